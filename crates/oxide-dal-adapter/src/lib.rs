//! # oxide-dal-adapter
//!
//! Runs operations compiled by `oxide-dal-core` against a database.
//!
//! A driver implements [`Client`] (and [`Connection`] for its sessions). The
//! [`Adapter`] layers the rest on top:
//!
//! - [`Adapter::execute`] and [`Adapter::migrate`] compile for the adapter's
//!   dialect and normalize results into [`QueryOutcome`]s;
//! - transactions are identified by [`TransactionToken`]s, each bound to one
//!   connection until commit or rollback;
//! - savepoints, upsert and `returning` follow the adapter's
//!   [`Capabilities`];
//! - an advisory lock can bracket migration runs.
//!
//! [`SqliteClient`] is a ready-made client over a `sqlx` SQLite pool.
//!
//! ```rust,ignore
//! use oxide_dal_adapter::{Adapter, SqliteClient};
//! use oxide_dal_core::{Dialect, Predicate, Query, Select};
//!
//! let adapter = Adapter::new(SqliteClient::connect("sqlite:app.db").await?, Dialect::sqlite());
//! let outcome = adapter
//!     .execute(&Select::from("users").filter(Predicate::eq("active", true)).into(), None)
//!     .await?;
//! for record in outcome.records() {
//!     println!("{:?}", record.get("username"));
//! }
//! ```

mod adapter;
mod capabilities;
mod client;
mod error;
mod record;
mod result;
mod sqlite;
mod transaction;

pub use adapter::Adapter;
pub use capabilities::Capabilities;
pub use client::{Client, ClientError, Connection, RawResult};
pub use error::{AdapterError, Result};
pub use record::Record;
pub use result::QueryOutcome;
pub use sqlite::SqliteClient;
pub use transaction::TransactionToken;
