//! # oxide-dal-core
//!
//! A dialect-neutral SQL compiler.
//!
//! Operations are plain data: [`Query`] for data manipulation and
//! [`MigrationOp`](schema::MigrationOp) for schema changes. The compiler turns
//! them into [`SqlStatement`]s for a given [`Dialect`], a declarative value
//! describing quoting, placeholders, literals, type names and DDL quirks.
//!
//! ```rust
//! use oxide_dal_core::{compile_query, Dialect, Predicate, Query};
//!
//! let query = Query::delete(
//!     "sessions",
//!     Some(Predicate::or(vec![
//!         Predicate::lt("expires_at", "2024-01-01"),
//!         Predicate::is_null("user_id"),
//!     ])),
//! );
//!
//! let pg = compile_query(&query, &Dialect::postgres()).unwrap();
//! assert_eq!(
//!     pg.text,
//!     "delete from \"sessions\" where (\"expires_at\" < $1) or (\"user_id\" is null)"
//! );
//!
//! let my = compile_query(&query, &Dialect::mysql()).unwrap();
//! assert_eq!(
//!     my.text,
//!     "delete from `sessions` where (`expires_at` < ?) or (`user_id` is null)"
//! );
//! ```
//!
//! ## Values are always bound
//!
//! Values never end up in the statement text; identifiers are quoted with the
//! dialect's quote character, embedded quotes doubled.

pub mod compiler;
pub mod dialect;
mod error;
pub mod predicate;
pub mod query;
pub mod schema;
pub mod table;
pub mod value;

pub use compiler::{
    compile, compile_migration, compile_query, IsolationLevel, Operation, SqlStatement,
    TransactionOptions,
};
pub use dialect::Dialect;
pub use error::{CompileError, Result};
pub use predicate::{ComparisonOp, LogicalOp, Operand, Predicate};
pub use query::{
    Aggregate, Delete, Insert, InsertMany, Join, JoinKind, OrderBy, Query, RawSql, Returning, Row,
    Select, SortDirection, Update, Upsert,
};
pub use table::{ColumnPath, TableRef};
pub use value::{SqlValue, ToSqlValue};
