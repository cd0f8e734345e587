//! Versioned schema migrations on top of `oxide-dal-adapter`.
//!
//! Migrations are [`MigrationDescriptor`]s: a 14-digit `YYYYMMDDHHmmss` id, a
//! name, a checksum and a [`MigrationHandler`]. They come from SQL files
//! ([`loader::load_dir`]), from lists of schema operations
//! ([`MigrationDescriptor::from_operations`]) or from custom handlers.
//!
//! The [`Migrator`] records applied migrations in a journal table, refuses to
//! run when an applied migration's checksum changed, and supports targeted,
//! stepped and dry runs in both directions.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use oxide_dal_adapter::{Adapter, SqliteClient};
//! use oxide_dal_core::Dialect;
//! use oxide_dal_core::schema::{CreateTableBuilder, MigrationOp, bigint, varchar};
//! use oxide_dal_migrate::prelude::*;
//!
//! let create_users: MigrationOp = CreateTableBuilder::new()
//!     .name("users")
//!     .column(bigint("id").primary_key().autoincrement().build())
//!     .column(varchar("username", 255).not_null().unique().build())
//!     .build()
//!     .into();
//!
//! let migrations = vec![
//!     MigrationDescriptor::reversible("20240101000000", "create_users", vec![create_users])?,
//! ];
//!
//! let adapter = Adapter::new(SqliteClient::connect("sqlite:app.db").await?, Dialect::sqlite());
//! let migrator = Migrator::new(Arc::new(adapter), migrations)?;
//! migrator.up(UpOptions::default()).await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Create an empty migration file
//! oxide-dal-migrate new create_users
//!
//! # Apply pending migrations
//! oxide-dal-migrate up
//!
//! # Revert the latest batch
//! oxide-dal-migrate down
//!
//! # Show migration status
//! oxide-dal-migrate status
//! ```

pub mod checksum;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod journal;
pub mod loader;
pub mod runner;

pub use context::MigrationContext;
pub use descriptor::{MigrationDescriptor, MigrationHandler, TransactionMode};
pub use error::{MigrateError, Result};
pub use journal::{Journal, JournalRow, DEFAULT_TABLE};
pub use runner::{
    Direction, DownOptions, MigrationRun, MigrationState, MigrationStatus, Migrator,
    MigratorConfig, RunReport, UpOptions,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::context::MigrationContext;
    pub use crate::descriptor::{MigrationDescriptor, MigrationHandler, TransactionMode};
    pub use crate::error::{MigrateError, Result};
    pub use crate::loader::load_dir;
    pub use crate::runner::{DownOptions, MigrationState, Migrator, MigratorConfig, UpOptions};
}
