//! Error types for the migration runner.

use std::path::PathBuf;

use oxide_dal_adapter::AdapterError;
use oxide_dal_core::CompileError;

/// Errors that can occur while loading or running migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// An applied migration's content changed since it was recorded.
    #[error("Migration '{id}' has drifted: recorded checksum {recorded}, current checksum {current}")]
    Drift {
        id: String,
        recorded: String,
        current: String,
    },

    /// The migration must run in a transaction but the database can't wrap
    /// DDL in one.
    #[error("Migration '{0}' requires a transaction but the database has no transactional DDL")]
    TransactionRequired(String),

    /// A journal row selected for reverting has no loaded migration.
    #[error("Migration '{0}' is recorded in the journal but has no definition")]
    MissingDefinition(String),

    /// A target id that matches no known migration.
    #[error("Unknown migration: {0}")]
    UnknownMigration(String),

    /// Two migrations share an id.
    #[error("Duplicate migration id: {0}")]
    DuplicateId(String),

    /// A migration id that isn't a 14-digit `YYYYMMDDHHmmss` timestamp.
    #[error("Invalid migration id '{0}': expected 14 digits (YYYYMMDDHHmmss)")]
    InvalidId(String),

    /// A `.sql` file not named `YYYYMMDDHHmmss_name.sql`.
    #[error("Invalid migration file name: {0}")]
    InvalidFilename(PathBuf),

    /// Failed to parse a migration file.
    #[error("Failed to parse migration file '{path}': {message}")]
    Parse {
        /// Path to the migration file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Migration file already exists.
    #[error("Migration file already exists: {0}")]
    MigrationExists(PathBuf),

    /// No migrations directory found.
    #[error("Migrations directory not found: {0}")]
    MigrationsDirNotFound(PathBuf),

    /// A journal row the runner can't read.
    #[error("Invalid journal row: {0}")]
    Journal(String),

    /// IO error (reading/writing migration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error while checksumming operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error raised by the adapter or its driver.
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// An operation that can't be compiled for the database.
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// Error raised by a migration handler.
    #[error("Migration handler failed: {0}")]
    Handler(String),
}

impl MigrateError {
    /// Wraps an arbitrary handler failure.
    pub fn handler(message: impl std::fmt::Display) -> Self {
        Self::Handler(message.to_string())
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
