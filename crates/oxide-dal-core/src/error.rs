//! Compile-time validation errors.

/// Errors raised while compiling an operation into SQL.
///
/// Every variant is detected before any statement reaches a client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// Upsert without any values.
    #[error("upsert into '{0}' has no values")]
    EmptyUpsert(String),

    /// Update without any changed columns.
    #[error("update of '{0}' has no changes")]
    EmptyUpdate(String),

    /// Insert without any values.
    #[error("insert into '{0}' has no values")]
    EmptyInsert(String),

    /// Conflict-target upsert with neither an explicit target nor a primary key.
    #[error("upsert into '{0}' needs a conflict target or a primary key")]
    MissingConflictTarget(String),

    /// Raw SQL placeholder count does not match the bound values.
    #[error("raw SQL has {placeholders} placeholders but {values} values were bound")]
    PlaceholderMismatch {
        /// Number of `?` placeholders found outside quoted literals.
        placeholders: usize,
        /// Number of bound values.
        values: usize,
    },

    /// A constraint drop has no name and the dialect can't derive one.
    #[error("dropping {kind} on '{table}' requires a constraint name on {dialect}")]
    MissingConstraintName {
        /// Constraint kind, e.g. `primary key`.
        kind: &'static str,
        /// Table the constraint belongs to.
        table: String,
        /// Dialect name.
        dialect: &'static str,
    },

    /// A table needs at least one column.
    #[error("table '{0}' has no columns")]
    NoColumns(String),

    /// The dialect cannot express the requested feature.
    #[error("{feature} is not supported by {dialect}")]
    Unsupported {
        /// Description of the feature.
        feature: String,
        /// Dialect name.
        dialect: &'static str,
    },
}

impl CompileError {
    pub(crate) fn unsupported(feature: impl Into<String>, dialect: &'static str) -> Self {
        Self::Unsupported {
            feature: feature.into(),
            dialect,
        }
    }
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
