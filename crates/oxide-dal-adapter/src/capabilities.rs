//! Adapter capabilities.

use oxide_dal_core::Dialect;

/// Features the adapter may use. Defaults come from the dialect; switching
/// one off makes the adapter emulate or refuse the feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Statements may carry a `returning` clause.
    pub returning: bool,
    pub savepoints: bool,
    pub upsert: bool,
    /// DDL runs inside transactions.
    pub transactional_ddl: bool,
    /// Advisory locks bracket migration runs.
    pub migration_lock: bool,
}

impl Capabilities {
    /// Everything the dialect supports.
    #[must_use]
    pub const fn for_dialect(dialect: &Dialect) -> Self {
        Self {
            returning: dialect.supports_returning,
            savepoints: dialect.transactions.savepoints,
            upsert: true,
            transactional_ddl: dialect.transactions.transactional_ddl,
            migration_lock: dialect.migration_lock.is_some(),
        }
    }
}
