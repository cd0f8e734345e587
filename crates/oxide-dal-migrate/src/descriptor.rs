//! Migration descriptors.
//!
//! A migration is a value: id, name, checksum, transaction mode and a
//! [`MigrationHandler`] that performs the up and down steps. SQL files and
//! operation lists are just two handlers; anything else implements the trait.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use oxide_dal_core::schema::MigrationOp;

use crate::checksum::operations_checksum;
use crate::context::MigrationContext;
use crate::error::{MigrateError, Result};

/// Whether a migration runs inside a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionMode {
    /// Use a transaction when the database supports transactional DDL.
    #[default]
    Auto,
    /// Refuse to run without transactional DDL.
    Required,
    /// Never open a transaction.
    None,
}

impl TransactionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Required => "required",
            Self::None => "none",
        }
    }
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "required" => Ok(Self::Required),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown transaction mode '{other}' (expected auto, required or none)"
            )),
        }
    }
}

/// The up and down steps of a migration.
///
/// ```rust,ignore
/// struct Backfill;
///
/// #[async_trait]
/// impl MigrationHandler for Backfill {
///     async fn up(&self, ctx: &mut MigrationContext<'_>) -> Result<()> {
///         ctx.alter_table("users", |t| {
///             t.add_column(boolean("verified").not_null().default_value(false).build());
///         })
///         .await?;
///         ctx.raw("update users set verified = 1 where email_confirmed_at is not null").await
///     }
///
///     async fn down(&self, ctx: &mut MigrationContext<'_>) -> Result<()> {
///         ctx.alter_table("users", |t| {
///             t.drop_column("verified");
///         })
///         .await
///     }
/// }
/// ```
#[async_trait]
pub trait MigrationHandler: Send + Sync {
    async fn up(&self, ctx: &mut MigrationContext<'_>) -> Result<()>;

    async fn down(&self, ctx: &mut MigrationContext<'_>) -> Result<()>;
}

/// Runs two lists of schema operations.
struct OperationsHandler {
    up: Vec<MigrationOp>,
    down: Vec<MigrationOp>,
}

#[async_trait]
impl MigrationHandler for OperationsHandler {
    async fn up(&self, ctx: &mut MigrationContext<'_>) -> Result<()> {
        for op in &self.up {
            ctx.apply(op).await?;
        }
        Ok(())
    }

    async fn down(&self, ctx: &mut MigrationContext<'_>) -> Result<()> {
        for op in &self.down {
            ctx.apply(op).await?;
        }
        Ok(())
    }
}

/// Runs raw SQL statements, as read from a migration file.
pub(crate) struct SqlHandler {
    pub(crate) up: Vec<String>,
    pub(crate) down: Vec<String>,
}

#[async_trait]
impl MigrationHandler for SqlHandler {
    async fn up(&self, ctx: &mut MigrationContext<'_>) -> Result<()> {
        for sql in &self.up {
            ctx.raw(sql).await?;
        }
        Ok(())
    }

    async fn down(&self, ctx: &mut MigrationContext<'_>) -> Result<()> {
        for sql in &self.down {
            ctx.raw(sql).await?;
        }
        Ok(())
    }
}

/// A migration known to the runner.
#[derive(Clone)]
pub struct MigrationDescriptor {
    /// 14-digit `YYYYMMDDHHmmss` id. Ids order migrations.
    pub id: String,
    pub name: String,
    /// Recorded in the journal when applied, compared on every later run.
    pub checksum: String,
    pub transaction: TransactionMode,
    handler: Arc<dyn MigrationHandler>,
}

impl MigrationDescriptor {
    /// A migration with a custom handler.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        checksum: impl Into<String>,
        handler: impl MigrationHandler + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            checksum: checksum.into(),
            transaction: TransactionMode::Auto,
            handler: Arc::new(handler),
        }
    }

    /// A migration running `up` forward and `down` backward. The checksum
    /// covers both lists.
    ///
    /// # Errors
    ///
    /// Fails if the operations can't be serialized for checksumming.
    pub fn from_operations(
        id: impl Into<String>,
        name: impl Into<String>,
        up: Vec<MigrationOp>,
        down: Vec<MigrationOp>,
    ) -> Result<Self> {
        let checksum = operations_checksum(&up, &down)?;
        Ok(Self::new(id, name, checksum, OperationsHandler { up, down }))
    }

    /// Like [`from_operations`](Self::from_operations), deriving `down` by
    /// reversing `up`.
    ///
    /// # Errors
    ///
    /// Fails if an operation has no reverse, or on serialization failure.
    pub fn reversible(
        id: impl Into<String>,
        name: impl Into<String>,
        up: Vec<MigrationOp>,
    ) -> Result<Self> {
        let id = id.into();
        let down = up
            .iter()
            .rev()
            .map(|op| {
                op.reverse().ok_or_else(|| {
                    MigrateError::handler(format!("migration {id} has an irreversible operation"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_operations(id, name, up, down)
    }

    /// Sets the transaction mode.
    #[must_use]
    pub const fn transaction(mut self, mode: TransactionMode) -> Self {
        self.transaction = mode;
        self
    }

    #[must_use]
    pub fn handler(&self) -> &dyn MigrationHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for MigrationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("checksum", &self.checksum)
            .field("transaction", &self.transaction)
            .finish_non_exhaustive()
    }
}

/// Whether `id` is a 14-digit timestamp.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    id.len() == 14 && id.bytes().all(|b| b.is_ascii_digit())
}
