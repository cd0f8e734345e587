//! The migration runner.
//!
//! A run takes the adapter's advisory lock, makes sure the journal exists,
//! checks every applied migration for drift, then applies (or reverts) the
//! selected migrations one by one, each in its own transaction when the mode
//! and database allow. The lock is released on every path.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use oxide_dal_adapter::Adapter;
use oxide_dal_core::{SqlStatement, TableRef, TransactionOptions};
use serde::Serialize;
use tracing::{info, warn};

use crate::context::MigrationContext;
use crate::descriptor::{is_valid_id, MigrationDescriptor, TransactionMode};
use crate::error::{MigrateError, Result};
use crate::journal::{next_batch, Journal, JournalRow, DEFAULT_TABLE};

/// Where the journal lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratorConfig {
    pub table: String,
    pub schema: Option<String>,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            schema: None,
        }
    }
}

impl MigratorConfig {
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    fn table_ref(&self) -> TableRef {
        match &self.schema {
            Some(schema) => TableRef::qualified(schema.clone(), self.table.clone()),
            None => TableRef::new(self.table.clone()),
        }
    }
}

/// Options for [`Migrator::up`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpOptions {
    /// Apply pending migrations up to and including this id.
    pub to: Option<String>,
    /// Apply at most this many migrations.
    pub step: Option<usize>,
    /// Compile and report without touching the database.
    pub dry_run: bool,
}

/// Options for [`Migrator::down`]. Without `to` or `step` the latest batch is
/// reverted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownOptions {
    /// Revert applied migrations with an id at or after this one.
    pub to: Option<String>,
    /// Revert at most this many migrations.
    pub step: Option<usize>,
    /// Compile and report without touching the database.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

/// One migration run (or planned) by a [`Migrator`].
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationRun {
    pub id: String,
    pub name: String,
    /// Every statement, including the journal insert or delete.
    pub statements: Vec<SqlStatement>,
}

/// What a run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub direction: Direction,
    pub dry_run: bool,
    /// Batch recorded for applied migrations. `None` when reverting.
    pub batch: Option<i64>,
    /// Migrations in execution order.
    pub migrations: Vec<MigrationRun>,
}

impl RunReport {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.migrations.iter().map(|m| m.id.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationState {
    Applied,
    Pending,
    /// Applied, but the content changed since.
    Drifted,
    /// In the journal without a loaded definition.
    Missing,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Applied => "applied",
            Self::Pending => "pending",
            Self::Drifted => "drifted",
            Self::Missing => "missing",
        })
    }
}

/// One line of [`Migrator::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub id: String,
    pub name: String,
    pub state: MigrationState,
    pub batch: Option<i64>,
    pub applied_at: Option<DateTime<Utc>>,
}

/// Applies and reverts a fixed, id-ordered set of migrations.
pub struct Migrator {
    adapter: Arc<Adapter>,
    migrations: Vec<MigrationDescriptor>,
    config: MigratorConfig,
}

impl Migrator {
    /// # Errors
    ///
    /// Fails on a malformed or duplicate id.
    pub fn new(adapter: Arc<Adapter>, mut migrations: Vec<MigrationDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for migration in &migrations {
            if !is_valid_id(&migration.id) {
                return Err(MigrateError::InvalidId(migration.id.clone()));
            }
            if !seen.insert(migration.id.as_str()) {
                return Err(MigrateError::DuplicateId(migration.id.clone()));
            }
        }
        migrations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Self {
            adapter,
            migrations,
            config: MigratorConfig::default(),
        })
    }

    #[must_use]
    pub fn with_config(mut self, config: MigratorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn migrations(&self) -> &[MigrationDescriptor] {
        &self.migrations
    }

    #[must_use]
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    fn journal(&self) -> Journal<'_> {
        Journal::new(&self.adapter, self.config.table_ref())
    }

    fn find(&self, id: &str) -> Option<&MigrationDescriptor> {
        self.migrations
            .binary_search_by(|m| m.id.as_str().cmp(id))
            .ok()
            .map(|index| &self.migrations[index])
    }

    /// Applies pending migrations in id order.
    ///
    /// # Errors
    ///
    /// Fails on drift, an unknown target, a missing transaction capability
    /// or the first failing migration. Migrations before the failing one stay
    /// applied.
    pub async fn up(&self, options: UpOptions) -> Result<RunReport> {
        self.locked(self.run_up(&options)).await
    }

    /// Reverts applied migrations, newest first.
    ///
    /// # Errors
    ///
    /// Fails on drift, an unknown target, a selected migration without a
    /// definition or the first failing migration.
    pub async fn down(&self, options: DownOptions) -> Result<RunReport> {
        self.locked(self.run_down(&options)).await
    }

    /// State of every loaded migration, plus journal rows without one.
    ///
    /// # Errors
    ///
    /// Fails on a driver error or an unreadable journal.
    pub async fn status(&self) -> Result<Vec<MigrationStatus>> {
        let rows = self.load_journal(false).await?;
        let recorded: HashMap<&str, &JournalRow> =
            rows.iter().map(|row| (row.id.as_str(), row)).collect();

        let mut statuses: Vec<MigrationStatus> = self
            .migrations
            .iter()
            .map(|m| {
                let row = recorded.get(m.id.as_str());
                let state = match row {
                    Some(row) if row.checksum != m.checksum => MigrationState::Drifted,
                    Some(_) => MigrationState::Applied,
                    None => MigrationState::Pending,
                };
                MigrationStatus {
                    id: m.id.clone(),
                    name: m.name.clone(),
                    state,
                    batch: row.map(|r| r.batch),
                    applied_at: row.map(|r| r.applied_at),
                }
            })
            .collect();

        for row in rows.iter().filter(|row| self.find(&row.id).is_none()) {
            warn!(id = %row.id, name = %row.name, "Journal row has no migration definition");
            statuses.push(MigrationStatus {
                id: row.id.clone(),
                name: row.name.clone(),
                state: MigrationState::Missing,
                batch: Some(row.batch),
                applied_at: Some(row.applied_at),
            });
        }
        statuses.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(statuses)
    }

    /// Runs `run` between acquiring and releasing the migration lock.
    async fn locked(&self, run: impl Future<Output = Result<RunReport>>) -> Result<RunReport> {
        let lock = &self.config.table;
        self.adapter.acquire_migration_lock(lock).await?;
        let result = run.await;
        let released = self.adapter.release_migration_lock(lock).await;
        match (result, released) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), released) => {
                if let Err(release_err) = released {
                    warn!(error = %release_err, "Failed to release migration lock");
                }
                Err(err)
            }
        }
    }

    /// Journal rows. A dry run never creates the journal and reads a missing
    /// one as empty.
    async fn load_journal(&self, create: bool) -> Result<Vec<JournalRow>> {
        let journal = self.journal();
        if create {
            journal.ensure().await?;
        } else if !journal.exists().await? {
            return Ok(Vec::new());
        }
        journal.load().await
    }

    fn check_drift(&self, rows: &[JournalRow]) -> Result<()> {
        for row in rows {
            if let Some(migration) = self.find(&row.id) {
                if migration.checksum != row.checksum {
                    return Err(MigrateError::Drift {
                        id: row.id.clone(),
                        recorded: row.checksum.clone(),
                        current: migration.checksum.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Whether `migration` runs in a transaction.
    fn use_transaction(&self, migration: &MigrationDescriptor) -> Result<bool> {
        let transactional_ddl = self.adapter.capabilities().transactional_ddl;
        match migration.transaction {
            TransactionMode::Auto => Ok(transactional_ddl),
            TransactionMode::Required if transactional_ddl => Ok(true),
            TransactionMode::Required => Err(MigrateError::TransactionRequired(migration.id.clone())),
            TransactionMode::None => Ok(false),
        }
    }

    async fn run_up(&self, options: &UpOptions) -> Result<RunReport> {
        let rows = self.load_journal(!options.dry_run).await?;
        self.check_drift(&rows)?;

        if let Some(to) = &options.to {
            if self.find(to).is_none() {
                return Err(MigrateError::UnknownMigration(to.clone()));
            }
        }

        let applied: HashSet<&str> = rows.iter().map(|row| row.id.as_str()).collect();
        let mut selected: Vec<&MigrationDescriptor> = self
            .migrations
            .iter()
            .filter(|m| !applied.contains(m.id.as_str()))
            .filter(|m| options.to.as_ref().is_none_or(|to| m.id <= *to))
            .collect();
        if let Some(step) = options.step {
            selected.truncate(step);
        }
        let modes = selected
            .iter()
            .map(|m| self.use_transaction(m))
            .collect::<Result<Vec<_>>>()?;

        let batch = next_batch(&rows);
        let mut report = RunReport {
            direction: Direction::Up,
            dry_run: options.dry_run,
            batch: Some(batch),
            migrations: Vec::with_capacity(selected.len()),
        };
        for (migration, transactional) in selected.into_iter().zip(modes) {
            let run = self
                .run_one(migration, Direction::Up, batch, transactional, options.dry_run)
                .await?;
            report.migrations.push(run);
        }

        info!(
            applied = report.migrations.len(),
            batch,
            dry_run = options.dry_run,
            "Migration run complete"
        );
        Ok(report)
    }

    async fn run_down(&self, options: &DownOptions) -> Result<RunReport> {
        let rows = self.load_journal(!options.dry_run).await?;
        self.check_drift(&rows)?;

        if let Some(to) = &options.to {
            if self.find(to).is_none() && !rows.iter().any(|row| row.id == *to) {
                return Err(MigrateError::UnknownMigration(to.clone()));
            }
        }

        let mut candidates: Vec<&JournalRow> = rows.iter().rev().collect();
        match (&options.to, options.step) {
            (None, None) => {
                let latest = rows.iter().map(|row| row.batch).max();
                candidates.retain(|row| Some(row.batch) == latest);
            }
            (to, step) => {
                if let Some(to) = to {
                    candidates.retain(|row| row.id >= *to);
                }
                if let Some(step) = step {
                    candidates.truncate(step);
                }
            }
        }

        let selected = candidates
            .iter()
            .map(|row| {
                self.find(&row.id)
                    .ok_or_else(|| MigrateError::MissingDefinition(row.id.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        let modes = selected
            .iter()
            .map(|m| self.use_transaction(m))
            .collect::<Result<Vec<_>>>()?;

        let mut report = RunReport {
            direction: Direction::Down,
            dry_run: options.dry_run,
            batch: None,
            migrations: Vec::with_capacity(selected.len()),
        };
        for (migration, transactional) in selected.into_iter().zip(modes) {
            let run = self
                .run_one(migration, Direction::Down, 0, transactional, options.dry_run)
                .await?;
            report.migrations.push(run);
        }

        info!(
            reverted = report.migrations.len(),
            dry_run = options.dry_run,
            "Migration run complete"
        );
        Ok(report)
    }

    async fn run_one(
        &self,
        migration: &MigrationDescriptor,
        direction: Direction,
        batch: i64,
        transactional: bool,
        dry_run: bool,
    ) -> Result<MigrationRun> {
        info!(
            id = %migration.id,
            name = %migration.name,
            direction = %direction,
            transactional,
            dry_run,
            "Running migration"
        );

        let journal = self.journal();
        let journal_query = match direction {
            Direction::Up => journal.record_query(migration, batch),
            Direction::Down => journal.remove_query(&migration.id),
        };

        if dry_run {
            let mut ctx = MigrationContext::new(&self.adapter, None, true);
            run_handler(migration, direction, &mut ctx).await?;
            let mut statements = ctx.into_statements();
            statements.push(self.adapter.compile_sql(&journal_query)?);
            return Ok(MigrationRun {
                id: migration.id.clone(),
                name: migration.name.clone(),
                statements,
            });
        }

        let transaction = if transactional {
            Some(
                self.adapter
                    .begin_transaction(TransactionOptions::default())
                    .await?,
            )
        } else {
            None
        };

        let mut ctx = MigrationContext::new(&self.adapter, transaction, false);
        let outcome = async {
            run_handler(migration, direction, &mut ctx).await?;
            let statement = self.adapter.compile_sql(&journal_query)?;
            self.adapter.run_statement(&statement, transaction).await?;
            Ok::<_, MigrateError>(statement)
        }
        .await;

        match (outcome, transaction) {
            (Ok(journal_statement), transaction) => {
                if let Some(token) = transaction {
                    self.adapter.commit_transaction(token).await?;
                }
                let mut statements = ctx.into_statements();
                statements.push(journal_statement);
                info!(
                    id = %migration.id,
                    name = %migration.name,
                    direction = %direction,
                    "Migration finished"
                );
                Ok(MigrationRun {
                    id: migration.id.clone(),
                    name: migration.name.clone(),
                    statements,
                })
            }
            (Err(err), Some(token)) => {
                if let Err(rollback_err) = self.adapter.rollback_transaction(token).await {
                    warn!(
                        id = %migration.id,
                        error = %rollback_err,
                        "Rollback after failed migration also failed"
                    );
                }
                Err(err)
            }
            (Err(err), None) => Err(err),
        }
    }
}

async fn run_handler(
    migration: &MigrationDescriptor,
    direction: Direction,
    ctx: &mut MigrationContext<'_>,
) -> Result<()> {
    match direction {
        Direction::Up => migration.handler().up(ctx).await,
        Direction::Down => migration.handler().down(ctx).await,
    }
}
