//! The migration journal.
//!
//! One row per applied migration in the `oxide_migrations` table (name
//! configurable). The journal records; it doesn't lock. Concurrent runners
//! are kept apart by the adapter's advisory migration lock.

use chrono::{DateTime, NaiveDateTime, Utc};
use oxide_dal_adapter::{Adapter, Record, TransactionToken};
use oxide_dal_core::schema::{integer, timestamp, varchar, CreateTableBuilder, MigrationOp};
use oxide_dal_core::{Predicate, Query, Select, SortDirection, SqlValue, TableRef};

use crate::descriptor::MigrationDescriptor;
use crate::error::{MigrateError, Result};

/// Default journal table name.
pub const DEFAULT_TABLE: &str = "oxide_migrations";

/// A record of an applied migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalRow {
    pub id: String,
    pub name: String,
    pub checksum: String,
    /// Migrations applied by the same `up` run share a batch.
    pub batch: i64,
    pub applied_at: DateTime<Utc>,
}

/// Reads and writes the journal table through an adapter.
pub struct Journal<'a> {
    adapter: &'a Adapter,
    table: TableRef,
}

impl<'a> Journal<'a> {
    #[must_use]
    pub const fn new(adapter: &'a Adapter, table: TableRef) -> Self {
        Self { adapter, table }
    }

    #[must_use]
    pub const fn table(&self) -> &TableRef {
        &self.table
    }

    /// The `create table` operation for the journal.
    #[must_use]
    pub fn create_table_op(&self) -> MigrationOp {
        CreateTableBuilder::new()
            .name(self.table.clone())
            .if_not_exists()
            .column(varchar("id", 64).primary_key().build())
            .column(varchar("name", 255).not_null().build())
            .column(varchar("checksum", 128).not_null().build())
            .column(integer("batch").not_null().build())
            .column(timestamp("applied_at").not_null().default_now().build())
            .build()
            .into()
    }

    /// Whether the journal table exists.
    ///
    /// # Errors
    ///
    /// Fails on a driver error.
    pub async fn exists(&self) -> Result<bool> {
        Ok(self.adapter.table_exists(&self.table, None).await?)
    }

    /// Creates the journal table if it's missing.
    ///
    /// # Errors
    ///
    /// Fails on a driver error.
    pub async fn ensure(&self) -> Result<()> {
        if !self.exists().await? {
            self.adapter.migrate(&self.create_table_op(), None).await?;
        }
        Ok(())
    }

    /// All rows, ordered by id.
    ///
    /// # Errors
    ///
    /// Fails on a driver error or an unreadable row.
    pub async fn load(&self) -> Result<Vec<JournalRow>> {
        let select = Select::from(self.table.clone())
            .columns(&["id", "name", "checksum", "batch", "applied_at"])
            .order_by("id", SortDirection::Asc);
        let outcome = self.adapter.execute(&select.into(), None).await?;
        outcome.records().iter().map(parse_row).collect()
    }

    /// Insert recording `migration` as applied in `batch`.
    #[must_use]
    pub fn record_query(&self, migration: &MigrationDescriptor, batch: i64) -> Query {
        Query::insert(
            self.table.clone(),
            [
                ("id", SqlValue::Text(migration.id.clone())),
                ("name", SqlValue::Text(migration.name.clone())),
                ("checksum", SqlValue::Text(migration.checksum.clone())),
                ("batch", SqlValue::Int(batch)),
            ],
        )
        .into()
    }

    /// Delete forgetting migration `id`.
    #[must_use]
    pub fn remove_query(&self, id: &str) -> Query {
        Query::delete(self.table.clone(), Some(Predicate::eq("id", id)))
    }

    /// Records `migration` inside `transaction`.
    ///
    /// # Errors
    ///
    /// Fails on a driver error.
    pub async fn record(
        &self,
        migration: &MigrationDescriptor,
        batch: i64,
        transaction: Option<TransactionToken>,
    ) -> Result<()> {
        self.adapter
            .execute(&self.record_query(migration, batch), transaction)
            .await?;
        Ok(())
    }

    /// Removes migration `id` inside `transaction`.
    ///
    /// # Errors
    ///
    /// Fails on a driver error.
    pub async fn remove(&self, id: &str, transaction: Option<TransactionToken>) -> Result<()> {
        self.adapter
            .execute(&self.remove_query(id), transaction)
            .await?;
        Ok(())
    }
}

/// Batch number for the next `up` run.
#[must_use]
pub fn next_batch(rows: &[JournalRow]) -> i64 {
    rows.iter().map(|row| row.batch).max().unwrap_or(0) + 1
}

fn parse_row(record: &Record) -> Result<JournalRow> {
    let text = |column: &str| match record.get(column) {
        Some(SqlValue::Text(value)) => Ok(value.clone()),
        Some(SqlValue::Int(value)) => Ok(value.to_string()),
        other => Err(MigrateError::Journal(format!("{column}: {other:?}"))),
    };
    let batch = match record.get("batch") {
        Some(SqlValue::Int(value)) => *value,
        Some(SqlValue::Text(value)) => value
            .trim()
            .parse()
            .map_err(|_| MigrateError::Journal(format!("batch: {value}")))?,
        other => return Err(MigrateError::Journal(format!("batch: {other:?}"))),
    };
    let applied_at = text("applied_at")?;

    Ok(JournalRow {
        id: text("id")?,
        name: text("name")?,
        checksum: text("checksum")?,
        batch,
        applied_at: parse_timestamp(&applied_at)
            .ok_or_else(|| MigrateError::Journal(format!("applied_at: {applied_at}")))?,
    })
}

/// Accepts RFC 3339 as well as the `YYYY-MM-DD HH:MM:SS[.f]` form SQL
/// engines print for `current_timestamp`.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|dt| dt.and_utc())
        })
}
