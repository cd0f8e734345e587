//! The adapter: compiles operations for its dialect and runs them through a
//! [`Client`], tracking transactions by token.

use std::sync::Arc;

use oxide_dal_core::compiler::{
    compile_begin, compile_commit, compile_lock_acquire, compile_lock_release,
    compile_release_savepoint, compile_rollback, compile_rollback_to_savepoint, compile_savepoint,
    compile_table_exists,
};
use oxide_dal_core::schema::MigrationOp;
use oxide_dal_core::{
    compile_migration, compile_query, Dialect, Predicate, Query, Returning, Row, Select,
    SqlStatement, SqlValue, TableRef, TransactionOptions,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::capabilities::Capabilities;
use crate::client::{Client, Connection, RawResult};
use crate::error::{AdapterError, Result};
use crate::record::Record;
use crate::result::{normalize_count, QueryOutcome};
use crate::transaction::{TransactionTable, TransactionToken};

/// Runs compiled operations against one database.
///
/// ```rust,ignore
/// let adapter = Adapter::new(SqliteClient::connect("sqlite::memory:").await?, Dialect::sqlite());
/// let tx = adapter.begin_transaction(TransactionOptions::default()).await?;
/// adapter.execute(&Query::insert("users", [("name", "ann")]).into(), Some(tx)).await?;
/// adapter.commit_transaction(tx).await?;
/// ```
pub struct Adapter {
    client: Arc<dyn Client>,
    dialect: Dialect,
    capabilities: Capabilities,
    transactions: TransactionTable,
    /// Session holding the advisory migration lock.
    lock_connection: Mutex<Option<Arc<dyn Connection>>>,
}

impl Adapter {
    /// Creates an adapter with the dialect's default capabilities.
    pub fn new(client: impl Client + 'static, dialect: Dialect) -> Self {
        Self::from_arc(Arc::new(client), dialect)
    }

    /// Creates an adapter over a shared client.
    pub fn from_arc(client: Arc<dyn Client>, dialect: Dialect) -> Self {
        Self {
            client,
            capabilities: Capabilities::for_dialect(&dialect),
            dialect,
            transactions: TransactionTable::new(),
            lock_connection: Mutex::new(None),
        }
    }

    /// Overrides the capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[must_use]
    pub const fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    #[must_use]
    pub const fn dialect_name(&self) -> &'static str {
        self.dialect.name
    }

    /// Number of transactions still open.
    #[must_use]
    pub fn open_transactions(&self) -> usize {
        self.transactions.len()
    }

    /// The dialect as the compiler should see it, narrowed by capabilities.
    fn effective_dialect(&self) -> Dialect {
        let mut dialect = self.dialect;
        dialect.supports_returning &= self.capabilities.returning;
        dialect
    }

    /// Compiles a query without running it.
    ///
    /// # Errors
    ///
    /// Fails when the query doesn't validate or needs a disabled capability.
    pub fn compile_sql(&self, query: &Query) -> Result<SqlStatement> {
        if matches!(query, Query::Upsert(_)) && !self.capabilities.upsert {
            return Err(AdapterError::Unsupported("upsert"));
        }
        Ok(compile_query(query, &self.effective_dialect())?)
    }

    /// Compiles a schema operation without running it.
    ///
    /// # Errors
    ///
    /// Fails when the operation can't be expressed on this dialect.
    pub fn compile_migration(&self, op: &MigrationOp) -> Result<Vec<SqlStatement>> {
        Ok(compile_migration(op, &self.dialect)?)
    }

    /// Runs one statement, inside the transaction when a token is given.
    ///
    /// # Errors
    ///
    /// Fails on an unknown token or a driver error.
    pub async fn run_statement(
        &self,
        statement: &SqlStatement,
        transaction: Option<TransactionToken>,
    ) -> Result<RawResult> {
        debug!(sql = %statement.text, values = statement.values.len(), "Executing SQL");
        match transaction {
            Some(token) => {
                let connection = self
                    .transactions
                    .connection(token)
                    .ok_or(AdapterError::UnknownTransaction(token))?;
                Ok(connection.run(statement).await?)
            }
            None => Ok(self.client.run(statement).await?),
        }
    }

    /// Executes a data query and normalizes its result.
    ///
    /// # Errors
    ///
    /// Fails on validation, an unknown token, or a driver error.
    pub async fn execute(
        &self,
        query: &Query,
        transaction: Option<TransactionToken>,
    ) -> Result<QueryOutcome> {
        if let Some(token) = transaction {
            if self.transactions.connection(token).is_none() {
                return Err(AdapterError::UnknownTransaction(token));
            }
        }

        if let Query::InsertMany(many) = query {
            if many.rows.is_empty() {
                return Ok(QueryOutcome {
                    rows: many.returning.is_requested().then(Vec::new),
                    ..QueryOutcome::default()
                });
            }
        }

        let statement = self.compile_sql(query)?;
        let raw = self.run_statement(&statement, transaction).await?;

        match query {
            Query::Count(_) | Query::Exists(_) => {
                let count = raw
                    .rows
                    .first()
                    .and_then(|row| {
                        row.iter()
                            .find(|(name, _)| name == "count")
                            .or_else(|| row.first())
                    })
                    .map(|(_, value)| normalize_count(value))
                    .transpose()?
                    .unwrap_or(0);
                Ok(QueryOutcome {
                    rows: None,
                    rows_affected: 0,
                    insert_id: None,
                    count: Some(count),
                })
            }
            Query::Select(_) | Query::Raw(_) => Ok(QueryOutcome {
                rows_affected: raw.rows_affected,
                rows: Some(into_records(raw.rows)),
                insert_id: None,
                count: None,
            }),
            Query::Insert(_) | Query::InsertMany(_) | Query::Upsert(_) => {
                self.insert_outcome(query, raw, transaction).await
            }
            Query::Update(_) | Query::Delete(_) => {
                let rows = self.returned_rows(query, raw.rows);
                Ok(QueryOutcome {
                    rows,
                    rows_affected: raw.rows_affected,
                    insert_id: None,
                    count: None,
                })
            }
        }
    }

    fn returned_rows(&self, query: &Query, rows: Vec<Row>) -> Option<Vec<Record>> {
        if !query.returning().is_requested() {
            return None;
        }
        if self.effective_dialect().supports_returning {
            return Some(into_records(rows));
        }
        warn!(
            dialect = self.dialect.name,
            table = query.table().map_or("", |t| t.name.as_str()),
            "Returning requested but unavailable; no rows returned"
        );
        None
    }

    async fn insert_outcome(
        &self,
        query: &Query,
        raw: RawResult,
        transaction: Option<TransactionToken>,
    ) -> Result<QueryOutcome> {
        let supplied = match query {
            Query::Insert(q) => Some(&q.row),
            Query::InsertMany(q) => q.rows.last(),
            Query::Upsert(q) => Some(&q.values),
            _ => None,
        };
        let insert_id = insert_id(query.primary_key(), &raw, supplied);
        let returning = query.returning();

        let rows = if !returning.is_requested() {
            None
        } else if self.effective_dialect().supports_returning {
            Some(into_records(raw.rows))
        } else if let (Query::Insert(q), [key], Some(id)) =
            (query, query.primary_key(), &insert_id)
        {
            Some(self.reselect(&q.table, key, id, returning, transaction).await?)
        } else {
            self.returned_rows(query, Vec::new())
        };

        Ok(QueryOutcome {
            rows,
            rows_affected: raw.rows_affected,
            insert_id,
            count: None,
        })
    }

    /// Emulates `returning` by selecting the inserted row by key.
    async fn reselect(
        &self,
        table: &TableRef,
        key: &str,
        id: &SqlValue,
        returning: &Returning,
        transaction: Option<TransactionToken>,
    ) -> Result<Vec<Record>> {
        let mut select = Select::from(table.unaliased()).filter(Predicate::eq(key, id.clone()));
        if let Returning::Columns(columns) = returning {
            let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
            select = select.columns(&columns);
        }
        let statement = compile_query(&select.into(), &self.dialect)?;
        let raw = self.run_statement(&statement, transaction).await?;
        Ok(into_records(raw.rows))
    }

    /// Compiles a schema operation and runs each statement in order.
    ///
    /// # Errors
    ///
    /// Fails on validation, an unknown token, or a driver error. Statements
    /// already run stay applied unless the surrounding transaction is rolled
    /// back.
    pub async fn migrate(
        &self,
        op: &MigrationOp,
        transaction: Option<TransactionToken>,
    ) -> Result<()> {
        for statement in self.compile_migration(op)? {
            self.run_statement(&statement, transaction).await?;
        }
        Ok(())
    }

    /// Whether `table` exists in the current schema.
    ///
    /// # Errors
    ///
    /// Fails on a driver error or an unreadable count.
    pub async fn table_exists(
        &self,
        table: &TableRef,
        transaction: Option<TransactionToken>,
    ) -> Result<bool> {
        let statement = compile_table_exists(&self.dialect, table);
        let raw = self.run_statement(&statement, transaction).await?;
        let count = match raw.rows.first().and_then(|row| row.first()) {
            Some((_, value)) => normalize_count(value)?,
            None => 0,
        };
        Ok(count > 0)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Opens a transaction on its own connection.
    ///
    /// # Errors
    ///
    /// Fails when the dialect can't honour `options`, or on a driver error.
    pub async fn begin_transaction(&self, options: TransactionOptions) -> Result<TransactionToken> {
        let statements = compile_begin(&self.dialect, options)?;
        let connection = self.client.acquire().await?;
        for statement in &statements {
            debug!(sql = %statement.text, "Executing SQL");
            if let Err(err) = connection.run(statement).await {
                self.release_connection(connection).await;
                return Err(err.into());
            }
        }
        let token = self.transactions.register(connection);
        debug!(%token, "Transaction started");
        Ok(token)
    }

    /// Commits and forgets the transaction. The connection is released even
    /// when the commit fails.
    ///
    /// # Errors
    ///
    /// Fails on an unknown token or a driver error.
    pub async fn commit_transaction(&self, token: TransactionToken) -> Result<()> {
        self.finish_transaction(token, &compile_commit()).await
    }

    /// Rolls back and forgets the transaction. The connection is released even
    /// when the rollback fails.
    ///
    /// # Errors
    ///
    /// Fails on an unknown token or a driver error.
    pub async fn rollback_transaction(&self, token: TransactionToken) -> Result<()> {
        self.finish_transaction(token, &compile_rollback()).await
    }

    async fn finish_transaction(
        &self,
        token: TransactionToken,
        statement: &SqlStatement,
    ) -> Result<()> {
        let entry = self
            .transactions
            .remove(token)
            .ok_or(AdapterError::UnknownTransaction(token))?;
        debug!(sql = %statement.text, %token, "Executing SQL");
        let result = entry.connection.run(statement).await;
        self.release_connection(entry.connection).await;
        result?;
        Ok(())
    }

    async fn release_connection(&self, connection: Arc<dyn Connection>) {
        if !self.client.is_pooled() {
            return;
        }
        if let Err(err) = self.client.release(connection).await {
            warn!(error = %err, "Failed to release connection");
        }
    }

    // =========================================================================
    // Savepoints
    // =========================================================================

    /// `savepoint "name"` inside the transaction.
    ///
    /// # Errors
    ///
    /// Fails on an unknown token, without the savepoints capability, or on a
    /// driver error.
    pub async fn create_savepoint(&self, token: TransactionToken, name: &str) -> Result<()> {
        let statement = self.savepoint_statement(token, name, compile_savepoint)?;
        self.run_statement(&statement, Some(token)).await?;
        Ok(())
    }

    /// `rollback to savepoint "name"` inside the transaction.
    ///
    /// # Errors
    ///
    /// See [`create_savepoint`](Self::create_savepoint).
    pub async fn rollback_to_savepoint(&self, token: TransactionToken, name: &str) -> Result<()> {
        let statement = self.savepoint_statement(token, name, compile_rollback_to_savepoint)?;
        self.run_statement(&statement, Some(token)).await?;
        Ok(())
    }

    /// `release savepoint "name"` inside the transaction.
    ///
    /// # Errors
    ///
    /// See [`create_savepoint`](Self::create_savepoint).
    pub async fn release_savepoint(&self, token: TransactionToken, name: &str) -> Result<()> {
        let statement = self.savepoint_statement(token, name, compile_release_savepoint)?;
        self.run_statement(&statement, Some(token)).await?;
        Ok(())
    }

    fn savepoint_statement(
        &self,
        token: TransactionToken,
        name: &str,
        compile: fn(&Dialect, &str) -> oxide_dal_core::Result<SqlStatement>,
    ) -> Result<SqlStatement> {
        if self.transactions.connection(token).is_none() {
            return Err(AdapterError::UnknownTransaction(token));
        }
        if !self.capabilities.savepoints {
            return Err(AdapterError::Unsupported("savepoints"));
        }
        Ok(compile(&self.dialect, name)?)
    }

    // =========================================================================
    // Migration lock
    // =========================================================================

    /// Takes the advisory lock `name` on a dedicated connection, held until
    /// [`release_migration_lock`](Self::release_migration_lock). A no-op
    /// without the `migration_lock` capability, and while the lock is
    /// already held, so one release always frees it.
    ///
    /// # Errors
    ///
    /// Fails on a driver error.
    pub async fn acquire_migration_lock(&self, name: &str) -> Result<()> {
        if !self.capabilities.migration_lock {
            return Ok(());
        }
        let Some(statement) = compile_lock_acquire(&self.dialect, name) else {
            return Ok(());
        };

        let mut held = self.lock_connection.lock().await;
        if held.is_some() {
            debug!(lock = name, "Migration lock already held");
            return Ok(());
        }
        let connection = self.client.acquire().await?;
        debug!(sql = %statement.text, lock = name, "Acquiring migration lock");
        match connection.run(&statement).await {
            Ok(_) => {
                *held = Some(connection);
                Ok(())
            }
            Err(err) => {
                self.release_connection(connection).await;
                Err(err.into())
            }
        }
    }

    /// Releases the advisory lock `name` and its connection.
    ///
    /// # Errors
    ///
    /// Fails on a driver error. The connection is released regardless.
    pub async fn release_migration_lock(&self, name: &str) -> Result<()> {
        if !self.capabilities.migration_lock {
            return Ok(());
        }
        let Some(statement) = compile_lock_release(&self.dialect, name) else {
            return Ok(());
        };
        let Some(connection) = self.lock_connection.lock().await.take() else {
            return Ok(());
        };
        debug!(sql = %statement.text, lock = name, "Releasing migration lock");
        let result = connection.run(&statement).await;
        self.release_connection(connection).await;
        result?;
        Ok(())
    }
}

fn into_records(rows: Vec<Row>) -> Vec<Record> {
    rows.into_iter().map(Record::from).collect()
}

/// Single-column keys only: the key from the last returned row, else the last
/// row's supplied key, else the driver's id. Tables without a declared key
/// use the driver's id.
fn insert_id(primary_key: &[String], raw: &RawResult, supplied: Option<&Row>) -> Option<SqlValue> {
    let driver_id = || raw.last_insert_id.map(SqlValue::Int);
    match primary_key {
        [] => driver_id(),
        [key] => {
            let lookup = |row: &Row| {
                row.iter()
                    .find(|(column, _)| column == key)
                    .map(|(_, value)| value.clone())
                    .filter(|value| !value.is_null())
            };
            raw.rows
                .last()
                .and_then(lookup)
                .or_else(|| supplied.and_then(lookup))
                .or_else(driver_id)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(rows: Vec<Row>, last_insert_id: Option<i64>) -> RawResult {
        RawResult {
            rows,
            rows_affected: 1,
            last_insert_id,
        }
    }

    #[test]
    fn test_insert_id_prefers_returned_row() {
        let pk = vec!["id".to_string()];
        let returned = vec![vec![("id".to_string(), SqlValue::Int(9))]];
        let supplied = vec![("id".to_string(), SqlValue::Int(5))];
        assert_eq!(
            insert_id(&pk, &raw(returned, Some(1)), Some(&supplied)),
            Some(SqlValue::Int(9))
        );
        assert_eq!(
            insert_id(&pk, &raw(vec![], Some(1)), Some(&supplied)),
            Some(SqlValue::Int(5))
        );
        assert_eq!(
            insert_id(&pk, &raw(vec![], Some(1)), None),
            Some(SqlValue::Int(1))
        );
    }

    #[test]
    fn test_composite_key_has_no_insert_id() {
        let pk = vec!["a".to_string(), "b".to_string()];
        assert_eq!(insert_id(&pk, &raw(vec![], Some(3)), None), None);
        assert_eq!(
            insert_id(&[], &raw(vec![], Some(3)), None),
            Some(SqlValue::Int(3))
        );
    }
}
