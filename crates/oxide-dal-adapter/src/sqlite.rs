//! SQLite client on top of a sqlx pool.

use std::sync::Arc;

use async_trait::async_trait;
use oxide_dal_core::{Row, SqlStatement, SqlValue};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};
use tokio::sync::Mutex;

use crate::client::{Client, ClientError, Connection, RawResult};

/// A pooled SQLite client.
///
/// Note that every connection to `sqlite::memory:` opens its own database;
/// use a single-connection pool for in-memory databases.
#[derive(Debug, Clone)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to `url`, creating the database file if needed.
    ///
    /// # Errors
    ///
    /// Returns the driver error when the database can't be opened.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = url
            .parse::<sqlx::sqlite::SqliteConnectOptions>()?
            .create_if_missing(true);
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Client for SqliteClient {
    async fn run(&self, statement: &SqlStatement) -> Result<RawResult, ClientError> {
        let mut conn = self.pool.acquire().await?;
        Ok(run_on(&mut conn, statement).await?)
    }

    async fn acquire(&self) -> Result<Arc<dyn Connection>, ClientError> {
        let conn = self.pool.acquire().await?;
        Ok(Arc::new(SqliteSession {
            conn: Mutex::new(Some(conn)),
        }))
    }

    fn is_pooled(&self) -> bool {
        true
    }
}

/// One connection checked out of the pool. Closing it returns it.
struct SqliteSession {
    conn: Mutex<Option<PoolConnection<Sqlite>>>,
}

#[async_trait]
impl Connection for SqliteSession {
    async fn run(&self, statement: &SqlStatement) -> Result<RawResult, ClientError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or("connection already released")?;
        Ok(run_on(conn, statement).await?)
    }

    async fn close(&self) -> Result<(), ClientError> {
        drop(self.conn.lock().await.take());
        Ok(())
    }
}

async fn run_on(
    conn: &mut SqliteConnection,
    statement: &SqlStatement,
) -> Result<RawResult, sqlx::Error> {
    let (before, previous_id): (i64, i64) =
        sqlx::query_as("select total_changes(), last_insert_rowid()")
            .fetch_one(&mut *conn)
            .await?;

    let mut query = sqlx::query(&statement.text);
    for value in &statement.values {
        query = bind_value(query, value.clone());
    }
    let rows = query
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(convert_row)
        .collect::<Result<Vec<_>, _>>()?;

    let (after, last_id): (i64, i64) =
        sqlx::query_as("select total_changes(), last_insert_rowid()")
            .fetch_one(&mut *conn)
            .await?;
    let rows_affected = u64::try_from(after - before).unwrap_or(0);

    // An upsert taking its update branch leaves the rowid untouched.
    let inserted = rows_affected > 0 && last_id != 0 && last_id != previous_id;
    Ok(RawResult {
        rows,
        rows_affected,
        last_insert_id: inserted.then_some(last_id),
    })
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: SqlValue,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
    }
}

/// Converts by the storage class of each value, not the declared column type.
fn convert_row(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut cells = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            let type_name = raw.type_info().name().to_ascii_uppercase();
            match type_name.as_str() {
                "INTEGER" | "INT" | "INT8" | "BIGINT" | "BOOLEAN" => {
                    SqlValue::Int(row.try_get_unchecked::<i64, _>(index)?)
                }
                "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
                    SqlValue::Float(row.try_get_unchecked::<f64, _>(index)?)
                }
                "BLOB" => SqlValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(index)?),
                _ => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
            }
        };
        cells.push((column.name().to_string(), value));
    }
    Ok(cells)
}
