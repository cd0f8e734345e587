//! The driver seam.
//!
//! A [`Client`] runs compiled statements. Drivers implement it once and get
//! transactions, savepoints, returning emulation and migration locks from the
//! [`Adapter`](crate::Adapter) for free.

use std::sync::Arc;

use async_trait::async_trait;
use oxide_dal_core::{Row, SqlStatement};

/// Error type returned by drivers. Passed through to callers unmodified.
pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

/// What a driver hands back for one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    /// Rows produced by the statement, in order.
    pub rows: Vec<Row>,
    pub rows_affected: u64,
    /// Driver-reported id of the last inserted row, when it has one.
    pub last_insert_id: Option<i64>,
}

/// A single session. Statements run on it in caller order.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn run(&self, statement: &SqlStatement) -> Result<RawResult, ClientError>;

    /// Gives the session back to its owner. Running statements afterwards
    /// is an error.
    async fn close(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

/// A database client, pooled or single-session.
#[async_trait]
pub trait Client: Send + Sync {
    /// Runs a statement outside any transaction.
    async fn run(&self, statement: &SqlStatement) -> Result<RawResult, ClientError>;

    /// Hands out a session. Pooled clients return a fresh connection, others
    /// their one shared session.
    async fn acquire(&self) -> Result<Arc<dyn Connection>, ClientError>;

    /// Whether [`acquire`](Self::acquire) checks connections out of a pool.
    fn is_pooled(&self) -> bool;

    /// Returns a session obtained from [`acquire`](Self::acquire).
    async fn release(&self, connection: Arc<dyn Connection>) -> Result<(), ClientError> {
        connection.close().await
    }
}
