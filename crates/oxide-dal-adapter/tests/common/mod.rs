#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use oxide_dal_adapter::{Client, ClientError, Connection, RawResult};
use oxide_dal_core::{SqlStatement, SqlValue};
use parking_lot::Mutex;
use sqlx::sqlite::SqlitePoolOptions;

type Responder = Box<dyn Fn(&SqlStatement) -> Result<RawResult, ClientError> + Send + Sync>;

/// Shared state behind a [`RecordingClient`] and its sessions.
struct Recorder {
    statements: Mutex<Vec<String>>,
    responder: Mutex<Responder>,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

/// In-memory client recording every statement it is asked to run.
#[derive(Clone)]
pub struct RecordingClient {
    recorder: Arc<Recorder>,
    pooled: bool,
}

impl RecordingClient {
    pub fn pooled() -> Self {
        Self::new(true)
    }

    pub fn single() -> Self {
        Self::new(false)
    }

    fn new(pooled: bool) -> Self {
        Self {
            recorder: Arc::new(Recorder {
                statements: Mutex::new(Vec::new()),
                responder: Mutex::new(Box::new(|_: &SqlStatement| Ok(RawResult::default()))),
                acquired: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
            }),
            pooled,
        }
    }

    /// Replaces how statements are answered.
    pub fn respond_with(
        &self,
        responder: impl Fn(&SqlStatement) -> Result<RawResult, ClientError> + Send + Sync + 'static,
    ) {
        *self.recorder.responder.lock() = Box::new(responder);
    }

    /// Makes every statement starting with `prefix` fail.
    pub fn fail_on(&self, prefix: &'static str) {
        self.respond_with(move |statement| {
            if statement.text.starts_with(prefix) {
                Err(format!("boom: {}", statement.text).into())
            } else {
                Ok(RawResult::default())
            }
        });
    }

    pub fn statements(&self) -> Vec<String> {
        self.recorder.statements.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.recorder.statements.lock().len()
    }

    pub fn acquired(&self) -> usize {
        self.recorder.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.recorder.released.load(Ordering::SeqCst)
    }
}

impl Recorder {
    fn run(&self, statement: &SqlStatement) -> Result<RawResult, ClientError> {
        self.statements.lock().push(statement.text.clone());
        (**self.responder.lock())(statement)
    }
}

struct RecordingSession {
    recorder: Arc<Recorder>,
}

#[async_trait]
impl Connection for RecordingSession {
    async fn run(&self, statement: &SqlStatement) -> Result<RawResult, ClientError> {
        self.recorder.run(statement)
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.recorder.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Client for RecordingClient {
    async fn run(&self, statement: &SqlStatement) -> Result<RawResult, ClientError> {
        self.recorder.run(statement)
    }

    async fn acquire(&self) -> Result<Arc<dyn Connection>, ClientError> {
        self.recorder.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(RecordingSession {
            recorder: Arc::clone(&self.recorder),
        }))
    }

    fn is_pooled(&self) -> bool {
        self.pooled
    }
}

/// A result carrying one row.
pub fn one_row(cells: &[(&str, SqlValue)]) -> RawResult {
    RawResult {
        rows: vec![cells
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect()],
        rows_affected: 1,
        last_insert_id: None,
    }
}

/// A single-connection in-memory SQLite client.
pub async fn sqlite_client() -> oxide_dal_adapter::SqliteClient {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create pool");
    oxide_dal_adapter::SqliteClient::new(pool)
}
