#![allow(dead_code, clippy::new_without_default)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use oxide_dal_adapter::{Adapter, Client, ClientError, Connection, RawResult, SqliteClient};
use oxide_dal_core::schema::{integer, text, CreateTableBuilder, MigrationOp};
use oxide_dal_core::{Dialect, SqlStatement, TableRef};
use oxide_dal_migrate::MigrationDescriptor;
use parking_lot::Mutex;
use sqlx::sqlite::SqlitePoolOptions;

/// A single-connection in-memory SQLite adapter.
pub async fn sqlite_adapter() -> Arc<Adapter> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");
    Arc::new(Adapter::new(SqliteClient::new(pool), Dialect::sqlite()))
}

pub async fn table_exists(adapter: &Adapter, table: &str) -> bool {
    adapter
        .table_exists(&TableRef::new(table), None)
        .await
        .expect("table_exists failed")
}

/// `create table {table} (id integer primary key, label text)`.
pub fn create_table(table: &str) -> MigrationOp {
    CreateTableBuilder::new()
        .name(table)
        .column(integer("id").primary_key().build())
        .column(text("label").build())
        .build()
        .into()
}

/// A reversible migration creating `table`.
pub fn creates(id: &str, table: &str) -> MigrationDescriptor {
    MigrationDescriptor::reversible(id, format!("create_{table}"), vec![create_table(table)])
        .expect("reversible migration")
}

/// Writes `content` to `dir/file_name`.
pub fn write_migration(dir: &Path, file_name: &str, content: &str) {
    std::fs::write(dir.join(file_name), content).expect("Failed to write migration file");
}

type Responder = Box<dyn Fn(&SqlStatement) -> Result<RawResult, ClientError> + Send + Sync>;

struct Recorder {
    statements: Mutex<Vec<String>>,
    responder: Mutex<Responder>,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl Recorder {
    fn run(&self, statement: &SqlStatement) -> Result<RawResult, ClientError> {
        self.statements.lock().push(statement.text.clone());
        (**self.responder.lock())(statement)
    }
}

/// Pooled in-memory client recording every statement. Answers with empty
/// results unless told otherwise.
#[derive(Clone)]
pub struct RecordingClient {
    recorder: Arc<Recorder>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self {
            recorder: Arc::new(Recorder {
                statements: Mutex::new(Vec::new()),
                responder: Mutex::new(Box::new(|_: &SqlStatement| Ok(RawResult::default()))),
                acquired: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
            }),
        }
    }

    /// Makes every statement starting with `prefix` fail.
    pub fn fail_on(&self, prefix: &'static str) {
        *self.recorder.responder.lock() = Box::new(move |statement: &SqlStatement| {
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

    pub fn acquired(&self) -> usize {
        self.recorder.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.recorder.released.load(Ordering::SeqCst)
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
        true
    }
}
