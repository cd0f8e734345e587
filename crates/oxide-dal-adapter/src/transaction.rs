//! Live transaction bookkeeping.
//!
//! Each adapter owns one [`TransactionTable`]. Tokens are never reused, so a
//! stale token can't reach somebody else's connection.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::client::Connection;

/// Opaque handle to a transaction opened by
/// [`Adapter::begin_transaction`](crate::Adapter::begin_transaction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionToken(u64);

impl fmt::Display for TransactionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

pub(crate) struct TransactionEntry {
    pub(crate) connection: Arc<dyn Connection>,
}

/// Maps tokens to the connection their transaction runs on.
///
/// The lock is only held for map access, never across an `.await`.
pub(crate) struct TransactionTable {
    next: AtomicU64,
    entries: Mutex<HashMap<TransactionToken, TransactionEntry>>,
}

impl TransactionTable {
    pub(crate) fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn register(&self, connection: Arc<dyn Connection>) -> TransactionToken {
        let token = TransactionToken(self.next.fetch_add(1, Ordering::Relaxed));
        self.entries
            .lock()
            .insert(token, TransactionEntry { connection });
        token
    }

    pub(crate) fn connection(&self, token: TransactionToken) -> Option<Arc<dyn Connection>> {
        self.entries
            .lock()
            .get(&token)
            .map(|entry| Arc::clone(&entry.connection))
    }

    pub(crate) fn remove(&self, token: TransactionToken) -> Option<TransactionEntry> {
        self.entries.lock().remove(&token)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
