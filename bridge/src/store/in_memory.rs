//! In-memory store for development and tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Store, Transaction};
use crate::error::{Error, Result};
use crate::model::{OwnedRow, Row};

#[derive(Default)]
struct Inner {
    committed: Mutex<Vec<OwnedRow>>,
    begun: AtomicUsize,
    rolled_back: AtomicUsize,
    fail_ping: AtomicBool,
    fail_begin: AtomicBool,
    fail_commit: AtomicBool,
    fail_row: Mutex<Option<usize>>,
}

/// Store that keeps committed rows in memory.
///
/// Failures can be injected to exercise the ping, begin, row and commit
/// error paths.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent ping fail, as an unreachable server would.
    pub fn fail_pings(&self, fail: bool) {
        self.inner.fail_ping.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent begin fail. Failed begins are not counted by
    /// [`transactions_begun`](Self::transactions_begun).
    pub fn fail_begins(&self, fail: bool) {
        self.inner.fail_begin.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent commit fail.
    pub fn fail_commits(&self, fail: bool) {
        self.inner.fail_commit.store(fail, Ordering::SeqCst);
    }

    /// Make the row at `index` (zero-based, per transaction) fail to execute.
    pub fn fail_row_at(&self, index: Option<usize>) {
        *self.inner.fail_row.lock().expect("lock poisoned") = index;
    }

    /// Rows from committed transactions, in commit order.
    pub fn committed_rows(&self) -> Vec<OwnedRow> {
        self.inner.committed.lock().expect("lock poisoned").clone()
    }

    pub fn transactions_begun(&self) -> usize {
        self.inner.begun.load(Ordering::SeqCst)
    }

    pub fn transactions_rolled_back(&self) -> usize {
        self.inner.rolled_back.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn destination(&self) -> &str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        if self.inner.fail_ping.load(Ordering::SeqCst) {
            return Err(Error::Connection("injected ping failure".to_string()));
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        if self.inner.fail_begin.load(Ordering::SeqCst) {
            return Err(Error::Store("injected begin failure".to_string()));
        }
        self.inner.begun.fetch_add(1, Ordering::SeqCst);
        let fail_row = *self.inner.fail_row.lock().expect("lock poisoned");
        Ok(Box::new(InMemoryTransaction {
            inner: self.inner.clone(),
            pending: Vec::new(),
            fail_row,
        }))
    }
}

struct InMemoryTransaction {
    inner: Arc<Inner>,
    pending: Vec<OwnedRow>,
    fail_row: Option<usize>,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn execute(&mut self, row: &Row<'_>) -> Result<()> {
        if self.fail_row == Some(self.pending.len()) {
            return Err(Error::RowExecution(format!(
                "injected failure at row {}",
                self.pending.len()
            )));
        }
        self.pending.push(row.to_owned_row());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { inner, pending, .. } = *self;
        if inner.fail_commit.load(Ordering::SeqCst) {
            return Err(Error::Commit("injected commit failure".to_string()));
        }
        inner
            .committed
            .lock()
            .expect("lock poisoned")
            .extend(pending);
        Ok(())
    }

    async fn rollback(self: Box<Self>) {
        self.inner.rolled_back.fetch_add(1, Ordering::SeqCst);
    }
}
