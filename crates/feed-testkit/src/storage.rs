//! Storage handler with failure injection.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use feed_core::effects::{StorageEffects, StorageError, Transaction, WriteOp};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct FlakyState {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_commits: AtomicU32,
    failing_reads: AtomicU32,
    commit_attempts: AtomicU32,
}

/// In-memory storage whose next commits or reads can be made to fail.
///
/// Failures are reported as [`StorageError::WriteFailed`] /
/// [`StorageError::ReadFailed`], both retryable. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FlakyStorage {
    state: Arc<FlakyState>,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` commits.
    pub fn fail_next_commits(&self, n: u32) {
        self.state.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` reads (`get` and `list_keys`).
    pub fn fail_next_reads(&self, n: u32) {
        self.state.failing_reads.store(n, Ordering::SeqCst);
    }

    /// Commits attempted so far, failed or not.
    pub fn commit_attempts(&self) -> u32 {
        self.state.commit_attempts.load(Ordering::SeqCst)
    }

    /// Copy of the stored data.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.state.data.lock().clone()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl StorageEffects for FlakyStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if Self::take_failure(&self.state.failing_reads) {
            return Err(StorageError::ReadFailed(format!("injected read failure: {key}")));
        }
        Ok(self.state.data.lock().get(key).cloned())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        if Self::take_failure(&self.state.failing_reads) {
            return Err(StorageError::ReadFailed(format!(
                "injected list failure: {prefix}"
            )));
        }
        Ok(self
            .state
            .data
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn commit(&self, tx: Transaction) -> Result<(), StorageError> {
        self.state.commit_attempts.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.state.failing_commits) {
            return Err(StorageError::WriteFailed("injected commit failure".into()));
        }
        let mut data = self.state.data.lock();
        for write in tx.into_writes() {
            match write {
                WriteOp::Put { key, value } => {
                    data.insert(key, value);
                }
                WriteOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }
}
