//! Bounded retries around any storage handler.

use async_trait::async_trait;
use feed_core::effects::{RetryPolicy, StorageEffects, StorageError, Transaction};

/// Retries transient failures of the wrapped handler under a [`RetryPolicy`].
///
/// Only errors reporting [`StorageError::is_retryable`] are retried; once the
/// attempts are exhausted the last error surfaces to the caller.
#[derive(Debug)]
pub struct RetryingStorage<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: StorageEffects> RetryingStorage<S> {
    /// Wrap `inner` with `policy`.
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Borrow the wrapped handler.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: StorageEffects> StorageEffects for RetryingStorage<S> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.policy
            .execute(|| self.inner.get(key), StorageError::is_retryable)
            .await
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.policy
            .execute(|| self.inner.list_keys(prefix), StorageError::is_retryable)
            .await
    }

    async fn commit(&self, tx: Transaction) -> Result<(), StorageError> {
        self.policy
            .execute(|| self.inner.commit(tx.clone()), StorageError::is_retryable)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_testkit::FlakyStorage;
    use std::time::Duration;

    fn policy(retries: u32) -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(retries)
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let flaky = FlakyStorage::new();
        flaky.fail_next_commits(2);
        let store = RetryingStorage::new(flaky.clone(), policy(3));

        store.put("content/a", vec![1]).await.unwrap();
        assert_eq!(flaky.commit_attempts(), 3);
        assert_eq!(store.get("content/a").await.unwrap(), Some(vec![1]));
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_error() {
        let flaky = FlakyStorage::new();
        flaky.fail_next_commits(10);
        let store = RetryingStorage::new(flaky.clone(), policy(2));

        let err = store.put("content/a", vec![1]).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(flaky.commit_attempts(), 3);
        assert_eq!(flaky.get("content/a").await.unwrap(), None);
    }
}
