//! Storage effect trait.
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `feed-store` (memory and file snapshot handlers)
//! - **Usage**: content payloads, shared state and action records
//!
//! Writes are grouped into a [`Transaction`]; a committed transaction is
//! applied in full or not at all.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Error type for storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum StorageError {
    /// Key rejected by the backend
    #[error("Invalid key: {reason}")]
    InvalidKey {
        /// Why the key is invalid
        reason: String,
    },
    /// Read failed
    #[error("Read failed: {0}")]
    ReadFailed(String),
    /// Write failed
    #[error("Write failed: {0}")]
    WriteFailed(String),
    /// Stored bytes could not be decoded
    #[error("Corrupted entry: {0}")]
    Corrupted(String),
    /// Backend temporarily unavailable
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ReadFailed(_) | Self::WriteFailed(_) | Self::Unavailable(_)
        )
    }
}

/// A single buffered write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Store `value` under `key`
    Put {
        /// Target key
        key: String,
        /// New value
        value: Vec<u8>,
    },
    /// Delete `key` if present
    Delete {
        /// Target key
        key: String,
    },
}

impl WriteOp {
    /// Key touched by the write.
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// Buffered writes committed atomically by [`StorageEffects::commit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    writes: Vec<WriteOp>,
}

impl Transaction {
    /// Start an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a put.
    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.writes.push(WriteOp::Put {
            key: key.into(),
            value,
        });
    }

    /// Buffer a delete.
    pub fn delete(&mut self, key: impl Into<String>) {
        self.writes.push(WriteOp::Delete { key: key.into() });
    }

    /// Discard the buffered writes.
    pub fn abort(self) {
        debug!(writes = self.writes.len(), "Aborting storage transaction");
    }

    /// Number of buffered writes.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Buffered writes in order.
    pub fn writes(&self) -> &[WriteOp] {
        &self.writes
    }

    /// Consume the transaction, returning its writes in order.
    pub fn into_writes(self) -> Vec<WriteOp> {
        self.writes
    }
}

/// Durable key-value storage.
#[async_trait]
pub trait StorageEffects: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// List keys starting with `prefix`, sorted.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Apply every write of `tx`, in order, atomically.
    async fn commit(&self, tx: Transaction) -> Result<(), StorageError>;

    /// Start a transaction against this store.
    fn begin_transaction(&self) -> Transaction {
        Transaction::new()
    }

    /// Store a single value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut tx = self.begin_transaction();
        tx.put(key, value);
        self.commit(tx).await
    }

    /// Delete a single key.
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut tx = self.begin_transaction();
        tx.delete(key);
        self.commit(tx).await
    }

    /// Read several keys, preserving request order.
    async fn get_batch(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, StorageError> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.get(key).await?);
        }
        Ok(out)
    }
}

/// Blanket implementation for Arc<T> where T: StorageEffects
#[async_trait]
impl<T: StorageEffects + ?Sized> StorageEffects for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key).await
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        (**self).list_keys(prefix).await
    }

    async fn commit(&self, tx: Transaction) -> Result<(), StorageError> {
        (**self).commit(tx).await
    }

    async fn get_batch(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, StorageError> {
        (**self).get_batch(keys).await
    }
}
