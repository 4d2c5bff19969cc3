//! In-memory storage handler

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use feed_core::effects::{StorageEffects, StorageError, Transaction, WriteOp};
use tokio::sync::RwLock;

/// In-memory storage handler.
///
/// Transactions apply under a single write lock, so readers never observe a
/// partially committed batch. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageHandler {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStorageHandler {
    /// Create a new memory storage handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with initial data
    pub fn with_data(data: BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Whether storage is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copy of everything stored
    pub async fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.data.read().await.clone()
    }
}

pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey {
            reason: "Key cannot be empty".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn apply_writes(
    data: &mut BTreeMap<String, Vec<u8>>,
    tx: Transaction,
) -> Result<(), StorageError> {
    for write in tx.writes() {
        validate_key(write.key())?;
    }
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

#[async_trait]
impl StorageEffects for MemoryStorageHandler {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let data = self.data.read().await;
        Ok(data.get(key).cloned())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let data = self.data.read().await;
        Ok(data
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn commit(&self, tx: Transaction) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        apply_writes(&mut data, tx)
    }
}
