//! File snapshot storage handler
//!
//! Keeps the whole key space in memory and persists it as one JSON snapshot.
//! Each commit writes a temp file, syncs it and renames it over the snapshot,
//! so a crash leaves either the previous or the new state on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use feed_core::effects::{StorageEffects, StorageError, Transaction};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::memory::apply_writes;

/// Durable storage handler backed by a single snapshot file
#[derive(Debug)]
pub struct FileStorageHandler {
    path: PathBuf,
    data: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl FileStorageHandler {
    /// Open the snapshot at `path`, starting empty when it does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::WriteFailed(format!("Failed to create directory: {e}"))
            })?;
        }

        let data = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Corrupted(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to read snapshot: {e}"
                )))
            }
        };

        info!(path = %path.display(), keys = data.len(), "Opened file storage");
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_snapshot(&self, data: &BTreeMap<String, Vec<u8>>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(data)
            .map_err(|e| StorageError::WriteFailed(format!("Failed to encode snapshot: {e}")))?;

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create temp file: {e}"))
        })?;
        file.write_all(&bytes)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("Failed to write data: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::WriteFailed(format!("Failed to sync: {e}")))?;

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to rename temp file: {e}"))
        })?;
        Ok(())
    }
}

#[async_trait]
impl StorageEffects for FileStorageHandler {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let data = self.data.lock().await;
        Ok(data
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn commit(&self, tx: Transaction) -> Result<(), StorageError> {
        let writes = tx.len();
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        apply_writes(&mut next, tx)?;
        self.write_snapshot(&next).await?;
        *data = next;
        debug!(writes, path = %self.path.display(), "Committed snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commits_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed").join("store.json");

        let store = FileStorageHandler::open(&path).await.unwrap();
        let mut tx = store.begin_transaction();
        tx.put("content/a", b"alpha".to_vec());
        tx.put("content/b", b"beta".to_vec());
        store.commit(tx).await.unwrap();
        store.delete("content/b").await.unwrap();
        drop(store);

        let reopened = FileStorageHandler::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("content/a").await.unwrap(),
            Some(b"alpha".to_vec())
        );
        assert_eq!(reopened.get("content/b").await.unwrap(), None);
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn failed_commit_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorageHandler::open(dir.path().join("store.json"))
            .await
            .unwrap();
        store.put("content/a", vec![1]).await.unwrap();

        let mut tx = store.begin_transaction();
        tx.delete("content/a");
        tx.put("", vec![2]);
        assert!(store.commit(tx).await.is_err());

        assert_eq!(store.get("content/a").await.unwrap(), Some(vec![1]));
    }

    #[tokio::test]
    async fn corrupted_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"not json").unwrap();

        let err = FileStorageHandler::open(&path).await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupted(_)));
    }
}
