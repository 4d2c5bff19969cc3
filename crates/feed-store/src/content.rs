//! Typed content store over a [`StorageEffects`] handler.
//!
//! Key layout:
//! - `content/<content id>` → [`StoredContent`] (bincode)
//! - `head/meta` → [`StoredHead`] (bincode)
//!
//! A batch of HEAD mutations is written through one [`ContentWriteBatch`] and
//! committed as a single storage transaction.

use std::sync::Arc;

use feed_core::effects::{StorageEffects, Transaction};
use feed_core::{ContentId, FeedError, Payload, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

/// Prefix of content payload keys.
pub const CONTENT_PREFIX: &str = "content/";

/// Key of the HEAD metadata record.
pub const HEAD_META_KEY: &str = "head/meta";

/// A payload as persisted, with its position in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredContent {
    /// Insertion sequence; orders the stream on restore
    pub sequence: u64,
    /// Stored payload
    pub payload: Payload,
}

/// HEAD-wide metadata persisted alongside content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredHead {
    /// Next insertion sequence to hand out
    pub next_sequence: u64,
    /// When HEAD last received server content
    pub refreshed_at_ms: Option<u64>,
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| FeedError::storage(format!("encode failed: {e}")))
}

pub(crate) fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes)
        .map_err(|e| FeedError::storage(format!("corrupted entry {key}: {e}")))
}

fn content_key(id: &ContentId) -> String {
    format!("{CONTENT_PREFIX}{id}")
}

/// Writes staged for one atomic commit.
#[derive(Debug, Default)]
pub struct ContentWriteBatch {
    tx: Transaction,
}

impl ContentWriteBatch {
    /// Stage a payload write.
    pub fn put_content(&mut self, id: &ContentId, content: &StoredContent) -> Result<()> {
        self.tx.put(content_key(id), encode(content)?);
        Ok(())
    }

    /// Stage a payload delete.
    pub fn remove_content(&mut self, id: &ContentId) {
        self.tx.delete(content_key(id));
    }

    /// Stage the HEAD metadata record.
    pub fn put_head(&mut self, head: &StoredHead) -> Result<()> {
        self.tx.put(HEAD_META_KEY, encode(head)?);
        Ok(())
    }

    /// Number of staged writes.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Durable store of content payloads and HEAD metadata.
#[derive(Clone)]
pub struct ContentStore {
    storage: Arc<dyn StorageEffects>,
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore").finish_non_exhaustive()
    }
}

impl ContentStore {
    /// Create a store over `storage`.
    pub fn new(storage: Arc<dyn StorageEffects>) -> Self {
        Self { storage }
    }

    /// Start staging a batch.
    pub fn begin(&self) -> ContentWriteBatch {
        ContentWriteBatch {
            tx: self.storage.begin_transaction(),
        }
    }

    /// Commit a staged batch atomically.
    pub async fn commit(&self, batch: ContentWriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let writes = batch.len();
        self.storage.commit(batch.tx).await?;
        debug!(writes, "Committed content batch");
        Ok(())
    }

    /// Load every stored payload in stream order.
    pub async fn load_all(&self) -> Result<Vec<(ContentId, StoredContent)>> {
        let keys = self.storage.list_keys(CONTENT_PREFIX).await?;
        let values = self.storage.get_batch(&keys).await?;

        let mut out = Vec::with_capacity(keys.len());
        for (key, value) in keys.iter().zip(values) {
            let Some(bytes) = value else {
                warn!(key, "Content key vanished during load");
                continue;
            };
            let id = ContentId::new(&key[CONTENT_PREFIX.len()..]);
            out.push((id, decode::<StoredContent>(key, &bytes)?));
        }
        out.sort_by_key(|(_, content)| content.sequence);
        Ok(out)
    }

    /// Load HEAD metadata, if any was ever written.
    pub async fn load_head(&self) -> Result<Option<StoredHead>> {
        match self.storage.get(HEAD_META_KEY).await? {
            Some(bytes) => Ok(Some(decode(HEAD_META_KEY, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Read payloads for `ids`, preserving request order and omitting misses.
    pub async fn get_payloads(&self, ids: &[ContentId]) -> Result<Vec<(ContentId, Payload)>> {
        let keys: Vec<String> = ids.iter().map(content_key).collect();
        let values = self.storage.get_batch(&keys).await?;

        let mut out = Vec::with_capacity(ids.len());
        for ((id, key), value) in ids.iter().zip(&keys).zip(values) {
            if let Some(bytes) = value {
                let stored: StoredContent = decode(key, &bytes)?;
                out.push((id.clone(), stored.payload));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorageHandler;

    fn store() -> ContentStore {
        ContentStore::new(Arc::new(MemoryStorageHandler::new()))
    }

    fn feature(sequence: u64, body: &[u8]) -> StoredContent {
        StoredContent {
            sequence,
            payload: Payload::Feature(body.to_vec()),
        }
    }

    #[tokio::test]
    async fn load_all_orders_by_sequence() {
        let store = store();
        let mut batch = store.begin();
        batch.put_content(&"b::1".into(), &feature(2, b"b")).unwrap();
        batch.put_content(&"a::1".into(), &feature(1, b"a")).unwrap();
        store.commit(batch).await.unwrap();

        let ids: Vec<String> = store
            .load_all()
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id.into_inner())
            .collect();
        assert_eq!(ids, vec!["a::1", "b::1"]);
    }

    #[tokio::test]
    async fn get_payloads_keeps_request_order_and_skips_misses() {
        let store = store();
        let mut batch = store.begin();
        batch.put_content(&"x::1".into(), &feature(0, b"x")).unwrap();
        batch.put_content(&"y::1".into(), &feature(1, b"y")).unwrap();
        store.commit(batch).await.unwrap();

        let found = store
            .get_payloads(&["y::1".into(), "missing::0".into(), "x::1".into()])
            .await
            .unwrap();
        assert_eq!(
            found,
            vec![
                (ContentId::new("y::1"), Payload::Feature(b"y".to_vec())),
                (ContentId::new("x::1"), Payload::Feature(b"x".to_vec())),
            ]
        );
    }

    #[tokio::test]
    async fn head_metadata_round_trips() {
        let store = store();
        assert_eq!(store.load_head().await.unwrap(), None);

        let head = StoredHead {
            next_sequence: 4,
            refreshed_at_ms: Some(1_000),
        };
        let mut batch = store.begin();
        batch.put_head(&head).unwrap();
        store.commit(batch).await.unwrap();

        assert_eq!(store.load_head().await.unwrap(), Some(head));
    }
}
