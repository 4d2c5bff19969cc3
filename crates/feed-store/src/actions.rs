//! Durable action log.
//!
//! Records are keyed `action/<timestamp>/<uuid>` so a prefix scan returns
//! them in time order. The log is independent of sessions and HEAD; only
//! [`ActionStore::clear_all`] deletes from it.

use std::collections::BTreeSet;
use std::sync::Arc;

use feed_core::effects::StorageEffects;
use feed_core::{ActionRecord, ActionType, ContentId, Result};
use tracing::{debug, info};
use uuid::Uuid;

use crate::content::{decode, encode};

/// Prefix of action record keys.
pub const ACTION_PREFIX: &str = "action/";

/// Append-only store of [`ActionRecord`]s.
#[derive(Clone)]
pub struct ActionStore {
    storage: Arc<dyn StorageEffects>,
}

impl std::fmt::Debug for ActionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionStore").finish_non_exhaustive()
    }
}

impl ActionStore {
    /// Create a store over `storage`.
    pub fn new(storage: Arc<dyn StorageEffects>) -> Self {
        Self { storage }
    }

    /// Append `records` in one transaction.
    pub async fn append(&self, records: &[ActionRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut tx = self.storage.begin_transaction();
        for record in records {
            let key = format!(
                "{ACTION_PREFIX}{:020}/{}",
                record.timestamp_ms,
                Uuid::new_v4()
            );
            tx.put(key, encode(record)?);
        }
        self.storage.commit(tx).await?;
        debug!(count = records.len(), "Appended action records");
        Ok(())
    }

    /// Every record, oldest first.
    pub async fn all(&self) -> Result<Vec<ActionRecord>> {
        let keys = self.storage.list_keys(ACTION_PREFIX).await?;
        let values = self.storage.get_batch(&keys).await?;
        let mut out = Vec::with_capacity(keys.len());
        for (key, value) in keys.iter().zip(values) {
            if let Some(bytes) = value {
                out.push(decode(key, &bytes)?);
            }
        }
        Ok(out)
    }

    /// Ids with at least one recorded dismiss.
    pub async fn dismissed_content_ids(&self) -> Result<BTreeSet<ContentId>> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|record| record.action_type == ActionType::Dismiss)
            .map(|record| record.content_id)
            .collect())
    }

    /// Delete every record; returns how many were removed.
    pub async fn clear_all(&self) -> Result<usize> {
        let keys = self.storage.list_keys(ACTION_PREFIX).await?;
        let mut tx = self.storage.begin_transaction();
        for key in &keys {
            tx.delete(key.as_str());
        }
        self.storage.commit(tx).await?;
        info!(removed = keys.len(), "Cleared action log");
        Ok(keys.len())
    }
}
