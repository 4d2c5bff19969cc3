//! HEAD: the canonical merged content state.
//!
//! HEAD keeps stream structure and shared state in memory. Feature bodies
//! live only in the content store and are read on demand.
//!
//! A batch is applied to a copy of HEAD ([`Head::stage`]); the copy replaces
//! the live value only after its writes have been committed.

use std::collections::HashMap;

use feed_core::{
    ContentId, ContinuationToken, DataOperation, FeedError, MutationContext, MutationOrigin,
    Payload, Result,
};
use feed_store::{ContentWriteBatch, StoredContent, StoredHead};
use indexmap::IndexMap;

/// What an entry of HEAD is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EntryKind {
    Feature,
    SharedState,
    Token(ContinuationToken),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HeadEntry {
    pub(crate) sequence: u64,
    pub(crate) kind: EntryKind,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Head {
    entries: IndexMap<ContentId, HeadEntry>,
    shared_state: HashMap<ContentId, Vec<u8>>,
    next_sequence: u64,
    refreshed_at_ms: Option<u64>,
    version: u64,
}

/// Result of applying a batch to a copy of HEAD.
pub(crate) struct StagedBatch {
    pub(crate) head: Head,
    /// Final payload of every id written by the batch and still present
    puts: IndexMap<ContentId, Payload>,
    /// Ids present before the batch and gone after it
    pub(crate) removed: Vec<ContentId>,
    /// Features that existed before and were rewritten
    pub(crate) changed: Vec<ContentId>,
    /// Features that did not exist before, in stream order
    pub(crate) created: Vec<ContentId>,
    /// Last continuation token carried by the batch
    pub(crate) batch_token: Option<ContinuationToken>,
}

impl StagedBatch {
    /// Storage writes reproducing the staged HEAD.
    pub(crate) fn write_batch(&self, mut batch: ContentWriteBatch) -> Result<ContentWriteBatch> {
        for id in &self.removed {
            batch.remove_content(id);
        }
        for (id, payload) in &self.puts {
            let Some(entry) = self.head.entries.get(id) else {
                continue;
            };
            batch.put_content(
                id,
                &StoredContent {
                    sequence: entry.sequence,
                    payload: payload.clone(),
                },
            )?;
        }
        batch.put_head(&self.head.stored_meta())?;
        Ok(batch)
    }

    pub(crate) fn updated_count(&self) -> usize {
        self.puts.len()
    }
}

/// Reject batches that cannot be applied as a whole.
pub(crate) fn validate(operations: &[DataOperation]) -> Result<()> {
    for (index, op) in operations.iter().enumerate() {
        match op {
            DataOperation::UpdateOrAppend { id, payload } => {
                if id.is_empty() {
                    return Err(FeedError::parse(format!("operation {index}: empty content id")));
                }
                if let Payload::Token(token) = payload {
                    if token.as_str().is_empty() {
                        return Err(FeedError::parse(format!(
                            "operation {index}: empty continuation token"
                        )));
                    }
                }
            }
            DataOperation::Remove { id } if id.is_empty() => {
                return Err(FeedError::parse(format!("operation {index}: empty content id")));
            }
            DataOperation::Remove { .. } => {}
            DataOperation::ClearAll { namespace } => {
                if namespace.as_deref() == Some("") {
                    return Err(FeedError::parse(format!("operation {index}: empty namespace")));
                }
            }
        }
    }
    Ok(())
}

impl Head {
    /// Rebuild HEAD from persisted records ordered by sequence.
    pub(crate) fn restore(
        meta: Option<StoredHead>,
        records: Vec<(ContentId, StoredContent)>,
    ) -> Self {
        let mut head = Head::default();
        let mut max_sequence = None;
        for (id, stored) in records {
            max_sequence = max_sequence.max(Some(stored.sequence));
            head.insert_entry(id, stored.sequence, stored.payload);
        }
        let meta = meta.unwrap_or_default();
        head.next_sequence = meta
            .next_sequence
            .max(max_sequence.map_or(0, |s| s.saturating_add(1)));
        head.refreshed_at_ms = meta.refreshed_at_ms;
        head
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn refreshed_at_ms(&self) -> Option<u64> {
        self.refreshed_at_ms
    }

    pub(crate) fn has_features(&self) -> bool {
        self.entries
            .values()
            .any(|entry| entry.kind == EntryKind::Feature)
    }

    pub(crate) fn contains(&self, id: &ContentId) -> bool {
        self.entries.contains_key(id)
    }

    /// Feature ids in stream order.
    pub(crate) fn feature_ids(&self) -> Vec<ContentId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.kind == EntryKind::Feature)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Most recent continuation token in stream order.
    pub(crate) fn latest_token(&self) -> Option<ContinuationToken> {
        self.entries.values().rev().find_map(|entry| match &entry.kind {
            EntryKind::Token(token) => Some(token.clone()),
            _ => None,
        })
    }

    pub(crate) fn shared_state(&self, id: &ContentId) -> Option<Vec<u8>> {
        self.shared_state.get(id).cloned()
    }

    fn stored_meta(&self) -> StoredHead {
        StoredHead {
            next_sequence: self.next_sequence,
            refreshed_at_ms: self.refreshed_at_ms,
        }
    }

    fn insert_entry(&mut self, id: ContentId, sequence: u64, payload: Payload) {
        let kind = match payload {
            Payload::Feature(_) => EntryKind::Feature,
            Payload::SharedState(bytes) => {
                self.shared_state.insert(id.clone(), bytes);
                EntryKind::SharedState
            }
            Payload::Token(token) => EntryKind::Token(token),
        };
        self.entries.insert(id, HeadEntry { sequence, kind });
    }

    fn remove_entry(&mut self, id: &ContentId) {
        self.shared_state.remove(id);
        self.entries.shift_remove(id);
    }

    /// Apply `operations` in order to a copy of HEAD.
    ///
    /// Within the batch the last operation on an id wins.
    pub(crate) fn stage(
        &self,
        operations: &[DataOperation],
        context: &MutationContext,
        now_ms: u64,
    ) -> StagedBatch {
        let mut next = self.clone();
        let mut puts: IndexMap<ContentId, Payload> = IndexMap::new();
        let mut batch_token = None;

        for op in operations {
            match op {
                DataOperation::UpdateOrAppend { id, payload } => {
                    if let Payload::Token(token) = payload {
                        batch_token = Some(token.clone());
                    }
                    let sequence = match next.entries.get(id) {
                        Some(existing) => existing.sequence,
                        None => {
                            let sequence = next.next_sequence;
                            next.next_sequence = next.next_sequence.saturating_add(1);
                            sequence
                        }
                    };
                    // Re-inserting an existing key keeps its stream position.
                    next.shared_state.remove(id);
                    next.insert_entry(id.clone(), sequence, payload.clone());
                    puts.insert(id.clone(), payload.clone());
                }
                DataOperation::Remove { id } => {
                    next.remove_entry(id);
                    puts.shift_remove(id);
                }
                DataOperation::ClearAll { namespace } => {
                    let doomed: Vec<ContentId> = next
                        .entries
                        .keys()
                        .filter(|id| match namespace {
                            Some(ns) => id.namespace() == Some(ns.as_str()),
                            None => true,
                        })
                        .cloned()
                        .collect();
                    for id in doomed {
                        next.remove_entry(&id);
                        puts.shift_remove(&id);
                    }
                }
            }
        }

        let removed = self
            .entries
            .keys()
            .filter(|id| !next.entries.contains_key(*id))
            .cloned()
            .collect();

        let is_feature = |id: &ContentId| {
            next.entries
                .get(id)
                .is_some_and(|entry| entry.kind == EntryKind::Feature)
        };
        let changed = puts
            .keys()
            .filter(|id| self.entries.contains_key(*id) && is_feature(*id))
            .cloned()
            .collect();
        let created = next
            .entries
            .iter()
            .filter(|(id, entry)| {
                entry.kind == EntryKind::Feature && !self.entries.contains_key(*id)
            })
            .map(|(id, _)| id.clone())
            .collect();

        if context.origin == MutationOrigin::Refresh {
            next.refreshed_at_ms = Some(now_ms);
        }
        next.version = next.version.saturating_add(1);

        StagedBatch {
            head: next,
            puts,
            removed,
            changed,
            created,
            batch_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use feed_testkit::{clear_op, feature_op, remove_op, shared_state_op, token_op};

    fn ids(values: &[&str]) -> Vec<ContentId> {
        values.iter().map(|v| ContentId::new(*v)).collect()
    }

    fn refresh() -> MutationContext {
        MutationContext::refresh()
    }

    #[test]
    fn update_then_remove_in_one_batch_leaves_id_absent() {
        let staged = Head::default().stage(&[feature_op("a", b"1"), remove_op("a")], &refresh(), 0);
        assert!(!staged.head.contains(&ContentId::new("a")));
        assert!(staged.created.is_empty());
        assert_eq!(staged.updated_count(), 0);
    }

    #[test]
    fn updates_keep_stream_position() {
        let head = Head::default()
            .stage(&[feature_op("a", b"1"), feature_op("b", b"1")], &refresh(), 0)
            .head;
        let staged = head.stage(&[feature_op("a", b"2"), feature_op("c", b"1")], &refresh(), 0);

        assert_eq!(staged.head.feature_ids(), ids(&["a", "b", "c"]));
        assert_eq!(staged.changed, ids(&["a"]));
        assert_eq!(staged.created, ids(&["c"]));
    }

    #[test]
    fn clear_namespace_only_touches_that_namespace() {
        let head = Head::default()
            .stage(
                &[
                    feature_op("card::1", b"x"),
                    feature_op("ad::1", b"y"),
                    feature_op("card::2", b"z"),
                ],
                &refresh(),
                0,
            )
            .head;
        let staged = head.stage(&[DataOperation::clear_namespace("card")], &refresh(), 0);

        assert_eq!(staged.head.feature_ids(), ids(&["ad::1"]));
        assert_eq!(staged.removed, ids(&["card::1", "card::2"]));
    }

    #[test]
    fn clear_all_drops_tokens_and_shared_state() {
        let head = Head::default()
            .stage(
                &[
                    feature_op("a", b"x"),
                    shared_state_op("style", b"s"),
                    token_op("t", "page-2"),
                ],
                &refresh(),
                0,
            )
            .head;
        assert_eq!(head.latest_token(), Some(ContinuationToken::new("page-2")));
        assert_eq!(head.shared_state(&ContentId::new("style")), Some(b"s".to_vec()));

        let staged = head.stage(&[clear_op()], &refresh(), 0);
        assert_eq!(staged.head.latest_token(), None);
        assert_eq!(staged.head.shared_state(&ContentId::new("style")), None);
        assert!(!staged.head.has_features());
    }

    #[test]
    fn shared_state_and_tokens_are_not_stream_features() {
        let staged = Head::default().stage(
            &[
                shared_state_op("style", b"s"),
                feature_op("a", b"x"),
                token_op("t", "next"),
            ],
            &refresh(),
            0,
        );
        assert_eq!(staged.head.feature_ids(), ids(&["a"]));
        assert_eq!(staged.created, ids(&["a"]));
        assert_eq!(staged.batch_token, Some(ContinuationToken::new("next")));
    }

    #[test]
    fn refresh_stamps_time_and_bumps_version() {
        let staged = Head::default().stage(&[feature_op("a", b"x")], &refresh(), 42);
        assert_eq!(staged.head.refreshed_at_ms(), Some(42));
        assert_eq!(staged.head.version(), 1);

        let host = MutationContext::refresh().with_origin(MutationOrigin::Host);
        let again = staged.head.stage(&[feature_op("b", b"y")], &host, 99);
        assert_eq!(again.head.refreshed_at_ms(), Some(42));
        assert_eq!(again.head.version(), 2);
    }

    #[test]
    fn restore_orders_by_sequence_and_resumes_numbering() {
        let records = vec![
            (
                ContentId::new("a"),
                StoredContent {
                    sequence: 3,
                    payload: Payload::Feature(b"a".to_vec()),
                },
            ),
            (
                ContentId::new("b"),
                StoredContent {
                    sequence: 5,
                    payload: Payload::Feature(b"b".to_vec()),
                },
            ),
        ];
        let head = Head::restore(None, records);
        assert_eq!(head.feature_ids(), ids(&["a", "b"]));

        let staged = head.stage(&[feature_op("c", b"c")], &refresh(), 0);
        assert_eq!(staged.head.entries[&ContentId::new("c")].sequence, 6);
    }

    #[test]
    fn validation_rejects_empty_ids() {
        assert_matches!(
            validate(&[feature_op("a", b"x"), remove_op("")]),
            Err(FeedError::Parse { .. })
        );
        assert_matches!(
            validate(&[DataOperation::clear_namespace("")]),
            Err(FeedError::Parse { .. })
        );
        assert!(validate(&[feature_op("a", b"x"), clear_op()]).is_ok());
    }
}
