//! Per-session view state.

use std::sync::Arc;

use feed_core::{ContentId, ContinuationToken, SessionId, SessionObserver};

/// A session's view of HEAD as handed to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Session token, usable with `get_existing_session`
    pub id: SessionId,
    /// Visible feature ids in display order
    pub items: Vec<ContentId>,
    /// Cursor for the next page, if the stream continues
    pub continuation_token: Option<ContinuationToken>,
    /// HEAD version the view was last synced with
    pub head_version: u64,
}

pub(crate) struct StreamSession {
    pub(crate) id: SessionId,
    pub(crate) items: Vec<ContentId>,
    pub(crate) cursor: Option<ContinuationToken>,
    pub(crate) head_version: u64,
    pub(crate) observer: Option<Arc<dyn SessionObserver>>,
    pub(crate) last_access_ms: u64,
}

impl StreamSession {
    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            items: self.items.clone(),
            continuation_token: self.cursor.clone(),
            head_version: self.head_version,
        }
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.observer.is_some()
    }

    /// Whether a detached session has been idle past `ttl_ms`.
    pub(crate) fn is_expired(&self, now_ms: u64, ttl_ms: u64) -> bool {
        !self.is_attached() && now_ms.saturating_sub(self.last_access_ms) >= ttl_ms
    }
}
