//! Durable records of user-initiated actions.

use serde::{Deserialize, Serialize};

use crate::identifiers::ContentId;

/// Kind of recorded action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// Content removed from view by the user
    Dismiss,
}

/// One recorded action. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Content the action applies to
    pub content_id: ContentId,
    /// What the user did
    pub action_type: ActionType,
    /// Wall-clock time of the action in milliseconds
    pub timestamp_ms: u64,
}

impl ActionRecord {
    /// Record a dismiss of `content_id` at `timestamp_ms`.
    pub fn dismiss(content_id: ContentId, timestamp_ms: u64) -> Self {
        Self {
            content_id,
            action_type: ActionType::Dismiss,
            timestamp_ms,
        }
    }
}
