//! Host-facing notification interfaces.

use serde::{Deserialize, Serialize};

use crate::identifiers::SessionId;
use crate::operations::MutationOrigin;

/// How a range of a session's visible items changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Items were inserted at the range
    Inserted,
    /// Items were removed from the range
    Removed,
    /// Items at the range have new payloads
    Changed,
}

/// One change notification for an attached session.
///
/// Ranges refer to positions after every earlier notification of the same
/// batch has been applied, so replaying them in order reproduces the
/// post-batch view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionChange {
    /// Session the change applies to
    pub session: SessionId,
    /// First affected position
    pub range_start: usize,
    /// Number of affected positions
    pub range_length: usize,
    /// Kind of change
    pub kind: ChangeKind,
}

/// UI-side observer of an attached session.
pub trait SessionObserver: Send + Sync {
    /// Called once per change after a whole batch has been applied.
    fn on_change(&self, change: SessionChange);
}

/// Optional host capability told about every applied batch.
pub trait ContentEventReporter: Send + Sync {
    /// A batch was merged into HEAD.
    fn on_batch_applied(&self, origin: MutationOrigin, updated: usize, removed: usize);
}
