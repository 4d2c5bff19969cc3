//! Observer that records every change it is told about.

use std::sync::Arc;

use feed_core::{ChangeKind, SessionChange, SessionObserver};
use parking_lot::Mutex;

/// Records [`SessionChange`]s in delivery order. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    changes: Arc<Mutex<Vec<SessionChange>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every change recorded so far.
    pub fn changes(&self) -> Vec<SessionChange> {
        self.changes.lock().clone()
    }

    /// Recorded changes of one kind.
    pub fn changes_of(&self, kind: ChangeKind) -> Vec<SessionChange> {
        self.changes
            .lock()
            .iter()
            .filter(|c| c.kind == kind)
            .copied()
            .collect()
    }

    /// Forget everything recorded.
    pub fn clear(&self) {
        self.changes.lock().clear();
    }
}

impl SessionObserver for RecordingObserver {
    fn on_change(&self, change: SessionChange) {
        self.changes.lock().push(change);
    }
}
