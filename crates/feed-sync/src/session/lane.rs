//! Mutation lane
//!
//! Every write to HEAD runs on one serialized execution context. The lane is
//! a FIFO async mutex plus a task-local marker, so work already running on
//! the lane can call back into lane-only operations without deadlocking.

use std::future::Future;

use tokio::sync::Mutex;
use tracing::trace;
use uuid::Uuid;

tokio::task_local! {
    static CURRENT_LANE: Uuid;
}

/// Single-writer execution context for HEAD mutations.
#[derive(Debug)]
pub struct MutationLane {
    id: Uuid,
    gate: Mutex<()>,
}

impl Default for MutationLane {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationLane {
    /// Create a lane.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            gate: Mutex::new(()),
        }
    }

    /// Whether the calling task is running on this lane.
    pub fn is_current(&self) -> bool {
        CURRENT_LANE
            .try_with(|id| *id == self.id)
            .unwrap_or(false)
    }

    /// Panic unless called from this lane.
    ///
    /// Calling a lane-only operation from elsewhere is a programming error,
    /// not a recoverable condition.
    #[track_caller]
    pub fn assert_on_lane(&self, operation: &str) {
        assert!(
            self.is_current(),
            "{operation} must run on the session mutation lane"
        );
    }

    /// Run `fut` on the lane, after every task queued before it.
    ///
    /// Runs inline when the caller is already on the lane.
    pub async fn run<F, T>(&self, name: &str, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        if self.is_current() {
            trace!(task = name, "Running re-entrant lane task");
            return fut.await;
        }
        let _guard = self.gate.lock().await;
        trace!(task = name, "Running lane task");
        CURRENT_LANE.scope(self.id, fut).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn marker_is_scoped_to_the_lane() {
        let lane = MutationLane::new();
        let other = MutationLane::new();
        assert!(!lane.is_current());

        let (on_lane, on_other) = lane
            .run("check", async { (lane.is_current(), other.is_current()) })
            .await;
        assert!(on_lane);
        assert!(!on_other);
        assert!(!lane.is_current());
    }

    #[tokio::test]
    async fn nested_runs_do_not_deadlock() {
        let lane = MutationLane::new();
        let value = lane
            .run("outer", async { lane.run("inner", async { 7 }).await })
            .await;
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn tasks_are_serialized_in_arrival_order() {
        let lane = Arc::new(MutationLane::new());
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..5 {
            let lane = lane.clone();
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                lane.run("append", async {
                    log.lock().push(i);
                    tokio::task::yield_now().await;
                    log.lock().push(i);
                })
                .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let log = log.lock().clone();
        for pair in log.chunks(2) {
            assert_eq!(pair[0], pair[1], "lane tasks interleaved: {log:?}");
        }
    }

    #[tokio::test]
    #[should_panic(expected = "must run on the session mutation lane")]
    async fn assert_fails_off_lane() {
        MutationLane::new().assert_on_lane("dismiss");
    }
}
