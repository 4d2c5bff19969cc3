//! Host content event reporting.

use std::sync::Arc;

use feed_core::{ContentEventReporter, FeedConfig, MutationContext, MutationOrigin};
use feed_store::MemoryStorageHandler;
use feed_sync::{FeedContext, SessionManager};
use feed_testkit::{feature_op, remove_op, ControllableClock, ManualSpawner, ScriptedNetwork};
use parking_lot::Mutex;

#[derive(Default)]
struct CountingReporter {
    batches: Mutex<Vec<(MutationOrigin, usize, usize)>>,
}

impl ContentEventReporter for CountingReporter {
    fn on_batch_applied(&self, origin: MutationOrigin, updated: usize, removed: usize) {
        self.batches.lock().push((origin, updated, removed));
    }
}

#[tokio::test]
async fn reporter_sees_each_applied_batch_once() {
    feed_testkit::init_tracing();
    let reporter = Arc::new(CountingReporter::default());
    let context = FeedContext::new(
        FeedConfig::default(),
        Arc::new(MemoryStorageHandler::new()),
        Arc::new(ScriptedNetwork::new()),
    )
    .with_clock(Arc::new(ControllableClock::new(1_000)))
    .with_spawner(Arc::new(ManualSpawner::new()))
    .with_reporter(reporter.clone());
    let sessions = SessionManager::new(&context);

    sessions
        .get_update_consumer(MutationContext::refresh())
        .accept(Ok(vec![feature_op("a", b"1"), feature_op("b", b"2")]))
        .await
        .unwrap();
    sessions
        .get_update_consumer(MutationContext::refresh().with_origin(MutationOrigin::Host))
        .accept(Ok(vec![remove_op("a"), feature_op("b", b"3")]))
        .await
        .unwrap();
    // Rejected batches are not reported.
    assert!(sessions
        .get_update_consumer(MutationContext::refresh())
        .accept(Ok(vec![remove_op("")]))
        .await
        .is_err());

    assert_eq!(
        *reporter.batches.lock(),
        vec![
            (MutationOrigin::Refresh, 2, 0),
            (MutationOrigin::Host, 1, 1),
        ]
    );
}
