//! Dismiss visibility and action durability.

mod common;

use std::sync::Arc;

use common::{ids, Harness};
use feed_core::{ActionType, ChangeKind, ContentId, SessionChange};
use feed_testkit::{feature_op, remove_op, FlakyStorage, RecordingObserver};

#[tokio::test]
async fn dismiss_is_visible_before_the_record_is_durable() {
    let h = Harness::manual();
    h.refresh_with(vec![feature_op("c1", b"1"), feature_op("c2", b"2")])
        .await;
    let observer = RecordingObserver::new();
    let session = h
        .sessions
        .get_new_session(Some(Arc::new(observer.clone())))
        .await;

    h.sessions
        .run_task(
            "dismiss",
            h.actions
                .dismiss(ids(&["c1"]), vec![remove_op("c1")], session.id),
        )
        .await
        .unwrap();

    // Visible without running any background work.
    assert_eq!(h.sessions.session_snapshot(&session.id).unwrap().items, ids(&["c2"]));
    assert_eq!(
        observer.changes(),
        vec![SessionChange {
            session: session.id,
            range_start: 0,
            range_length: 1,
            kind: ChangeKind::Removed,
        }]
    );
    assert!(h.actions.dismissed_content_ids().await.unwrap().is_empty());
    assert_eq!(h.spawner.spawned_names(), vec!["record_dismiss"]);

    h.spawner.run_pending().await;

    let dismissed = h.actions.dismissed_content_ids().await.unwrap();
    assert!(dismissed.contains(&ContentId::new("c1")));
    let actions = h.actions.actions().await.unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action_type, ActionType::Dismiss);
    assert_eq!(actions[0].timestamp_ms, common::START_MS);
}

#[tokio::test]
async fn failed_record_write_does_not_undo_the_dismiss() {
    let storage = FlakyStorage::new();
    let h = Harness::with_storage(Arc::new(storage.clone()));
    h.refresh_with(vec![feature_op("c1", b"1"), feature_op("c2", b"2")])
        .await;
    let session = h.sessions.get_new_session(None).await;

    h.sessions
        .run_task(
            "dismiss",
            h.actions
                .dismiss(ids(&["c1"]), vec![remove_op("c1")], session.id),
        )
        .await
        .unwrap();

    storage.fail_next_commits(1);
    h.spawner.run_pending().await;

    assert!(h.actions.dismissed_content_ids().await.unwrap().is_empty());
    assert_eq!(h.sessions.session_snapshot(&session.id).unwrap().items, ids(&["c2"]));
    assert!(h.sessions.stream_features(&ids(&["c1"])).await.unwrap().is_empty());
}

#[tokio::test]
async fn records_survive_session_expiry_until_cleared() {
    let h = Harness::manual();
    h.refresh_with(vec![feature_op("c1", b"1")]).await;
    let session = h.sessions.get_new_session(None).await;

    h.sessions
        .run_task(
            "dismiss",
            h.actions
                .dismiss(ids(&["c1"]), vec![remove_op("c1")], session.id),
        )
        .await
        .unwrap();
    h.spawner.run_pending().await;

    h.clock.advance(h.config.session.session_ttl_ms);
    assert_eq!(h.sessions.expire_sessions(), 1);
    assert_eq!(h.actions.actions().await.unwrap().len(), 1);

    assert_eq!(h.actions.clear_actions().await.unwrap(), 1);
    assert!(h.actions.actions().await.unwrap().is_empty());
}

#[tokio::test]
#[should_panic(expected = "must run on the session mutation lane")]
async fn dismiss_off_the_lane_is_a_programming_error() {
    let h = Harness::manual();
    let session = feed_core::SessionId::new_random();
    let _ = h
        .actions
        .dismiss(ids(&["c1"]), vec![remove_op("c1")], session)
        .await;
}

#[tokio::test]
async fn rejected_dismiss_batch_is_still_recorded() {
    let h = Harness::manual();
    h.refresh_with(vec![feature_op("c1", b"1")]).await;
    let session = h.sessions.get_new_session(None).await;

    let applied = h
        .sessions
        .run_task(
            "dismiss",
            h.actions
                .dismiss(ids(&["c1"]), vec![remove_op("")], session.id),
        )
        .await;

    assert!(applied.is_err());
    assert_eq!(h.sessions.session_snapshot(&session.id).unwrap().items, ids(&["c1"]));
    h.spawner.run_pending().await;
    assert!(h
        .actions
        .dismissed_content_ids()
        .await
        .unwrap()
        .contains(&ContentId::new("c1")));
}
