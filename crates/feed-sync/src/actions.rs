//! Action manager
//!
//! A dismiss has two independent effects: the session mutation, applied
//! synchronously on the mutation lane so the UI sees it at once, and the
//! durable action record, appended later on the background spawner. A
//! failed record write is logged and never undoes the mutation.

use std::collections::BTreeSet;
use std::sync::Arc;

use feed_core::effects::{ClockEffects, TaskSpawner};
use feed_core::{
    ActionRecord, ContentId, DataOperation, MutationContext, MutationOrigin, Result, SessionId,
};
use feed_store::ActionStore;
use futures::FutureExt;
use tracing::{info, warn};

use crate::context::FeedContext;
use crate::session::SessionManager;

/// Public entry point for user actions on content.
#[derive(Clone)]
pub struct ActionManager {
    sessions: SessionManager,
    store: ActionStore,
    clock: Arc<dyn ClockEffects>,
    spawner: Arc<dyn TaskSpawner>,
}

impl ActionManager {
    /// Create an action manager writing through `sessions`.
    pub fn new(context: &FeedContext, sessions: SessionManager) -> Self {
        Self {
            sessions,
            store: ActionStore::new(context.storage.clone()),
            clock: context.clock.clone(),
            spawner: context.spawner.clone(),
        }
    }

    /// Dismiss `content_ids` on behalf of `session`.
    ///
    /// Must be called on the mutation lane (see
    /// [`SessionManager::run_task`]); panics otherwise. `operations` are
    /// applied before this returns. One [`ActionRecord`] per id is
    /// written in the background whether or not the mutation succeeded.
    pub async fn dismiss(
        &self,
        content_ids: Vec<ContentId>,
        operations: Vec<DataOperation>,
        session: SessionId,
    ) -> Result<()> {
        self.sessions.assert_on_lane("dismiss");

        let context = MutationContext::for_session(session).with_origin(MutationOrigin::Dismiss);
        let applied = self
            .sessions
            .get_update_consumer(context)
            .accept(Ok(operations))
            .await;

        let now = self.clock.now_ms();
        let records: Vec<ActionRecord> = content_ids
            .into_iter()
            .map(|id| ActionRecord::dismiss(id, now))
            .collect();
        let store = self.store.clone();
        self.spawner.spawn(
            "record_dismiss",
            async move {
                match store.append(&records).await {
                    Ok(()) => info!(count = records.len(), "Recorded dismiss actions"),
                    Err(err) => warn!(
                        count = records.len(),
                        error = %err,
                        "Failed to record dismiss actions"
                    ),
                }
            }
            .boxed(),
        );

        applied
    }

    /// Ids with a durable dismiss record.
    pub async fn dismissed_content_ids(&self) -> Result<BTreeSet<ContentId>> {
        self.store.dismissed_content_ids().await
    }

    /// Every recorded action, oldest first.
    pub async fn actions(&self) -> Result<Vec<ActionRecord>> {
        self.store.all().await
    }

    /// Delete every recorded action. Returns how many were removed.
    pub async fn clear_actions(&self) -> Result<usize> {
        self.store.clear_all().await
    }
}
