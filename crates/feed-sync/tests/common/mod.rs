//! Shared fixtures for feed-sync integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use feed_core::effects::{StorageEffects, TaskSpawner, TokioSpawner};
use feed_core::{ContentId, DataOperation, FeedConfig, MutationContext, Payload};
use feed_store::MemoryStorageHandler;
use feed_sync::{ActionManager, FeedContext, SessionManager};
use feed_testkit::{ControllableClock, ManualSpawner, ScriptedNetwork};

pub const START_MS: u64 = 10_000_000;

pub struct Harness {
    pub sessions: SessionManager,
    pub actions: ActionManager,
    pub network: ScriptedNetwork,
    pub clock: ControllableClock,
    pub spawner: ManualSpawner,
    pub config: FeedConfig,
}

impl Harness {
    /// Background work queues on a [`ManualSpawner`].
    pub fn manual() -> Self {
        let spawner = ManualSpawner::new();
        Self::build(
            Arc::new(MemoryStorageHandler::new()),
            Arc::new(spawner.clone()),
            spawner,
        )
    }

    /// Background work runs on the Tokio runtime.
    pub fn tokio() -> Self {
        Self::build(
            Arc::new(MemoryStorageHandler::new()),
            Arc::new(TokioSpawner),
            ManualSpawner::new(),
        )
    }

    /// Manual spawner over the given storage.
    pub fn with_storage(storage: Arc<dyn StorageEffects>) -> Self {
        let spawner = ManualSpawner::new();
        Self::build(storage, Arc::new(spawner.clone()), spawner)
    }

    fn build(
        storage: Arc<dyn StorageEffects>,
        task_spawner: Arc<dyn TaskSpawner>,
        spawner: ManualSpawner,
    ) -> Self {
        feed_testkit::init_tracing();
        let mut config = FeedConfig::default();
        config.storage.max_retries = 0;

        let network = ScriptedNetwork::new();
        let clock = ControllableClock::new(START_MS);
        let context = FeedContext::new(config.clone(), storage, Arc::new(network.clone()))
            .with_clock(Arc::new(clock.clone()))
            .with_spawner(task_spawner);
        let sessions = SessionManager::new(&context);
        let actions = ActionManager::new(&context, sessions.clone());
        Self {
            sessions,
            actions,
            network,
            clock,
            spawner,
            config,
        }
    }

    /// Apply `ops` as a HEAD-wide refresh.
    pub async fn refresh_with(&self, ops: Vec<DataOperation>) {
        self.sessions
            .get_update_consumer(MutationContext::refresh())
            .accept(Ok(ops))
            .await
            .unwrap();
    }
}

pub fn ids(values: &[&str]) -> Vec<ContentId> {
    values.iter().map(|v| ContentId::new(*v)).collect()
}

pub fn feature(id: &str, body: &[u8]) -> (ContentId, Payload) {
    (ContentId::new(id), Payload::Feature(body.to_vec()))
}

/// Yield until `done` holds, giving spawned tasks a chance to run.
pub async fn settle(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
