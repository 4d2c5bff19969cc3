//! Explicit collaborator set handed to every manager.
//!
//! There is no process-wide state: a host builds one [`FeedContext`] and
//! passes it to [`SessionManager::new`](crate::SessionManager::new) and
//! [`ActionManager::new`](crate::ActionManager::new).

use std::sync::Arc;

use feed_core::effects::{
    ClockEffects, NetworkEffects, StorageEffects, SystemClock, TaskSpawner, TokioSpawner,
};
use feed_core::wire::{JsonWireCodec, WireCodec};
use feed_core::{ContentEventReporter, FeedConfig};
use feed_store::RetryingStorage;

use crate::scheduler::{SchedulerPolicy, StalenessScheduler};

/// Effects, policies and configuration shared by the feed managers.
#[derive(Clone)]
pub struct FeedContext {
    /// Engine configuration
    pub config: FeedConfig,
    /// Durable storage, already wrapped in bounded retries
    pub storage: Arc<dyn StorageEffects>,
    /// Feed transport
    pub network: Arc<dyn NetworkEffects>,
    /// Wall clock
    pub clock: Arc<dyn ClockEffects>,
    /// Background executor for I/O off the mutation lane
    pub spawner: Arc<dyn TaskSpawner>,
    /// Response decoder
    pub codec: Arc<dyn WireCodec>,
    /// Request policy
    pub scheduler: Arc<dyn SchedulerPolicy>,
    /// Optional observer of applied batches
    pub reporter: Option<Arc<dyn ContentEventReporter>>,
}

impl FeedContext {
    /// Production defaults around `storage` and `network`.
    ///
    /// Storage is wrapped in [`RetryingStorage`] using the configured retry
    /// policy. The scheduler is a [`StalenessScheduler`] over the system
    /// clock.
    pub fn new(
        config: FeedConfig,
        storage: Arc<dyn StorageEffects>,
        network: Arc<dyn NetworkEffects>,
    ) -> Self {
        let clock: Arc<dyn ClockEffects> = Arc::new(SystemClock);
        let storage: Arc<dyn StorageEffects> = Arc::new(RetryingStorage::new(
            storage,
            config.storage.retry_policy(),
        ));
        let scheduler = Arc::new(StalenessScheduler::new(
            config.scheduler.clone(),
            clock.clone(),
        ));
        Self {
            config,
            storage,
            network,
            clock,
            spawner: Arc::new(TokioSpawner),
            codec: Arc::new(JsonWireCodec),
            scheduler,
            reporter: None,
        }
    }

    /// Replace the clock and rebuild the default scheduler around it.
    ///
    /// Call before [`with_scheduler`](Self::with_scheduler).
    pub fn with_clock(mut self, clock: Arc<dyn ClockEffects>) -> Self {
        self.scheduler = Arc::new(StalenessScheduler::new(
            self.config.scheduler.clone(),
            clock.clone(),
        ));
        self.clock = clock;
        self
    }

    /// Replace the background executor.
    pub fn with_spawner(mut self, spawner: Arc<dyn TaskSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Replace the response codec.
    pub fn with_codec(mut self, codec: Arc<dyn WireCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Replace the scheduling policy.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn SchedulerPolicy>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Install a content event reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ContentEventReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }
}
