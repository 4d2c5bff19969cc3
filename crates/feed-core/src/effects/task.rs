//! Runtime-agnostic task spawning.

use futures::future::BoxFuture;
use tracing::trace;

/// Task spawning contract for runtime implementations.
pub trait TaskSpawner: Send + Sync {
    /// Spawn a named background task.
    fn spawn(&self, name: &'static str, fut: BoxFuture<'static, ()>);
}

/// Spawner backed by the ambient Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, name: &'static str, fut: BoxFuture<'static, ()>) {
        trace!(task = name, "Spawning background task");
        tokio::spawn(fut);
    }
}
