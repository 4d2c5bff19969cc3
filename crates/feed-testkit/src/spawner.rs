//! Task spawner that only runs work when a test asks it to.

use std::sync::Arc;

use feed_core::effects::TaskSpawner;
use futures::future::BoxFuture;
use parking_lot::Mutex;

#[derive(Default)]
struct SpawnerState {
    queue: Mutex<Vec<(&'static str, BoxFuture<'static, ()>)>>,
    history: Mutex<Vec<&'static str>>,
}

/// Queues spawned futures instead of running them.
///
/// Models a disabled background executor: nothing spawned makes progress
/// until [`ManualSpawner::run_pending`] drives the queue.
#[derive(Clone, Default)]
pub struct ManualSpawner {
    state: Arc<SpawnerState>,
}

impl ManualSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks queued and not yet run.
    pub fn pending(&self) -> usize {
        self.state.queue.lock().len()
    }

    /// Names of every task ever spawned, in spawn order.
    pub fn spawned_names(&self) -> Vec<&'static str> {
        self.state.history.lock().clone()
    }

    /// Run queued tasks to completion, including tasks they spawn.
    /// Returns the number of tasks run.
    pub async fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let batch = std::mem::take(&mut *self.state.queue.lock());
            if batch.is_empty() {
                return ran;
            }
            for (_, fut) in batch {
                fut.await;
                ran += 1;
            }
        }
    }
}

impl ManualSpawner {
    /// Run only the queued tasks named `name`, leaving the rest queued.
    /// Returns the number of tasks run.
    pub async fn run_named(&self, name: &str) -> usize {
        let selected: Vec<_> = {
            let mut queue = self.state.queue.lock();
            let (selected, rest) = std::mem::take(&mut *queue)
                .into_iter()
                .partition(|(task, _)| *task == name);
            *queue = rest;
            selected
        };
        let ran = selected.len();
        for (_, fut) in selected {
            fut.await;
        }
        ran
    }

    /// Drop every queued task without running it, as a shut-down executor
    /// would. Returns the number of tasks dropped.
    pub fn discard_pending(&self) -> usize {
        let dropped = std::mem::take(&mut *self.state.queue.lock());
        dropped.len()
    }
}

impl TaskSpawner for ManualSpawner {
    fn spawn(&self, name: &'static str, fut: BoxFuture<'static, ()>) {
        self.state.history.lock().push(name);
        self.state.queue.lock().push((name, fut));
    }
}
