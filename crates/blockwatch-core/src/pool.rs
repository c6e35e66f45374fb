//! Bounded dispatch pool.
//!
//! A counting semaphore caps the number of in-flight dispatch tasks. The
//! producer blocks in [`DispatchPool::spawn`] while every slot is taken,
//! which is the watcher's only backpressure mechanism. Spawned tasks are
//! tracked in a `JoinSet` so [`DispatchPool::drain`] can wait for all of
//! them.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::WatcherError;

pub struct DispatchPool {
    slots: Arc<Semaphore>,
    capacity: usize,
    tasks: JoinSet<()>,
}

impl DispatchPool {
    /// Create a pool admitting at most `capacity` concurrent tasks.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            tasks: JoinSet::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    /// Wait for a free slot, then run `task` on it.
    ///
    /// The slot is released when `task` completes, even if it panics.
    pub async fn spawn<F>(&mut self, task: F) -> Result<(), WatcherError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slot = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| WatcherError::Other("dispatch pool closed".into()))?;
        self.reap();
        self.tasks.spawn(async move {
            let _slot = slot;
            task.await;
        });
        Ok(())
    }

    /// Wait until every spawned task has finished.
    pub async fn drain(&mut self) {
        while let Some(res) = self.tasks.join_next().await {
            log_join_error(res);
        }
    }

    // Drop bookkeeping for tasks that already finished.
    fn reap(&mut self) {
        while let Some(res) = self.tasks.try_join_next() {
            log_join_error(res);
        }
    }
}

fn log_join_error(res: Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        tracing::error!(error = %e, "dispatch task failed");
    }
}
