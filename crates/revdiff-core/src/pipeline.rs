//! At most one running task per pipeline key.
//!
//! Starting a pipeline aborts whatever still runs under the same key. A
//! finished task only releases its key if it has not been replaced in the
//! meantime.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

#[derive(Default)]
struct Registry {
    next_generation: u64,
    running: HashMap<String, (u64, AbortHandle)>,
    closed: bool,
}

#[derive(Clone, Default)]
pub struct PipelineRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `task` under `key`, cancelling the previous one. Returns `None`
    /// once the registry has been shut down.
    pub fn start<F>(&self, key: &str, task: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut registry = self.lock();
        if registry.closed {
            debug!(key, "Pipeline registry closed, not starting");
            return None;
        }

        if let Some((_, previous)) = registry.running.remove(key) {
            previous.abort();
            debug!(key, "Replaced running pipeline");
        }

        registry.next_generation += 1;
        let generation = registry.next_generation;
        let owner = self.clone();
        let owned_key = key.to_string();
        // The lock is held until the handle is registered, so the task
        // cannot release before it is known.
        let handle = tokio::spawn(async move {
            task.await;
            owner.release(&owned_key, generation);
        });
        registry
            .running
            .insert(key.to_string(), (generation, handle.abort_handle()));
        Some(handle)
    }

    fn release(&self, key: &str, generation: u64) {
        let mut registry = self.lock();
        if matches!(registry.running.get(key), Some((current, _)) if *current == generation) {
            registry.running.remove(key);
        }
    }

    pub fn is_running(&self, key: &str) -> bool {
        self.lock().running.contains_key(key)
    }

    pub fn running_count(&self) -> usize {
        self.lock().running.len()
    }

    /// Abort everything and refuse further pipelines.
    pub fn shutdown(&self) {
        let mut registry = self.lock();
        registry.closed = true;
        let count = registry.running.len();
        for (_, (_, handle)) in registry.running.drain() {
            handle.abort();
        }
        debug!(aborted = count, "Pipeline registry shut down");
    }
}
