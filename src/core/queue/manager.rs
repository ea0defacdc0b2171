//! QueueManager keeps the live failsafe queues of a process.
//!
//! Uses DashMap for concurrent access keyed by storage id, so connections
//! can look up or create their queue without a global lock.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::config::QueueConfig;
use crate::core::error::QueueError;
use crate::core::queue::{QueuePluginRegistry, StorageQueue};
use crate::core::storage_id::StorageId;

/// A thread-safe registry of queues.
///
/// Queues are built through a [`QueuePluginRegistry`], so any registered
/// implementation can back a storage id.
#[derive(Debug, Default)]
pub struct QueueManager {
    /// Map of storage id → queue.
    queues: DashMap<String, Arc<dyn StorageQueue>>,
    plugins: QueuePluginRegistry,
}

impl QueueManager {
    #[inline]
    pub fn new() -> Self {
        Self::with_plugins(QueuePluginRegistry::default())
    }

    pub fn with_plugins(plugins: QueuePluginRegistry) -> Self {
        Self {
            queues: DashMap::new(),
            plugins,
        }
    }

    /// Returns the queue for `storage_id`, creating it from `config` if
    /// absent. An existing queue keeps its own configuration; one that was
    /// shut down is replaced by a fresh queue.
    pub fn get_or_create(
        &self,
        storage_id: &StorageId,
        config: QueueConfig,
    ) -> Result<Arc<dyn StorageQueue>, QueueError> {
        if let Some(existing) = self.queues.get(storage_id.as_str()) {
            if !existing.is_shutdown() {
                return Ok(Arc::clone(&*existing));
            }
        }

        match self.queues.entry(storage_id.as_str().to_string()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_shutdown() {
                    return Ok(Arc::clone(occupied.get()));
                }
                let queue = self.create(storage_id, config)?;
                occupied.insert(Arc::clone(&queue));
                info!(storage = %storage_id, "replaced shut down queue");
                Ok(queue)
            }
            Entry::Vacant(vacant) => {
                let queue = self.create(storage_id, config)?;
                vacant.insert(Arc::clone(&queue));
                Ok(queue)
            }
        }
    }

    fn create(
        &self,
        storage_id: &StorageId,
        config: QueueConfig,
    ) -> Result<Arc<dyn StorageQueue>, QueueError> {
        let queue = self.plugins.create(storage_id.clone(), config)?;
        info!(
            storage = %storage_id,
            queue_type = queue.queue_type(),
            version = queue.version(),
            "created queue"
        );
        Ok(queue)
    }

    /// Returns the live queue for `storage_id`. A queue shut down directly
    /// is forgotten here.
    pub fn get(&self, storage_id: &StorageId) -> Option<Arc<dyn StorageQueue>> {
        if self
            .queues
            .remove_if(storage_id.as_str(), |_, q| q.is_shutdown())
            .is_some()
        {
            debug!(storage = %storage_id, "dropped shut down queue");
            return None;
        }
        self.queues
            .get(storage_id.as_str())
            .map(|q| Arc::clone(&*q))
    }

    /// Returns the total number of queues currently registered.
    #[inline]
    pub fn count(&self) -> usize {
        self.queues.len()
    }

    /// Shuts a queue down and forgets it. Returns `false` if it was unknown.
    pub fn shutdown_queue(&self, storage_id: &StorageId) -> bool {
        match self.queues.remove(storage_id.as_str()) {
            Some((_, queue)) => {
                queue.shutdown();
                info!(storage = %storage_id, pending = queue.entry_count(), "queue removed");
                true
            }
            None => false,
        }
    }

    /// Shuts down and forgets every queue, returning how many there were.
    pub fn shutdown_all(&self) -> usize {
        let ids: Vec<String> = self.queues.iter().map(|e| e.key().clone()).collect();
        let mut count = 0;
        for id in ids {
            if let Some((_, queue)) = self.queues.remove(&id) {
                queue.shutdown();
                count += 1;
            }
        }
        info!(count, "all queues shut down");
        count
    }
}
