//! Lookup of queue implementations by `(type, version)`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::QueueConfig;
use crate::core::error::QueueError;
use crate::core::queue::ram::{RamQueue, RAM_QUEUE_TYPE, RAM_QUEUE_VERSION};
use crate::core::queue::StorageQueue;
use crate::core::storage_id::StorageId;

/// Constructor of one queue implementation.
pub type QueueFactory =
    fn(StorageId, Option<QueueConfig>) -> Result<Arc<dyn StorageQueue>, QueueError>;

fn ram_factory(
    storage_id: StorageId,
    config: Option<QueueConfig>,
) -> Result<Arc<dyn StorageQueue>, QueueError> {
    Ok(Arc::new(RamQueue::initialize(storage_id, config)?))
}

#[derive(Debug, Clone)]
pub struct QueuePluginRegistry {
    factories: HashMap<(String, String), QueueFactory>,
}

impl Default for QueuePluginRegistry {
    /// A registry knowing the built-in `RAM` / `1.0` queue.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(RAM_QUEUE_TYPE, RAM_QUEUE_VERSION, ram_factory);
        registry
    }
}

impl QueuePluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers a factory, replacing any previous one for the same pair.
    pub fn register(&mut self, queue_type: &str, version: &str, factory: QueueFactory) {
        self.factories
            .insert((queue_type.to_string(), version.to_string()), factory);
    }

    pub fn contains(&self, queue_type: &str, version: &str) -> bool {
        self.factories
            .contains_key(&(queue_type.to_string(), version.to_string()))
    }

    /// Builds the queue named by `config.queue_type` / `config.version`.
    pub fn create(
        &self,
        storage_id: StorageId,
        config: QueueConfig,
    ) -> Result<Arc<dyn StorageQueue>, QueueError> {
        let key = (config.queue_type.clone(), config.version.clone());
        let factory = self.factories.get(&key).ok_or_else(|| {
            QueueError::Configuration(format!(
                "unknown queue plugin type='{}' version='{}'",
                key.0, key.1
            ))
        })?;
        factory(storage_id, Some(config))
    }
}
