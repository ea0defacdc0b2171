mod common;

use std::sync::Arc;

use failsafe_queue::{
    QueueConfig, QueueError, QueueManager, QueuePluginRegistry, RamQueue, StorageId, StorageQueue,
};

#[test]
fn get_or_create_returns_same_queue() {
    common::init_logging();
    let manager = QueueManager::new();
    let id = StorageId::new("connection", "client/joe/1").unwrap();

    let a = manager.get_or_create(&id, QueueConfig::with_limits(5, 1000)).unwrap();
    let b = manager.get_or_create(&id, QueueConfig::with_limits(99, 99)).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(b.capacity(), (5, 1000));
    assert_eq!(manager.count(), 1);
    assert!(manager.get(&id).is_some());
}

#[test]
fn unknown_plugin_is_rejected() {
    let manager = QueueManager::new();
    let id = StorageId::unique("connection").unwrap();
    let cfg = QueueConfig {
        queue_type: "CACHE".into(),
        ..QueueConfig::default()
    };
    let err = manager.get_or_create(&id, cfg).unwrap_err();
    assert!(matches!(err, QueueError::Configuration(_)));
    assert_eq!(manager.count(), 0);
}

fn small_ram(
    storage_id: StorageId,
    config: Option<QueueConfig>,
) -> Result<Arc<dyn StorageQueue>, QueueError> {
    let mut config = config.unwrap_or_default();
    config.max_entries = config.max_entries.min(1);
    Ok(Arc::new(RamQueue::initialize(storage_id, Some(config))?))
}

#[test]
fn custom_plugins_are_used() {
    let mut plugins = QueuePluginRegistry::empty();
    plugins.register("SMALL", "1.0", small_ram);
    let manager = QueueManager::with_plugins(plugins);

    let id = StorageId::unique("subject").unwrap();
    let cfg = QueueConfig {
        queue_type: "SMALL".into(),
        ..QueueConfig::default()
    };
    let q = manager.get_or_create(&id, cfg).unwrap();
    assert_eq!(q.capacity().0, 1);

    let ram = StorageId::unique("subject").unwrap();
    assert!(manager.get_or_create(&ram, QueueConfig::default()).is_err());
}

#[test]
fn shutdown_deregisters_queues() {
    let manager = QueueManager::new();
    let a = StorageId::unique("connection").unwrap();
    let b = StorageId::unique("connection").unwrap();
    let qa = manager.get_or_create(&a, QueueConfig::default()).unwrap();
    manager.get_or_create(&b, QueueConfig::default()).unwrap();

    assert!(manager.shutdown_queue(&a));
    assert!(qa.is_shutdown());
    assert!(!manager.shutdown_queue(&a));
    assert!(manager.get(&a).is_none());

    assert_eq!(manager.shutdown_all(), 1);
    assert_eq!(manager.count(), 0);
}

#[test]
fn queue_shut_down_directly_is_rebuilt() {
    let ids = failsafe_queue::IdGenerator::new();
    let manager = QueueManager::new();
    let id = StorageId::unique("connection").unwrap();

    let first = manager.get_or_create(&id, QueueConfig::default()).unwrap();
    first.shutdown();
    assert!(manager.get(&id).is_none());
    assert_eq!(manager.count(), 0);

    let second = manager.get_or_create(&id, QueueConfig::default()).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    second.put(common::publish(&ids, 5, "after"), false).unwrap();
    assert_eq!(second.entry_count(), 1);

    second.destroy();
    let third = manager.get_or_create(&id, QueueConfig::default()).unwrap();
    assert!(!third.is_shutdown());
    assert_eq!(manager.count(), 1);
}
