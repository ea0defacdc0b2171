#![allow(dead_code)]

use std::sync::{Arc, Once};

use failsafe_queue::{
    EntryPayload, IdGenerator, KeyQos, MsgUnit, Priority, QueueConfig, QueueEntry, RamQueue,
    StorageId,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        failsafe_queue::logging::init_logging();
    });
}

pub fn ram_queue(max_entries: u64, max_bytes: u64) -> RamQueue {
    init_logging();
    RamQueue::new(
        StorageId::new("connection", "client/joe/1").unwrap(),
        QueueConfig::with_limits(max_entries, max_bytes),
    )
    .unwrap()
}

/// A publish entry whose size is exactly `size` bytes (at least the overhead).
pub fn sized(ids: &IdGenerator, prio: u8, persistent: bool, size: u64) -> Arc<QueueEntry> {
    let content = vec![b'x'; size.saturating_sub(100) as usize];
    Arc::new(QueueEntry::new(
        ids,
        Priority::new(prio as i64).unwrap(),
        persistent,
        EntryPayload::Publish(MsgUnit::new("", content, "")),
    ))
}

pub fn publish(ids: &IdGenerator, prio: u8, key: &str) -> Arc<QueueEntry> {
    Arc::new(QueueEntry::new(
        ids,
        Priority::new(prio as i64).unwrap(),
        false,
        EntryPayload::Publish(MsgUnit::new(key, "payload", "")),
    ))
}

pub fn subscribe(ids: &IdGenerator, key: &str) -> Arc<QueueEntry> {
    Arc::new(QueueEntry::new(
        ids,
        Priority::NORM,
        true,
        EntryPayload::Subscribe(KeyQos::new(key, "")),
    ))
}

pub fn keys(entries: &[Arc<QueueEntry>]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.key_oid().unwrap_or("").to_string())
        .collect()
}

pub fn priorities(entries: &[Arc<QueueEntry>]) -> Vec<i32> {
    entries.iter().map(|e| e.priority().value()).collect()
}
