//! Failsafe queue module.
//!
//! Defines the storage abstraction the dispatcher buffers operations in while
//! the broker is unreachable, and the in-memory implementation.
//!
//! Supports:
//! - Priority and creation-time ordering
//! - Capacity bounds by entry count and by bytes
//! - Separate accounting of persistent entries
//! - Put interception and size notifications

pub mod listener;
pub mod manager;
pub mod plugin;
pub mod ram;
pub mod watch;

pub use listener::{PutInterceptor, SizeListener};
pub use manager::QueueManager;
pub use plugin::QueuePluginRegistry;
pub use ram::RamQueue;
pub use watch::WatchSizeListener;

use std::fmt::Debug;
use std::sync::Arc;

use crate::config::QueueConfig;
use crate::core::entry::QueueEntry;
use crate::core::error::QueueError;
use crate::core::priority::Priority;
use crate::core::storage_id::StorageId;
use crate::core::timestamp::EntryId;

/// Occupancy of a queue at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueSize {
    pub entries: u64,
    pub bytes: u64,
    pub persistent_entries: u64,
    pub persistent_bytes: u64,
    pub shutdown: bool,
}

/// Result of a range read.
#[derive(Debug, Clone, Default)]
pub struct ReturnHolder {
    pub entries: Vec<Arc<QueueEntry>>,
    pub count_entries: u64,
    pub count_bytes: u64,
}

impl ReturnHolder {
    pub(crate) fn push(&mut self, entry: Arc<QueueEntry>) {
        self.count_entries += 1;
        self.count_bytes += entry.size_in_bytes();
        self.entries.push(entry);
    }
}

/// Common interface of all queue implementations.
///
/// Entry and byte limits on reads are `i64`: a negative value means
/// unbounded. A negative `min_priority` restricts the read to entries sharing
/// the head's priority.
///
/// All implementations must be thread-safe (`Send + Sync`).
pub trait StorageQueue: Send + Sync + Debug {
    fn storage_id(&self) -> &StorageId;

    /// Plugin type, e.g. `"RAM"`.
    fn queue_type(&self) -> &'static str;

    fn version(&self) -> &'static str;

    /// `true` if content is lost on process exit.
    fn is_transient(&self) -> bool;

    fn config(&self) -> QueueConfig;

    fn set_config(&self, config: QueueConfig) -> Result<(), QueueError>;

    fn put(&self, entry: Arc<QueueEntry>, bypass_interceptor: bool) -> Result<(), QueueError>;

    /// Admits a batch. Capacity is checked once against the totals before the
    /// batch, admitted entries are not rolled back.
    fn put_all(
        &self,
        entries: &[Arc<QueueEntry>],
        bypass_interceptor: bool,
    ) -> Result<(), QueueError>;

    fn peek(&self) -> Option<Arc<QueueEntry>>;

    fn peek_range(
        &self,
        max_entries: i64,
        max_bytes: i64,
        min_priority: i32,
        max_priority: i32,
    ) -> ReturnHolder;

    fn peek_n(&self, max_entries: i64, max_bytes: i64) -> Vec<Arc<QueueEntry>> {
        self.peek_range(max_entries, max_bytes, Priority::MIN.value(), Priority::MAX.value())
            .entries
    }

    fn peek_same_priority(&self, max_entries: i64, max_bytes: i64) -> Vec<Arc<QueueEntry>> {
        self.peek_range(max_entries, max_bytes, -1, -1).entries
    }

    fn take_range(
        &self,
        max_entries: i64,
        max_bytes: i64,
        min_priority: i32,
        max_priority: i32,
    ) -> Result<Vec<Arc<QueueEntry>>, QueueError>;

    fn take(&self, max_entries: i64, max_bytes: i64) -> Result<Vec<Arc<QueueEntry>>, QueueError> {
        self.take_range(max_entries, max_bytes, Priority::MIN.value(), Priority::MAX.value())
    }

    fn take_same_priority(
        &self,
        max_entries: i64,
        max_bytes: i64,
    ) -> Result<Vec<Arc<QueueEntry>>, QueueError> {
        self.take_range(max_entries, max_bytes, -1, -1)
    }

    /// Takes from the low end, stopping before `boundary`. With `leave_one`
    /// the queue is never emptied completely.
    fn take_lowest(
        &self,
        max_entries: i64,
        max_bytes: i64,
        boundary: Option<&QueueEntry>,
        leave_one: bool,
    ) -> Result<Vec<Arc<QueueEntry>>, QueueError>;

    fn peek_lowest(
        &self,
        max_entries: i64,
        max_bytes: i64,
        boundary: Option<&QueueEntry>,
        leave_one: bool,
    ) -> Vec<Arc<QueueEntry>>;

    fn remove_exact(&self, entry: &Arc<QueueEntry>) -> bool {
        self.remove_exact_batch(std::slice::from_ref(entry))
            .first()
            .copied()
            .unwrap_or(false)
    }

    fn remove_exact_batch(&self, entries: &[Arc<QueueEntry>]) -> Vec<bool>;

    /// Removes every entry ordered before `boundary`, and `boundary` itself
    /// when `inclusive`.
    fn remove_up_to(&self, boundary: &QueueEntry, inclusive: bool) -> u64;

    /// Removes everything, returns the number of entries dropped.
    fn clear(&self) -> u64;

    fn shutdown(&self);

    fn is_shutdown(&self) -> bool;

    fn destroy(&self) {
        self.clear();
        self.shutdown();
    }

    fn size(&self) -> QueueSize;

    fn entry_count(&self) -> u64 {
        self.size().entries
    }

    fn byte_count(&self) -> u64 {
        self.size().bytes
    }

    fn persistent_entry_count(&self) -> u64 {
        self.size().persistent_entries
    }

    fn persistent_byte_count(&self) -> u64 {
        self.size().persistent_bytes
    }

    /// `(max_entries, max_bytes)`.
    fn capacity(&self) -> (u64, u64) {
        let config = self.config();
        (config.max_entries, config.max_bytes)
    }

    /// Sums entry sizes by scanning the store instead of reading counters.
    fn synchronized_byte_count(&self) -> u64 {
        self.recount().bytes
    }

    /// Recomputes all counters by scanning the store.
    fn recount(&self) -> QueueSize;

    fn add_size_listener(&self, listener: Arc<dyn SizeListener>);

    fn remove_size_listener(&self, listener: &Arc<dyn SizeListener>);

    fn has_size_listener(&self, listener: &Arc<dyn SizeListener>) -> bool;

    fn set_put_interceptor(&self, interceptor: Arc<dyn PutInterceptor>) -> Result<(), QueueError>;

    fn clear_put_interceptor(&self);

    /// Whether entries get `added`/`removed` lifecycle callbacks.
    fn set_notified_about_add_or_remove(&self, notify: bool);

    fn is_notified_about_add_or_remove(&self) -> bool;

    fn debug_dump(&self, indent: &str) -> String;

    // Optional operations. Implementations without them keep the defaults.

    fn entry_references(&self) -> Result<Vec<EntryId>, QueueError> {
        Err(self.not_implemented("entry_references"))
    }

    fn entries_matching(
        &self,
        _filter: &dyn Fn(&QueueEntry) -> bool,
    ) -> Result<Vec<Arc<QueueEntry>>, QueueError> {
        Err(self.not_implemented("entries_matching"))
    }

    fn remove_transient(&self) -> Result<u64, QueueError> {
        Err(self.not_implemented("remove_transient"))
    }

    fn peek_start_at(
        &self,
        _max_entries: i64,
        _max_bytes: i64,
        _first_exclusive: &QueueEntry,
    ) -> Result<Vec<Arc<QueueEntry>>, QueueError> {
        Err(self.not_implemented("peek_start_at"))
    }

    fn remove_head(&self, _to_entry: &QueueEntry) -> Result<u64, QueueError> {
        Err(self.not_implemented("remove_head"))
    }

    fn not_implemented(&self, operation: &'static str) -> QueueError {
        QueueError::NotImplemented {
            operation,
            queue_type: self.queue_type(),
        }
    }
}
