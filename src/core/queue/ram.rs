//! Transient in-memory queue backed by an ordered map.
//!
//! One mutex guards the store, the counters and the shutdown flag. Listener,
//! interceptor and entry lifecycle callbacks always run after it is released.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::core::entry::{EntryKey, QueueEntry};
use crate::core::error::{OverflowDimension, QueueError};
use crate::core::queue::listener::SizeListeners;
use crate::core::queue::{PutInterceptor, QueueSize, ReturnHolder, SizeListener, StorageQueue};
use crate::core::storage_id::StorageId;

pub const RAM_QUEUE_TYPE: &str = "RAM";
pub const RAM_QUEUE_VERSION: &str = "1.0";

struct Inner {
    config: QueueConfig,
    store: BTreeMap<EntryKey, Arc<QueueEntry>>,
    bytes: u64,
    persistent_entries: u64,
    persistent_bytes: u64,
    shutdown: bool,
}

impl Inner {
    fn size(&self) -> QueueSize {
        QueueSize {
            entries: self.store.len() as u64,
            bytes: self.bytes,
            persistent_entries: self.persistent_entries,
            persistent_bytes: self.persistent_bytes,
            shutdown: self.shutdown,
        }
    }

    fn check_capacity(&self, storage_id: &StorageId) -> Result<(), QueueError> {
        let entries = self.store.len() as u64;
        if entries >= self.config.max_entries {
            return Err(QueueError::Overflow {
                storage_id: storage_id.to_string(),
                dimension: OverflowDimension::Entries,
                current: entries,
                limit: self.config.max_entries,
            });
        }
        // Compared before insertion: the entry that crosses the byte bound is
        // still admitted, only the next put is refused.
        if self.bytes > self.config.max_bytes {
            return Err(QueueError::Overflow {
                storage_id: storage_id.to_string(),
                dimension: OverflowDimension::Bytes,
                current: self.bytes,
                limit: self.config.max_bytes,
            });
        }
        Ok(())
    }

    fn insert(&mut self, entry: &Arc<QueueEntry>, storage_id: &StorageId) -> bool {
        let key = entry.key();
        if self.store.contains_key(&key) {
            warn!(storage = %storage_id, entry = %entry, "entry is already queued, ignoring put");
            return false;
        }
        if !entry.mark_stored() {
            warn!(storage = %storage_id, entry = %entry, "entry is stored in another queue, ignoring put");
            return false;
        }
        let size = entry.size_in_bytes();
        self.store.insert(key, Arc::clone(entry));
        self.bytes += size;
        if entry.is_persistent() {
            self.persistent_entries += 1;
            self.persistent_bytes += size;
        }
        true
    }

    fn remove_key(&mut self, key: &EntryKey) -> Option<Arc<QueueEntry>> {
        let entry = self.store.remove(key)?;
        entry.mark_unstored();
        let size = entry.size_in_bytes();
        self.bytes = self.bytes.saturating_sub(size);
        if entry.is_persistent() {
            self.persistent_entries = self.persistent_entries.saturating_sub(1);
            self.persistent_bytes = self.persistent_bytes.saturating_sub(size);
        }
        Some(entry)
    }

    fn remove_all(&mut self, entries: &[Arc<QueueEntry>]) {
        for entry in entries {
            self.remove_key(&entry.key());
        }
    }

    fn select_range(
        &self,
        max_entries: i64,
        max_bytes: i64,
        mut min_priority: i32,
        mut max_priority: i32,
    ) -> ReturnHolder {
        let mut ret = ReturnHolder::default();
        for entry in self.store.values() {
            if max_entries >= 0 && ret.count_entries >= max_entries as u64 {
                break;
            }
            let size = entry.size_in_bytes();
            // The first match is returned even when it alone exceeds the limit.
            if max_bytes >= 0 && ret.count_entries > 0 && ret.count_bytes + size > max_bytes as u64
            {
                break;
            }
            let prio = entry.priority().value();
            if min_priority < 0 {
                min_priority = prio;
                max_priority = prio;
            }
            // Priorities never increase in scan order.
            if prio < min_priority {
                break;
            }
            if prio <= max_priority {
                ret.push(Arc::clone(entry));
            }
        }
        ret
    }

    fn select_lowest(
        &self,
        max_entries: i64,
        max_bytes: i64,
        boundary: Option<&QueueEntry>,
        leave_one: bool,
    ) -> Vec<Arc<QueueEntry>> {
        let boundary = boundary.map(QueueEntry::key);
        let mut selected = Vec::new();
        let mut count = 0u64;
        let mut bytes = 0u64;
        for (key, entry) in self.store.iter().rev() {
            if !inside_range(count, max_entries, bytes, max_bytes) {
                break;
            }
            if boundary.is_some_and(|b| b >= *key) {
                break;
            }
            bytes += entry.size_in_bytes();
            count += 1;
            selected.push(Arc::clone(entry));
        }
        if leave_one && !selected.is_empty() && selected.len() == self.store.len() {
            selected.pop();
        }
        selected
    }

    fn recount(&self) -> QueueSize {
        let mut size = QueueSize {
            shutdown: self.shutdown,
            ..QueueSize::default()
        };
        for entry in self.store.values() {
            size.entries += 1;
            size.bytes += entry.size_in_bytes();
            if entry.is_persistent() {
                size.persistent_entries += 1;
                size.persistent_bytes += entry.size_in_bytes();
            }
        }
        size
    }
}

/// Whether a tail walk may take one more entry. Negative limits are
/// unbounded; with both limits set the less restrictive one wins.
fn inside_range(count: u64, max_entries: i64, bytes: u64, max_bytes: i64) -> bool {
    match (max_entries < 0, max_bytes < 0) {
        (true, true) => true,
        (true, false) => bytes < max_bytes as u64,
        (false, true) => count < max_entries as u64,
        (false, false) => count < max_entries as u64 || bytes < max_bytes as u64,
    }
}

fn validate(config: &QueueConfig) -> Result<(), QueueError> {
    if config.max_entries > i32::MAX as u64 {
        return Err(QueueError::Configuration(format!(
            "max_entries {} exceeds the supported maximum of {}",
            config.max_entries,
            i32::MAX
        )));
    }
    Ok(())
}

/// The `RAM` / `1.0` queue plugin.
pub struct RamQueue {
    storage_id: StorageId,
    inner: Mutex<Inner>,
    listeners: SizeListeners,
    interceptor: RwLock<Option<Arc<dyn PutInterceptor>>>,
    notify_add_remove: AtomicBool,
}

impl RamQueue {
    /// Creates a queue for `storage_id`.
    ///
    /// Fails when no configuration is given or its limits are unsupported.
    /// An empty storage id cannot be constructed in the first place.
    pub fn initialize(
        storage_id: StorageId,
        config: Option<QueueConfig>,
    ) -> Result<Self, QueueError> {
        let config = config.ok_or_else(|| {
            QueueError::Configuration(format!("no queue configuration given for '{storage_id}'"))
        })?;
        validate(&config)?;
        debug!(
            storage = %storage_id,
            max_entries = config.max_entries,
            max_bytes = config.max_bytes,
            "initialized RAM queue"
        );
        Ok(Self {
            storage_id,
            notify_add_remove: AtomicBool::new(config.notify_add_remove),
            inner: Mutex::new(Inner {
                config,
                store: BTreeMap::new(),
                bytes: 0,
                persistent_entries: 0,
                persistent_bytes: 0,
                shutdown: false,
            }),
            listeners: SizeListeners::default(),
            interceptor: RwLock::new(None),
        })
    }

    pub fn new(storage_id: StorageId, config: QueueConfig) -> Result<Self, QueueError> {
        Self::initialize(storage_id, Some(config))
    }

    fn shutdown_error(&self) -> QueueError {
        QueueError::Shutdown {
            storage_id: self.storage_id.to_string(),
        }
    }

    fn notify_enabled(&self) -> bool {
        self.notify_add_remove.load(Ordering::Acquire)
    }

    fn after_removal(&self, removed: &[Arc<QueueEntry>], size: QueueSize) {
        if self.notify_enabled() {
            for entry in removed {
                entry.removed(&self.storage_id);
            }
        }
        self.listeners.notify(self, size);
    }

    fn take_selected(
        &self,
        select: impl FnOnce(&Inner) -> Vec<Arc<QueueEntry>>,
    ) -> Result<Vec<Arc<QueueEntry>>, QueueError> {
        let (taken, size) = {
            let mut inner = self.inner.lock();
            if inner.shutdown {
                return Err(self.shutdown_error());
            }
            let taken = select(&*inner);
            inner.remove_all(&taken);
            (taken, inner.size())
        };
        debug!(storage = %self.storage_id, taken = taken.len(), remaining = size.entries, "took entries");
        self.after_removal(&taken, size);
        Ok(taken)
    }
}

impl StorageQueue for RamQueue {
    fn storage_id(&self) -> &StorageId {
        &self.storage_id
    }

    fn queue_type(&self) -> &'static str {
        RAM_QUEUE_TYPE
    }

    fn version(&self) -> &'static str {
        RAM_QUEUE_VERSION
    }

    fn is_transient(&self) -> bool {
        true
    }

    fn config(&self) -> QueueConfig {
        self.inner.lock().config.clone()
    }

    fn set_config(&self, config: QueueConfig) -> Result<(), QueueError> {
        validate(&config)?;
        self.notify_add_remove
            .store(config.notify_add_remove, Ordering::Release);
        let mut inner = self.inner.lock();
        let old = &inner.config;
        if old.max_entries != config.max_entries || old.max_bytes != config.max_bytes {
            info!(
                storage = %self.storage_id,
                old_max_entries = old.max_entries,
                max_entries = config.max_entries,
                old_max_bytes = old.max_bytes,
                max_bytes = config.max_bytes,
                "queue capacity changed"
            );
        }
        inner.config = config;
        Ok(())
    }

    fn put(&self, entry: Arc<QueueEntry>, bypass_interceptor: bool) -> Result<(), QueueError> {
        self.put_all(std::slice::from_ref(&entry), bypass_interceptor)
    }

    fn put_all(
        &self,
        entries: &[Arc<QueueEntry>],
        bypass_interceptor: bool,
    ) -> Result<(), QueueError> {
        if entries.is_empty() {
            return Ok(());
        }
        if self.is_shutdown() {
            return Err(self.shutdown_error());
        }

        let interceptor = if bypass_interceptor {
            None
        } else {
            self.interceptor.read().clone()
        };
        if let Some(interceptor) = &interceptor {
            if !interceptor.pre_put(entries) {
                debug!(storage = %self.storage_id, count = entries.len(), "put vetoed by interceptor");
                return Ok(());
            }
        }

        let (admitted, size) = {
            let mut inner = self.inner.lock();
            if inner.shutdown {
                return Err(self.shutdown_error());
            }
            if let Err(e) = inner.check_capacity(&self.storage_id) {
                warn!(storage = %self.storage_id, error = %e, "rejecting put");
                return Err(e);
            }
            let admitted: Vec<Arc<QueueEntry>> = entries
                .iter()
                .filter(|entry| inner.insert(entry, &self.storage_id))
                .cloned()
                .collect();
            (admitted, inner.size())
        };

        if self.notify_enabled() {
            for entry in &admitted {
                entry.added(&self.storage_id);
            }
        }
        self.listeners.notify(self, size);
        if let Some(interceptor) = &interceptor {
            if !admitted.is_empty() {
                interceptor.post_put(&admitted);
            }
        }
        Ok(())
    }

    fn peek(&self) -> Option<Arc<QueueEntry>> {
        self.inner.lock().store.values().next().cloned()
    }

    fn peek_range(
        &self,
        max_entries: i64,
        max_bytes: i64,
        min_priority: i32,
        max_priority: i32,
    ) -> ReturnHolder {
        self.inner
            .lock()
            .select_range(max_entries, max_bytes, min_priority, max_priority)
    }

    fn take_range(
        &self,
        max_entries: i64,
        max_bytes: i64,
        min_priority: i32,
        max_priority: i32,
    ) -> Result<Vec<Arc<QueueEntry>>, QueueError> {
        self.take_selected(|inner| {
            inner
                .select_range(max_entries, max_bytes, min_priority, max_priority)
                .entries
        })
    }

    fn take_lowest(
        &self,
        max_entries: i64,
        max_bytes: i64,
        boundary: Option<&QueueEntry>,
        leave_one: bool,
    ) -> Result<Vec<Arc<QueueEntry>>, QueueError> {
        self.take_selected(|inner| inner.select_lowest(max_entries, max_bytes, boundary, leave_one))
    }

    fn peek_lowest(
        &self,
        max_entries: i64,
        max_bytes: i64,
        boundary: Option<&QueueEntry>,
        leave_one: bool,
    ) -> Vec<Arc<QueueEntry>> {
        self.inner
            .lock()
            .select_lowest(max_entries, max_bytes, boundary, leave_one)
    }

    fn remove_exact_batch(&self, entries: &[Arc<QueueEntry>]) -> Vec<bool> {
        if entries.is_empty() {
            return Vec::new();
        }
        let (results, removed, size) = {
            let mut inner = self.inner.lock();
            let mut results = Vec::with_capacity(entries.len());
            let mut removed = Vec::new();
            for entry in entries {
                match inner.remove_key(&entry.key()) {
                    Some(stored) => {
                        results.push(true);
                        removed.push(stored);
                    }
                    None => results.push(false),
                }
            }
            (results, removed, inner.size())
        };
        self.after_removal(&removed, size);
        results
    }

    fn remove_up_to(&self, boundary: &QueueEntry, inclusive: bool) -> u64 {
        let bound = boundary.key();
        let (removed, size) = {
            let mut inner = self.inner.lock();
            let keys: Vec<EntryKey> = if inclusive {
                inner.store.range(..=bound).map(|(k, _)| *k).collect()
            } else {
                inner.store.range(..bound).map(|(k, _)| *k).collect()
            };
            let removed: Vec<Arc<QueueEntry>> =
                keys.iter().filter_map(|k| inner.remove_key(k)).collect();
            (removed, inner.size())
        };
        self.after_removal(&removed, size);
        removed.len() as u64
    }

    fn clear(&self) -> u64 {
        let (removed, size) = {
            let mut inner = self.inner.lock();
            let store = mem::take(&mut inner.store);
            inner.bytes = 0;
            inner.persistent_entries = 0;
            inner.persistent_bytes = 0;
            let removed: Vec<Arc<QueueEntry>> = store.into_values().collect();
            for entry in &removed {
                entry.mark_unstored();
            }
            (removed, inner.size())
        };
        debug!(storage = %self.storage_id, cleared = removed.len(), "queue cleared");
        self.after_removal(&removed, size);
        removed.len() as u64
    }

    fn shutdown(&self) {
        let size = {
            let mut inner = self.inner.lock();
            if inner.shutdown {
                return;
            }
            inner.shutdown = true;
            inner.size()
        };
        if size.entries > 0 {
            warn!(
                storage = %self.storage_id,
                entries = size.entries,
                bytes = size.bytes,
                "shutting down queue with pending entries"
            );
        }
        self.listeners.notify(self, size);
        self.listeners.clear();
        debug!(storage = %self.storage_id, "queue shut down");
    }

    fn is_shutdown(&self) -> bool {
        self.inner.lock().shutdown
    }

    fn size(&self) -> QueueSize {
        self.inner.lock().size()
    }

    fn recount(&self) -> QueueSize {
        self.inner.lock().recount()
    }

    fn add_size_listener(&self, listener: Arc<dyn SizeListener>) {
        self.listeners.add(listener);
    }

    fn remove_size_listener(&self, listener: &Arc<dyn SizeListener>) {
        self.listeners.remove(listener);
    }

    fn has_size_listener(&self, listener: &Arc<dyn SizeListener>) -> bool {
        self.listeners.contains(listener)
    }

    fn set_put_interceptor(&self, interceptor: Arc<dyn PutInterceptor>) -> Result<(), QueueError> {
        let mut slot = self.interceptor.write();
        if slot.is_some() {
            return Err(QueueError::AlreadyRegistered {
                storage_id: self.storage_id.to_string(),
            });
        }
        *slot = Some(interceptor);
        Ok(())
    }

    fn clear_put_interceptor(&self) {
        self.interceptor.write().take();
    }

    fn set_notified_about_add_or_remove(&self, notify: bool) {
        self.notify_add_remove.store(notify, Ordering::Release);
    }

    fn is_notified_about_add_or_remove(&self) -> bool {
        self.notify_enabled()
    }

    fn debug_dump(&self, indent: &str) -> String {
        let inner = self.inner.lock();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{indent}{} queue '{}' version {}",
            RAM_QUEUE_TYPE, self.storage_id, RAM_QUEUE_VERSION
        );
        let _ = writeln!(
            out,
            "{indent}  entries: {}/{}",
            inner.store.len(),
            inner.config.max_entries
        );
        let _ = writeln!(out, "{indent}  bytes: {}/{}", inner.bytes, inner.config.max_bytes);
        let _ = writeln!(
            out,
            "{indent}  persistent: {} entries, {} bytes",
            inner.persistent_entries, inner.persistent_bytes
        );
        let _ = writeln!(out, "{indent}  shutdown: {}", inner.shutdown);
        for entry in inner.store.values() {
            let _ = writeln!(out, "{indent}  - {} ({} bytes)", entry, entry.size_in_bytes());
        }
        out
    }
}

impl fmt::Debug for RamQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.size();
        f.debug_struct("RamQueue")
            .field("storage_id", &self.storage_id)
            .field("entries", &size.entries)
            .field("bytes", &size.bytes)
            .field("shutdown", &size.shutdown)
            .field("listeners", &self.listeners)
            .finish()
    }
}
