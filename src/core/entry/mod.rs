//! Queue entries: one pending broker operation each.
//!
//! An entry is immutable once built, apart from a few transient flags the
//! queue and the dispatcher maintain (`stored`, the receiver, counters).
//! Entries are shared as `Arc<QueueEntry>` between producer, queue and
//! consumer.

pub mod payload;

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use once_cell::sync::OnceCell;
use tracing::trace;

use crate::core::priority::Priority;
use crate::core::session::SessionName;
use crate::core::storage_id::StorageId;
use crate::core::timestamp::{EntryId, IdGenerator, Timestamp};

pub use payload::{EntryPayload, KeyQos, MethodKind, MsgUnit};

/// Fixed per-entry overhead added to the payload size.
pub const ENTRY_OVERHEAD_BYTES: u64 = 100;

/// Sort key of an entry: priority descending, then older first, then id.
///
/// Distinct entries never compare equal, so the key can index an ordered map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub priority: Priority,
    pub created_at: Timestamp,
    pub id: EntryId,
}

impl Ord for EntryKey {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for EntryKey {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
pub struct QueueEntry {
    key: EntryKey,
    persistent: bool,
    size_in_bytes: u64,
    payload: EntryPayload,
    receiver: OnceCell<SessionName>,
    stored: AtomicBool,
    references: AtomicU32,
    redeliver_counter: AtomicU32,
}

impl QueueEntry {
    /// Creates an entry with a fresh id and creation timestamp.
    pub fn new(
        ids: &IdGenerator,
        priority: Priority,
        persistent: bool,
        payload: EntryPayload,
    ) -> Self {
        let (id, created_at) = ids.next();
        Self::with_identity(id, created_at, priority, persistent, payload)
    }

    /// Creates an entry with a known identity, e.g. when restoring from a
    /// durable store.
    pub fn with_identity(
        id: EntryId,
        created_at: Timestamp,
        priority: Priority,
        persistent: bool,
        payload: EntryPayload,
    ) -> Self {
        let size_in_bytes = ENTRY_OVERHEAD_BYTES + payload.size_in_bytes();
        Self {
            key: EntryKey {
                priority,
                created_at,
                id,
            },
            persistent,
            size_in_bytes,
            payload,
            receiver: OnceCell::new(),
            stored: AtomicBool::new(false),
            references: AtomicU32::new(0),
            redeliver_counter: AtomicU32::new(0),
        }
    }

    /// An unstored copy with the same identity, payload and receiver.
    ///
    /// The copy collides with the original in any queue, so it can only be
    /// admitted where the original is not stored.
    pub fn snapshot(&self) -> Self {
        let copy = Self {
            key: self.key,
            persistent: self.persistent,
            size_in_bytes: self.size_in_bytes,
            payload: self.payload.clone(),
            receiver: OnceCell::new(),
            stored: AtomicBool::new(false),
            references: AtomicU32::new(0),
            redeliver_counter: AtomicU32::new(self.redeliver_counter()),
        };
        if let Some(receiver) = self.receiver.get() {
            let _ = copy.receiver.set(receiver.clone());
        }
        copy
    }

    #[inline]
    pub fn key(&self) -> EntryKey {
        self.key
    }

    #[inline]
    pub fn id(&self) -> EntryId {
        self.key.id
    }

    #[inline]
    pub fn priority(&self) -> Priority {
        self.key.priority
    }

    #[inline]
    pub fn created_at(&self) -> Timestamp {
        self.key.created_at
    }

    #[inline]
    pub fn method(&self) -> MethodKind {
        self.payload.method_kind()
    }

    #[inline]
    pub fn size_in_bytes(&self) -> u64 {
        self.size_in_bytes
    }

    #[inline]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn payload(&self) -> &EntryPayload {
        &self.payload
    }

    pub fn key_oid(&self) -> Option<&str> {
        self.payload.key_oid()
    }

    pub fn receiver(&self) -> Option<&SessionName> {
        self.receiver.get()
    }

    /// Sets the destination once. Returns `false` if one was already set.
    pub fn set_receiver(&self, receiver: SessionName) -> bool {
        self.receiver.set(receiver).is_ok()
    }

    pub fn is_stored(&self) -> bool {
        self.stored.load(Ordering::Acquire)
    }

    /// Claims storage membership. Fails if the entry is already stored.
    pub(crate) fn mark_stored(&self) -> bool {
        self.stored
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn mark_unstored(&self) {
        self.stored.store(false, Ordering::Release);
    }

    /// Lifecycle callback, invoked by a queue after admission.
    pub fn added(&self, storage_id: &StorageId) {
        let refs = self.references.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(entry = %self, storage = %storage_id, refs, "entry added");
    }

    /// Lifecycle callback, invoked by a queue after removal.
    pub fn removed(&self, storage_id: &StorageId) {
        let refs = self
            .references
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |r| Some(r.saturating_sub(1)))
            .map(|prev| prev.saturating_sub(1))
            .unwrap_or(0);
        trace!(entry = %self, storage = %storage_id, refs, "entry removed");
    }

    /// Number of queues that reported this entry as added and not yet removed.
    pub fn reference_count(&self) -> u32 {
        self.references.load(Ordering::Acquire)
    }

    /// Counts a failed delivery attempt.
    pub fn incr_redeliver_counter(&self) -> u32 {
        self.redeliver_counter.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn redeliver_counter(&self) -> u32 {
        self.redeliver_counter.load(Ordering::Acquire)
    }

    /// Identifier for log output, e.g. `publish/HIGH/1700000000000000001/hello`.
    pub fn log_id(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.method(),
            self.priority(),
            self.created_at(),
            self.key_oid().unwrap_or("")
        )
    }
}

impl fmt::Display for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.log_id())
    }
}
