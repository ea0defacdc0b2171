//! Identity generation for queue entries.
//!
//! Every entry carries an [`EntryId`] (final sort tie-break and removal
//! identity) and a [`Timestamp`] (secondary sort key). Both come from an
//! [`IdGenerator`] owned by the producer. Ids are drawn from one process-wide
//! counter so entries built by different generators never share a key.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

const NANOS_PER_MILLI: u64 = 1_000_000;

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl EntryId {
    pub fn from_raw(value: u64) -> Self {
        EntryId(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Nanoseconds since the epoch. Only the millisecond part is wall clock, the
/// rest is a counter that keeps values unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_nanos(nanos: u64) -> Self {
        Timestamp(nanos)
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn as_millis(self) -> u64 {
        self.0 / NANOS_PER_MILLI
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Hands out process-unique ids and timestamps that strictly increase per
/// generator.
#[derive(Debug)]
pub struct IdGenerator {
    last_timestamp: Mutex<u64>,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            last_timestamp: Mutex::new(0),
        }
    }

    #[inline]
    pub fn next_id(&self) -> EntryId {
        EntryId(NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns a timestamp greater than every one returned before, even if
    /// the wall clock steps backwards.
    pub fn next_timestamp(&self) -> Timestamp {
        let now = current_millis().saturating_mul(NANOS_PER_MILLI);
        let mut last = self.last_timestamp.lock();
        let next = if now > *last { now } else { *last + 1 };
        *last = next;
        Timestamp(next)
    }

    pub fn next(&self) -> (EntryId, Timestamp) {
        (self.next_id(), self.next_timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn timestamps_strictly_increase() {
        let ids = IdGenerator::new();
        let mut prev = ids.next_timestamp();
        for _ in 0..10_000 {
            let ts = ids.next_timestamp();
            assert!(ts > prev);
            prev = ts;
        }
    }

    #[test]
    fn ids_unique_across_threads() {
        let ids = Arc::new(IdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = ids.clone();
                thread::spawn(move || (0..1000).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<EntryId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 4000);
    }

    #[test]
    fn ids_unique_across_generators() {
        let a = IdGenerator::new();
        let b = IdGenerator::new();
        let (id_a, _) = a.next();
        let (id_b, _) = b.next();
        assert_ne!(id_a, id_b);
        assert!(b.next_id() > id_b);
    }
}
