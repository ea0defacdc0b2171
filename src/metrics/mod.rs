use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::queue::{QueueSize, SizeListener, StorageQueue};

/// Occupancy counters of one queue, fed by size notifications.
///
/// Register it with [`StorageQueue::add_size_listener`]. Counters are
/// coarse-grained and updated with relaxed ordering.
#[derive(Debug, Default)]
pub struct QueueMetrics {
    notifications: AtomicU64,
    entries: AtomicU64,
    bytes: AtomicU64,
    persistent_entries: AtomicU64,
    persistent_bytes: AtomicU64,
    peak_entries: AtomicU64,
    peak_bytes: AtomicU64,
}

impl QueueMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }

    /// Last reported size. `shutdown` is always `false`.
    pub fn last(&self) -> QueueSize {
        QueueSize {
            entries: self.entries.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            persistent_entries: self.persistent_entries.load(Ordering::Relaxed),
            persistent_bytes: self.persistent_bytes.load(Ordering::Relaxed),
            shutdown: false,
        }
    }

    #[inline]
    pub fn peak_entries(&self) -> u64 {
        self.peak_entries.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn peak_bytes(&self) -> u64 {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    fn record(&self, size: QueueSize) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
        self.entries.store(size.entries, Ordering::Relaxed);
        self.bytes.store(size.bytes, Ordering::Relaxed);
        self.persistent_entries
            .store(size.persistent_entries, Ordering::Relaxed);
        self.persistent_bytes
            .store(size.persistent_bytes, Ordering::Relaxed);
        self.peak_entries.fetch_max(size.entries, Ordering::Relaxed);
        self.peak_bytes.fetch_max(size.bytes, Ordering::Relaxed);
    }

    /// Prometheus-style text, one `failsafe_queue_*` sample per line labelled
    /// with `storage`.
    pub fn snapshot(&self, storage: &str) -> String {
        let last = self.last();
        let mut out = String::new();
        for (name, value) in [
            ("notifications", self.notifications()),
            ("entries", last.entries),
            ("bytes", last.bytes),
            ("persistent_entries", last.persistent_entries),
            ("persistent_bytes", last.persistent_bytes),
            ("peak_entries", self.peak_entries()),
            ("peak_bytes", self.peak_bytes()),
        ] {
            let _ = writeln!(out, "failsafe_queue_{name}{{storage=\"{storage}\"}} {value}");
        }
        out
    }
}

impl SizeListener for QueueMetrics {
    fn size_changed(&self, _queue: &dyn StorageQueue, size: QueueSize) {
        self.record(size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peaks_survive_shrinking() {
        let m = QueueMetrics::new();
        m.record(QueueSize {
            entries: 3,
            bytes: 300,
            ..QueueSize::default()
        });
        m.record(QueueSize {
            entries: 1,
            bytes: 100,
            ..QueueSize::default()
        });
        assert_eq!(m.notifications(), 2);
        assert_eq!(m.last().entries, 1);
        assert_eq!(m.peak_entries(), 3);
        assert_eq!(m.peak_bytes(), 300);
    }

    #[test]
    fn snapshot_format() {
        let m = QueueMetrics::new();
        m.record(QueueSize {
            entries: 2,
            bytes: 210,
            persistent_entries: 1,
            persistent_bytes: 100,
            shutdown: false,
        });
        let text = m.snapshot("connection:joe");
        assert!(text.contains("failsafe_queue_entries{storage=\"connection:joe\"} 2\n"));
        assert!(text.contains("failsafe_queue_persistent_bytes{storage=\"connection:joe\"} 100\n"));
        assert_eq!(text.lines().count(), 7);
    }
}
