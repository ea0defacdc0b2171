//! Hooks a dispatcher can hang on a queue without touching its internals.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::entry::QueueEntry;
use crate::core::queue::{QueueSize, StorageQueue};

/// Observer of queue occupancy.
///
/// Called synchronously after every mutating operation, outside the queue's
/// lock. The reported size is the one the operation left behind; the queue
/// may have moved on by the time the listener reads it again.
pub trait SizeListener: Send + Sync {
    fn size_changed(&self, queue: &dyn StorageQueue, size: QueueSize);
}

/// Admission control around `put`.
///
/// Single puts are passed as a one element slice.
pub trait PutInterceptor: Send + Sync {
    /// Returning `false` drops the put silently, without error or mutation.
    fn pre_put(&self, entries: &[Arc<QueueEntry>]) -> bool;

    /// Called with the entries that were actually admitted.
    fn post_put(&self, entries: &[Arc<QueueEntry>]);
}

/// Registered size listeners of one queue.
#[derive(Default)]
pub(crate) struct SizeListeners {
    listeners: RwLock<Vec<Arc<dyn SizeListener>>>,
}

impl SizeListeners {
    /// Adding the same listener twice keeps one registration.
    pub(crate) fn add(&self, listener: Arc<dyn SizeListener>) {
        let mut listeners = self.listeners.write();
        if !listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            listeners.push(listener);
        }
    }

    pub(crate) fn remove(&self, listener: &Arc<dyn SizeListener>) {
        self.listeners.write().retain(|l| !Arc::ptr_eq(l, listener));
    }

    pub(crate) fn contains(&self, listener: &Arc<dyn SizeListener>) -> bool {
        self.listeners.read().iter().any(|l| Arc::ptr_eq(l, listener))
    }

    pub(crate) fn clear(&self) {
        self.listeners.write().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Invokes every listener on a copy of the registration list, so
    /// listeners may register or deregister from inside the callback.
    pub(crate) fn notify(&self, queue: &dyn StorageQueue, size: QueueSize) {
        let listeners: Vec<Arc<dyn SizeListener>> = self.listeners.read().clone();
        for listener in listeners {
            listener.size_changed(queue, size);
        }
    }
}

impl fmt::Debug for SizeListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizeListeners")
            .field("count", &self.len())
            .finish()
    }
}
