//! Bridges size notifications into async code.

use tokio::sync::watch;

use crate::core::queue::{QueueSize, SizeListener, StorageQueue};

/// Publishes every reported [`QueueSize`] on a `tokio::sync::watch` channel.
///
/// A dispatcher waiting for capacity can `changed().await` on a receiver
/// instead of polling the queue.
#[derive(Debug)]
pub struct WatchSizeListener {
    tx: watch::Sender<QueueSize>,
}

impl WatchSizeListener {
    pub fn new(initial: QueueSize) -> (Self, watch::Receiver<QueueSize>) {
        let (tx, rx) = watch::channel(initial);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> watch::Receiver<QueueSize> {
        self.tx.subscribe()
    }
}

impl SizeListener for WatchSizeListener {
    fn size_changed(&self, _queue: &dyn StorageQueue, size: QueueSize) {
        // send_replace never fails, even when every receiver is gone.
        self.tx.send_replace(size);
    }
}
