//! failsafe-queue – the client-side failsafe queue of a pub/sub broker client.
//!
//! While the broker connection is down, pending operations (connect, publish,
//! subscribe, ...) are buffered in a bounded, priority and time ordered queue
//! and replayed in order once the connection is back.
//!
//! This crate exports
//!  * `core`    – entries, the `StorageQueue` trait, the RAM queue, manager
//!  * `config`  – TOML/YAML driven queue configuration with env overrides
//!  * `logging` – `tracing` subscriber setup
//!  * `metrics` – a size listener keeping occupancy counters

// ───────────────────────────────────────────────────────────
// Public modules
// ───────────────────────────────────────────────────────────
pub mod config;
pub mod core;
pub mod logging;
pub mod metrics;

// ───────────────────────────────────────────────────────────
// Re-exports
// ───────────────────────────────────────────────────────────
pub use config::{load_config, Config, ConfigError, QueueConfig};
pub use crate::core::entry::{EntryKey, EntryPayload, KeyQos, MethodKind, MsgUnit, QueueEntry};
pub use crate::core::error::{OverflowDimension, QueueError};
pub use crate::core::priority::Priority;
pub use crate::core::queue::{
    PutInterceptor, QueueManager, QueuePluginRegistry, QueueSize, RamQueue, ReturnHolder,
    SizeListener, StorageQueue, WatchSizeListener,
};
pub use crate::core::session::SessionName;
pub use crate::core::storage_id::StorageId;
pub use crate::core::timestamp::{EntryId, IdGenerator, Timestamp};
pub use metrics::QueueMetrics;
