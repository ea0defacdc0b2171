use std::fmt;

use thiserror::Error;

/// Which capacity bound a rejected `put` ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowDimension {
    Entries,
    Bytes,
}

impl fmt::Display for OverflowDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowDimension::Entries => f.write_str("entries"),
            OverflowDimension::Bytes => f.write_str("bytes"),
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("invalid queue configuration: {0}")]
    Configuration(String),

    #[error("queue '{storage_id}' overflow ({dimension}): {current} in queue, limit is {limit}")]
    Overflow {
        storage_id: String,
        dimension: OverflowDimension,
        current: u64,
        limit: u64,
    },

    #[error("queue '{storage_id}' is shut down, no message access is possible")]
    Shutdown { storage_id: String },

    #[error("queue '{storage_id}' already has a put interceptor registered")]
    AlreadyRegistered { storage_id: String },

    #[error("{operation}() is not implemented by the {queue_type} queue")]
    NotImplemented {
        operation: &'static str,
        queue_type: &'static str,
    },

    #[error("priority {0} is outside of [0, 9]")]
    InvalidPriority(i64),
}

impl QueueError {
    /// The overflowed dimension, if this is a capacity violation.
    pub fn overflow_dimension(&self) -> Option<OverflowDimension> {
        match self {
            QueueError::Overflow { dimension, .. } => Some(*dimension),
            _ => None,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, QueueError::Shutdown { .. })
    }
}
