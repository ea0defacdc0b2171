pub mod entry;
pub mod error;
pub mod priority;
pub mod queue;
pub mod session;
pub mod storage_id;
pub mod timestamp;
