use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::QueueError;

/// Scope identifier of one queue instance, e.g. `connection:client/joe/1`.
///
/// Cheap to clone; never used for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageId {
    id: Arc<str>,
    relating_len: usize,
}

impl StorageId {
    /// Builds `relating:postfix`. Both parts are trimmed and must not be empty.
    pub fn new(relating: &str, postfix: &str) -> Result<Self, QueueError> {
        let relating = relating.trim();
        let postfix = postfix.trim();
        if relating.is_empty() || postfix.is_empty() {
            return Err(QueueError::Configuration(format!(
                "illegal storage id, relating='{relating}' postfix='{postfix}'"
            )));
        }
        Ok(Self {
            id: Arc::from(format!("{relating}:{postfix}")),
            relating_len: relating.len(),
        })
    }

    /// Mints a fresh id under `relating` with a random postfix.
    pub fn unique(relating: &str) -> Result<Self, QueueError> {
        Self::new(relating, &Uuid::new_v4().to_string())
    }

    /// Parses `relating:postfix`; a string without a colon is taken as a
    /// bare postfix relating to `queue`.
    pub fn parse(raw: &str) -> Result<Self, QueueError> {
        match raw.split_once(':') {
            Some((relating, postfix)) => Self::new(relating, postfix),
            None => Self::new("queue", raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn relating(&self) -> &str {
        &self.id[..self.relating_len]
    }

    pub fn postfix(&self) -> &str {
        &self.id[self.relating_len + 1..]
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl AsRef<str> for StorageId {
    fn as_ref(&self) -> &str {
        &self.id
    }
}
