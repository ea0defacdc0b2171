use std::fmt;

use crate::core::error::QueueError;

/// Scheduling weight of a queued operation, higher drains first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    pub const MIN: Priority = Priority(0);
    pub const LOW: Priority = Priority(3);
    pub const NORM: Priority = Priority(5);
    pub const HIGH: Priority = Priority(7);
    pub const MAX: Priority = Priority(9);

    pub fn new(value: i64) -> Result<Self, QueueError> {
        if (0..=9).contains(&value) {
            Ok(Priority(value as u8))
        } else {
            Err(QueueError::InvalidPriority(value))
        }
    }

    #[inline]
    pub fn value(self) -> i32 {
        self.0 as i32
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::NORM
    }
}

impl TryFrom<i32> for Priority {
    type Error = QueueError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Priority::new(value as i64)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            0 => "MIN",
            3 => "LOW",
            5 => "NORM",
            7 => "HIGH",
            9 => "MAX",
            _ => return write!(f, "{}", self.0),
        };
        f.write_str(name)
    }
}
