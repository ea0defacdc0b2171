use std::fmt;
use std::ops::Deref;

/// Destination identity of a queued operation, e.g. `client/joe/1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionName(pub String);

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionName {
    fn from(s: &str) -> Self {
        SessionName(s.to_owned())
    }
}

impl From<String> for SessionName {
    fn from(s: String) -> Self {
        SessionName(s)
    }
}

impl From<SessionName> for String {
    fn from(name: SessionName) -> Self {
        name.0
    }
}

impl AsRef<str> for SessionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for SessionName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
