//! Operation-specific data carried by a queue entry.
//!
//! Keys and QoS are kept as the opaque strings the client produced; the queue
//! never parses them.

use std::fmt;

use bytes::Bytes;

/// Broker method an entry replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Connect,
    Disconnect,
    Publish,
    PublishOneway,
    Subscribe,
    Unsubscribe,
    Get,
    Erase,
}

impl MethodKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MethodKind::Connect => "connect",
            MethodKind::Disconnect => "disconnect",
            MethodKind::Publish => "publish",
            MethodKind::PublishOneway => "publishOneway",
            MethodKind::Subscribe => "subscribe",
            MethodKind::Unsubscribe => "unSubscribe",
            MethodKind::Get => "get",
            MethodKind::Erase => "erase",
        }
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message: key, content and QoS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgUnit {
    pub key: String,
    pub content: Bytes,
    pub qos: String,
}

impl MsgUnit {
    pub fn new(key: impl Into<String>, content: impl Into<Bytes>, qos: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
            qos: qos.into(),
        }
    }

    pub fn size_in_bytes(&self) -> u64 {
        (self.key.len() + self.content.len() + self.qos.len()) as u64
    }
}

/// Key and QoS of a subscribe, unsubscribe, get or erase request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyQos {
    pub key: String,
    pub qos: String,
}

impl KeyQos {
    pub fn new(key: impl Into<String>, qos: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            qos: qos.into(),
        }
    }

    fn size_in_bytes(&self) -> u64 {
        (self.key.len() + self.qos.len()) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPayload {
    Connect { qos: String },
    Disconnect { qos: String },
    Publish(MsgUnit),
    PublishOneway(Vec<MsgUnit>),
    Subscribe(KeyQos),
    Unsubscribe(KeyQos),
    Get(KeyQos),
    Erase(KeyQos),
}

impl EntryPayload {
    pub fn method_kind(&self) -> MethodKind {
        match self {
            EntryPayload::Connect { .. } => MethodKind::Connect,
            EntryPayload::Disconnect { .. } => MethodKind::Disconnect,
            EntryPayload::Publish(_) => MethodKind::Publish,
            EntryPayload::PublishOneway(_) => MethodKind::PublishOneway,
            EntryPayload::Subscribe(_) => MethodKind::Subscribe,
            EntryPayload::Unsubscribe(_) => MethodKind::Unsubscribe,
            EntryPayload::Get(_) => MethodKind::Get,
            EntryPayload::Erase(_) => MethodKind::Erase,
        }
    }

    /// Bytes contributed by the embedded data, without per-entry overhead.
    pub fn size_in_bytes(&self) -> u64 {
        match self {
            EntryPayload::Connect { qos } | EntryPayload::Disconnect { qos } => qos.len() as u64,
            EntryPayload::Publish(unit) => unit.size_in_bytes(),
            EntryPayload::PublishOneway(units) => units.iter().map(MsgUnit::size_in_bytes).sum(),
            EntryPayload::Subscribe(kq)
            | EntryPayload::Unsubscribe(kq)
            | EntryPayload::Get(kq)
            | EntryPayload::Erase(kq) => kq.size_in_bytes(),
        }
    }

    /// The message key the operation addresses, if any.
    pub fn key_oid(&self) -> Option<&str> {
        match self {
            EntryPayload::Publish(unit) => Some(&unit.key),
            EntryPayload::PublishOneway(units) => units.first().map(|u| u.key.as_str()),
            EntryPayload::Subscribe(kq)
            | EntryPayload::Unsubscribe(kq)
            | EntryPayload::Get(kq)
            | EntryPayload::Erase(kq) => Some(&kq.key),
            EntryPayload::Connect { .. } | EntryPayload::Disconnect { .. } => None,
        }
    }
}
