//! Record types flowing through the bridge

use std::borrow::Cow;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw record as delivered by the stream source
///
/// `value` is the decoded-but-untyped union-tagged tree produced by the
/// stream client. Immutable once received.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Opaque record key
    pub key: Bytes,

    /// Union-tagged value tree
    pub value: Value,

    /// Partition the record was read from (diagnostics only)
    pub partition: Option<i32>,

    /// Offset within the partition (diagnostics only)
    pub offset: Option<i64>,
}

impl RawRecord {
    pub fn new(key: impl Into<Bytes>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            partition: None,
            offset: None,
        }
    }

    /// Attach the partition/offset position
    pub fn at(mut self, partition: i32, offset: i64) -> Self {
        self.partition = Some(partition);
        self.offset = Some(offset);
        self
    }

    /// Key rendered as text (lossy for non UTF-8 keys)
    pub fn key_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }
}

/// Normalized, sink-ready representation of one consumed record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedMessage {
    /// Record key
    pub key: String,

    /// Topic the record was consumed from
    pub topic: String,

    /// Normalized value serialized as JSON
    pub payload: Bytes,
}

impl DecodedMessage {
    /// Payload as UTF-8 text
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
