//! Encoding descriptor - SchemaResolver output
//!
//! Fetched once per consumer at startup, never mutated afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire encoding kind registered for a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EncodingKind {
    /// Union-tagged binary encoding (the only kind the pipeline decodes)
    #[default]
    Avro,
    Protobuf,
    Json,
}

impl EncodingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avro => "AVRO",
            Self::Protobuf => "PROTOBUF",
            Self::Json => "JSON",
        }
    }

    /// Parse the registry's `schemaType` field
    ///
    /// Registries omit the field for Avro subjects.
    pub fn from_registry(schema_type: Option<&str>) -> Option<Self> {
        match schema_type.map(str::to_ascii_uppercase).as_deref() {
            None | Some("AVRO") => Some(Self::Avro),
            Some("PROTOBUF") => Some(Self::Protobuf),
            Some("JSON") => Some(Self::Json),
            Some(_) => None,
        }
    }

    /// Whether the pipeline can decode records of this kind
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Avro)
    }
}

impl fmt::Display for EncodingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema registered under a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingDescriptor {
    /// Registry subject, typically the topic name
    pub subject: String,

    /// Registry-wide schema id
    pub id: i32,

    /// Version of the schema under its subject
    pub version: i32,

    /// Encoding kind
    pub kind: EncodingKind,

    /// Full schema text
    pub schema: String,
}

impl EncodingDescriptor {
    pub fn new(subject: impl Into<String>, kind: EncodingKind, schema: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            id: 0,
            version: 0,
            kind,
            schema: schema.into(),
        }
    }

    /// Encoding kind accessor
    pub fn kind(&self) -> EncodingKind {
        self.kind
    }
}
