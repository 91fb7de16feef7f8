//! Record normalizer
//!
//! Union-tagged decoders represent a nullable or polymorphic field as a
//! single-entry mapping keyed by the concrete branch type, e.g.
//! `{"name": {"string": "Alice"}}`. Normalization collapses those wrappers so
//! the payload serializes as plain JSON: `{"name": "Alice"}`.
//!
//! Which branches are collapsed is governed by [`UnionPolicy`]. Wrappers that
//! are not collapsed are recursed into. The root mapping itself is never
//! collapsed. The transformation is pure, total and idempotent.

use contracts::UnionPolicy;
use serde_json::{Map, Value};

/// Primitive union branch tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnionTag {
    String,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Bytes,
}

impl UnionTag {
    /// Recognize a mapping key as a branch tag
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "string" => Some(Self::String),
            "int" => Some(Self::Int),
            "long" => Some(Self::Long),
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            "boolean" => Some(Self::Boolean),
            "bytes" => Some(Self::Bytes),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Bytes => "bytes",
        }
    }

    /// Whether `policy` collapses branches of this tag
    pub fn is_collapsed_by(&self, policy: UnionPolicy) -> bool {
        match policy {
            UnionPolicy::StringOnly => matches!(self, Self::String),
            UnionPolicy::AllPrimitives => true,
        }
    }
}

/// Shape of a field value
#[derive(Debug)]
enum FieldShape {
    /// Single-entry mapping keyed by a recognized tag
    Branch(UnionTag, Value),
    Mapping(Map<String, Value>),
    Sequence(Vec<Value>),
    Scalar(Value),
}

impl FieldShape {
    fn classify(value: Value) -> Self {
        match value {
            Value::Object(map) => match branch_tag(&map) {
                Some(tag) => match map.into_iter().next() {
                    Some((_, inner)) => Self::Branch(tag, inner),
                    None => Self::Mapping(Map::new()),
                },
                None => Self::Mapping(map),
            },
            Value::Array(items) => Self::Sequence(items),
            scalar => Self::Scalar(scalar),
        }
    }
}

fn branch_tag(map: &Map<String, Value>) -> Option<UnionTag> {
    if map.len() != 1 {
        return None;
    }
    map.keys().next().and_then(|key| UnionTag::from_key(key))
}

/// Normalize with the default policy (string branches only)
pub fn normalize(value: Value) -> Value {
    normalize_with(value, UnionPolicy::default())
}

/// Normalize with an explicit union policy
pub fn normalize_with(value: Value, policy: UnionPolicy) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize_mapping(map, policy)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| normalize_with(item, policy))
                .collect(),
        ),
        scalar => scalar,
    }
}

fn normalize_mapping(map: Map<String, Value>, policy: UnionPolicy) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| (key, normalize_field(value, policy)))
        .collect()
}

fn normalize_field(value: Value, policy: UnionPolicy) -> Value {
    match FieldShape::classify(value) {
        FieldShape::Branch(tag, inner) if tag.is_collapsed_by(policy) => {
            normalize_field(inner, policy)
        }
        FieldShape::Branch(tag, inner) => {
            let mut wrapper = Map::with_capacity(1);
            wrapper.insert(tag.as_str().to_string(), normalize_field(inner, policy));
            Value::Object(wrapper)
        }
        FieldShape::Mapping(map) => Value::Object(normalize_mapping(map, policy)),
        FieldShape::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(|item| normalize_field(item, policy))
                .collect(),
        ),
        FieldShape::Scalar(scalar) => scalar,
    }
}
