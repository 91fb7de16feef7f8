//! Record decoding: kind check, shape check, normalization

use bytes::Bytes;
use contracts::{ContractError, DecodedMessage, EncodingDescriptor, RawRecord, UnionPolicy};
use serde_json::Value;

use crate::normalizer::normalize_with;

/// Decode one raw record into a sink-ready message
///
/// # Errors
/// - `ContractError::UnexpectedData`: the descriptor's kind is not decodable
/// - `ContractError::DeserializationFailed`: the value is not a mapping
pub fn decode(
    record: &RawRecord,
    descriptor: &EncodingDescriptor,
    topic: &str,
    policy: UnionPolicy,
) -> Result<DecodedMessage, ContractError> {
    let kind = descriptor.kind();
    if !kind.is_supported() {
        return Err(ContractError::UnexpectedData { kind });
    }

    if !record.value.is_object() {
        return Err(ContractError::DeserializationFailed {
            found: value_kind(&record.value),
        });
    }

    let normalized = normalize_with(record.value.clone(), policy);
    let payload = serde_json::to_vec(&normalized)?;

    Ok(DecodedMessage {
        key: record.key_str().into_owned(),
        topic: topic.to_string(),
        payload: Bytes::from(payload),
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::EncodingKind;
    use serde_json::json;

    fn avro() -> EncodingDescriptor {
        EncodingDescriptor::new("customers", EncodingKind::Avro, "{}")
    }

    #[test]
    fn decodes_string_branches_into_plain_json() {
        let record = RawRecord::new("42", json!({"name": {"string": "Alice"}}));
        let message = decode(&record, &avro(), "customers", UnionPolicy::StringOnly).unwrap();

        assert_eq!(message.key, "42");
        assert_eq!(message.topic, "customers");
        assert_eq!(message.payload_str(), Some(r#"{"name":"Alice"}"#));
    }

    #[test]
    fn unsupported_kind_is_unexpected_data() {
        let descriptor = EncodingDescriptor::new("customers", EncodingKind::Protobuf, "");
        let record = RawRecord::new("42", json!({"name": "Alice"}));

        let err = decode(&record, &descriptor, "customers", UnionPolicy::StringOnly).unwrap_err();
        assert!(matches!(
            err,
            ContractError::UnexpectedData {
                kind: EncodingKind::Protobuf
            }
        ));
    }

    #[test]
    fn non_mapping_value_fails_deserialization() {
        for (value, found) in [
            (json!("bare"), "string"),
            (json!(7), "number"),
            (json!([1]), "array"),
            (json!(null), "null"),
        ] {
            let record = RawRecord::new("42", value);
            let err = decode(&record, &avro(), "customers", UnionPolicy::StringOnly).unwrap_err();
            match err {
                ContractError::DeserializationFailed { found: actual } => assert_eq!(actual, found),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn kind_is_checked_before_shape() {
        let descriptor = EncodingDescriptor::new("customers", EncodingKind::Json, "");
        let record = RawRecord::new("42", json!("bare"));
        let err = decode(&record, &descriptor, "customers", UnionPolicy::StringOnly).unwrap_err();
        assert!(matches!(err, ContractError::UnexpectedData { .. }));
    }
}
