//! Text ⇄ envelope conversion.

use serde::Serialize;
use serde_json::Value;

use crate::envelope::Envelope;

/// Codec failures.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Inbound text is not JSON.
    #[error("malformed JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// Inbound text is JSON but not an object.
    #[error("envelope must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// Outbound value could not be serialized.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decode one inbound text message.
pub fn decode(text: &str) -> Result<Envelope, CodecError> {
    match serde_json::from_str::<Value>(text).map_err(CodecError::Parse)? {
        Value::Object(fields) => Ok(Envelope::from_map(fields)),
        other => Err(CodecError::NotAnObject(kind(&other))),
    }
}

/// Encode an outbound value.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(CodecError::Encode)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn decode_object() {
        let env = decode(r#"{"func":"echo","data":{"x":1}}"#).unwrap();
        assert_eq!(env.func(), Some("echo"));
    }

    #[test]
    fn decode_malformed_json() {
        assert_matches!(decode("{not json"), Err(CodecError::Parse(_)));
        assert_matches!(decode(""), Err(CodecError::Parse(_)));
    }

    #[test]
    fn decode_non_object() {
        assert_matches!(decode("[1,2,3]"), Err(CodecError::NotAnObject("array")));
        assert_matches!(decode("\"hi\""), Err(CodecError::NotAnObject("string")));
        assert_matches!(decode("null"), Err(CodecError::NotAnObject("null")));
    }

    #[test]
    fn encode_value() {
        let text = encode(&json!({"a": 1})).unwrap();
        assert_eq!(text, r#"{"a":1}"#);
    }

    #[test]
    fn encode_rejects_non_string_map_keys() {
        let mut map = BTreeMap::new();
        let _ = map.insert(vec![1u8], 1);
        assert_matches!(encode(&map), Err(CodecError::Encode(_)));
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = decode("42").unwrap_err();
        assert_eq!(err.to_string(), "envelope must be a JSON object, got number");
    }
}
