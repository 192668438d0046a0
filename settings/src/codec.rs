//! JSON encoding of settings blobs stored in the key-value store.

use errors::SettingsError;
use serde::Serialize;
use serde_json::Value;

use crate::Mapping;

/// Encode a mapping for storage under `key`.
///
/// Fails with `InvalidValue` when the value cannot be represented as JSON or
/// is not a mapping at the top level. Nothing is written in that case.
pub(crate) fn encode_mapping<T: Serialize + ?Sized>(
    key: &str,
    mapping: &T
) -> Result<String, SettingsError> {
    let value = serde_json::to_value(mapping).map_err(|e| SettingsError::invalid_value(key, e))?;

    if !value.is_object() {
        return Err(SettingsError::invalid_value(
            key,
            format!("expected a mapping, got {}", kind_of(&value))
        ));
    }

    serde_json::to_string(&value).map_err(|e| SettingsError::invalid_value(key, e))
}

/// Decode a stored blob into a mapping.
pub(crate) fn decode_mapping(key: &str, raw: &str) -> Result<Mapping, SettingsError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(SettingsError::invalid_value(
            key,
            format!("stored blob is {}, not a mapping", kind_of(&other))
        )),
        Err(e) => Err(SettingsError::invalid_value(key, e))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_encode_nested_mapping() {
        let encoded = encode_mapping("k", &json!({"D": {"e": "f"}})).unwrap();
        assert_eq!(encoded, r#"{"D":{"e":"f"}}"#);
    }

    #[test]
    fn test_encode_rejects_non_mapping() {
        let err = encode_mapping("k", &vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
        assert!(err.to_string().contains("a sequence"));
    }

    #[test]
    fn test_encode_rejects_unrepresentable_keys() {
        let mut mapping = HashMap::new();
        mapping.insert((1, 2), "tuple keys have no JSON form");

        let err = encode_mapping("k", &mapping).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_mapping("k", "not json").is_err());
        assert!(decode_mapping("k", "[1]").is_err());
        assert_eq!(decode_mapping("k", r#"{"A":1}"#).unwrap()["A"], json!(1));
    }
}
