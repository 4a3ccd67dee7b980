//! Argument and value checks shared by every operation.

use serde_json::{Map, Value};

use crate::error::{ArgPosition, KodbError, KodbResult};

/// Member that marks a native set as a kodb set. Never visible to callers.
pub(crate) const SET_EXISTENCE_TOKEN: &str = "SET_EXISTENCE_TOKEN";

/// Returns `true` if `raw` is the JSON text of an object (not an array,
/// scalar, or null).
pub fn is_stringified_object(raw: &str) -> bool {
    parse_object(raw).is_some()
}

/// Parse `raw` as a JSON object, or `None` if it is anything else.
pub(crate) fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

pub(crate) fn ensure_key(key: &str) -> KodbResult<()> {
    if key.is_empty() {
        return Err(KodbError::invalid(ArgPosition::First, "key must not be empty"));
    }
    Ok(())
}

pub(crate) fn ensure_object(value: &Value) -> KodbResult<&Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| KodbError::invalid(ArgPosition::Second, "must be a plain object"))
}

pub(crate) fn ensure_member(member: &str) -> KodbResult<()> {
    if member == SET_EXISTENCE_TOKEN {
        return Err(KodbError::invalid(
            ArgPosition::Second,
            "member name is reserved",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stringified_object_accepts_objects_only() {
        assert!(is_stringified_object("{}"));
        assert!(is_stringified_object(r#"{"a":{"b":[1,2]}}"#));
        assert!(!is_stringified_object("[1,2]"));
        assert!(!is_stringified_object("\"text\""));
        assert!(!is_stringified_object("42"));
        assert!(!is_stringified_object("null"));
        assert!(!is_stringified_object("nonJSONStringValue"));
        assert!(!is_stringified_object(""));
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            ensure_key(""),
            Err(KodbError::InvalidArgument { position: ArgPosition::First, .. })
        ));
        assert!(ensure_key("k").is_ok());
    }

    #[test]
    fn only_objects_are_plain_objects() {
        assert!(ensure_object(&json!({"a": 1})).is_ok());
        for v in [json!([1]), json!("s"), json!(1), json!(null), json!(true)] {
            assert!(matches!(
                ensure_object(&v),
                Err(KodbError::InvalidArgument { position: ArgPosition::Second, .. })
            ));
        }
    }

    #[test]
    fn sentinel_is_not_a_member() {
        assert!(ensure_member("a").is_ok());
        assert!(ensure_member("").is_ok());
        assert!(ensure_member(SET_EXISTENCE_TOKEN).is_err());
    }
}
