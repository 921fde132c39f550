//! Canonical serialization of credential payloads.
//!
//! The signed byte sequence of a credential is the RFC 8785 (JCS) rendering of
//! the credential's JSON object with the `proof` member removed: object keys
//! sorted by UTF-16 code units, compact separators, no insignificant
//! whitespace. Floats are rejected outright because their textual form is not
//! stable across implementations; thresholds and balances travel as decimal
//! strings, timestamps and sequence IDs as integers.
//!
//! [`CanonicalBytes`] has a private inner field, so the only way to obtain
//! signable bytes is through this pipeline.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Name of the member excluded from the signed payload.
pub const PROOF_FIELD: &str = "proof";

/// Bytes produced exclusively by JCS canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Canonicalize an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Canonicalize a credential object with its `proof` member stripped.
    ///
    /// This is the exact routine a verifier runs over untrusted input, so it
    /// works on the raw JSON object rather than a typed struct: unknown
    /// members stay covered by the signature.
    pub fn without_proof(value: &Value) -> Result<Self, CanonicalizationError> {
        let mut object = value
            .as_object()
            .cloned()
            .ok_or(CanonicalizationError::NotAnObject)?;
        object.remove(PROOF_FIELD);
        Self::from_value(Value::Object(object))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The canonical form as a string (always valid UTF-8).
    pub fn as_str(&self) -> &str {
        // serde_jcs emits a String, so the bytes are UTF-8 by construction.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() {
                return Err(CanonicalizationError::FloatRejected(
                    n.as_f64().unwrap_or(f64::NAN),
                ));
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_keys_compact() {
        let data = serde_json::json!({"b": 2, "a": 1, "c": "hello"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_str(), r#"{"a":1,"b":2,"c":"hello"}"#);
    }

    #[test]
    fn test_nested_objects_sorted() {
        let data = serde_json::json!({
            "outer": {"z": true, "a": null},
            "list": [3, 2, 1]
        });
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_str(), r#"{"list":[3,2,1],"outer":{"a":null,"z":true}}"#);
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a: Value = serde_json::from_str(r#"{"x": 1, "y": {"q": "1", "p": "2"}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{ "y": {"p": "2", "q": "1"},  "x": 1 }"#).unwrap();
        assert_eq!(
            CanonicalBytes::from_value(a).unwrap(),
            CanonicalBytes::from_value(b).unwrap()
        );
    }

    #[test]
    fn test_float_rejected() {
        let data = serde_json::json!({"balance": 0.5});
        match CanonicalBytes::new(&data) {
            Err(CanonicalizationError::FloatRejected(f)) => assert_eq!(f, 0.5),
            other => panic!("expected FloatRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_float_rejected_inside_array() {
        let data = serde_json::json!({"values": [1, 2.25]});
        assert!(CanonicalBytes::new(&data).is_err());
    }

    #[test]
    fn test_without_proof_strips_member() {
        let data = serde_json::json!({
            "issuer": "did:x:00",
            "proof": {"proofValue": "0xabc"}
        });
        let cb = CanonicalBytes::without_proof(&data).unwrap();
        assert_eq!(cb.as_str(), r#"{"issuer":"did:x:00"}"#);
    }

    #[test]
    fn test_without_proof_requires_object() {
        let data = serde_json::json!(["not", "an", "object"]);
        assert!(matches!(
            CanonicalBytes::without_proof(&data),
            Err(CanonicalizationError::NotAnObject)
        ));
    }
}
