use std::collections::BTreeMap;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Encode a search operation and its parameters into a stable cache key.
///
/// Identical (name, value) sets produce identical keys regardless of
/// argument order: params are canonicalized through a name-sorted map
/// before hashing (nested objects are already order-canonical —
/// `serde_json::Map` keeps keys sorted). The operation name is both mixed
/// into the digest and kept as a readable prefix, so distinct operations
/// never collide even with identical parameter shapes.
pub fn encode(operation: &str, params: &[(&str, Value)]) -> String {
    let canonical: BTreeMap<&str, &Value> = params.iter().map(|(k, v)| (*k, v)).collect();
    let serialized =
        serde_json::to_string(&canonical).expect("string-keyed JSON map always serializes");

    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update(b"\0");
    hasher.update(serialized.as_bytes());
    format!("{operation}:{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_is_order_independent() {
        let a = encode(
            "search_hotels",
            &[("city", json!("Miami")), ("name", Value::Null)],
        );
        let b = encode(
            "search_hotels",
            &[("name", Value::Null), ("city", json!("Miami"))],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn key_is_namespaced_by_operation() {
        let hotels = encode("search_hotels", &[("city", json!("Miami"))]);
        let rooms = encode("search_rooms", &[("city", json!("Miami"))]);
        assert_ne!(hotels, rooms);
        assert!(hotels.starts_with("search_hotels:"));
        assert!(rooms.starts_with("search_rooms:"));
    }

    #[test]
    fn key_distinguishes_values() {
        let miami = encode("search_hotels", &[("city", json!("Miami"))]);
        let boston = encode("search_hotels", &[("city", json!("Boston"))]);
        let none = encode("search_hotels", &[("city", Value::Null)]);
        assert_ne!(miami, boston);
        assert_ne!(miami, none);
    }

    #[test]
    fn key_distinguishes_param_sets() {
        let one = encode("search_hotels", &[("city", json!("Miami"))]);
        let two = encode(
            "search_hotels",
            &[("city", json!("Miami")), ("limit", json!(10))],
        );
        assert_ne!(one, two);
    }

    #[test]
    fn nested_objects_are_canonical() {
        let a = encode("op", &[("filter", json!({"b": 1, "a": 2}))]);
        let b = encode("op", &[("filter", json!({"a": 2, "b": 1}))]);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_params_still_keyed() {
        let key = encode("list_all", &[]);
        assert!(key.starts_with("list_all:"));
        assert_eq!(key.len(), "list_all:".len() + 64); // sha-256 hex
    }
}
