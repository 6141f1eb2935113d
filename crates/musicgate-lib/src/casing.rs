//! Response key casing.
//!
//! Upstream adapters return JSON in whatever casing their provider uses
//! (`snake_case` from the metadata service, `camelCase` from YouTube). The
//! gateway exposes a single convention, camelCase, by rewriting object keys
//! recursively. String values are never touched, and the transform is
//! idempotent: applying it to its own output is a no-op.

use convert_case::{Case, Casing};
use serde_json::{map::Entry, Map, Value};
use tracing::warn;

/// Convert a single object key to camelCase.
///
/// Keys that are already camelCase come back unchanged.
pub fn camel_case_key(key: &str) -> String {
    if is_camel_case(key) {
        return key.to_string();
    }
    key.to_case(Case::Camel)
}

/// Rewrite every object key in `value` to camelCase.
///
/// Arrays are walked element by element; scalars are returned as-is.
///
/// ```
/// use musicgate_lib::casing::camel_case_keys;
/// use serde_json::json;
///
/// let value = camel_case_keys(json!({"image_url": "a_b", "items": [{"play_count": 1}]}));
/// assert_eq!(value, json!({"imageUrl": "a_b", "items": [{"playCount": 1}]}));
/// ```
pub fn camel_case_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                let converted = camel_case_key(&key);
                let already_camel = converted == key;
                match out.entry(converted) {
                    Entry::Vacant(slot) => {
                        slot.insert(camel_case_keys(inner));
                    }
                    // On a collision the key that was already camelCase wins.
                    Entry::Occupied(mut slot) => {
                        warn!(key = %key, normalized = %slot.key(), "object keys collide after camelCasing");
                        if already_camel {
                            slot.insert(camel_case_keys(inner));
                        }
                    }
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(camel_case_keys).collect()),
        scalar => scalar,
    }
}

/// Returns true when every key in `value` is already camelCase.
pub fn is_normalized(value: &Value) -> bool {
    match value {
        Value::Object(map) => map
            .iter()
            .all(|(key, inner)| camel_case_key(key) == *key && is_normalized(inner)),
        Value::Array(items) => items.iter().all(is_normalized),
        _ => true,
    }
}

// Lowercase first character, ASCII alphanumerics only. Skipping these keeps
// `videoId`, `url` and friends byte-for-byte stable.
fn is_camel_case(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {
            chars.all(|c| c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}
