#![deny(missing_docs)]

//! # Vendor Extensions
//!
//! Capture and round-trip of `x-`-prefixed keys on OpenAPI objects.
//!
//! Extensions ride on nearly every object via `#[serde(flatten)]`. On
//! deserialization all leftover keys reach this map; only `x-` keys are
//! kept so unknown standard keys stay forward compatible. Serialization
//! re-emits the kept keys verbatim, in insertion order.

use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;

/// Ordered map of vendor-extension keys (`x-...`) to raw JSON values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extensions(pub IndexMap<String, JsonValue>);

impl Extensions {
    /// Creates an empty extension map.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no extension keys are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up an extension value by exact key.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Inserts an extension entry. Keys not starting with `x-` are ignored.
    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) {
        let key = key.into();
        if key.starts_with("x-") {
            self.0.insert(key, value);
        }
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }
}

impl Serialize for Extensions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Extensions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ExtVisitor;

        impl<'de> Visitor<'de> for ExtVisitor {
            type Value = Extensions;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of vendor extension keys")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = IndexMap::new();
                while let Some((key, value)) = access.next_entry::<String, JsonValue>()? {
                    // Unknown non-extension keys are dropped for forward compatibility.
                    if key.starts_with("x-") {
                        out.insert(key, value);
                    }
                }
                Ok(Extensions(out))
            }
        }

        deserializer.deserialize_map(ExtVisitor)
    }
}

/// Lower-cases every `x-` key in a raw JSON tree, recursively.
///
/// YAML decoding lower-cases extension keys; JSON decoding preserves them
/// as-is. Callers parsing YAML run the raw value through this before
/// handing it to the typed model.
pub fn lowercase_extension_keys(value: &mut JsonValue) {
    match value {
        JsonValue::Object(map) => {
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                if let Some(mut inner) = map.remove(&key) {
                    lowercase_extension_keys(&mut inner);
                    let lowered = key.to_ascii_lowercase();
                    if lowered.starts_with("x-") && lowered != key {
                        map.insert(lowered, inner);
                    } else {
                        map.insert(key, inner);
                    }
                }
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                lowercase_extension_keys(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extensions_keep_only_x_keys() {
        let raw = json!({"x-order": 3, "unknownField": true, "x-owner": "core"});
        let ext: Extensions = serde_json::from_value(raw).unwrap();
        assert_eq!(ext.0.len(), 2);
        assert_eq!(ext.get("x-order"), Some(&json!(3)));
        assert!(ext.get("unknownField").is_none());
    }

    #[test]
    fn test_extensions_round_trip_order() {
        let raw = json!({"x-b": 1, "x-a": 2});
        let ext: Extensions = serde_json::from_value(raw).unwrap();
        let out = serde_json::to_string(&ext).unwrap();
        assert_eq!(out, r#"{"x-b":1,"x-a":2}"#);
    }

    #[test]
    fn test_lowercase_extension_keys_recursive() {
        let mut value = json!({
            "x-Outer": {"x-Inner": 1, "Plain": 2},
            "paths": [{"x-Tag": true}]
        });
        lowercase_extension_keys(&mut value);
        assert!(value.get("x-outer").is_some());
        assert!(value["x-outer"].get("x-inner").is_some());
        assert!(value["x-outer"].get("Plain").is_some());
        assert!(value["paths"][0].get("x-tag").is_some());
    }

    #[test]
    fn test_insert_rejects_non_extension_key() {
        let mut ext = Extensions::new();
        ext.insert("title", json!("nope"));
        ext.insert("x-title", json!("yes"));
        assert_eq!(ext.0.len(), 1);
    }
}
