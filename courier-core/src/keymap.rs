//! Recursive key renaming between backend and frontend naming conventions.
//!
//! A [`KeyMap`] is declared once per endpoint as `backend_key -> frontendKey`
//! and applied in either direction. Keys without an entry pass through
//! untouched, arrays are walked element by element and scalars are returned
//! as-is.
//!
//! `serde_json::Value` is an owned tree, so inputs are always cycle-free.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Direction in which a [`KeyMap`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `backend_key` -> `frontendKey` (response side).
    BackendToFrontend,
    /// `frontendKey` -> `backend_key` (request side).
    FrontendToBackend,
}

impl Direction {
    /// Returns the opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            Self::BackendToFrontend => Self::FrontendToBackend,
            Self::FrontendToBackend => Self::BackendToFrontend,
        }
    }
}

/// Immutable mapping from backend key names to frontend key names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMap {
    entries: BTreeMap<String, String>,
}

impl KeyMap {
    /// Creates an empty key map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a key map from `(backend, frontend)` pairs.
    pub fn from_pairs<I, B, F>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (B, F)>,
        B: Into<String>,
        F: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(b, f)| (b.into(), f.into()))
                .collect(),
        }
    }

    /// Adds a `backend -> frontend` entry.
    pub fn with(mut self, backend: impl Into<String>, frontend: impl Into<String>) -> Self {
        self.entries.insert(backend.into(), frontend.into());
        self
    }

    /// Returns true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the map with keys and values swapped.
    pub fn reversed(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(b, f)| (f.clone(), b.clone()))
                .collect(),
        }
    }

    /// Renames keys in `value` in the given direction.
    pub fn apply(&self, value: &Value, direction: Direction) -> Value {
        map_keys(value, self, direction)
    }
}

/// Renames object keys throughout `input` using `key_map`.
///
/// When two source keys map onto the same target key, the one visited last
/// wins.
pub fn map_keys(input: &Value, key_map: &KeyMap, direction: Direction) -> Value {
    match direction {
        Direction::BackendToFrontend => walk(input, &key_map.entries),
        Direction::FrontendToBackend => walk(input, &key_map.reversed().entries),
    }
}

fn walk(value: &Value, table: &BTreeMap<String, String>) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|item| walk(item, table)).collect()),
        Value::Object(fields) => {
            let mapped: Map<String, Value> = fields
                .iter()
                .map(|(key, inner)| {
                    let renamed = table.get(key).cloned().unwrap_or_else(|| key.clone());
                    (renamed, walk(inner, table))
                })
                .collect();
            Value::Object(mapped)
        }
        scalar => scalar.clone(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_map() -> KeyMap {
        KeyMap::new()
            .with("user_id", "userId")
            .with("display_name", "displayName")
            .with("created_at", "createdAt")
    }

    #[test]
    fn test_backend_to_frontend() {
        let backend = json!({ "user_id": 7, "display_name": "Ada", "role": "admin" });
        let mapped = user_map().apply(&backend, Direction::BackendToFrontend);

        assert_eq!(mapped, json!({ "userId": 7, "displayName": "Ada", "role": "admin" }));
    }

    #[test]
    fn test_frontend_to_backend() {
        let frontend = json!({ "userId": 7, "displayName": "Ada" });
        let mapped = map_keys(&frontend, &user_map(), Direction::FrontendToBackend);

        assert_eq!(mapped, json!({ "user_id": 7, "display_name": "Ada" }));
    }

    #[test]
    fn test_nested_objects_and_arrays() {
        let backend = json!({
            "items": [
                { "user_id": 1, "meta": { "created_at": "2024-01-01" } },
                { "user_id": 2, "meta": { "created_at": "2024-02-01" } }
            ]
        });
        let mapped = user_map().apply(&backend, Direction::BackendToFrontend);

        assert_eq!(mapped["items"][0]["userId"], 1);
        assert_eq!(mapped["items"][1]["meta"]["createdAt"], "2024-02-01");
    }

    #[test]
    fn test_scalars_pass_through() {
        let map = user_map();
        assert_eq!(map.apply(&json!(42), Direction::BackendToFrontend), json!(42));
        assert_eq!(map.apply(&json!("user_id"), Direction::BackendToFrontend), json!("user_id"));
        assert_eq!(map.apply(&Value::Null, Direction::FrontendToBackend), Value::Null);
    }

    #[test]
    fn test_round_trip_is_identity_without_collisions() {
        let map = user_map();
        let original = json!({
            "userId": 3,
            "displayName": "Grace",
            "tags": [{ "createdAt": "yesterday" }],
            "untouched": true
        });

        let backend = map.apply(&original, Direction::FrontendToBackend);
        let restored = map.apply(&backend, Direction::FrontendToBackend.reverse());

        assert_ne!(backend, original);
        assert_eq!(restored, original);
    }

    #[test]
    fn test_empty_map_is_identity() {
        let value = json!({ "a_b": [1, { "c_d": null }] });
        assert_eq!(KeyMap::new().apply(&value, Direction::BackendToFrontend), value);
    }

    #[test]
    fn test_reversed() {
        let reversed = user_map().reversed();
        assert_eq!(reversed.len(), 3);
        assert_eq!(
            reversed.apply(&json!({ "userId": 1 }), Direction::BackendToFrontend),
            json!({ "user_id": 1 })
        );
    }

    #[test]
    fn test_deserialize_from_plain_object() {
        let map: KeyMap = serde_json::from_str(r#"{"user_id":"userId"}"#).unwrap();
        assert_eq!(map, KeyMap::from_pairs([("user_id", "userId")]));
    }
}
