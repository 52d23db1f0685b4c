//! Key-value storage for request preferences.
//!
//! Two scopes are read by the request chain: a session-scoped store for the
//! selected currency and a durable store for the UI language.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Well-known preference keys.
pub mod keys {
    /// Selected currency (session-scoped).
    pub const CURRENCY: &str = "currency";
    /// UI language (durable).
    pub const LANGUAGE: &str = "language";
}

/// Read access to a key-value store.
pub trait KeyValueStorage: Send + Sync {
    /// Returns the value for `key`, if present.
    fn get(&self, key: &str) -> Option<String>;
}

/// In-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with `pairs`.
    pub fn with_values<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: RwLock::new(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Sets a value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Removes a value.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}
