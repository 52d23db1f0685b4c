//! Schema validation seam.
//!
//! Codecs validate payloads through the [`Schema`] trait. A schema either
//! returns the (possibly normalized) value or a [`ValidationError`].
//!
//! Two implementations ship with the crate:
//!
//! - [`TypedSchema`] - validates by deserializing into a Rust type and
//!   serializing it back, which also drops fields the type does not declare
//! - [`AnySchema`] - accepts every value unchanged

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ValidationError;

/// A validator for JSON-shaped values.
pub trait Schema: Send + Sync + fmt::Debug {
    /// Human-readable schema name, used in warnings.
    fn name(&self) -> &str;

    /// Validates `value`, returning the accepted value.
    fn validate(&self, value: &Value) -> Result<Value, ValidationError>;
}

// ============================================================================
// Typed Schema
// ============================================================================

/// Schema backed by a serde type.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct User { id: u64, name: String }
///
/// let schema = TypedSchema::<User>::new();
/// schema.validate(&json!({ "id": 1, "name": "Ada" }))?;
/// ```
pub struct TypedSchema<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    /// Creates a schema named after `T`.
    pub fn new() -> Self {
        let full = std::any::type_name::<T>();
        let short = full.rsplit("::").next().unwrap_or(full);
        Self::named(short)
    }

    /// Creates a schema with an explicit name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TypedSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSchema").field("name", &self.name).finish()
    }
}

impl<T> Schema for TypedSchema<T>
where
    T: DeserializeOwned + Serialize,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        let parsed: T = serde_json::from_value(value.clone())
            .map_err(|e| ValidationError::new(self.name.as_str(), e.to_string()))?;
        serde_json::to_value(parsed).map_err(|e| ValidationError::new(self.name.as_str(), e.to_string()))
    }
}

// ============================================================================
// Any Schema
// ============================================================================

/// Schema that accepts any value unchanged.
///
/// Useful for endpoints that only need key remapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnySchema;

impl Schema for AnySchema {
    fn name(&self) -> &str {
        "any"
    }

    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        Ok(value.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
