//! Response body representation.

use serde_json::Value;

/// Body of an inbound response.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseBody {
    /// Structured body (JSON, or text wrapped as a JSON string).
    Json(Value),
    /// Opaque bytes (downloads, images).
    Binary(Vec<u8>),
    /// No body.
    #[default]
    Empty,
}

impl ResponseBody {
    /// Returns the JSON value, if this is a structured body.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a mutable JSON value, if this is a structured body.
    pub fn as_json_mut(&mut self) -> Option<&mut Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Converts into a JSON value. Binary and empty bodies become `null`.
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Binary(_) | Self::Empty => Value::Null,
        }
    }

    /// Returns true for binary bodies.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// Reads a string field from an object body.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.as_json()?.get(key)?.as_str()
    }
}

impl From<Value> for ResponseBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}
