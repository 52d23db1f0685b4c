//! Request specification and per-endpoint codecs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, ValidationError};
use crate::keymap::{Direction, KeyMap};
use crate::schema::Schema;

// ============================================================================
// Method
// ============================================================================

/// HTTP method of an exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET
    #[default]
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl Method {
    /// Returns the canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Returns true for methods that carry the payload as a body.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch | Self::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(CoreError::InvalidMethod(s.to_string())),
        }
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Frontend and backend schema for one side of an exchange.
#[derive(Debug, Clone)]
pub struct SchemaPair {
    /// Shape the application works with.
    pub frontend: Arc<dyn Schema>,
    /// Shape the server speaks.
    pub backend: Arc<dyn Schema>,
}

impl SchemaPair {
    /// Creates a schema pair.
    pub fn new(frontend: impl Schema + 'static, backend: impl Schema + 'static) -> Self {
        Self {
            frontend: Arc::new(frontend),
            backend: Arc::new(backend),
        }
    }
}

/// Per-endpoint validation and key-remapping configuration.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    /// Schemas applied to the outbound payload.
    pub request: Option<SchemaPair>,
    /// Schemas applied to the inbound body.
    pub response: Option<SchemaPair>,
    /// `backend_key -> frontendKey` map shared by both sides.
    pub key_map: KeyMap,
}

impl Codec {
    /// Creates an empty codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request schemas.
    pub fn with_request(mut self, frontend: impl Schema + 'static, backend: impl Schema + 'static) -> Self {
        self.request = Some(SchemaPair::new(frontend, backend));
        self
    }

    /// Sets the response schemas.
    pub fn with_response(mut self, frontend: impl Schema + 'static, backend: impl Schema + 'static) -> Self {
        self.response = Some(SchemaPair::new(frontend, backend));
        self
    }

    /// Sets the key map.
    pub fn with_key_map(mut self, key_map: KeyMap) -> Self {
        self.key_map = key_map;
        self
    }

    /// Converts an outbound payload to the backend shape.
    ///
    /// Validates against the frontend schema, renames keys frontend to
    /// backend, then validates against the backend schema. Returns `None`
    /// when the codec declares no request schemas.
    pub fn encode_request(&self, payload: &Value) -> Option<Result<Value, ValidationError>> {
        let pair = self.request.as_ref()?;
        Some(self.convert(pair.frontend.as_ref(), pair.backend.as_ref(), payload, Direction::FrontendToBackend))
    }

    /// Converts an inbound body to the frontend shape.
    ///
    /// Mirror image of [`Codec::encode_request`]: backend schema, keys
    /// backend to frontend, frontend schema.
    pub fn decode_response(&self, body: &Value) -> Option<Result<Value, ValidationError>> {
        let pair = self.response.as_ref()?;
        Some(self.convert(pair.backend.as_ref(), pair.frontend.as_ref(), body, Direction::BackendToFrontend))
    }

    fn convert(
        &self,
        first: &dyn Schema,
        second: &dyn Schema,
        value: &Value,
        direction: Direction,
    ) -> Result<Value, ValidationError> {
        let parsed = first.validate(value)?;
        let mapped = if self.key_map.is_empty() {
            parsed
        } else {
            self.key_map.apply(&parsed, direction)
        };
        second.validate(&mapped)
    }
}

// ============================================================================
// Request Spec
// ============================================================================

/// An exchange as submitted by application code.
///
/// `url` may contain `{param}` placeholders that are filled from matching
/// payload keys before the request is sent.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// Path relative to the client base URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Payload object; becomes the query string or the body depending on the method.
    pub payload: Option<Value>,
    /// Optional validation and key-remapping configuration.
    pub codec: Option<Arc<Codec>>,
    /// Strip payload keys consumed by URL placeholders (default true).
    pub remove_url_params: bool,
    /// Extra headers supplied by the caller.
    pub headers: BTreeMap<String, String>,
    /// How many times this request has already been replayed after a
    /// credential refresh. Zero for caller submissions.
    pub retry_count: u32,
}

impl RequestSpec {
    /// Creates a request with no payload.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            payload: None,
            codec: None,
            remove_url_params: true,
            headers: BTreeMap::new(),
            retry_count: 0,
        }
    }

    /// Creates a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Creates a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Creates a PUT request.
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    /// Creates a PATCH request.
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    /// Creates a DELETE request.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    /// Sets the payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the payload from any serializable value.
    pub fn with_json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self, CoreError> {
        Ok(self.with_payload(serde_json::to_value(payload)?))
    }

    /// Attaches a codec.
    pub fn with_codec(mut self, codec: impl Into<Arc<Codec>>) -> Self {
        self.codec = Some(codec.into());
        self
    }

    /// Keeps payload keys that were consumed by URL placeholders.
    pub fn keep_url_params(mut self) -> Self {
        self.remove_url_params = false;
        self
    }

    /// Adds a caller-supplied header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Returns true if this request is a replay.
    pub fn is_retry(&self) -> bool {
        self.retry_count > 0
    }

    /// Returns a copy marked as the next replay attempt.
    pub fn next_attempt(&self) -> Self {
        Self {
            retry_count: self.retry_count.saturating_add(1),
            ..self.clone()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
