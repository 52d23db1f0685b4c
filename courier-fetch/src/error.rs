//! Exchange error types.

use std::collections::BTreeMap;
use std::time::Duration;

use courier_core::{CoreError, RequestSpec};
use serde_json::Value;
use thiserror::Error;

/// Message shown to callers whose requests were dropped by a sign-out.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized, please sign in again";

/// Message for a replayed request the server still refused.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired, please sign in again";

/// Trace id used when the server did not send one.
pub const MISSING_TRACE_ID: &str = "N/A";

// ============================================================================
// Exchange Error
// ============================================================================

/// Error type for a failed exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The host is known to be offline; nothing was sent.
    #[error("Network unavailable: {} {}", .request.method, .request.url)]
    Offline {
        /// The request that was attempted.
        request: Box<RequestSpec>,
    },

    /// A credential refresh is in flight; the request must wait for it.
    #[error("Credential refresh in progress: {} {}", .request.method, .request.url)]
    RefreshInProgress {
        /// The request that was attempted.
        request: Box<RequestSpec>,
    },

    /// The session is no longer valid.
    #[error("{message}")]
    Unauthorized {
        /// User-facing message.
        message: String,
        /// The request that was rejected, if any.
        request: Option<Box<RequestSpec>>,
    },

    /// Too many refresh attempts within the rate-limit window.
    #[error("Refresh rate too high: more than {attempts} attempts within {window:?}")]
    RefreshRateLimited {
        /// Attempts allowed per window.
        attempts: u32,
        /// Length of the window.
        window: Duration,
    },

    /// The transport failed or the server answered with a non-2xx status.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request could not be built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The server answered with something we cannot use.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Credential storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// The exchange was dropped before the refresh it waited on settled.
    #[error("Exchange abandoned before the credential refresh settled")]
    Abandoned,
}

impl ExchangeError {
    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>, request: Option<&RequestSpec>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            request: request.map(|r| Box::new(r.clone())),
        }
    }

    /// HTTP status of the failure, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status,
            _ => None,
        }
    }

    /// The request this error is tagged with, if any.
    pub fn request(&self) -> Option<&RequestSpec> {
        match self {
            Self::Offline { request } | Self::RefreshInProgress { request } => Some(&**request),
            Self::Unauthorized { request, .. } => request.as_deref(),
            _ => None,
        }
    }

    /// Returns true for an HTTP 401 or a pre-flagged unauthorized error.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. }) || self.status() == Some(401)
    }
}

// ============================================================================
// Transport Error
// ============================================================================

/// A failed transport call.
///
/// `message` comes from the body's `message` field when the server sent one.
/// Rendered as `"<message> (<trace id>)"`.
#[derive(Debug, Clone, Error)]
#[error("{message} ({trace_id})")]
pub struct TransportError {
    /// HTTP status, `None` if no response was received.
    pub status: Option<u16>,
    /// Parsed response body, if any.
    pub body: Option<Value>,
    /// Response headers with lower-case names.
    pub headers: BTreeMap<String, String>,
    /// Human-readable message.
    pub message: String,
    /// Value of the `x-trace-id` response header, or `N/A`.
    pub trace_id: String,
}

impl TransportError {
    /// Builds an error from a non-2xx response.
    pub fn from_response(
        status: u16,
        headers: BTreeMap<String, String>,
        body: Option<Value>,
    ) -> Self {
        let message = body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map_or_else(
                || format!("Request failed with status code {status}"),
                str::to_string,
            );
        let trace_id = headers
            .get("x-trace-id")
            .cloned()
            .unwrap_or_else(|| MISSING_TRACE_ID.to_string());

        Self {
            status: Some(status),
            body,
            headers,
            message,
            trace_id,
        }
    }

    /// Builds an error for a request that never got a response.
    pub fn network(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: None,
            body: None,
            headers: BTreeMap::new(),
            message: if message.is_empty() {
                "unknown error".to_string()
            } else {
                message
            },
            trace_id: MISSING_TRACE_ID.to_string(),
        }
    }

    /// Envelope `success` flag of a failed exchange. Always false.
    pub fn success(&self) -> bool {
        false
    }
}

// ============================================================================
// Storage Error
// ============================================================================

/// Error type for token and key-value storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Access denied by the platform store.
    #[error("Access denied to credential storage")]
    AccessDenied,

    /// The backend is not available on this system.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Platform error.
    #[error("Platform error: {0}")]
    Platform(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error.
    #[error("Storage error: {0}")]
    Other(String),
}

impl From<keyring::Error> for StorageError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(e) => StorageError::Platform(e.to_string()),
            keyring::Error::NoStorageAccess(_) => StorageError::AccessDenied,
            keyring::Error::Ambiguous(_) => {
                StorageError::Other("Ambiguous credential entry".to_string())
            }
            _ => StorageError::Other(err.to_string()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
