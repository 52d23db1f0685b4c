//! Core error types for `Courier`.

use std::fmt;

use thiserror::Error;

/// Core error type for `Courier` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid HTTP method name.
    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    /// Invalid data handed to a request builder.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Token could not be decoded as a JWT.
    #[error("JWT decode error: {0}")]
    Jwt(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A value did not match a schema.
#[derive(Debug, Clone, Error)]
#[error("{schema}: {message}")]
pub struct ValidationError {
    /// Name of the schema that rejected the value.
    pub schema: String,
    /// Why the value was rejected.
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error for the named schema.
    pub fn new(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            message: message.into(),
        }
    }
}

/// Which side of an exchange a payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Outbound request payload.
    Request,
    /// Inbound response body.
    Response,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Response => write!(f, "response"),
        }
    }
}

/// Non-fatal schema mismatch.
///
/// Codec validation never aborts an exchange. The mismatch is recorded as a
/// warning and the unmodified value continues down the chain.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// URL of the exchange, as submitted.
    pub url: String,
    /// Side of the exchange that failed validation.
    pub stage: Stage,
    /// The underlying validation failure.
    pub error: ValidationError,
}

impl ValidationWarning {
    /// Creates a new warning.
    pub fn new(url: impl Into<String>, stage: Stage, error: ValidationError) -> Self {
        Self {
            url: url.into(),
            stage,
            error,
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} data for {} does not match its schema ({})",
            self.stage, self.url, self.error
        )
    }
}
