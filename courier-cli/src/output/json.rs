//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use courier_fetch::{ExchangeError, ProbeResult};
use serde::{Serialize, Serializer};

// ============================================================================
// Output Types
// ============================================================================

/// Stored credential state. Token values are never included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
    pub backend: String,
    pub signed_in: bool,
    pub access_token: bool,
    pub refresh_token: bool,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_datetime_opt")]
    pub refresh_expiry: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// Reachability probe output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutput {
    pub url: String,
    pub online: bool,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeOutput {
    pub fn new(url: &str, result: &ProbeResult) -> Self {
        Self {
            url: url.to_string(),
            online: result.online,
            response_time_ms: result.response_time_ms,
            status_code: result.status_code,
            error: result.error.clone(),
        }
    }
}

/// A failed exchange.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl From<&ExchangeError> for ErrorOutput {
    fn from(err: &ExchangeError) -> Self {
        let (message, trace_id) = match err {
            ExchangeError::Transport(e) => (e.message.clone(), Some(e.trace_id.clone())),
            other => (other.to_string(), None),
        };
        Self {
            success: false,
            message,
            status: err.status(),
            trace_id,
        }
    }
}

// ============================================================================
// Serialization helpers
// ============================================================================

fn serialize_datetime_opt<S>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => s.serialize_str(&dt.to_rfc3339()),
        None => s.serialize_none(),
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }
}

// ============================================================================
// Tests
// ============================================================================
