//! Access/refresh credentials and JWT claim helpers.
//!
//! Tokens are JWTs. Only the payload segment is decoded: signatures are the
//! server's business, the client only needs `exp` to know when the refresh
//! token stops being useful.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::CoreError;

// ============================================================================
// Credential
// ============================================================================

/// The current access/refresh token pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Bearer token attached to every request.
    pub access_token: String,
    /// Token presented to the refresh endpoint.
    pub refresh_token: String,
    /// When the refresh token expires, from its `exp` claim.
    pub refresh_expiry: Option<DateTime<Utc>>,
}

impl Credential {
    /// Builds a credential, deriving the refresh expiry from the token claims.
    pub fn from_tokens(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        let refresh_token = refresh_token.into();
        let refresh_expiry = expiry_of(&refresh_token);
        Self {
            access_token: access_token.into(),
            refresh_token,
            refresh_expiry,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("refresh_expiry", &self.refresh_expiry)
            .finish()
    }
}

/// Token pair as returned by the refresh endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// New access token.
    pub access_token: String,
    /// New refresh token.
    pub refresh_token: String,
}

impl TokenPair {
    /// Converts into a credential with the derived expiry.
    pub fn into_credential(self) -> Credential {
        Credential::from_tokens(self.access_token, self.refresh_token)
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair").finish_non_exhaustive()
    }
}

// ============================================================================
// JWT Claims
// ============================================================================

/// Claims read from a JWT payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject.
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiration (seconds since epoch).
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issued at (seconds since epoch).
    #[serde(default)]
    pub iat: Option<i64>,
    /// Application user id.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Client IP bound into the token.
    #[serde(default)]
    pub ip: Option<String>,
    /// Account name.
    #[serde(default)]
    pub account: Option<String>,
    /// Any other claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JwtClaims {
    /// Returns the expiry as a timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    /// Returns true if the token is expired at `now`. Tokens without `exp`
    /// count as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_none_or(|exp| exp < now)
    }

    /// Time left before expiry, zero if already expired.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at()
            .map_or(Duration::zero(), |exp| (exp - now).max(Duration::zero()))
    }

    /// Returns true if the token expires within `buffer` of `now`.
    pub fn should_refresh_at(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        self.remaining_at(now) <= buffer
    }
}

/// Decodes the payload segment of a JWT without verifying its signature.
pub fn decode_claims(token: &str) -> Result<JwtClaims, CoreError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(CoreError::Jwt(format!(
            "expected 3 segments, got {}",
            parts.len()
        )));
    }

    let payload = parts[1];
    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD.decode(payload))
        .map_err(|e| CoreError::Jwt(format!("base64 decode error: {e}")))?;

    serde_json::from_slice(&decoded).map_err(|e| CoreError::Jwt(format!("JSON parse error: {e}")))
}

/// Expiry of a token, or `None` if it is not a JWT or carries no `exp`.
pub fn expiry_of(token: &str) -> Option<DateTime<Utc>> {
    decode_claims(token).ok()?.expires_at()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Builds an unsigned test JWT carrying `claims`.
    pub(crate) fn make_jwt(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.signature")
    }

    #[test]
    fn test_decode_claims() {
        let token = make_jwt(&json!({ "sub": "42", "exp": 1_900_000_000, "user_id": "u-1", "role": "admin" }));
        let claims = decode_claims(&token).unwrap();

        assert_eq!(claims.sub.as_deref(), Some("42"));
        assert_eq!(claims.exp, Some(1_900_000_000));
        assert_eq!(claims.user_id.as_deref(), Some("u-1"));
        assert_eq!(claims.extra.get("role"), Some(&json!("admin")));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(decode_claims("not-a-jwt").is_err());
        assert!(decode_claims("a.b").is_err());
        assert!(decode_claims("a.!!!.c").is_err());
    }

    #[test]
    fn test_credential_expiry_from_claim() {
        let refresh = make_jwt(&json!({ "exp": 1_700_000_000 }));
        let credential = Credential::from_tokens("access", refresh);

        assert_eq!(
            credential.refresh_expiry,
            Utc.timestamp_opt(1_700_000_000, 0).single()
        );
    }

    #[test]
    fn test_credential_without_claim() {
        let credential = Credential::from_tokens("access", "opaque-refresh");
        assert!(credential.refresh_expiry.is_none());
    }

    #[test]
    fn test_expiry_helpers() {
        let now = Utc.timestamp_opt(1_000, 0).single().unwrap();
        let claims = JwtClaims {
            exp: Some(1_200),
            ..Default::default()
        };

        assert!(!claims.is_expired_at(now));
        assert_eq!(claims.remaining_at(now), Duration::seconds(200));
        assert!(claims.should_refresh_at(now, Duration::minutes(5)));
        assert!(!claims.should_refresh_at(now, Duration::seconds(100)));
        assert!(JwtClaims::default().is_expired_at(now));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let credential = Credential::from_tokens("secret-access", "secret-refresh");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("secret"));
    }
}
