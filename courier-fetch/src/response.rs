//! Inbound response chain.
//!
//! Applied to every 2xx response, in order:
//!
//! 1. [`NormalizeEnvelope`] - add `success: true` to object bodies
//! 2. [`ValidateBody`] - codec validation and key remap (advisory)
//! 3. [`UpdateCredentials`] - persist tokens the server handed out
//! 4. [`BinaryPassthrough`] - binary bodies are left alone

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{Codec, RequestSpec, ResponseBody, Stage, ValidationWarning};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::credentials::{CredentialStore, token_names};
use crate::error::ExchangeError;
use crate::host::http::RawResponse;
use crate::pipeline::{Pipeline, Step};

/// Envelope flag added to object bodies.
pub const SUCCESS_FIELD: &str = "success";

// ============================================================================
// Inbound Response
// ============================================================================

/// A response on its way back to the caller.
#[derive(Debug, Clone)]
pub struct InboundResponse {
    /// URL of the exchange, as submitted.
    pub url: String,
    /// Codec of the exchange, if any.
    pub codec: Option<Arc<Codec>>,
    /// HTTP status.
    pub status: u16,
    /// Response headers with lower-case names.
    pub headers: BTreeMap<String, String>,
    /// Body.
    pub body: ResponseBody,
}

impl InboundResponse {
    /// Pairs a raw response with the request that produced it.
    pub fn new(spec: &RequestSpec, raw: RawResponse) -> Self {
        Self {
            url: spec.url.clone(),
            codec: spec.codec.clone(),
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
        }
    }
}

// ============================================================================
// Steps
// ============================================================================

/// Adds `success: true` to object bodies.
///
/// A `success` field sent by the server is left untouched.
pub struct NormalizeEnvelope;

#[async_trait]
impl Step<InboundResponse> for NormalizeEnvelope {
    fn name(&self) -> &str {
        "normalize-envelope"
    }

    async fn apply(&self, mut response: InboundResponse) -> Result<InboundResponse, ExchangeError> {
        if let Some(Value::Object(fields)) = response.body.as_json_mut() {
            fields
                .entry(SUCCESS_FIELD)
                .or_insert(Value::Bool(true));
        }
        Ok(response)
    }
}

/// Runs the response codec over the body.
///
/// A mismatch is logged as a [`ValidationWarning`] and the raw body is
/// returned. The envelope flag survives schema conversion.
pub struct ValidateBody;

#[async_trait]
impl Step<InboundResponse> for ValidateBody {
    fn name(&self) -> &str {
        "validate-body"
    }

    async fn apply(&self, mut response: InboundResponse) -> Result<InboundResponse, ExchangeError> {
        let Some(codec) = response.codec.clone() else {
            return Ok(response);
        };
        let Some(body) = response.body.as_json() else {
            return Ok(response);
        };

        match codec.decode_response(body) {
            Some(Ok(mut decoded)) => {
                let flag = body.get(SUCCESS_FIELD).cloned();
                if let (Some(flag), Value::Object(fields)) = (flag, &mut decoded) {
                    fields.entry(SUCCESS_FIELD).or_insert(flag);
                }
                response.body = ResponseBody::Json(decoded);
            }
            Some(Err(error)) => {
                let warning = ValidationWarning::new(&response.url, Stage::Response, error);
                warn!(%warning, "Returning body without conversion");
            }
            None => {}
        }
        Ok(response)
    }
}

/// Stores tokens found in the body.
///
/// Both `accessToken` and `refreshToken` must be present. A storage failure
/// is logged; the response still reaches the caller.
pub struct UpdateCredentials {
    credentials: Arc<CredentialStore>,
}

impl UpdateCredentials {
    /// Creates the step.
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl Step<InboundResponse> for UpdateCredentials {
    fn name(&self) -> &str {
        "update-credentials"
    }

    async fn apply(&self, response: InboundResponse) -> Result<InboundResponse, ExchangeError> {
        let access = response.body.str_field(token_names::ACCESS_TOKEN);
        let refresh = response.body.str_field(token_names::REFRESH_TOKEN);

        if let (Some(access), Some(refresh)) = (access, refresh) {
            if !access.is_empty() && !refresh.is_empty() {
                match self.credentials.store_tokens(access, refresh).await {
                    Ok(credential) => {
                        debug!(url = %response.url, expiry = ?credential.refresh_expiry, "Credentials updated from response");
                    }
                    Err(e) => {
                        warn!(url = %response.url, error = %e, "Failed to store credentials from response");
                    }
                }
            }
        }
        Ok(response)
    }
}

/// Leaves binary bodies untouched.
pub struct BinaryPassthrough;

#[async_trait]
impl Step<InboundResponse> for BinaryPassthrough {
    fn name(&self) -> &str {
        "binary-passthrough"
    }

    async fn apply(&self, response: InboundResponse) -> Result<InboundResponse, ExchangeError> {
        if let ResponseBody::Binary(bytes) = &response.body {
            trace!(url = %response.url, len = bytes.len(), "Binary body");
        }
        Ok(response)
    }
}

// ============================================================================
// Chain
// ============================================================================

/// Builds the inbound chain in its fixed order.
pub fn response_chain(credentials: Arc<CredentialStore>) -> Pipeline<InboundResponse> {
    Pipeline::new("response")
        .then(NormalizeEnvelope)
        .then(ValidateBody)
        .then(UpdateCredentials::new(credentials))
        .then(BinaryPassthrough)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::keychain::{MemoryTokenStorage, TokenStorage};
    use courier_core::{KeyMap, TypedSchema};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    fn inbound(spec: &RequestSpec, body: ResponseBody) -> InboundResponse {
        InboundResponse::new(
            spec,
            RawResponse {
                status: 200,
                headers: BTreeMap::new(),
                body,
            },
        )
    }

    #[tokio::test]
    async fn test_envelope_adds_success_flag() {
        let spec = RequestSpec::get("/foo");
        let out = NormalizeEnvelope
            .apply(inbound(&spec, json!({ "foo": 1 }).into()))
            .await
            .unwrap();
        assert_eq!(out.body.as_json(), Some(&json!({ "success": true, "foo": 1 })));
    }

    #[tokio::test]
    async fn test_envelope_keeps_server_flag() {
        let spec = RequestSpec::get("/foo");
        let out = NormalizeEnvelope
            .apply(inbound(&spec, json!({ "success": false }).into()))
            .await
            .unwrap();
        assert_eq!(out.body.as_json(), Some(&json!({ "success": false })));
    }

    #[tokio::test]
    async fn test_envelope_ignores_non_objects() {
        let spec = RequestSpec::get("/list");
        let out = NormalizeEnvelope
            .apply(inbound(&spec, json!([1, 2]).into()))
            .await
            .unwrap();
        assert_eq!(out.body.as_json(), Some(&json!([1, 2])));

        let out = NormalizeEnvelope
            .apply(inbound(&spec, ResponseBody::Binary(vec![1])))
            .await
            .unwrap();
        assert!(out.body.is_binary());
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Profile {
        display_name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct ProfileRow {
        display_name: String,
    }

    fn profile_spec() -> RequestSpec {
        RequestSpec::get("/profile").with_codec(
            Codec::new()
                .with_response(TypedSchema::<Profile>::new(), TypedSchema::<ProfileRow>::new())
                .with_key_map(KeyMap::new().with("display_name", "displayName")),
        )
    }

    #[tokio::test]
    async fn test_validate_body_converts_and_keeps_flag() {
        let spec = profile_spec();
        let out = ValidateBody
            .apply(inbound(&spec, json!({ "display_name": "Ada", "success": true }).into()))
            .await
            .unwrap();
        assert_eq!(
            out.body.as_json(),
            Some(&json!({ "displayName": "Ada", "success": true }))
        );
    }

    #[tokio::test]
    async fn test_validate_body_is_lenient() {
        let spec = profile_spec();
        let raw = json!({ "unexpected": [1, 2, 3] });
        let out = ValidateBody.apply(inbound(&spec, raw.clone().into())).await.unwrap();
        assert_eq!(out.body.as_json(), Some(&raw));
    }

    #[tokio::test]
    async fn test_update_credentials_requires_both_tokens() {
        let storage = Arc::new(MemoryTokenStorage::new());
        let step = UpdateCredentials::new(Arc::new(CredentialStore::new(storage.clone())));
        let spec = RequestSpec::post("/login");

        step.apply(inbound(&spec, json!({ "accessToken": "a" }).into()))
            .await
            .unwrap();
        assert!(storage.is_empty().await);

        step.apply(inbound(&spec, json!({ "accessToken": "a", "refreshToken": "r" }).into()))
            .await
            .unwrap();
        assert_eq!(
            storage.get_token(token_names::ACCESS_TOKEN).await.unwrap().as_deref(),
            Some("a")
        );
        assert_eq!(
            storage.get_token(token_names::REFRESH_TOKEN).await.unwrap().as_deref(),
            Some("r")
        );
    }

    #[test]
    fn test_chain_order() {
        let chain = response_chain(Arc::new(CredentialStore::new(Arc::new(MemoryTokenStorage::new()))));
        assert_eq!(
            chain.step_names(),
            vec!["normalize-envelope", "validate-body", "update-credentials", "binary-passthrough"]
        );
    }
}
