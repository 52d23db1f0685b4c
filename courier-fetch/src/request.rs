//! Outbound request chain.
//!
//! Every exchange passes through these steps, in this order, before it
//! reaches the transport:
//!
//! 1. [`CheckNetwork`] - fail fast when the host is offline
//! 2. [`CheckRefreshing`] - park the request behind an in-flight refresh
//! 3. [`ValidatePayload`] - codec validation and key remap (advisory)
//! 4. [`ExpandUrlTemplate`] - fill `{param}` placeholders from the payload
//! 5. [`RoutePayload`] - query string for reads, body for writes
//! 6. [`SetCurrency`], [`SetLocale`], [`SetAccessToken`] - headers

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use courier_core::{Method, RequestSpec, Stage, ValidationWarning};
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::credentials::CredentialStore;
use crate::error::ExchangeError;
use crate::host::network::Connectivity;
use crate::host::storage::{KeyValueStorage, keys};
use crate::pipeline::{Pipeline, Step};
use crate::refresh::RefreshCoordinator;

/// Header carrying the selected currency.
pub const CURRENCY_HEADER: &str = "currency";
/// Header carrying the UI language.
pub const LOCALE_HEADER: &str = "x-locale";
/// Header carrying the bearer token.
pub const AUTHORIZATION_HEADER: &str = "authorization";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("Invalid regex"));

// ============================================================================
// Outbound Request
// ============================================================================

/// A request on its way to the transport.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// The request as submitted.
    pub source: RequestSpec,
    /// Path, with placeholders expanded once templating has run.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Payload not yet routed to query or body.
    pub payload: Option<Value>,
    /// Query parameters (read methods).
    pub query: Option<Value>,
    /// JSON body (write methods).
    pub body: Option<Value>,
    /// Headers with lower-case names.
    pub headers: BTreeMap<String, String>,
}

impl OutboundRequest {
    /// Starts an outbound request from a spec.
    pub fn new(spec: &RequestSpec) -> Self {
        Self {
            source: spec.clone(),
            url: spec.url.clone(),
            method: spec.method,
            payload: spec.payload.clone(),
            query: None,
            body: None,
            headers: spec.headers.clone(),
        }
    }

    /// Returns a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Sets a header, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Flattens the query object into `(key, value)` pairs.
    ///
    /// Scalars are rendered as text, arrays repeat the key, nulls are
    /// skipped and nested objects are sent as JSON text.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let Some(Value::Object(fields)) = &self.query else {
            return Vec::new();
        };

        let mut pairs = Vec::new();
        for (key, value) in fields {
            match value {
                Value::Array(items) => {
                    pairs.extend(items.iter().filter_map(query_text).map(|v| (key.clone(), v)));
                }
                other => {
                    if let Some(text) = query_text(other) {
                        pairs.push((key.clone(), text));
                    }
                }
            }
        }
        pairs
    }
}

fn query_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// ============================================================================
// Steps
// ============================================================================

/// Rejects the request when the host is offline.
pub struct CheckNetwork {
    connectivity: Arc<dyn Connectivity>,
}

impl CheckNetwork {
    /// Creates the step.
    pub fn new(connectivity: Arc<dyn Connectivity>) -> Self {
        Self { connectivity }
    }
}

#[async_trait]
impl Step<OutboundRequest> for CheckNetwork {
    fn name(&self) -> &str {
        "check-network"
    }

    async fn apply(&self, request: OutboundRequest) -> Result<OutboundRequest, ExchangeError> {
        if self.connectivity.is_online() {
            return Ok(request);
        }
        warn!(url = %request.url, "Network unavailable");
        Err(ExchangeError::Offline {
            request: Box::new(request.source),
        })
    }
}

/// Rejects fresh requests while a credential refresh is in flight.
///
/// Replays skip the check: they are sent by the refresh itself.
pub struct CheckRefreshing {
    coordinator: Arc<RefreshCoordinator>,
}

impl CheckRefreshing {
    /// Creates the step.
    pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl Step<OutboundRequest> for CheckRefreshing {
    fn name(&self) -> &str {
        "check-refreshing"
    }

    async fn apply(&self, request: OutboundRequest) -> Result<OutboundRequest, ExchangeError> {
        if request.source.is_retry() || !self.coordinator.is_refreshing() {
            return Ok(request);
        }
        debug!(url = %request.url, "Refresh in progress, holding request");
        Err(ExchangeError::RefreshInProgress {
            request: Box::new(request.source),
        })
    }
}

/// Runs the request codec over the payload.
///
/// A mismatch is logged as a [`ValidationWarning`] and the payload is sent
/// unmodified.
pub struct ValidatePayload;

#[async_trait]
impl Step<OutboundRequest> for ValidatePayload {
    fn name(&self) -> &str {
        "validate-payload"
    }

    async fn apply(&self, mut request: OutboundRequest) -> Result<OutboundRequest, ExchangeError> {
        let Some(codec) = request.source.codec.clone() else {
            return Ok(request);
        };
        let Some(payload) = request.payload.as_ref() else {
            return Ok(request);
        };

        match codec.encode_request(payload) {
            Some(Ok(encoded)) => request.payload = Some(encoded),
            Some(Err(error)) => {
                let warning = ValidationWarning::new(&request.source.url, Stage::Request, error);
                warn!(%warning, "Sending payload without conversion");
            }
            None => {}
        }
        Ok(request)
    }
}

/// Fills `{param}` placeholders in the URL from payload fields.
///
/// Consumed fields are removed from the payload unless the request keeps
/// them. Placeholders without a matching field are left as-is.
pub struct ExpandUrlTemplate;

#[async_trait]
impl Step<OutboundRequest> for ExpandUrlTemplate {
    fn name(&self) -> &str {
        "expand-url-template"
    }

    async fn apply(&self, mut request: OutboundRequest) -> Result<OutboundRequest, ExchangeError> {
        if !request.url.contains('{') {
            return Ok(request);
        }
        let Some(Value::Object(fields)) = request.payload.as_mut() else {
            return Ok(request);
        };

        let mut consumed = Vec::new();
        let expanded = PLACEHOLDER
            .replace_all(&request.url, |caps: &Captures<'_>| match fields.get(&caps[1]) {
                Some(value) => {
                    consumed.push(caps[1].to_string());
                    template_text(value)
                }
                None => {
                    debug!(param = &caps[1], "No payload field for URL placeholder");
                    caps[0].to_string()
                }
            })
            .into_owned();

        if request.source.remove_url_params {
            for key in &consumed {
                fields.remove(key);
            }
        }

        trace!(from = %request.url, to = %expanded, "Expanded URL template");
        request.url = expanded;
        Ok(request)
    }
}

fn template_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Moves the payload to the query string (reads) or the body (writes).
pub struct RoutePayload;

#[async_trait]
impl Step<OutboundRequest> for RoutePayload {
    fn name(&self) -> &str {
        "route-payload"
    }

    async fn apply(&self, mut request: OutboundRequest) -> Result<OutboundRequest, ExchangeError> {
        let payload = request.payload.take();
        if request.method.is_write() {
            request.body = payload;
        } else {
            request.query = payload;
        }
        Ok(request)
    }
}

/// Adds the `currency` header from session storage.
pub struct SetCurrency {
    storage: Arc<dyn KeyValueStorage>,
}

impl SetCurrency {
    /// Creates the step.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Step<OutboundRequest> for SetCurrency {
    fn name(&self) -> &str {
        "set-currency"
    }

    async fn apply(&self, mut request: OutboundRequest) -> Result<OutboundRequest, ExchangeError> {
        if let Some(currency) = self.storage.get(keys::CURRENCY).filter(|c| !c.is_empty()) {
            request.set_header(CURRENCY_HEADER, currency);
        }
        Ok(request)
    }
}

/// Adds the `x-locale` header from durable storage.
pub struct SetLocale {
    storage: Arc<dyn KeyValueStorage>,
}

impl SetLocale {
    /// Creates the step.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Step<OutboundRequest> for SetLocale {
    fn name(&self) -> &str {
        "set-locale"
    }

    async fn apply(&self, mut request: OutboundRequest) -> Result<OutboundRequest, ExchangeError> {
        if let Some(language) = self.storage.get(keys::LANGUAGE).filter(|l| !l.is_empty()) {
            request.set_header(LOCALE_HEADER, language);
        }
        Ok(request)
    }
}

/// Adds the bearer token from the credential store.
pub struct SetAccessToken {
    credentials: Arc<CredentialStore>,
}

impl SetAccessToken {
    /// Creates the step.
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl Step<OutboundRequest> for SetAccessToken {
    fn name(&self) -> &str {
        "set-access-token"
    }

    async fn apply(&self, mut request: OutboundRequest) -> Result<OutboundRequest, ExchangeError> {
        if let Some(token) = self.credentials.access_token().await {
            request.set_header(AUTHORIZATION_HEADER, format!("Bearer {token}"));
        }
        Ok(request)
    }
}

// ============================================================================
// Chain
// ============================================================================

/// Builds the outbound chain in its fixed order.
pub fn request_chain(
    connectivity: Arc<dyn Connectivity>,
    coordinator: Arc<RefreshCoordinator>,
    session: Arc<dyn KeyValueStorage>,
    local: Arc<dyn KeyValueStorage>,
    credentials: Arc<CredentialStore>,
) -> Pipeline<OutboundRequest> {
    Pipeline::new("request")
        .then(CheckNetwork::new(connectivity))
        .then(CheckRefreshing::new(coordinator))
        .then(ValidatePayload)
        .then(ExpandUrlTemplate)
        .then(RoutePayload)
        .then(SetCurrency::new(session))
        .then(SetLocale::new(local))
        .then(SetAccessToken::new(credentials))
}

// ============================================================================
// Tests
// ============================================================================
