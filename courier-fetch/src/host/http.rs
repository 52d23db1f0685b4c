//! HTTP transport backed by `reqwest`.
//!
//! The transport sends a fully transformed [`OutboundRequest`] and hands
//! back the raw response. Non-2xx statuses are returned as
//! [`TransportError`] so the exchange layer can classify them.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use courier_core::{Method, ResponseBody};
use reqwest::{Client, header};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::error::TransportError;
use crate::request::OutboundRequest;

/// Content type sent with every request.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Request timeout ceiling (24 hours).
pub const DEFAULT_TIMEOUT_SECS: u64 = 86_400;

/// User agent string for Courier.
const USER_AGENT: &str = concat!("Courier/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Raw Response
// ============================================================================

/// A 2xx response as received from the wire.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    /// HTTP status.
    pub status: u16,
    /// Response headers with lower-case names.
    pub headers: BTreeMap<String, String>,
    /// Decoded body.
    pub body: ResponseBody,
}

impl RawResponse {
    /// Creates a JSON response.
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: ResponseBody::Json(body),
        }
    }

    /// Returns a header value by lower-case name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Sends requests over the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request. Non-2xx responses are errors.
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError>;
}

// ============================================================================
// Reqwest Transport
// ============================================================================

/// [`Transport`] using a shared `reqwest` client.
///
/// Request URLs are resolved against `base_url` by appending the path, so a
/// base of `http://host/api` and a path of `/users/5` give
/// `http://host/api/users/5`. Absolute URLs are used as-is.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Creates a transport with the default timeout ceiling.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a transport with a custom timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let base_url = base_url.into();
        Url::parse(&base_url)
            .map_err(|e| TransportError::network(format!("Invalid base URL {base_url}: {e}")))?;

        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { inner, base_url })
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &Client {
        &self.inner
    }

    /// Resolves a request path against the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url, TransportError> {
        let joined = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };
        Url::parse(&joined).map_err(|e| TransportError::network(format!("Invalid URL {joined}: {e}")))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError> {
        let url = self.resolve(&request.url)?;

        let mut builder = self
            .inner
            .request(to_reqwest_method(request.method), url)
            .header(header::CONTENT_TYPE, DEFAULT_CONTENT_TYPE);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let query = request.query_pairs();
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!("Sending request");
        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;
        let body = decode_body(headers.get("content-type").map(String::as_str), &bytes);

        debug!(status, "Response received");

        if !(200..300).contains(&status) {
            return Err(TransportError::from_response(
                status,
                headers,
                body.as_json().cloned(),
            ));
        }

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

/// Decodes a body by content type.
///
/// JSON (or untyped) bodies are parsed, text is wrapped as a JSON string,
/// anything else is kept as bytes.
fn decode_body(content_type: Option<&str>, bytes: &[u8]) -> ResponseBody {
    if bytes.is_empty() {
        return ResponseBody::Empty;
    }

    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    let is_json = content_type.contains("json");

    if is_json || content_type.is_empty() {
        if let Ok(value) = serde_json::from_slice(bytes) {
            return ResponseBody::Json(value);
        }
    }

    if is_json || content_type.is_empty() || content_type.starts_with("text/") {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return ResponseBody::Json(Value::String(text.to_string()));
        }
    }

    ResponseBody::Binary(bytes.to_vec())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::RequestSpec;
    use serde_json::json;
    use wiremock::matchers::{body_json, header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_resolve_appends_to_base_path() {
        let transport = ReqwestTransport::new("http://localhost/api").unwrap();
        assert_eq!(
            transport.resolve("/users/5").unwrap().as_str(),
            "http://localhost/api/users/5"
        );
        assert_eq!(
            transport.resolve("users").unwrap().as_str(),
            "http://localhost/api/users"
        );
        assert_eq!(
            transport.resolve("https://other.example/x").unwrap().as_str(),
            "https://other.example/x"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ReqwestTransport::new("not a url").is_err());
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(None, b""), ResponseBody::Empty);
        assert_eq!(
            decode_body(Some("application/json; charset=utf-8"), br#"{"a":1}"#),
            ResponseBody::Json(json!({ "a": 1 }))
        );
        assert_eq!(
            decode_body(Some("text/plain"), b"hello"),
            ResponseBody::Json(json!("hello"))
        );
        assert_eq!(
            decode_body(Some("application/octet-stream"), &[0xff, 0x00]),
            ResponseBody::Binary(vec![0xff, 0x00])
        );
    }

    #[tokio::test]
    async fn test_send_get_with_query_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .and(query_param("page", "2"))
            .and(header_eq("authorization", "Bearer abc"))
            .and(header_eq("content-type", DEFAULT_CONTENT_TYPE))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(format!("{}/api", server.uri())).unwrap();
        let mut request = OutboundRequest::new(&RequestSpec::get("/users"));
        request.query = Some(json!({ "page": 2 }));
        request
            .headers
            .insert("authorization".to_string(), "Bearer abc".to_string());

        let response = transport.send(&request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, ResponseBody::Json(json!({ "items": [] })));
    }

    #[tokio::test]
    async fn test_send_post_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/orders"))
            .and(body_json(json!({ "qty": 3 })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 9 })))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(format!("{}/api", server.uri())).unwrap();
        let mut request = OutboundRequest::new(&RequestSpec::post("/orders"));
        request.body = Some(json!({ "qty": 3 }));

        let response = transport.send(&request).await.unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.body.as_json(), Some(&json!({ "id": 9 })));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/me"))
            .respond_with(
                ResponseTemplate::new(401)
                    .insert_header("x-trace-id", "trace-7")
                    .set_body_json(json!({ "message": "token expired" })),
            )
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(format!("{}/api", server.uri())).unwrap();
        let request = OutboundRequest::new(&RequestSpec::get("/me"));

        let err = transport.send(&request).await.unwrap_err();
        assert_eq!(err.status, Some(401));
        assert_eq!(err.trace_id, "trace-7");
        assert_eq!(err.to_string(), "token expired (trace-7)");
    }
}
