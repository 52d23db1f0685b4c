//! Shared fixtures for exchange tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use courier_core::TokenPair;
use courier_fetch::{
    ExchangeClient, ExchangeContext, ExchangeError, ExchangeSettings, HeadlessNavigator,
    MemoryStorage, MemoryTokenStorage, NetworkStatus, OutboundRequest, RawResponse,
    RefreshRequest, TokenRefresher, Transport, TransportError,
};
use serde_json::{Value, json};

/// Access token handed out by [`CountingRefresher`].
pub const FRESH_TOKEN: &str = "fresh-access";

type Handler = dyn Fn(&OutboundRequest) -> Result<RawResponse, TransportError> + Send + Sync;

/// Transport that records every request and answers through a closure.
pub struct MockTransport {
    seen: Mutex<Vec<OutboundRequest>>,
    latency: Duration,
    handler: Box<Handler>,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&OutboundRequest) -> Result<RawResponse, TransportError>
        + Send
        + Sync
        + 'static,
    ) -> Arc<Self> {
        Self::with_latency(Duration::ZERO, handler)
    }

    /// Like [`MockTransport::new`], but every call suspends for `latency`
    /// before answering.
    pub fn with_latency(
        latency: Duration,
        handler: impl Fn(&OutboundRequest) -> Result<RawResponse, TransportError>
        + Send
        + Sync
        + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            latency,
            handler: Box::new(handler),
        })
    }

    /// Answers 200 with `body` to everything.
    pub fn ok(body: Value) -> Arc<Self> {
        Self::new(move |_| Ok(RawResponse::json(200, body.clone())))
    }

    /// Answers `status` to everything except requests carrying the fresh token.
    pub fn until_refreshed(status: u16) -> Arc<Self> {
        Self::slow_until_refreshed(status, Duration::ZERO)
    }

    /// [`MockTransport::until_refreshed`] with a delay on every answer.
    pub fn slow_until_refreshed(status: u16, latency: Duration) -> Arc<Self> {
        let fresh = format!("Bearer {FRESH_TOKEN}");
        Self::with_latency(latency, move |request| {
            if request.header("authorization") == Some(fresh.as_str()) {
                Ok(RawResponse::json(200, json!({ "url": request.url })))
            } else {
                Err(http_error(status))
            }
        })
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.handler)(request)
    }
}

pub fn http_error(status: u16) -> TransportError {
    TransportError::from_response(status, BTreeMap::new(), Some(json!({ "message": "denied" })))
}

/// Refresher that counts calls and hands out [`FRESH_TOKEN`].
pub struct CountingRefresher {
    calls: AtomicUsize,
    delay: Duration,
    fail: bool,
}

impl CountingRefresher {
    pub fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for CountingRefresher {
    async fn refresh(&self, _request: RefreshRequest) -> Result<TokenPair, ExchangeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(http_error(403).into());
        }
        Ok(TokenPair {
            access_token: FRESH_TOKEN.to_string(),
            refresh_token: "fresh-refresh".to_string(),
        })
    }
}

/// A client plus handles on its collaborators.
pub struct Harness {
    pub client: ExchangeClient,
    pub transport: Arc<MockTransport>,
    pub refresher: Arc<CountingRefresher>,
    pub navigator: Arc<HeadlessNavigator>,
    pub tokens: Arc<MemoryTokenStorage>,
    pub network: Arc<NetworkStatus>,
    pub session: Arc<MemoryStorage>,
    pub local: Arc<MemoryStorage>,
}

pub struct HarnessBuilder {
    transport: Arc<MockTransport>,
    refresher: Arc<CountingRefresher>,
    navigator: Arc<HeadlessNavigator>,
    settings: ExchangeSettings,
}

impl HarnessBuilder {
    pub fn new(transport: Arc<MockTransport>) -> Self {
        Self {
            transport,
            refresher: CountingRefresher::new(),
            navigator: Arc::new(HeadlessNavigator::at("/orders")),
            settings: ExchangeSettings::default(),
        }
    }

    pub fn refresher(mut self, refresher: Arc<CountingRefresher>) -> Self {
        self.refresher = refresher;
        self
    }

    pub fn navigator(mut self, navigator: HeadlessNavigator) -> Self {
        self.navigator = Arc::new(navigator);
        self
    }

    pub fn refresh_limit(mut self, max_attempts: u32, window: Duration) -> Self {
        self.settings = self.settings.with_refresh_limit(max_attempts, window);
        self
    }

    pub fn build(self) -> Harness {
        let tokens = Arc::new(MemoryTokenStorage::new());
        let network = Arc::new(NetworkStatus::new());
        let session = Arc::new(MemoryStorage::new());
        let local = Arc::new(MemoryStorage::new());

        let ctx = ExchangeContext::builder()
            .settings(self.settings)
            .transport(self.transport.clone())
            .refresher(self.refresher.clone())
            .navigator(self.navigator.clone())
            .tokens(tokens.clone())
            .connectivity(network.clone())
            .session(session.clone())
            .local(local.clone())
            .build()
            .unwrap();

        Harness {
            client: ExchangeClient::new(ctx),
            transport: self.transport,
            refresher: self.refresher,
            navigator: self.navigator,
            tokens,
            network,
            session,
            local,
        }
    }
}

/// Lets the background refresh task finish draining.
pub async fn settle(client: &ExchangeClient) {
    while client.coordinator().is_refreshing() {
        tokio::task::yield_now().await;
    }
}

/// Unsigned JWT with the given claims.
pub fn jwt(claims: &Value) -> String {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}
