//! Single-flight credential refresh.
//!
//! The [`RefreshCoordinator`] is a small state machine (`Idle` or
//! `Refreshing`) plus a FIFO queue of requests waiting on the refresh.
//! Only the request that moves it out of `Idle` starts a refresh; every
//! other request that needs one joins the queue. When the refresh settles
//! the queue is drained in arrival order and the coordinator returns to
//! `Idle` once it is empty.
//!
//! All state lives behind one mutex that is never held across an await.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use courier_core::{RequestSpec, ResponseBody, TokenPair};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::budget::{BudgetExceeded, RefreshBudget};
use crate::error::ExchangeError;
use crate::host::http::Transport;
use crate::request::{AUTHORIZATION_HEADER, OutboundRequest};

/// Header carrying the refresh token on the refresh call.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Default path of the refresh endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/authorization/refreshToken";

/// Default path of the guest token endpoint.
pub const DEFAULT_INITIALIZE_PATH: &str = "/authorization/initializeToken";

/// Outcome delivered to a waiting exchange.
pub type Settlement = Result<ResponseBody, ExchangeError>;

// ============================================================================
// Refresh State
// ============================================================================

/// Whether a refresh is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshState {
    /// No refresh in flight.
    #[default]
    Idle,
    /// A refresh is in flight or its queue is being drained.
    Refreshing,
}

// ============================================================================
// Pending Request
// ============================================================================

/// A request parked until the current refresh settles.
///
/// Settling consumes the record, so it resolves or rejects exactly once.
#[derive(Debug)]
pub struct PendingRequest {
    request: RequestSpec,
    reply: oneshot::Sender<Settlement>,
}

impl PendingRequest {
    fn new(request: RequestSpec) -> (Self, Waiter) {
        let (reply, rx) = oneshot::channel();
        (Self { request, reply }, Waiter(rx))
    }

    /// The parked request.
    pub fn request(&self) -> &RequestSpec {
        &self.request
    }

    /// Delivers a response.
    pub fn resolve(self, body: ResponseBody) {
        self.settle(Ok(body));
    }

    /// Delivers a failure.
    pub fn reject(self, error: ExchangeError) {
        self.settle(Err(error));
    }

    /// Rejects with an unauthorized error tagged with this request.
    pub fn reject_unauthorized(self, message: &str) {
        let error = ExchangeError::unauthorized(message, Some(&self.request));
        self.reject(error);
    }

    fn settle(self, outcome: Settlement) {
        if self.reply.send(outcome).is_err() {
            debug!(url = %self.request.url, "Waiter gone before settlement");
        }
    }
}

/// Receives the outcome of a parked request.
#[derive(Debug)]
pub struct Waiter(oneshot::Receiver<Settlement>);

impl Waiter {
    /// Waits for the request to be replayed or rejected.
    pub async fn settled(self) -> Settlement {
        self.0.await.unwrap_or(Err(ExchangeError::Abandoned))
    }
}

/// How a request that needs a refresh was admitted.
#[derive(Debug)]
pub enum Admission {
    /// The request started a refresh; the caller must run it.
    Leader(Waiter),
    /// The request joined the refresh already in flight.
    Joined(Waiter),
    /// No refresh is in flight any more; send the request again.
    Resend,
    /// Too many refreshes recently; nothing was queued.
    RateLimited(BudgetExceeded),
}

// ============================================================================
// Refresh Coordinator
// ============================================================================

#[derive(Debug, Default)]
struct CoordinatorState {
    state: RefreshState,
    queue: VecDeque<PendingRequest>,
    budget: RefreshBudget,
}

/// Serializes credential refreshes and parks requests behind them.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    inner: Mutex<CoordinatorState>,
}

impl RefreshCoordinator {
    /// Creates a coordinator allowing `max_attempts` refreshes per `window`.
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            inner: Mutex::new(CoordinatorState {
                budget: RefreshBudget::new(max_attempts, window),
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state.
    pub fn state(&self) -> RefreshState {
        self.lock().state
    }

    /// Returns true while a refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.state() == RefreshState::Refreshing
    }

    /// Number of parked requests.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Refresh attempts counted in the current window.
    pub fn attempts_in_window(&self) -> usize {
        self.lock().budget.used_at(Instant::now())
    }

    /// Admits a request that needs fresh credentials.
    ///
    /// Joins the refresh in flight if there is one. Otherwise spends one
    /// unit of the rate-limit budget and makes the caller the leader.
    pub fn admit(&self, request: RequestSpec) -> Admission {
        let mut inner = self.lock();

        if inner.state == RefreshState::Refreshing {
            let (pending, waiter) = PendingRequest::new(request);
            inner.queue.push_back(pending);
            debug!(queued = inner.queue.len(), "Joined in-flight refresh");
            return Admission::Joined(waiter);
        }

        if let Err(exceeded) = inner.budget.try_acquire(Instant::now()) {
            warn!(
                attempts = exceeded.attempts,
                window = ?exceeded.window,
                "Refresh rate limit exceeded"
            );
            return Admission::RateLimited(exceeded);
        }

        let (pending, waiter) = PendingRequest::new(request);
        inner.queue.push_back(pending);
        inner.state = RefreshState::Refreshing;
        info!("Starting credential refresh");
        Admission::Leader(waiter)
    }

    /// Parks a request that was held back by an in-flight refresh.
    ///
    /// Returns [`Admission::Resend`] if that refresh has already settled.
    pub fn queue_behind(&self, request: RequestSpec) -> Admission {
        let mut inner = self.lock();
        if inner.state == RefreshState::Idle {
            return Admission::Resend;
        }
        let (pending, waiter) = PendingRequest::new(request);
        inner.queue.push_back(pending);
        debug!(queued = inner.queue.len(), "Queued behind refresh");
        Admission::Joined(waiter)
    }

    /// Takes every parked request, oldest first.
    ///
    /// Returns `None` and goes back to `Idle` once the queue is empty.
    pub fn next_batch(&self) -> Option<Vec<PendingRequest>> {
        let mut inner = self.lock();
        if inner.queue.is_empty() {
            inner.state = RefreshState::Idle;
            return None;
        }
        Some(inner.queue.drain(..).collect())
    }

    /// Takes every parked request and goes back to `Idle`.
    pub fn fail_all(&self) -> Vec<PendingRequest> {
        let mut inner = self.lock();
        inner.state = RefreshState::Idle;
        inner.queue.drain(..).collect()
    }
}

// ============================================================================
// Token Refresher
// ============================================================================

/// Tokens presented to the refresh endpoint.
#[derive(Clone, Default)]
pub struct RefreshRequest {
    /// Current access token.
    pub access_token: Option<String>,
    /// Current refresh token.
    pub refresh_token: Option<String>,
    /// Whether a user is signed in (guests get an initial token instead).
    pub signed_in: bool,
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("signed_in", &self.signed_in)
            .finish()
    }
}

/// Obtains a new token pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchanges the current tokens for new ones.
    async fn refresh(&self, request: RefreshRequest) -> Result<TokenPair, ExchangeError>;
}

/// [`TokenRefresher`] calling the authorization endpoints directly.
///
/// Signed-in users hit the refresh path, guests the initialize path. The
/// call bypasses both chains.
pub struct HttpTokenRefresher {
    transport: Arc<dyn Transport>,
    refresh_path: String,
    initialize_path: String,
}

impl HttpTokenRefresher {
    /// Creates a refresher using the default endpoint paths.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_paths(transport, DEFAULT_REFRESH_PATH, DEFAULT_INITIALIZE_PATH)
    }

    /// Creates a refresher with custom endpoint paths.
    pub fn with_paths(
        transport: Arc<dyn Transport>,
        refresh_path: impl Into<String>,
        initialize_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            refresh_path: refresh_path.into(),
            initialize_path: initialize_path.into(),
        }
    }

    /// Endpoint used for the given sign-in state.
    pub fn path_for(&self, signed_in: bool) -> &str {
        if signed_in {
            &self.refresh_path
        } else {
            &self.initialize_path
        }
    }

    /// Builds the refresh call.
    pub fn build_request(&self, request: &RefreshRequest) -> OutboundRequest {
        let spec = RequestSpec::get(self.path_for(request.signed_in));
        let mut outbound = OutboundRequest::new(&spec);
        outbound.set_header(
            AUTHORIZATION_HEADER,
            format!(
                "Bearer {}",
                request.access_token.as_deref().unwrap_or("noAccess")
            ),
        );
        outbound.set_header(
            REFRESH_TOKEN_HEADER,
            format!(
                "Bearer {}",
                request.refresh_token.as_deref().unwrap_or("noRefresh")
            ),
        );
        outbound
    }
}

impl fmt::Debug for HttpTokenRefresher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTokenRefresher")
            .field("refresh_path", &self.refresh_path)
            .field("initialize_path", &self.initialize_path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    #[instrument(skip_all, fields(signed_in = request.signed_in))]
    async fn refresh(&self, request: RefreshRequest) -> Result<TokenPair, ExchangeError> {
        let outbound = self.build_request(&request);
        debug!(path = %outbound.url, "Calling refresh endpoint");

        let response = self.transport.send(&outbound).await?;
        serde_json::from_value(response.body.into_json())
            .map_err(|e| ExchangeError::InvalidResponse(format!("refresh response: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
