//! The exchange client.
//!
//! [`ExchangeClient::exchange`] runs a request through the outbound chain,
//! the transport and the inbound chain. Failures go through [`classify`];
//! credential failures are parked on the [`RefreshCoordinator`] and
//! replayed once a single shared refresh settles.

use std::sync::Arc;

use courier_core::{RequestSpec, ResponseBody};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::classify::{Recovery, classify};
use crate::context::{ExchangeContext, ExchangeSettings};
use crate::credentials::CredentialStore;
use crate::error::{ExchangeError, SESSION_EXPIRED_MESSAGE, UNAUTHORIZED_MESSAGE};
use crate::host::http::Transport;
use crate::host::navigator::Navigator;
use crate::pipeline::Pipeline;
use crate::refresh::{Admission, PendingRequest, RefreshCoordinator, RefreshRequest, TokenRefresher};
use crate::request::{OutboundRequest, request_chain};
use crate::response::{InboundResponse, response_chain};

/// HTTP client with credential refresh.
///
/// Cheap to clone; clones share credentials, the refresh coordinator and
/// its queue.
#[derive(Clone)]
pub struct ExchangeClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    settings: ExchangeSettings,
    transport: Arc<dyn Transport>,
    navigator: Arc<dyn Navigator>,
    refresher: Arc<dyn TokenRefresher>,
    credentials: Arc<CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    request_chain: Pipeline<OutboundRequest>,
    response_chain: Pipeline<InboundResponse>,
}

impl ExchangeClient {
    /// Creates a client over the given context.
    pub fn new(ctx: ExchangeContext) -> Self {
        let credentials = Arc::new(CredentialStore::new(ctx.tokens));
        let coordinator = Arc::new(RefreshCoordinator::new(
            ctx.settings.max_refresh_attempts,
            ctx.settings.refresh_window,
        ));

        let request_chain = request_chain(
            ctx.connectivity,
            Arc::clone(&coordinator),
            ctx.session,
            ctx.local,
            Arc::clone(&credentials),
        );
        let response_chain = response_chain(Arc::clone(&credentials));

        Self {
            inner: Arc::new(ClientInner {
                settings: ctx.settings,
                transport: ctx.transport,
                navigator: ctx.navigator,
                refresher: ctx.refresher,
                credentials,
                coordinator,
                request_chain,
                response_chain,
            }),
        }
    }

    /// Runs one exchange.
    pub async fn exchange(&self, spec: RequestSpec) -> Result<ResponseBody, ExchangeError> {
        self.inner.exchange(spec).await
    }

    /// Runs one exchange and deserializes the body.
    pub async fn exchange_json<T: DeserializeOwned>(
        &self,
        spec: RequestSpec,
    ) -> Result<T, ExchangeError> {
        let body = self.exchange(spec).await?;
        serde_json::from_value(body.into_json())
            .map_err(|e| ExchangeError::InvalidResponse(e.to_string()))
    }

    /// Clears credentials, alerts the user and redirects to the login page.
    pub async fn sign_out(&self, reason: &str) {
        self.inner.sign_out(reason).await;
    }

    /// The credential store.
    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    /// The refresh coordinator.
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    /// The exchange settings.
    pub fn settings(&self) -> &ExchangeSettings {
        &self.inner.settings
    }

    /// Names of the outbound steps, in order.
    pub fn request_steps(&self) -> Vec<&str> {
        self.inner.request_chain.step_names()
    }

    /// Names of the inbound steps, in order.
    pub fn response_steps(&self) -> Vec<&str> {
        self.inner.response_chain.step_names()
    }
}

impl std::fmt::Debug for ExchangeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeClient")
            .field("settings", &self.inner.settings)
            .field("refresh_state", &self.inner.coordinator.state())
            .finish_non_exhaustive()
    }
}

impl ClientInner {
    #[instrument(skip(self, spec), fields(method = %spec.method, url = %spec.url))]
    async fn exchange(self: &Arc<Self>, spec: RequestSpec) -> Result<ResponseBody, ExchangeError> {
        loop {
            let error = match self.dispatch(&spec).await {
                Ok(body) => return Ok(body),
                Err(error) => error,
            };

            let signed_in = self.credentials.is_signed_in().await;
            let recovery = classify(error, &spec, signed_in);
            debug!(recovery = recovery.label(), "Exchange failed");

            let admission = match recovery {
                Recovery::Offline(error) | Recovery::Propagate(error) => return Err(error),
                Recovery::ForceSignOut(error) => {
                    self.sign_out(&error.to_string()).await;
                    return Err(error);
                }
                Recovery::QueueBehindRefresh(_) => self.coordinator.queue_behind(spec.clone()),
                Recovery::Refresh(_) => self.coordinator.admit(spec.clone()),
            };

            match admission {
                Admission::Leader(waiter) => {
                    self.spawn_refresh();
                    return waiter.settled().await;
                }
                Admission::Joined(waiter) => return waiter.settled().await,
                Admission::Resend => debug!("Refresh already settled, resending"),
                Admission::RateLimited(exceeded) => {
                    let error = ExchangeError::from(exceeded);
                    self.sign_out(&error.to_string()).await;
                    return Err(error);
                }
            }
        }
    }

    /// Request chain, transport, response chain.
    async fn dispatch(&self, spec: &RequestSpec) -> Result<ResponseBody, ExchangeError> {
        let outbound = self.request_chain.run(OutboundRequest::new(spec)).await?;
        let raw = self.transport.send(&outbound).await?;
        let inbound = self
            .response_chain
            .run(InboundResponse::new(spec, raw))
            .await?;
        Ok(inbound.body)
    }

    /// Runs the refresh on its own task so it settles even if the leading
    /// exchange is dropped.
    fn spawn_refresh(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        tokio::spawn(
            async move { inner.settle_refresh().await }.instrument(info_span!("refresh")),
        );
    }

    async fn settle_refresh(&self) {
        let request = RefreshRequest {
            access_token: self.credentials.access_token().await,
            refresh_token: self.credentials.refresh_token().await,
            signed_in: self.credentials.is_signed_in().await,
        };

        let outcome = match self.refresher.refresh(request).await {
            Ok(pair) => self
                .credentials
                .store(&pair.into_credential())
                .await
                .map_err(ExchangeError::from),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                info!("Credential refresh succeeded");
                self.replay_queue().await;
            }
            Err(error) => self.abort_refresh(&error).await,
        }
    }

    /// Replays parked requests batch by batch until the queue is empty.
    ///
    /// Once a replay fails the user is signed out and every request still
    /// waiting is rejected.
    async fn replay_queue(&self) {
        let mut signed_out = false;

        while let Some(batch) = self.coordinator.next_batch() {
            if signed_out {
                reject_all(batch, UNAUTHORIZED_MESSAGE);
                continue;
            }

            debug!(count = batch.len(), "Replaying queued requests");
            let replays = batch.into_iter().map(|pending| async move {
                let replay = pending.request().next_attempt();
                let outcome = self.dispatch(&replay).await;
                (pending, replay, outcome)
            });

            for (pending, replay, outcome) in join_all(replays).await {
                let error = match outcome {
                    Ok(body) => {
                        pending.resolve(body);
                        continue;
                    }
                    Err(error) => error,
                };

                match classify(error, &replay, false) {
                    Recovery::ForceSignOut(error) => {
                        warn!(url = %replay.url, error = %error, "Replayed request failed");
                        if !signed_out {
                            self.sign_out(&error.to_string()).await;
                            signed_out = true;
                        }
                        if error.is_unauthorized() {
                            pending.reject_unauthorized(SESSION_EXPIRED_MESSAGE);
                        } else {
                            pending.reject(error);
                        }
                    }
                    other => pending.reject(other.into_error()),
                }
            }
        }
    }

    async fn abort_refresh(&self, error: &ExchangeError) {
        warn!(error = %error, "Credential refresh failed");
        self.sign_out(&error.to_string()).await;
        reject_all(self.coordinator.fail_all(), UNAUTHORIZED_MESSAGE);
    }

    async fn sign_out(&self, reason: &str) {
        if let Err(e) = self.credentials.clear().await {
            warn!(error = %e, "Failed to clear credentials during sign-out");
        }

        self.navigator.alert(reason);

        let login_path = &self.settings.login_path;
        if self.navigator.location().contains(login_path.as_str()) {
            debug!("Already on the login page");
        } else {
            self.navigator.redirect(login_path);
        }
    }
}

fn reject_all(pending: Vec<PendingRequest>, message: &str) {
    if !pending.is_empty() {
        debug!(count = pending.len(), "Rejecting queued requests");
    }
    for request in pending {
        request.reject_unauthorized(message);
    }
}
