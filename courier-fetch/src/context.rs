//! Exchange context: settings and host collaborators.
//!
//! The context bundles everything an [`ExchangeClient`](crate::ExchangeClient)
//! talks to outside of itself:
//! - Transport for network requests
//! - Token storage for credentials
//! - Session and local key-value stores for request preferences
//! - Connectivity flag
//! - Navigator for sign-out alerts and redirects
//! - Token refresher

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::budget::{DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW};
use crate::error::ExchangeError;
use crate::host::http::{DEFAULT_TIMEOUT_SECS, ReqwestTransport, Transport};
use crate::host::keychain::{MemoryTokenStorage, TokenStorage};
use crate::host::navigator::{HeadlessNavigator, Navigator};
use crate::host::network::{Connectivity, NetworkStatus};
use crate::host::storage::{KeyValueStorage, MemoryStorage};
use crate::refresh::{
    DEFAULT_INITIALIZE_PATH, DEFAULT_REFRESH_PATH, HttpTokenRefresher, TokenRefresher,
};

/// Default base URL of the API.
pub const DEFAULT_BASE_URL: &str = "http://localhost/api";

/// Default path of the sign-in page.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

// ============================================================================
// Exchange Settings
// ============================================================================

/// Settings for exchanges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSettings {
    /// Base URL request paths are appended to.
    pub base_url: String,
    /// Transport timeout.
    pub timeout: Duration,
    /// Sign-in page; sign-outs redirect here.
    pub login_path: String,
    /// Refresh endpoint for signed-in users.
    pub refresh_path: String,
    /// Token bootstrap endpoint for guests.
    pub initialize_path: String,
    /// Refresh attempts allowed per window.
    pub max_refresh_attempts: u32,
    /// Rate-limit window for refresh attempts.
    pub refresh_window: Duration,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            initialize_path: DEFAULT_INITIALIZE_PATH.to_string(),
            max_refresh_attempts: DEFAULT_MAX_ATTEMPTS,
            refresh_window: DEFAULT_WINDOW,
        }
    }
}

impl ExchangeSettings {
    /// Creates settings for the given base URL.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Sets the transport timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the refresh rate limit.
    #[must_use]
    pub fn with_refresh_limit(mut self, max_attempts: u32, window: Duration) -> Self {
        self.max_refresh_attempts = max_attempts;
        self.refresh_window = window;
        self
    }
}

// ============================================================================
// Exchange Context
// ============================================================================

/// Host collaborators used by an exchange client.
pub struct ExchangeContext {
    /// Request transport.
    pub transport: Arc<dyn Transport>,
    /// Persistent token storage.
    pub tokens: Arc<dyn TokenStorage>,
    /// Session-scoped preferences (currency).
    pub session: Arc<dyn KeyValueStorage>,
    /// Durable preferences (language).
    pub local: Arc<dyn KeyValueStorage>,
    /// Online/offline flag.
    pub connectivity: Arc<dyn Connectivity>,
    /// Alerts and redirects.
    pub navigator: Arc<dyn Navigator>,
    /// Obtains new tokens.
    pub refresher: Arc<dyn TokenRefresher>,
    /// Exchange settings.
    pub settings: ExchangeSettings,
}

impl ExchangeContext {
    /// Creates a builder for customizing the context.
    pub fn builder() -> ExchangeContextBuilder {
        ExchangeContextBuilder::new()
    }
}

impl std::fmt::Debug for ExchangeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Exchange Context Builder
// ============================================================================

/// Builder for constructing an `ExchangeContext`.
///
/// Unset collaborators default to a reqwest transport on the configured
/// base URL, in-memory storage, an online network flag and a headless
/// navigator.
#[derive(Default)]
pub struct ExchangeContextBuilder {
    transport: Option<Arc<dyn Transport>>,
    tokens: Option<Arc<dyn TokenStorage>>,
    session: Option<Arc<dyn KeyValueStorage>>,
    local: Option<Arc<dyn KeyValueStorage>>,
    connectivity: Option<Arc<dyn Connectivity>>,
    navigator: Option<Arc<dyn Navigator>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    settings: ExchangeSettings,
}

impl ExchangeContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the token storage.
    #[must_use]
    pub fn tokens(mut self, tokens: Arc<dyn TokenStorage>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Sets the session-scoped preference store.
    #[must_use]
    pub fn session(mut self, session: Arc<dyn KeyValueStorage>) -> Self {
        self.session = Some(session);
        self
    }

    /// Sets the durable preference store.
    #[must_use]
    pub fn local(mut self, local: Arc<dyn KeyValueStorage>) -> Self {
        self.local = Some(local);
        self
    }

    /// Sets the connectivity source.
    #[must_use]
    pub fn connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Sets the navigator.
    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Sets the token refresher.
    #[must_use]
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Sets the exchange settings.
    #[must_use]
    pub fn settings(mut self, settings: ExchangeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.settings.base_url = base_url.into();
        self
    }

    /// Sets the login path.
    #[must_use]
    pub fn login_path(mut self, login_path: impl Into<String>) -> Self {
        self.settings.login_path = login_path.into();
        self
    }

    /// Builds the context.
    ///
    /// Fails only when the default transport cannot be created.
    pub fn build(self) -> Result<ExchangeContext, ExchangeError> {
        let settings = self.settings;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                debug!(base_url = %settings.base_url, "Creating default transport");
                Arc::new(ReqwestTransport::with_timeout(
                    settings.base_url.clone(),
                    settings.timeout,
                )?)
            }
        };

        let refresher = self.refresher.unwrap_or_else(|| {
            Arc::new(HttpTokenRefresher::with_paths(
                Arc::clone(&transport),
                settings.refresh_path.clone(),
                settings.initialize_path.clone(),
            ))
        });

        Ok(ExchangeContext {
            transport,
            tokens: self
                .tokens
                .unwrap_or_else(|| Arc::new(MemoryTokenStorage::new())),
            session: self.session.unwrap_or_else(|| Arc::new(MemoryStorage::new())),
            local: self.local.unwrap_or_else(|| Arc::new(MemoryStorage::new())),
            connectivity: self
                .connectivity
                .unwrap_or_else(|| Arc::new(NetworkStatus::new())),
            navigator: self
                .navigator
                .unwrap_or_else(|| Arc::new(HeadlessNavigator::new())),
            refresher,
            settings,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
