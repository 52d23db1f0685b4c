//! Connectivity tracking.
//!
//! [`NetworkStatus`] is a shared online flag consulted before every
//! request. A [`Probe`] updates it by contacting a URL: any HTTP answer
//! means the network is up, a failed connection means it is not.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, info};

/// Reports whether the host can reach the network.
pub trait Connectivity: Send + Sync {
    /// Returns false when the host is known to be offline.
    fn is_online(&self) -> bool;
}

// ============================================================================
// Network Status
// ============================================================================

/// Shared online/offline flag.
#[derive(Debug)]
pub struct NetworkStatus {
    online: AtomicBool,
}

impl NetworkStatus {
    /// Creates a status that starts online.
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
        }
    }

    /// Creates a status that starts offline.
    pub fn offline() -> Self {
        Self {
            online: AtomicBool::new(false),
        }
    }

    /// Updates the flag.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous != online {
            info!(online, "Network status changed");
        }
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl Connectivity for NetworkStatus {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Probe
// ============================================================================

/// Result of a probe check.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// Whether the endpoint answered at all.
    pub online: bool,
    /// Response time in milliseconds.
    pub response_time_ms: u64,
    /// Status code, if a response arrived.
    pub status_code: Option<u16>,
    /// Error message, if the request failed.
    pub error: Option<String>,
}

/// Checks reachability of a URL.
#[derive(Debug, Clone)]
pub struct Probe {
    /// The URL to probe.
    pub url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Probe {
    /// Creates a probe for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Sets the timeout for this probe.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs the probe.
    pub async fn check(&self, client: &Client) -> ProbeResult {
        let start = Instant::now();
        debug!(url = %self.url, "Running probe");

        let result = client.head(&self.url).timeout(self.timeout).send().await;
        let response_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(response) => ProbeResult {
                online: true,
                response_time_ms,
                status_code: Some(response.status().as_u16()),
                error: None,
            },
            Err(e) => ProbeResult {
                online: false,
                response_time_ms,
                status_code: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Runs the probe and records the outcome in `status`.
    pub async fn update(&self, client: &Client, status: &NetworkStatus) -> ProbeResult {
        let result = self.check(client).await;
        status.set_online(result.online);
        result
    }
}

// ============================================================================
// Tests
// ============================================================================
