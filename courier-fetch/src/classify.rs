//! Recovery policy for failed exchanges.
//!
//! [`classify`] tags a failure with what the client should do next. Checks
//! run in a fixed order:
//!
//! 1. a replayed request that failed again signs the user out
//! 2. a request held back by an in-flight refresh waits for it
//! 3. an offline failure is returned as-is
//! 4. HTTP 401, a pre-flagged unauthorized error, or HTTP 400 from a
//!    client that is not signed in triggers (or joins) a refresh
//! 5. anything else is returned to the caller

use courier_core::RequestSpec;

use crate::error::ExchangeError;

/// What to do with a failed exchange.
#[derive(Debug)]
pub enum Recovery {
    /// The host is offline. Not retried.
    Offline(ExchangeError),
    /// Park the request behind the refresh in flight.
    QueueBehindRefresh(ExchangeError),
    /// Start or join a credential refresh, then replay.
    Refresh(ExchangeError),
    /// A replay failed: clear credentials and sign out.
    ForceSignOut(ExchangeError),
    /// Return the error to the caller.
    Propagate(ExchangeError),
}

impl Recovery {
    /// Returns the classified error.
    pub fn into_error(self) -> ExchangeError {
        match self {
            Self::Offline(e)
            | Self::QueueBehindRefresh(e)
            | Self::Refresh(e)
            | Self::ForceSignOut(e)
            | Self::Propagate(e) => e,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Offline(_) => "offline",
            Self::QueueBehindRefresh(_) => "queue-behind-refresh",
            Self::Refresh(_) => "refresh",
            Self::ForceSignOut(_) => "force-sign-out",
            Self::Propagate(_) => "propagate",
        }
    }
}

/// Classifies `error`, raised while exchanging `request`.
///
/// `signed_in` tells whether the signed-in marker is set; only clients
/// that are not signed in treat HTTP 400 as a credential problem.
pub fn classify(error: ExchangeError, request: &RequestSpec, signed_in: bool) -> Recovery {
    if request.is_retry() {
        return Recovery::ForceSignOut(error);
    }

    match error {
        ExchangeError::RefreshInProgress { .. } => Recovery::QueueBehindRefresh(error),
        ExchangeError::Offline { .. } => Recovery::Offline(error),
        _ if needs_refresh(&error, signed_in) => Recovery::Refresh(error),
        _ => Recovery::Propagate(error),
    }
}

fn needs_refresh(error: &ExchangeError, signed_in: bool) -> bool {
    error.is_unauthorized() || (!signed_in && error.status() == Some(400))
}

// ============================================================================
// Tests
// ============================================================================
