//! User-facing side effects of a forced sign-out.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use tracing::{info, warn};

/// Where the user is and how to move them.
pub trait Navigator: Send + Sync {
    /// Current location path.
    fn location(&self) -> String;

    /// Navigates to `path`.
    fn redirect(&self, path: &str);

    /// Shows a message to the user.
    fn alert(&self, message: &str);
}

/// Alerts kept by [`HeadlessNavigator`]; older ones are dropped.
pub const MAX_ALERTS: usize = 32;

/// Navigator for processes without a UI.
///
/// Tracks the location in memory and keeps the latest [`MAX_ALERTS`]
/// alerts, logging both.
#[derive(Debug, Default)]
pub struct HeadlessNavigator {
    location: RwLock<String>,
    alerts: RwLock<VecDeque<String>>,
}

impl HeadlessNavigator {
    /// Creates a navigator at `/`.
    pub fn new() -> Self {
        Self::at("/")
    }

    /// Creates a navigator at `location`.
    pub fn at(location: impl Into<String>) -> Self {
        Self {
            location: RwLock::new(location.into()),
            alerts: RwLock::new(VecDeque::new()),
        }
    }

    /// Retained alerts, oldest first.
    pub fn alerts(&self) -> Vec<String> {
        self.alerts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Removes and returns the retained alerts, oldest first.
    pub fn take_alerts(&self) -> Vec<String> {
        self.alerts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}

impl Navigator for HeadlessNavigator {
    fn location(&self) -> String {
        self.location
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn redirect(&self, path: &str) {
        info!(to = %path, "Redirecting");
        *self.location.write().unwrap_or_else(PoisonError::into_inner) = path.to_string();
    }

    fn alert(&self, message: &str) {
        warn!(message = %message, "User alert");
        let mut alerts = self.alerts.write().unwrap_or_else(PoisonError::into_inner);
        if alerts.len() == MAX_ALERTS {
            alerts.pop_front();
        }
        alerts.push_back(message.to_string());
    }
}
