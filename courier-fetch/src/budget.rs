//! Rate limit for credential refresh attempts.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::ExchangeError;

/// Default number of refresh attempts allowed per window.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default rate-limit window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// The budget was spent when a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetExceeded {
    /// Attempts allowed per window.
    pub attempts: u32,
    /// Length of the window.
    pub window: Duration,
}

impl From<BudgetExceeded> for ExchangeError {
    fn from(exceeded: BudgetExceeded) -> Self {
        ExchangeError::RefreshRateLimited {
            attempts: exceeded.attempts,
            window: exceeded.window,
        }
    }
}

/// Sliding-window limit on refresh attempts.
///
/// Remembers when each recent attempt started and allows a new one only
/// while fewer than `max_attempts` started within the last `window`, so no
/// window of that length ever holds more than `max_attempts` refreshes.
#[derive(Debug, Clone)]
pub struct RefreshBudget {
    max_attempts: u32,
    window: Duration,
    recent: VecDeque<Instant>,
}

impl RefreshBudget {
    /// Creates a budget.
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            recent: VecDeque::new(),
        }
    }

    /// Attempts allowed per window.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Length of the window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Attempts started within the window ending at `now`.
    pub fn used_at(&self, now: Instant) -> usize {
        self.recent
            .iter()
            .filter(|started| now.duration_since(**started) < self.window)
            .count()
    }

    /// Records an attempt at `now`, or refuses it if the budget is spent.
    pub fn try_acquire(&mut self, now: Instant) -> Result<(), BudgetExceeded> {
        while let Some(oldest) = self.recent.front() {
            if now.duration_since(*oldest) >= self.window {
                self.recent.pop_front();
            } else {
                break;
            }
        }

        if self.recent.len() >= self.max_attempts as usize {
            return Err(BudgetExceeded {
                attempts: self.max_attempts,
                window: self.window,
            });
        }

        self.recent.push_back(now);
        Ok(())
    }
}

impl Default for RefreshBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW)
    }
}
