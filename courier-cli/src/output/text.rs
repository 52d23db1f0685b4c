//! Text output formatting with colors.

use chrono::{DateTime, Utc};
use courier_core::ResponseBody;
use courier_fetch::ProbeResult;
use courier_store::ClientConfig;

use super::json::TokenStatus;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats a response body.
    ///
    /// JSON strings are printed raw, other JSON pretty-printed.
    pub fn format_body(&self, body: &ResponseBody) -> String {
        match body {
            ResponseBody::Json(serde_json::Value::String(text)) => text.clone(),
            ResponseBody::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ResponseBody::Binary(bytes) => self.dim(&format!("<binary, {} bytes>", bytes.len())),
            ResponseBody::Empty => self.dim("<empty>"),
        }
    }

    /// Formats stored credential state.
    pub fn format_token_status(&self, status: &TokenStatus, now: DateTime<Utc>) -> String {
        let mut lines = vec![self.bold("Credentials"), "─".repeat(40)];

        lines.push(format!(
            "{:<15} {}",
            "Signed in:",
            if status.signed_in {
                self.green("yes")
            } else {
                self.dim("no (guest)")
            }
        ));
        lines.push(format!("{:<15} {}", "Access token:", self.presence(status.access_token)));

        let mut refresh = self.presence(status.refresh_token);
        if let Some(expiry) = status.refresh_expiry {
            refresh = format!("{refresh} {}", self.format_expiry(expiry, now));
        }
        lines.push(format!("{:<15} {}", "Refresh token:", refresh));

        if let Some(subject) = &status.subject {
            lines.push(format!("{:<15} {}", "Subject:", subject));
        }

        lines.push(format!("{:<15} {}", "Backend:", status.backend));
        lines.join("\n")
    }

    /// Formats the client configuration.
    pub fn format_config(&self, config: &ClientConfig) -> String {
        let rows = [
            ("Base URL", config.base_url.clone()),
            ("Timeout", format!("{}s", config.timeout_secs)),
            ("Login path", config.login_path.clone()),
            ("Refresh path", config.refresh_path.clone()),
            ("Guest path", config.initialize_path.clone()),
            (
                "Refresh limit",
                format!(
                    "{} per {}s",
                    config.max_refresh_attempts, config.refresh_window_secs
                ),
            ),
            ("Token backend", config.token_backend.to_string()),
            ("Log level", config.log_level.to_string()),
        ];

        let mut lines = vec![self.bold("Courier Configuration"), "─".repeat(40)];
        lines.extend(
            rows.iter()
                .map(|(label, value)| format!("{:<15} {}", format!("{label}:"), value)),
        );
        lines.join("\n")
    }

    /// Formats a reachability probe.
    pub fn format_probe(&self, url: &str, result: &ProbeResult) -> String {
        let status = if result.online {
            let code = result
                .status_code
                .map_or_else(String::new, |c| format!(" HTTP {c}"));
            format!("{}{code} in {}ms", self.green("✓ online"), result.response_time_ms)
        } else {
            let reason = result.error.as_deref().unwrap_or("unreachable");
            format!("{} {}", self.red("✗ offline"), self.dim(reason))
        };
        format!("{} {}", self.bold(url), status)
    }

    /// Formats an error message.
    pub fn format_error(&self, context: &str, error: &str) -> String {
        format!("{}: {} - {}", self.bold(context), self.red("Error"), error)
    }

    /// Formats time left until `expires_at`.
    pub fn format_expiry(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
        let remaining = expires_at - now;
        if remaining.num_seconds() <= 0 {
            return self.red("(expired)");
        }

        let text = if remaining.num_days() > 0 {
            format!(
                "(expires in {}d {}h)",
                remaining.num_days(),
                remaining.num_hours() % 24
            )
        } else if remaining.num_hours() > 0 {
            format!(
                "(expires in {}h {}m)",
                remaining.num_hours(),
                remaining.num_minutes() % 60
            )
        } else {
            format!("(expires in {}m)", remaining.num_minutes().max(1))
        };

        if remaining.num_hours() < 1 {
            self.red(&text)
        } else if remaining.num_days() < 1 {
            self.yellow(&text)
        } else {
            self.dim(&text)
        }
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn presence(&self, present: bool) -> String {
        if present {
            self.green("✓ present")
        } else {
            self.red("✗ missing")
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}
