//! Client configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use courier_fetch::ExchangeSettings;
use courier_fetch::budget::{DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW};
use courier_fetch::context::{DEFAULT_BASE_URL, DEFAULT_LOGIN_PATH};
use courier_fetch::host::http::DEFAULT_TIMEOUT_SECS;
use courier_fetch::refresh::{DEFAULT_INITIALIZE_PATH, DEFAULT_REFRESH_PATH};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{default_config_path, load_json, save_json};

// ============================================================================
// Config Types
// ============================================================================

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL request paths are appended to.
    pub base_url: String,
    /// Transport timeout in seconds.
    pub timeout_secs: u64,
    /// Sign-in page; forced sign-outs redirect here.
    pub login_path: String,
    /// Refresh endpoint for signed-in users.
    pub refresh_path: String,
    /// Token bootstrap endpoint for guests.
    pub initialize_path: String,
    /// Refresh attempts allowed per window.
    pub max_refresh_attempts: u32,
    /// Rate-limit window in seconds.
    pub refresh_window_secs: u64,
    /// Where tokens are kept.
    pub token_backend: TokenBackend,
    /// Log level.
    pub log_level: LogLevel,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            initialize_path: DEFAULT_INITIALIZE_PATH.to_string(),
            max_refresh_attempts: DEFAULT_MAX_ATTEMPTS,
            refresh_window_secs: DEFAULT_WINDOW.as_secs(),
            token_backend: TokenBackend::default(),
            log_level: LogLevel::default(),
        }
    }
}

/// Token storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenBackend {
    /// JSON file in the data directory.
    #[default]
    File,
    /// System keychain.
    Keychain,
    /// Process memory; nothing survives exit.
    Memory,
}

impl std::fmt::Display for TokenBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenBackend::File => write!(f, "file"),
            TokenBackend::Keychain => write!(f, "keychain"),
            TokenBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    #[default]
    Warn,
    /// Info level logging.
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

// ============================================================================
// Loading & Saving
// ============================================================================

impl ClientConfig {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        default_config_path()
    }

    /// Loads configuration from the default path.
    pub async fn load() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path()).await
    }

    /// Loads configuration from a specific path. A missing file means defaults.
    pub async fn load_from(path: &Path) -> Result<Self, StoreError> {
        let config: Self = match load_json(path).await {
            Ok(config) => config,
            Err(e) if e.is_not_found() => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e),
        };

        config.validate()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Saves configuration to the default path.
    pub async fn save(&self) -> Result<(), StoreError> {
        self.save_to(&Self::default_path()).await
    }

    /// Saves configuration to a specific path.
    pub async fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        save_json(path, self).await?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Checks values that would make the client unusable.
    pub fn validate(&self) -> Result<(), StoreError> {
        url::Url::parse(&self.base_url)
            .map_err(|e| StoreError::Config(format!("base_url {:?}: {e}", self.base_url)))?;
        if self.timeout_secs == 0 {
            return Err(StoreError::Config("timeout_secs must be positive".to_string()));
        }
        if self.refresh_window_secs == 0 {
            return Err(StoreError::Config(
                "refresh_window_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Converts into runtime exchange settings.
    pub fn to_settings(&self) -> ExchangeSettings {
        ExchangeSettings {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            login_path: self.login_path.clone(),
            refresh_path: self.refresh_path.clone(),
            initialize_path: self.initialize_path.clone(),
            max_refresh_attempts: self.max_refresh_attempts,
            refresh_window: Duration::from_secs(self.refresh_window_secs),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
