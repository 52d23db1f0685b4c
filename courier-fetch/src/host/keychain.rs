//! Persistent token storage.
//!
//! Tokens are stored as independent entries under well-known names, each
//! with an optional expiry. An expired entry reads as absent.
//!
//! - [`KeychainTokenStorage`] uses the system keychain via `keyring`
//!   (macOS Keychain Services, Windows Credential Manager, Linux Secret
//!   Service).
//! - [`MemoryTokenStorage`] keeps tokens for the lifetime of the process.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::StorageError;

/// Default keychain service name.
pub const DEFAULT_SERVICE: &str = "courier";

// ============================================================================
// Stored Token
// ============================================================================

/// A token value with its optional expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// The token.
    pub value: String,
    /// When the entry stops being valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Creates a stored token.
    pub fn new(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Returns true if the entry has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

// ============================================================================
// Token Storage Trait
// ============================================================================

/// Persistent key-value storage for tokens.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Reads a token. Missing and expired entries are `Ok(None)`.
    async fn get_token(&self, name: &str) -> Result<Option<String>, StorageError>;

    /// Writes a token with an optional expiry.
    async fn set_token(
        &self,
        name: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError>;

    /// Removes a token. Removing a missing entry succeeds.
    async fn remove_token(&self, name: &str) -> Result<(), StorageError>;

    /// Returns true if a live entry exists.
    async fn has_token(&self, name: &str) -> bool {
        matches!(self.get_token(name).await, Ok(Some(_)))
    }
}

// ============================================================================
// Keychain Implementation
// ============================================================================

/// Token storage in the system keychain.
///
/// Each token is one keychain entry under `service`, holding a JSON
/// [`StoredToken`]. Plain (non-JSON) secrets are read as tokens without
/// an expiry.
#[derive(Debug, Clone)]
pub struct KeychainTokenStorage {
    service: String,
}

impl KeychainTokenStorage {
    /// Creates storage under the default service name.
    pub fn new() -> Self {
        Self::with_service(DEFAULT_SERVICE)
    }

    /// Creates storage under a custom service name.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Returns the service name.
    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, name: &str) -> Result<Entry, StorageError> {
        Entry::new(&self.service, name).map_err(|e| StorageError::Platform(e.to_string()))
    }
}

impl Default for KeychainTokenStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStorage for KeychainTokenStorage {
    async fn get_token(&self, name: &str) -> Result<Option<String>, StorageError> {
        let entry = self.entry(name)?;

        let secret = match entry.get_password() {
            Ok(secret) => secret,
            Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, token = %name, "Token not found");
                return Ok(None);
            }
            Err(e) => {
                warn!(service = %self.service, token = %name, error = %e, "Failed to read token");
                return Err(e.into());
            }
        };

        let stored = serde_json::from_str::<StoredToken>(&secret)
            .unwrap_or_else(|_| StoredToken::new(secret, None));

        if stored.is_expired_at(Utc::now()) {
            debug!(service = %self.service, token = %name, "Token expired, removing");
            self.remove_token(name).await?;
            return Ok(None);
        }

        Ok(Some(stored.value))
    }

    async fn set_token(
        &self,
        name: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        debug!(service = %self.service, token = %name, "Storing token in keychain");

        let payload = serde_json::to_string(&StoredToken::new(value, expires_at))?;
        self.entry(name)?.set_password(&payload).map_err(|e| {
            warn!(service = %self.service, token = %name, error = %e, "Failed to store token");
            StorageError::from(e)
        })
    }

    async fn remove_token(&self, name: &str) -> Result<(), StorageError> {
        match self.entry(name)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, token = %name, "Token removed");
                Ok(())
            }
            Err(e) => {
                warn!(service = %self.service, token = %name, error = %e, "Failed to remove token");
                Err(e.into())
            }
        }
    }
}

// ============================================================================
// Memory Implementation
// ============================================================================

/// Process-local token storage.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    tokens: RwLock<HashMap<String, StoredToken>>,
}

impl MemoryTokenStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw entry, including its expiry.
    pub async fn entry(&self, name: &str) -> Option<StoredToken> {
        self.tokens.read().await.get(name).cloned()
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn get_token(&self, name: &str) -> Result<Option<String>, StorageError> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .get(name)
            .filter(|t| !t.is_expired_at(Utc::now()))
            .map(|t| t.value.clone()))
    }

    async fn set_token(
        &self,
        name: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        self.tokens
            .write()
            .await
            .insert(name.to_string(), StoredToken::new(value, expires_at));
        Ok(())
    }

    async fn remove_token(&self, name: &str) -> Result<(), StorageError> {
        self.tokens.write().await.remove(name);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
