//! Access/refresh token lifecycle.
//!
//! [`CredentialStore`] owns the tokens and keeps them in a
//! [`TokenStorage`] under fixed names. Reads never fail an exchange: a
//! storage error is logged and treated as "no token".

use std::sync::Arc;

use courier_core::Credential;
use tracing::{debug, instrument, warn};

use crate::error::StorageError;
use crate::host::keychain::TokenStorage;

/// Well-known token entry names.
pub mod token_names {
    /// Bearer token.
    pub const ACCESS_TOKEN: &str = "accessToken";
    /// Token presented to the refresh endpoint.
    pub const REFRESH_TOKEN: &str = "refreshToken";
    /// Signed-in marker.
    pub const SIGNED_IN: &str = "token";
}

/// Value of the signed-in marker entry.
pub const SIGNED_IN_VALUE: &str = "token";

/// Reads and writes the current credential.
pub struct CredentialStore {
    storage: Arc<dyn TokenStorage>,
}

impl CredentialStore {
    /// Creates a store over `storage`.
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self { storage }
    }

    /// Returns the underlying storage.
    pub fn storage(&self) -> &Arc<dyn TokenStorage> {
        &self.storage
    }

    /// Current access token.
    pub async fn access_token(&self) -> Option<String> {
        self.read(token_names::ACCESS_TOKEN).await
    }

    /// Current refresh token.
    pub async fn refresh_token(&self) -> Option<String> {
        self.read(token_names::REFRESH_TOKEN).await
    }

    /// Current credential, if both tokens are present.
    pub async fn current(&self) -> Option<Credential> {
        let access = self.access_token().await?;
        let refresh = self.refresh_token().await?;
        Some(Credential::from_tokens(access, refresh))
    }

    /// Returns true if the signed-in marker is set.
    pub async fn is_signed_in(&self) -> bool {
        self.read(token_names::SIGNED_IN).await.as_deref() == Some(SIGNED_IN_VALUE)
    }

    /// Sets the signed-in marker.
    pub async fn mark_signed_in(&self) -> Result<(), StorageError> {
        self.storage
            .set_token(token_names::SIGNED_IN, SIGNED_IN_VALUE, None)
            .await
    }

    /// Stores both tokens. The refresh entry expires with its `exp` claim.
    #[instrument(skip_all, fields(refresh_expiry = ?credential.refresh_expiry))]
    pub async fn store(&self, credential: &Credential) -> Result<(), StorageError> {
        if credential.refresh_expiry.is_none() {
            warn!("Refresh token carries no expiry claim, storing without expiry");
        }

        self.storage
            .set_token(token_names::ACCESS_TOKEN, &credential.access_token, None)
            .await?;
        self.storage
            .set_token(
                token_names::REFRESH_TOKEN,
                &credential.refresh_token,
                credential.refresh_expiry,
            )
            .await?;

        debug!("Stored new credentials");
        Ok(())
    }

    /// Stores a token pair, deriving the refresh expiry from its claims.
    pub async fn store_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Credential, StorageError> {
        let credential = Credential::from_tokens(access_token, refresh_token);
        self.store(&credential).await?;
        Ok(credential)
    }

    /// Removes both tokens and the signed-in marker.
    ///
    /// Every entry is attempted; the first failure is returned.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let mut first_error = None;
        for name in [
            token_names::ACCESS_TOKEN,
            token_names::REFRESH_TOKEN,
            token_names::SIGNED_IN,
        ] {
            if let Err(e) = self.storage.remove_token(name).await {
                warn!(token = %name, error = %e, "Failed to remove token");
                first_error.get_or_insert(e);
            }
        }
        debug!("Cleared credentials");
        first_error.map_or(Ok(()), Err)
    }

    async fn read(&self, name: &str) -> Option<String> {
        match self.storage.get_token(name).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(token = %name, error = %e, "Failed to read token");
                None
            }
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
