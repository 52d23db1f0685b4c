//! Assembles an [`ExchangeClient`] from a [`ClientConfig`].

use std::path::PathBuf;
use std::sync::Arc;

use courier_fetch::host::storage::keys;
use courier_fetch::{
    ExchangeClient, ExchangeContext, KeyValueStorage, KeychainTokenStorage, MemoryStorage,
    MemoryTokenStorage, TokenStorage,
};
use tracing::{debug, instrument};

use crate::config::{ClientConfig, TokenBackend};
use crate::error::StoreError;
use crate::persistence::{default_preferences_path, default_tokens_path};
use crate::preferences::FilePreferences;
use crate::token_store::FileTokenStorage;

/// Where the file-backed stores live.
#[derive(Debug, Clone)]
pub struct StorePaths {
    /// Token file (file backend only).
    pub tokens: PathBuf,
    /// Preferences file.
    pub preferences: PathBuf,
}

impl Default for StorePaths {
    fn default() -> Self {
        Self {
            tokens: default_tokens_path(),
            preferences: default_preferences_path(),
        }
    }
}

/// A client together with the stores it was built on.
pub struct OpenedClient {
    /// The client.
    pub client: ExchangeClient,
    /// Token storage selected by the configuration.
    pub tokens: Arc<dyn TokenStorage>,
    /// Durable preferences.
    pub preferences: Arc<FilePreferences>,
    /// Session-scoped values, seeded from the durable currency preference.
    pub session: Arc<MemoryStorage>,
}

impl std::fmt::Debug for OpenedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedClient")
            .field("client", &self.client)
            .field("preferences", &self.preferences.path())
            .finish_non_exhaustive()
    }
}

/// Opens the token storage selected by `backend`.
pub async fn open_token_storage(
    backend: TokenBackend,
    path: PathBuf,
) -> Arc<dyn TokenStorage> {
    match backend {
        TokenBackend::File => Arc::new(FileTokenStorage::open(path).await),
        TokenBackend::Keychain => Arc::new(KeychainTokenStorage::new()),
        TokenBackend::Memory => Arc::new(MemoryTokenStorage::new()),
    }
}

/// Builds a client from `config`, using the default store locations.
pub async fn open_client(config: &ClientConfig) -> Result<OpenedClient, StoreError> {
    open_client_at(config, StorePaths::default()).await
}

/// Builds a client from `config`, with stores at `paths`.
#[instrument(skip(config, paths), fields(base_url = %config.base_url, backend = %config.token_backend))]
pub async fn open_client_at(
    config: &ClientConfig,
    paths: StorePaths,
) -> Result<OpenedClient, StoreError> {
    config.validate()?;

    let tokens = open_token_storage(config.token_backend, paths.tokens).await;
    let preferences = Arc::new(FilePreferences::open(paths.preferences).await);

    let session = Arc::new(MemoryStorage::new());
    if let Some(currency) = preferences.get(keys::CURRENCY) {
        session.set(keys::CURRENCY, currency);
    }

    let ctx = ExchangeContext::builder()
        .settings(config.to_settings())
        .tokens(Arc::clone(&tokens))
        .session(session.clone())
        .local(preferences.clone())
        .build()?;

    debug!("Client assembled");
    Ok(OpenedClient {
        client: ExchangeClient::new(ctx),
        tokens,
        preferences,
        session,
    })
}

// ============================================================================
// Tests
// ============================================================================
