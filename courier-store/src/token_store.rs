//! File-backed token storage.
//!
//! All tokens live in one JSON object keyed by name, each entry carrying its
//! optional expiry. The file is rewritten on every change and kept at 0600.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_fetch::{StorageError, StoredToken, TokenStorage};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::persistence::{default_tokens_path, load_json_or_default, save_json};

/// [`TokenStorage`] persisted to a JSON file.
#[derive(Debug)]
pub struct FileTokenStorage {
    path: PathBuf,
    tokens: RwLock<BTreeMap<String, StoredToken>>,
}

impl FileTokenStorage {
    /// Opens the token file at the default path.
    pub async fn open_default() -> Self {
        Self::open(default_tokens_path()).await
    }

    /// Opens the token file at `path`. A missing or unreadable file starts
    /// empty.
    pub async fn open(path: PathBuf) -> Self {
        let tokens: BTreeMap<String, StoredToken> = load_json_or_default(&path).await;
        debug!(path = %path.display(), count = tokens.len(), "Opened token file");
        Self {
            path,
            tokens: RwLock::new(tokens),
        }
    }

    /// Path of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, expired ones included.
    pub async fn entries(&self) -> BTreeMap<String, StoredToken> {
        self.tokens.read().await.clone()
    }

    async fn persist(&self, tokens: &BTreeMap<String, StoredToken>) -> Result<(), StoreError> {
        save_json(&self.path, tokens).await
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn get_token(&self, name: &str) -> Result<Option<String>, StorageError> {
        let now = Utc::now();
        {
            let tokens = self.tokens.read().await;
            match tokens.get(name) {
                None => return Ok(None),
                Some(token) if !token.is_expired_at(now) => return Ok(Some(token.value.clone())),
                Some(_) => {}
            }
        }

        debug!(token = %name, "Dropping expired token");
        let mut tokens = self.tokens.write().await;
        if tokens.get(name).is_some_and(|t| t.is_expired_at(now)) {
            tokens.remove(name);
            self.persist(&tokens).await?;
        }
        Ok(None)
    }

    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    async fn set_token(
        &self,
        name: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        let mut tokens = self.tokens.write().await;
        tokens.insert(name.to_string(), StoredToken::new(value, expires_at));
        self.persist(&tokens).await?;
        Ok(())
    }

    async fn remove_token(&self, name: &str) -> Result<(), StorageError> {
        let mut tokens = self.tokens.write().await;
        if tokens.remove(name).is_some() {
            self.persist(&tokens).await?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
