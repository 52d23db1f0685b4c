//! Store error types.

use courier_fetch::{ExchangeError, StorageError};
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token storage error.
    #[error("Token storage error: {0}")]
    Storage(#[from] StorageError),

    /// The client could not be assembled.
    #[error("Client setup failed: {0}")]
    Client(#[from] ExchangeError),
}

impl StoreError {
    /// Returns true if the file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

impl From<StoreError> for StorageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => StorageError::Io(e),
            StoreError::Serialization(e) => StorageError::Serialization(e),
            StoreError::Storage(e) => e,
            other => StorageError::Other(other.to_string()),
        }
    }
}
