// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `Courier` Store
//!
//! File-backed persistence for the `Courier` exchange client.
//!
//! This crate provides:
//!
//! - **FileTokenStorage**: Tokens with expiry in a 0600 JSON file
//! - **FilePreferences**: Durable language/currency preferences
//! - **ClientConfig**: The configuration file and its runtime settings
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use courier_core::RequestSpec;
//! use courier_store::{ClientConfig, open_client};
//!
//! let config = ClientConfig::load().await?;
//! let opened = open_client(&config).await?;
//!
//! let body = opened.client.exchange(RequestSpec::get("/orders")).await?;
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod persistence;
pub mod preferences;
pub mod token_store;

pub use bootstrap::{OpenedClient, StorePaths, open_client, open_client_at, open_token_storage};
pub use config::{ClientConfig, LogLevel, TokenBackend};
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_config_path, default_data_dir, default_preferences_path,
    default_tokens_path, ensure_dir, load_json, load_json_or_default, save_json,
};
pub use preferences::FilePreferences;
pub use token_store::FileTokenStorage;
