// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `Courier` Fetch
//!
//! The exchange client: request and response chains, credential storage,
//! single-flight credential refresh and the host APIs they run against.
//!
//! ## Host APIs
//!
//! The [`host`] module provides abstractions for system interactions:
//!
//! - [`host::http`] - Transport trait and the reqwest implementation
//! - [`host::keychain`] - Token storage (system keychain or memory)
//! - [`host::storage`] - Key-value preference stores
//! - [`host::network`] - Online flag and reachability probe
//! - [`host::navigator`] - Alerts and redirects on sign-out
//!
//! ## Exchanges
//!
//! - [`request`] / [`response`] - The two step chains
//! - [`refresh::RefreshCoordinator`] - One refresh at a time, FIFO queue
//! - [`classify::classify`] - What to do with a failed exchange
//! - [`client::ExchangeClient`] - Ties it all together
//!
//! ## Example
//!
//! ```ignore
//! use courier_core::RequestSpec;
//! use courier_fetch::{ExchangeClient, ExchangeContext};
//!
//! let ctx = ExchangeContext::builder()
//!     .base_url("https://api.example.com")
//!     .build()?;
//! let client = ExchangeClient::new(ctx);
//!
//! let body = client
//!     .exchange(RequestSpec::get("/users/{id}").with_payload(json!({ "id": 5 })))
//!     .await?;
//! ```

// Core modules
pub mod budget;
pub mod classify;
pub mod client;
pub mod context;
pub mod credentials;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod refresh;
pub mod request;
pub mod response;

// Re-export key types at crate root

// Errors
pub use error::{
    ExchangeError, SESSION_EXPIRED_MESSAGE, StorageError, TransportError, UNAUTHORIZED_MESSAGE,
};

// Host APIs
pub use host::{
    http::{RawResponse, ReqwestTransport, Transport},
    keychain::{KeychainTokenStorage, MemoryTokenStorage, StoredToken, TokenStorage},
    navigator::{HeadlessNavigator, Navigator},
    network::{Connectivity, NetworkStatus, Probe, ProbeResult},
    storage::{KeyValueStorage, MemoryStorage},
};

// Chains & Client
pub use budget::{BudgetExceeded, RefreshBudget};
pub use classify::{Recovery, classify};
pub use client::ExchangeClient;
pub use context::{ExchangeContext, ExchangeContextBuilder, ExchangeSettings};
pub use credentials::CredentialStore;
pub use pipeline::{Pipeline, Step};
pub use refresh::{
    Admission, HttpTokenRefresher, RefreshCoordinator, RefreshRequest, RefreshState,
    TokenRefresher,
};
pub use request::{OutboundRequest, request_chain};
pub use response::{InboundResponse, response_chain};
