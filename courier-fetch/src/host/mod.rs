//! Host APIs consumed by the exchange engine.
//!
//! - [`http`] - Request transport (reqwest)
//! - [`keychain`] - Persistent token storage (system keychain, memory)
//! - [`storage`] - Key-value preferences (currency, language)
//! - [`network`] - Connectivity flag and probe
//! - [`navigator`] - Alerts and login redirects

pub mod http;
pub mod keychain;
pub mod navigator;
pub mod network;
pub mod storage;

// Re-export key types
pub use http::{RawResponse, ReqwestTransport, Transport};
pub use keychain::{KeychainTokenStorage, MemoryTokenStorage, StoredToken, TokenStorage};
pub use navigator::{HeadlessNavigator, Navigator};
pub use network::{Connectivity, NetworkStatus, Probe, ProbeResult};
pub use storage::{KeyValueStorage, MemoryStorage};
