// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `Courier` Core
//!
//! Core types for the `Courier` exchange client. Nothing in this crate
//! performs I/O.
//!
//! ## Key Types
//!
//! ### Requests
//! - [`RequestSpec`] - An exchange as submitted by application code
//! - [`Method`] - HTTP method with read/write routing
//! - [`Codec`] - Per-endpoint schemas and key map
//!
//! ### Transformation
//! - [`KeyMap`] / [`map_keys`] - Recursive key renaming
//! - [`Schema`] - Validation seam, with [`TypedSchema`] and [`AnySchema`]
//!
//! ### Credentials
//! - [`Credential`] - Access/refresh token pair with refresh expiry
//! - [`JwtClaims`] / [`decode_claims`] - Unverified JWT payload access
//!
//! ### Errors
//! - [`CoreError`], [`ValidationError`], [`ValidationWarning`]

pub mod error;
pub mod keymap;
pub mod models;
pub mod schema;

pub use error::{CoreError, Stage, ValidationError, ValidationWarning};
pub use keymap::{Direction, KeyMap, map_keys};
pub use models::{
    Codec, Credential, JwtClaims, Method, RequestSpec, ResponseBody, SchemaPair, TokenPair,
    decode_claims, expiry_of,
};
pub use schema::{AnySchema, Schema, TypedSchema};
