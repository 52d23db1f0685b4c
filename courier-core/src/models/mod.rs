//! Domain models for Courier.
//!
//! ## Submodules
//!
//! - [`request`] - Request spec, methods, codecs
//! - [`response`] - Response bodies
//! - [`credential`] - Access/refresh credentials and JWT claims

mod credential;
mod request;
mod response;

pub use credential::{Credential, JwtClaims, TokenPair, decode_claims, expiry_of};
pub use request::{Codec, Method, RequestSpec, SchemaPair};
pub use response::ResponseBody;
