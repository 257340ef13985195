#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Bearer token verification and scope enforcement at the gateway edge.
//!
//! Authenticity is delegated to an external Identity Provider (see [`TokenVerifier`]);
//! the token payload is only decoded to read the `scopes` and `user_id` claims.

// Core modules
pub mod authenticator;
pub mod claims;
pub mod claims_error;
pub mod config_error;
pub mod errors;
pub mod traits;
pub mod types;
pub mod verifier;

#[cfg(feature = "axum-ext")]
pub mod axum_ext;

// Core exports
pub use authenticator::{Authenticator, extract_bearer_token};
pub use claims::{ClaimValue, Claims, ScopeSet};
pub use claims_error::ClaimsError;
pub use config_error::ConfigError;
pub use errors::{AuthError, VerifyError};
pub use traits::TokenVerifier;
pub use types::AuthenticatedUser;
pub use verifier::HttpTokenVerifier;
