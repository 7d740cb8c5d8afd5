//! Authentication module.
//!
//! Validates bearer tokens on inbound event deliveries against an OpenID
//! Connect provider.
//!
//! # Pre-conditions
//! - The provider publishes a discovery document and a JSON Web Key Set.
//!
//! # Post-conditions
//! - A token is trusted only when `TokenVerifier::validate` returns `VerifiedClaims`.
//!
//! # Invariants
//! - Only RS256 signatures from keys in the tenant's key set are accepted.

pub mod cache;
pub mod discovery;
pub mod error;
pub mod http;
pub mod jwks;
pub mod jwt;
pub mod token;

pub use discovery::{DiscoveryDocument, DiscoveryResolver};
pub use error::{ValidationError, VerificationFailure};
pub use jwks::{KeySetClient, SigningKey};
pub use jwt::TokenVerifier;
pub use token::{UnverifiedHeader, ValidationOptions, VerifiedClaims};
