//! Token shapes on either side of verification.
//!
//! `UnverifiedHeader` is read before the signature is checked and carries
//! only what is needed to pick a signing key. `VerifiedClaims` is produced
//! only by the verifier, after signature, audience, issuer and time checks
//! have all passed. Nothing else in the crate exposes token claims.

use std::collections::HashMap;

use jsonwebtoken::{Algorithm, decode_header};
use serde::Deserialize;
use serde_json::Value;

use super::error::ValidationError;

/// What a token must match to be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Expected `aud` claim: the application (client) id tokens are issued for.
    pub client_id: String,
    /// Tenant whose discovery document defines the trusted issuer and keys.
    pub tenant_id: String,
}

impl ValidationOptions {
    #[must_use]
    pub fn new(client_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            tenant_id: tenant_id.into(),
        }
    }
}

/// The token header, decoded without checking the signature.
///
/// Must not be used for any trust decision. It only selects which key to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedHeader {
    key_id: String,
    algorithm: Algorithm,
}

impl UnverifiedHeader {
    /// Decode the header of `token`.
    ///
    /// # Errors
    /// Returns `ValidationError::MalformedToken` if the token is not a JWT or
    /// its header has no `kid`.
    pub fn parse(token: &str) -> Result<Self, ValidationError> {
        let header = decode_header(token)
            .map_err(|e| ValidationError::MalformedToken(format!("invalid JWT header: {e}")))?;

        let key_id = header
            .kid
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| ValidationError::MalformedToken("missing 'kid' header".to_string()))?;

        Ok(Self {
            key_id,
            algorithm: header.alg,
        })
    }

    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The algorithm the token claims to use. Not enforced here.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

/// Audience claim (a single string or an array).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

/// Payload layout decoded by the verifier.
///
/// `iss`, `aud` and `exp` are optional here so that a token lacking one is
/// reported as a missing claim by the verifier's required-claim check. They
/// are always present on a decoded `VerifiedClaims`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenClaims {
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
    #[serde(default)]
    exp: Option<u64>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    nbf: Option<u64>,
    #[serde(default)]
    iat: Option<u64>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

/// Claims of a token that passed full verification.
#[derive(Debug, Clone)]
pub struct VerifiedClaims {
    claims: TokenClaims,
}

impl VerifiedClaims {
    pub(crate) const fn new(claims: TokenClaims) -> Self {
        Self { claims }
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        self.claims.iss.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn audiences(&self) -> Vec<&str> {
        match &self.claims.aud {
            Some(Audience::Single(aud)) => vec![aud.as_str()],
            Some(Audience::Multiple(auds)) => auds.iter().map(String::as_str).collect(),
            None => Vec::new(),
        }
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claims.sub.as_deref()
    }

    /// Expiry as seconds since the Unix epoch.
    #[must_use]
    pub fn expires_at(&self) -> u64 {
        self.claims.exp.unwrap_or_default()
    }

    #[must_use]
    pub const fn not_before(&self) -> Option<u64> {
        self.claims.nbf
    }

    #[must_use]
    pub const fn issued_at(&self) -> Option<u64> {
        self.claims.iat
    }

    /// Any other claim by name, e.g. `tid`, `appid` or `oid`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.extra.get(name)
    }
}
