//! JWKS (JSON Web Key Set) fetching and signing key selection.
//!
//! # Post-conditions
//! - A returned `SigningKey` is an RSA public key whose `kid` equals the
//!   requested key id.
//!
//! # Invariants
//! - Symmetric and non-RSA keys are never turned into decoding keys.
//! - A cached key set is only replaced by a successfully fetched one; a failed
//!   fetch never evicts it.

use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};

use super::cache::MetadataCache;
use super::error::ValidationError;
use super::http::fetch_json;

/// An RSA public key taken from the provider's key set.
#[derive(Clone)]
pub struct SigningKey {
    key_id: String,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Build a signing key from a JWK.
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidSigningKey` if the key is not an RSA
    /// signature key usable with RS256.
    pub fn from_jwk(key_id: &str, jwk: &Jwk) -> Result<Self, ValidationError> {
        let unusable = |reason: String| ValidationError::InvalidSigningKey {
            key_id: key_id.to_string(),
            reason,
        };

        if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
            return Err(unusable("key is published for encryption".to_string()));
        }

        if let Some(alg) = jwk.common.key_algorithm
            && alg != KeyAlgorithm::RS256
        {
            return Err(unusable(format!("key is restricted to {alg:?}")));
        }

        let AlgorithmParameters::RSA(rsa) = &jwk.algorithm else {
            return Err(unusable("not an RSA key".to_string()));
        };

        let decoding_key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| unusable(e.to_string()))?;

        Ok(Self {
            key_id: key_id.to_string(),
            decoding_key,
        })
    }

    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub(crate) const fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

/// Fetches key sets and picks the key a token was signed with.
pub struct KeySetClient {
    http: reqwest::Client,
    cache: MetadataCache<JwkSet>,
}

impl KeySetClient {
    #[must_use]
    pub const fn new(http: reqwest::Client, cache: MetadataCache<JwkSet>) -> Self {
        Self { http, cache }
    }

    /// Get the signing key with id `key_id` from the key set at `jwks_uri`.
    ///
    /// When a cached key set lacks `key_id`, the provider may have rotated
    /// its keys, so the set is fetched again once before giving up. The cached
    /// set is only replaced by a successful fetch.
    ///
    /// # Errors
    /// - `ValidationError::KeySetFetch` on transport failure, non-2xx status or an unparsable
    ///   key set, when no cached key set is available.
    /// - `ValidationError::SigningKeyNotFound` if no key has id `key_id`.
    /// - `ValidationError::InvalidSigningKey` if the key cannot verify RS256 signatures.
    pub async fn signing_key(
        &self,
        jwks_uri: &str,
        key_id: &str,
    ) -> Result<SigningKey, ValidationError> {
        let cached = self.cache.get(jwks_uri);
        if let Some(key_set) = &cached {
            if let Some(jwk) = key_set.find(key_id) {
                tracing::debug!(jwks_uri, key_id, "using cached signing key");
                return SigningKey::from_jwk(key_id, jwk);
            }
            tracing::info!(jwks_uri, key_id, "key id not in cached key set, refetching");
        }

        let key_set = match self.fetch(jwks_uri).await {
            Ok(key_set) => key_set,
            Err(e) if cached.is_some() => {
                tracing::warn!(
                    jwks_uri,
                    key_id,
                    "key set refetch failed, keeping cached key set: {e}"
                );
                return Err(ValidationError::SigningKeyNotFound(key_id.to_string()));
            }
            Err(e) => return Err(e),
        };

        let result = key_set.find(key_id).map_or_else(
            || {
                tracing::warn!(
                    jwks_uri,
                    key_id,
                    key_count = key_set.keys.len(),
                    "signing key not found in key set"
                );
                Err(ValidationError::SigningKeyNotFound(key_id.to_string()))
            },
            |jwk| SigningKey::from_jwk(key_id, jwk),
        );

        self.cache.insert(jwks_uri, key_set);
        result
    }

    async fn fetch(&self, jwks_uri: &str) -> Result<JwkSet, ValidationError> {
        tracing::debug!(jwks_uri, "fetching key set");

        let body = fetch_json(&self.http, jwks_uri)
            .await
            .map_err(ValidationError::KeySetFetch)?;

        serde_json::from_slice(&body)
            .map_err(|e| ValidationError::KeySetFetch(format!("invalid key set: {e}")))
    }
}
