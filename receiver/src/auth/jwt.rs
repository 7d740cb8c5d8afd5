//! JWT verification against an OpenID Connect provider.
//!
//! Validates bearer tokens presented by event deliveries: the key is resolved
//! through the tenant's discovery document and key set, and the token is
//! accepted only if it is RS256-signed by that key for the expected audience
//! and issuer.
//!
//! # Pre-conditions
//! - The token has had any `Bearer ` prefix removed.
//!
//! # Post-conditions
//! - On success, returns the claims of the verified token.
//! - On failure, returns the first error in pipeline order; later steps are not attempted.
//!
//! # Invariants
//! - Only RS256 is accepted, whatever the token header claims.
//! - Claims are read only from the constrained verification.
//! - Verification keeps no per-token state; the same inputs give the same result.

use jsonwebtoken::{Algorithm, Validation, decode};

use super::cache::MetadataCache;
use super::discovery::DiscoveryResolver;
use super::error::{ValidationError, VerificationFailure};
use super::http::build_http_client;
use super::jwks::{KeySetClient, SigningKey};
use super::token::{TokenClaims, UnverifiedHeader, ValidationOptions, VerifiedClaims};
use crate::config::ProviderSettings;

/// Claims a token must carry to be accepted.
const REQUIRED_CLAIMS: [&str; 3] = ["exp", "aud", "iss"];

/// Validates tokens issued by one identity provider.
///
/// Safe to share between concurrent requests.
pub struct TokenVerifier {
    discovery: DiscoveryResolver,
    key_sets: KeySetClient,
    leeway_secs: u64,
}

impl TokenVerifier {
    #[must_use]
    pub const fn new(discovery: DiscoveryResolver, key_sets: KeySetClient, leeway_secs: u64) -> Self {
        Self {
            discovery,
            key_sets,
            leeway_secs,
        }
    }

    /// Build a verifier, with its HTTP client and caches, from settings.
    ///
    /// # Errors
    /// Returns the `reqwest` error if the HTTP client cannot be built.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, reqwest::Error> {
        let http = build_http_client(settings.http_timeout)?;
        let discovery = DiscoveryResolver::new(
            http.clone(),
            &settings.authority,
            MetadataCache::new(settings.cache_ttl),
        );
        let key_sets = KeySetClient::new(http, MetadataCache::new(settings.cache_ttl));
        Ok(Self::new(discovery, key_sets, settings.leeway_secs))
    }

    /// Validate `token` and return its claims.
    ///
    /// # Errors
    /// - `ValidationError::MalformedToken` if the header cannot be decoded or has no `kid`.
    /// - Discovery errors from `DiscoveryResolver::resolve`, unchanged.
    /// - Key set errors from `KeySetClient::signing_key`, unchanged.
    /// - `ValidationError::TokenVerification` if the signature, algorithm, audience,
    ///   issuer or validity window is rejected.
    /// - `ValidationError::InvalidSigningKey` if the key itself is rejected during verification.
    pub async fn validate(
        &self,
        token: &str,
        options: &ValidationOptions,
    ) -> Result<VerifiedClaims, ValidationError> {
        let header = UnverifiedHeader::parse(token)?;

        let discovery = self.discovery.resolve(&options.tenant_id).await?;

        let signing_key = self
            .key_sets
            .signing_key(&discovery.jwks_uri, header.key_id())
            .await?;

        let claims = self.verify(token, &signing_key, &options.client_id, &discovery.issuer)?;

        tracing::debug!(
            key_id = signing_key.key_id(),
            issuer = claims.issuer(),
            subject = claims.subject().unwrap_or_default(),
            expires_at = claims.expires_at(),
            "token verified"
        );

        Ok(claims)
    }

    /// Check the signature and claims of `token` with `signing_key`.
    fn verify(
        &self,
        token: &str,
        signing_key: &SigningKey,
        audience: &str,
        issuer: &str,
    ) -> Result<VerifiedClaims, ValidationError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[audience]);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&REQUIRED_CLAIMS);
        validation.validate_nbf = true;
        validation.leeway = self.leeway_secs;

        let token_data = decode::<TokenClaims>(token, signing_key.decoding_key(), &validation)
            .map_err(|e| map_jwt_error(e, signing_key.key_id()))?;

        Ok(VerifiedClaims::new(token_data.claims))
    }
}

/// Maps jsonwebtoken errors to a validation error.
///
/// Problems with the key itself come from the provider, not the caller, and are
/// reported as `InvalidSigningKey` rather than as a bad token.
fn map_jwt_error(error: jsonwebtoken::errors::Error, key_id: &str) -> ValidationError {
    use jsonwebtoken::errors::ErrorKind;

    let failure = match error.kind() {
        ErrorKind::InvalidSignature => VerificationFailure::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
            VerificationFailure::DisallowedAlgorithm
        }
        ErrorKind::InvalidAudience => VerificationFailure::AudienceMismatch,
        ErrorKind::InvalidIssuer => VerificationFailure::IssuerMismatch,
        ErrorKind::ExpiredSignature => VerificationFailure::Expired,
        ErrorKind::ImmatureSignature => VerificationFailure::NotYetValid,
        ErrorKind::MissingRequiredClaim(claim) => VerificationFailure::MissingClaim(claim.clone()),
        ErrorKind::InvalidRsaKey(_)
        | ErrorKind::InvalidEcdsaKey
        | ErrorKind::InvalidEddsaKey
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::Provider(_) => {
            return ValidationError::InvalidSigningKey {
                key_id: key_id.to_string(),
                reason: error.to_string(),
            };
        }
        _ => VerificationFailure::InvalidClaims(error.to_string()),
    };

    ValidationError::TokenVerification(failure)
}
