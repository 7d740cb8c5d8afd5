//! Token validation errors.
//!
//! Every failure in the validation pipeline is reported as a `ValidationError`.
//! Callers are expected to branch on the variant (or on `is_retryable` /
//! `is_unauthenticated`) rather than on the message text.

/// Why a token that was decoded and matched to a signing key was still rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    /// The signature does not match the signing key.
    InvalidSignature,
    /// The token is signed with an algorithm other than RS256.
    DisallowedAlgorithm,
    /// The `aud` claim does not contain the expected client id.
    AudienceMismatch,
    /// The `iss` claim does not equal the issuer from the discovery document.
    IssuerMismatch,
    /// The `exp` claim is in the past.
    Expired,
    /// The `nbf` claim is in the future.
    NotYetValid,
    /// A required claim is absent.
    MissingClaim(String),
    /// The payload could not be decoded into claims.
    InvalidClaims(String),
}

impl std::fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "invalid signature"),
            Self::DisallowedAlgorithm => write!(f, "signing algorithm not allowed"),
            Self::AudienceMismatch => write!(f, "audience mismatch"),
            Self::IssuerMismatch => write!(f, "issuer mismatch"),
            Self::Expired => write!(f, "token has expired"),
            Self::NotYetValid => write!(f, "token is not yet valid"),
            Self::MissingClaim(claim) => write!(f, "missing required claim '{claim}'"),
            Self::InvalidClaims(reason) => write!(f, "invalid claims: {reason}"),
        }
    }
}

/// Error returned when token validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The token cannot be decoded or its header has no key id.
    MalformedToken(String),
    /// The tenant id cannot be used to build a discovery URL.
    InvalidTenant(String),
    /// The discovery document could not be fetched.
    DiscoveryFetch(String),
    /// The discovery document does not have the expected shape.
    DiscoverySchema(String),
    /// The key set could not be fetched or parsed.
    KeySetFetch(String),
    /// The key set has no key with the token's key id.
    SigningKeyNotFound(String),
    /// The key set has a key with the token's key id, but it cannot verify RS256.
    InvalidSigningKey { key_id: String, reason: String },
    /// The signature or claims were rejected.
    TokenVerification(VerificationFailure),
}

impl ValidationError {
    /// Whether retrying the same validation later could succeed.
    ///
    /// Transport failures are retryable. An unknown key id may be a key
    /// rotation in progress, so a short retry is reasonable there too.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DiscoveryFetch(_) | Self::KeySetFetch(_) | Self::SigningKeyNotFound(_)
        )
    }

    /// Whether the failure is the token's fault, as opposed to the provider's
    /// or the receiver's configuration.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken(_) | Self::SigningKeyNotFound(_) | Self::TokenVerification(_)
        )
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedToken(reason) => write!(f, "malformed token: {reason}"),
            Self::InvalidTenant(tenant) => write!(f, "invalid tenant id: '{tenant}'"),
            Self::DiscoveryFetch(reason) => {
                write!(f, "failed to fetch discovery document: {reason}")
            }
            Self::DiscoverySchema(reason) => write!(f, "invalid discovery document: {reason}"),
            Self::KeySetFetch(reason) => write!(f, "failed to fetch key set: {reason}"),
            Self::SigningKeyNotFound(key_id) => {
                write!(f, "signing key '{key_id}' not found in key set")
            }
            Self::InvalidSigningKey { key_id, reason } => {
                write!(f, "signing key '{key_id}' is unusable: {reason}")
            }
            Self::TokenVerification(failure) => {
                write!(f, "token verification failed: {failure}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<VerificationFailure> for ValidationError {
    fn from(failure: VerificationFailure) -> Self {
        Self::TokenVerification(failure)
    }
}
