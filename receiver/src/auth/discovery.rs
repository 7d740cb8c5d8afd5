//! OpenID Connect discovery.
//!
//! Resolves a tenant's discovery document from
//! `{authority}/{tenant_id}/.well-known/openid-configuration`.
//!
//! # Pre-conditions
//! - The authority is an absolute URL without a trailing slash.
//!
//! # Post-conditions
//! - A returned `DiscoveryDocument` has all three required fields, taken
//!   verbatim from the provider response.
//!
//! # Invariants
//! - A failed fetch or a malformed document is never cached and never retried.

use serde::Deserialize;

use super::cache::MetadataCache;
use super::error::ValidationError;
use super::http::fetch_json;

/// The algorithm this receiver verifies tokens with.
const EXPECTED_SIGNING_ALGORITHM: &str = "RS256";

/// The subset of the discovery document the verifier needs.
///
/// Every field is required. Other fields in the provider response are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscoveryDocument {
    /// Where the provider publishes its signing keys.
    pub jwks_uri: String,
    /// The exact `iss` value tokens from this tenant carry.
    pub issuer: String,
    /// Algorithms the provider may sign ID tokens with.
    pub id_token_signing_alg_values_supported: Vec<String>,
}

impl DiscoveryDocument {
    /// Parse and validate a discovery response body.
    ///
    /// # Errors
    /// Returns `ValidationError::DiscoverySchema` if the body is not JSON or a
    /// required field is missing or has the wrong type.
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|e| ValidationError::DiscoverySchema(e.to_string()))
    }

    #[must_use]
    pub fn supports_rs256(&self) -> bool {
        self.id_token_signing_alg_values_supported
            .iter()
            .any(|alg| alg == EXPECTED_SIGNING_ALGORITHM)
    }
}

/// Check that a tenant id is safe to place in a URL path segment.
///
/// Accepts tenant GUIDs, verified domain names and the `common` /
/// `organizations` aliases.
#[must_use]
pub fn is_valid_tenant_id(tenant_id: &str) -> bool {
    !tenant_id.is_empty()
        && tenant_id != "."
        && tenant_id != ".."
        && tenant_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

/// Fetches discovery documents for tenants of one identity provider.
pub struct DiscoveryResolver {
    http: reqwest::Client,
    authority: String,
    cache: MetadataCache<DiscoveryDocument>,
}

impl DiscoveryResolver {
    /// Create a resolver for the provider at `authority`.
    ///
    /// A trailing slash on `authority` is ignored.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        authority: &str,
        cache: MetadataCache<DiscoveryDocument>,
    ) -> Self {
        Self {
            http,
            authority: authority.trim_end_matches('/').to_string(),
            cache,
        }
    }

    /// The discovery URL for `tenant_id`.
    #[must_use]
    pub fn discovery_url(&self, tenant_id: &str) -> String {
        format!(
            "{}/{tenant_id}/.well-known/openid-configuration",
            self.authority
        )
    }

    /// Resolve the discovery document for `tenant_id`.
    ///
    /// # Errors
    /// - `ValidationError::InvalidTenant` if the tenant id cannot be used in a URL.
    /// - `ValidationError::DiscoveryFetch` on transport failure, timeout or non-2xx status.
    /// - `ValidationError::DiscoverySchema` if the response body has the wrong shape.
    pub async fn resolve(&self, tenant_id: &str) -> Result<DiscoveryDocument, ValidationError> {
        if !is_valid_tenant_id(tenant_id) {
            return Err(ValidationError::InvalidTenant(tenant_id.to_string()));
        }

        if let Some(document) = self.cache.get(tenant_id) {
            tracing::debug!(tenant_id, "using cached discovery document");
            return Ok(document);
        }

        let url = self.discovery_url(tenant_id);
        tracing::debug!(url = %url, "fetching discovery document");

        let body = fetch_json(&self.http, &url)
            .await
            .map_err(ValidationError::DiscoveryFetch)?;

        let document = DiscoveryDocument::from_json(&body).inspect_err(|e| {
            tracing::warn!(tenant_id, "could not parse discovery document: {e}");
        })?;

        if !document.supports_rs256() {
            tracing::warn!(
                tenant_id,
                algorithms = ?document.id_token_signing_alg_values_supported,
                "provider does not advertise RS256; tokens will be rejected"
            );
        }

        self.cache.insert(tenant_id, document.clone());
        Ok(document)
    }
}
