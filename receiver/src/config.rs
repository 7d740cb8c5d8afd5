//! Receiver configuration module.
//!
//! This module provides configuration loading for the webhook receiver from
//! environment variables. Configuration is loaded once in `main` and passed
//! down explicitly; nothing else reads the environment.
//!
//! # Environment Variables
//!
//! - `CLIENT_ID`: Application (client) id tokens must be issued for (required)
//! - `TENANT_ID`: Tenant whose issuer and keys are trusted (required)
//! - `PORT`: Port to listen on (default: `8080`)
//! - `OIDC_AUTHORITY`: Identity provider base URL (default: `https://login.microsoftonline.com`)
//! - `OIDC_HTTP_TIMEOUT_SECS`: Timeout for discovery and key set requests (default: `5`)
//! - `OIDC_CACHE_TTL_SECS`: Cache lifetime for provider metadata (default: unset, no caching)
//! - `OIDC_LEEWAY_SECS`: Clock skew allowed for `exp` and `nbf` (default: `60`)
//!
//! # Invariants
//!
//! - `client_id` is never empty
//! - `tenant_id` is safe to place in a URL path segment
//! - `authority` is an absolute https URL (or http on a loopback host) without a trailing slash
//! - `http_timeout` is never zero

use std::time::Duration;

use crate::auth::ValidationOptions;
use crate::auth::discovery::is_valid_tenant_id;

/// Settings for talking to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Base URL the tenant id is appended to for discovery.
    pub authority: String,
    /// Timeout applied to each discovery and key set request.
    pub http_timeout: Duration,
    /// How long fetched metadata is reused. `None` fetches on every validation.
    pub cache_ttl: Option<Duration>,
    /// Clock skew tolerance in seconds.
    pub leeway_secs: u64,
}

impl ProviderSettings {
    /// Default identity provider.
    pub const DEFAULT_AUTHORITY: &'static str = "https://login.microsoftonline.com";
    /// Default request timeout.
    pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default clock skew tolerance.
    pub const DEFAULT_LEEWAY_SECS: u64 = 60;

    /// Default settings for the provider at `authority`.
    #[must_use]
    pub fn with_authority(authority: &str) -> Self {
        Self {
            authority: authority.trim_end_matches('/').to_string(),
            http_timeout: Self::DEFAULT_HTTP_TIMEOUT,
            cache_ttl: None,
            leeway_secs: Self::DEFAULT_LEEWAY_SECS,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self::with_authority(Self::DEFAULT_AUTHORITY)
    }
}

/// Receiver configuration.
///
/// # Post-conditions
///
/// - `client_id` and `tenant_id` are non-empty
/// - `provider.authority` has been validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Expected audience of delivery tokens.
    pub client_id: String,
    /// Tenant whose tokens are accepted.
    pub tenant_id: String,
    /// Port to listen on.
    pub listen_port: u16,
    /// Identity provider settings.
    pub provider: ProviderSettings,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn invalid(name: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        message: message.into(),
    }
}

impl ReceiverConfig {
    /// Default port for the receiver.
    pub const DEFAULT_PORT: u16 = 8080;

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or any variable
    /// has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration using `lookup` to read variables.
    ///
    /// # Errors
    ///
    /// Same as `from_env`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id = load_required(&lookup, "CLIENT_ID")?;

        let tenant_id = load_required(&lookup, "TENANT_ID")?;
        if !is_valid_tenant_id(&tenant_id) {
            return Err(invalid(
                "TENANT_ID",
                format!("'{tenant_id}' may only contain letters, digits, '-', '.' and '_'"),
            ));
        }

        let listen_port = match lookup("PORT") {
            Some(value) => value
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or_else(|| {
                    invalid(
                        "PORT",
                        format!("'{value}' is not a valid port number (must be 1-65535)"),
                    )
                })?,
            None => Self::DEFAULT_PORT,
        };

        let authority = match lookup("OIDC_AUTHORITY") {
            Some(value) => validate_authority(&value)?,
            None => ProviderSettings::DEFAULT_AUTHORITY.to_string(),
        };

        let http_timeout = match load_secs(&lookup, "OIDC_HTTP_TIMEOUT_SECS")? {
            Some(0) => return Err(invalid("OIDC_HTTP_TIMEOUT_SECS", "must be greater than 0")),
            Some(secs) => Duration::from_secs(secs),
            None => ProviderSettings::DEFAULT_HTTP_TIMEOUT,
        };

        let cache_ttl = load_secs(&lookup, "OIDC_CACHE_TTL_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let leeway_secs = load_secs(&lookup, "OIDC_LEEWAY_SECS")?
            .unwrap_or(ProviderSettings::DEFAULT_LEEWAY_SECS);

        Ok(Self {
            client_id,
            tenant_id,
            listen_port,
            provider: ProviderSettings {
                authority,
                http_timeout,
                cache_ttl,
                leeway_secs,
            },
        })
    }

    /// The options every inbound token is validated against.
    #[must_use]
    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions::new(self.client_id.clone(), self.tenant_id.clone())
    }
}

fn load_required<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))?;
    if value.trim().is_empty() {
        return Err(invalid(name, "must not be empty"));
    }
    Ok(value)
}

fn load_secs<F>(lookup: &F, name: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| invalid(name, format!("'{value}' is not a whole number of seconds")))
        })
        .transpose()
}

/// Validate the identity provider base URL.
///
/// Plain http is only accepted for loopback hosts.
fn validate_authority(value: &str) -> Result<String, ConfigError> {
    const NAME: &str = "OIDC_AUTHORITY";

    let url = url::Url::parse(value).map_err(|e| invalid(NAME, format!("'{value}': {e}")))?;

    let is_loopback = matches!(
        url.host_str(),
        Some("localhost" | "127.0.0.1" | "[::1]")
    );
    if url.scheme() != "https" && !(url.scheme() == "http" && is_loopback) {
        return Err(invalid(NAME, "must use https"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid(NAME, "must not have a query string or fragment"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid(NAME, "must not contain credentials"));
    }

    Ok(value.trim_end_matches('/').to_string())
}
