//! HTTP routes for event deliveries.
//!
//! - `OPTIONS /event`: CloudEvents 1.0 abuse protection. Answers with
//!   `WebHook-Allowed-Origin` once the caller's token is valid.
//! - `POST /event-azure`: Event Grid schema deliveries, including the
//!   subscription validation handshake.
//!
//! Every request must carry `Authorization: Bearer <token>`; the token is
//! validated before anything else in the request is acted on.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{options, post};
use axum::{Json, Router};

use crate::auth::{TokenVerifier, ValidationError, ValidationOptions, VerifiedClaims};
use crate::eventgrid::{
    DeliveryError, DeliveryKind, EVENT_TYPE_HEADER, parse_events, subscription_validation_response,
};

/// Header the CloudEvents validation request names its origin in.
pub const WEBHOOK_REQUEST_ORIGIN: &str = "webhook-request-origin";
/// Header granting the origin permission to deliver.
pub const WEBHOOK_ALLOWED_ORIGIN: &str = "webhook-allowed-origin";

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct AppState {
    verifier: Arc<TokenVerifier>,
    options: Arc<ValidationOptions>,
}

impl AppState {
    #[must_use]
    pub fn new(verifier: TokenVerifier, options: ValidationOptions) -> Self {
        Self {
            verifier: Arc::new(verifier),
            options: Arc::new(options),
        }
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Result<VerifiedClaims, RouteError> {
        let token = bearer_token(headers)?;
        let claims = self.verifier.validate(token, &self.options).await?;
        Ok(claims)
    }
}

/// Error returned by a webhook route.
#[derive(Debug)]
pub enum RouteError {
    /// `WebHook-Request-Origin` is absent.
    MissingOrigin,
    /// `Authorization` is absent.
    MissingAuthorization,
    /// `Authorization` is not a bearer token.
    InvalidAuthorization,
    /// `aeg-event-type` is absent.
    MissingEventType,
    /// The delivery body could not be handled.
    Delivery(DeliveryError),
    /// The bearer token was rejected or could not be checked.
    Validation(ValidationError),
}

impl std::fmt::Display for RouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingOrigin => write!(f, "missing {WEBHOOK_REQUEST_ORIGIN} header"),
            Self::MissingAuthorization => write!(f, "missing authorization header"),
            Self::InvalidAuthorization => write!(f, "authorization must use the Bearer scheme"),
            Self::MissingEventType => write!(f, "missing {EVENT_TYPE_HEADER} header"),
            Self::Delivery(e) => write!(f, "{e}"),
            Self::Validation(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Delivery(e) => Some(e),
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for RouteError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DeliveryError> for RouteError {
    fn from(e: DeliveryError) -> Self {
        Self::Delivery(e)
    }
}

impl RouteError {
    /// Status code and client-facing message.
    ///
    /// Validation details stay in the logs.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::MissingOrigin | Self::MissingEventType | Self::Delivery(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::MissingAuthorization => (StatusCode::FORBIDDEN, self.to_string()),
            Self::InvalidAuthorization => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::Validation(e) if e.is_unauthenticated() => {
                (StatusCode::UNAUTHORIZED, "invalid bearer token".to_string())
            }
            Self::Validation(ValidationError::InvalidTenant(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            ),
            Self::Validation(_) => (
                StatusCode::BAD_GATEWAY,
                "identity provider unavailable".to_string(),
            ),
        }
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        tracing::warn!(status = status.as_u16(), "rejecting webhook request: {self}");
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Build the webhook router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/event", options(abuse_protection))
        .route("/event-azure", post(event_grid_delivery))
        .with_state(state)
}

/// Extract the token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, RouteError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(RouteError::MissingAuthorization)?
        .to_str()
        .map_err(|_| RouteError::InvalidAuthorization)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(RouteError::InvalidAuthorization)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(RouteError::InvalidAuthorization);
    }

    Ok(token)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

async fn abuse_protection(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, RouteError> {
    let origin = header_str(&headers, WEBHOOK_REQUEST_ORIGIN).ok_or(RouteError::MissingOrigin)?;

    state.authenticate(&headers).await?;

    tracing::info!(origin, "webhook origin validated");

    Ok((
        StatusCode::NO_CONTENT,
        [(WEBHOOK_ALLOWED_ORIGIN, origin.to_string())],
    )
        .into_response())
}

async fn event_grid_delivery(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, RouteError> {
    state.authenticate(&headers).await?;

    let kind = header_str(&headers, EVENT_TYPE_HEADER)
        .map(DeliveryKind::from_header)
        .ok_or(RouteError::MissingEventType)?;

    let events = parse_events(&body)?;

    if kind == DeliveryKind::SubscriptionValidation {
        let response = subscription_validation_response(&events)?;
        tracing::info!("answering subscription validation handshake");
        return Ok((StatusCode::OK, Json(response)).into_response());
    }

    tracing::info!(kind = ?kind, count = events.len(), "event delivery accepted");
    Ok(StatusCode::NO_CONTENT.into_response())
}
