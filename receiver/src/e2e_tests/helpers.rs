//! Common helpers for end-to-end tests.

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::auth::{TokenVerifier, ValidationOptions};
use crate::config::ProviderSettings;
use crate::routes::{AppState, router};
use crate::testing::{MockProvider, PRIMARY_PRIVATE_KEY_PEM, TEST_KEY_ID, mint_token, standard_claims};

pub const CLIENT_ID: &str = "client-42";
pub const TENANT_ID: &str = "contoso";

/// The receiver's router wired to its own mock identity provider.
pub struct TestReceiver {
    pub provider: MockProvider,
    router: Router,
}

impl TestReceiver {
    pub async fn start() -> Self {
        let provider = MockProvider::start().await;
        let verifier = TokenVerifier::from_settings(&ProviderSettings::with_authority(
            &provider.base_url,
        ))
        .expect("verifier");
        let router = router(AppState::new(
            verifier,
            ValidationOptions::new(CLIENT_ID, TENANT_ID),
        ));

        Self { provider, router }
    }

    /// A token the receiver accepts.
    #[must_use]
    pub fn valid_token(&self) -> String {
        let claims = standard_claims(&self.provider.issuer(TENANT_ID), CLIENT_ID);
        mint_token(Some(TEST_KEY_ID), &claims, PRIMARY_PRIVATE_KEY_PEM)
    }

    /// `Authorization` header value carrying a valid token.
    #[must_use]
    pub fn valid_authorization(&self) -> String {
        format!("Bearer {}", self.valid_token())
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body")
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// `OPTIONS /event` as sent by the CloudEvents validation handshake.
#[must_use]
pub fn abuse_protection_request(origin: Option<&str>, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("OPTIONS").uri("/event");
    if let Some(origin) = origin {
        builder = builder.header("WebHook-Request-Origin", origin);
    }
    if let Some(authorization) = authorization {
        builder = builder.header("Authorization", authorization);
    }
    builder.body(Body::empty()).expect("request")
}

/// `POST /event-azure` with an Event Grid schema body.
#[must_use]
pub fn event_grid_request(
    event_type: Option<&str>,
    authorization: Option<&str>,
    body: &Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/event-azure")
        .header("Content-Type", "application/json");
    if let Some(event_type) = event_type {
        builder = builder.header("aeg-event-type", event_type);
    }
    if let Some(authorization) = authorization {
        builder = builder.header("Authorization", authorization);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

/// A subscription validation event carrying `code`.
#[must_use]
pub fn validation_event(code: &str) -> Value {
    json!({
        "id": "2d1781af-3a4c-4d7c-bd0c-e34b19da4e66",
        "topic": "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.EventGrid/topics/orders",
        "subject": "",
        "data": {
            "validationCode": code,
            "validationUrl": "https://rp-eastus2.eventgrid.azure.net:553/eventsubscriptions/orders/validate?id=512d38b6",
        },
        "eventType": "Microsoft.EventGrid.SubscriptionValidationEvent",
        "eventTime": "2026-10-19T18:41:00.9584103Z",
        "metadataVersion": "1",
        "dataVersion": "1",
    })
}

/// An ordinary blob-created event.
#[must_use]
pub fn blob_created_event() -> Value {
    json!({
        "id": "831e1650-001e-001b-66ab-eeb76e069631",
        "topic": "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/orders",
        "subject": "/blobServices/default/containers/incoming/blobs/order-1.json",
        "data": {
            "api": "PutBlockList",
            "contentType": "application/json",
            "contentLength": 524_288,
            "blobType": "BlockBlob",
            "url": "https://orders.blob.core.windows.net/incoming/order-1.json",
        },
        "eventType": "Microsoft.Storage.BlobCreated",
        "eventTime": "2026-10-19T18:41:00.9584103Z",
        "dataVersion": "",
        "metadataVersion": "1",
    })
}
