//! Event Grid schema payloads.
//!
//! Event Grid delivers events as a JSON array and marks each delivery with an
//! `aeg-event-type` header. Before any event is delivered, it sends a single
//! `SubscriptionValidation` event whose `validationCode` must be echoed back
//! as `{"validationResponse": "<code>"}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Header carrying the delivery type.
pub const EVENT_TYPE_HEADER: &str = "aeg-event-type";

/// Kind of delivery, from the `aeg-event-type` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryKind {
    /// Subscription validation handshake.
    SubscriptionValidation,
    /// Regular event delivery.
    Notification,
    /// The subscription was deleted.
    SubscriptionDeletion,
    /// Anything else; treated like a notification.
    Other(String),
}

impl DeliveryKind {
    #[must_use]
    pub fn from_header(value: &str) -> Self {
        match value {
            "SubscriptionValidation" => Self::SubscriptionValidation,
            "Notification" => Self::Notification,
            "SubscriptionDeletion" => Self::SubscriptionDeletion,
            other => Self::Other(other.to_string()),
        }
    }
}

/// An event in the Event Grid schema.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventGridEvent {
    pub id: String,
    #[serde(default)]
    pub topic: Option<String>,
    pub subject: String,
    pub event_type: String,
    pub event_time: String,
    pub data: Value,
    pub data_version: String,
    #[serde(default)]
    pub metadata_version: Option<String>,
}

/// `data` of a subscription validation event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionValidationEventData {
    pub validation_code: String,
    /// Manual validation URL, present for some topic types.
    #[serde(default)]
    pub validation_url: Option<String>,
}

/// Body answering a subscription validation handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionValidationResponse {
    pub validation_response: String,
}

/// Error returned when a delivery body cannot be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The body is not an array of Event Grid events.
    InvalidBody(String),
    /// A validation delivery did not contain exactly one event.
    UnexpectedEventCount(usize),
    /// The validation event's `data` has no usable `validationCode`.
    InvalidValidationData(String),
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBody(reason) => write!(f, "invalid Event Grid body: {reason}"),
            Self::UnexpectedEventCount(count) => {
                write!(f, "expected exactly one validation event, got {count}")
            }
            Self::InvalidValidationData(reason) => {
                write!(f, "invalid subscription validation data: {reason}")
            }
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Parse a delivery body into events.
///
/// # Errors
/// Returns `DeliveryError::InvalidBody` if the body is not a JSON array of
/// Event Grid events.
pub fn parse_events(body: &[u8]) -> Result<Vec<EventGridEvent>, DeliveryError> {
    serde_json::from_slice(body).map_err(|e| DeliveryError::InvalidBody(e.to_string()))
}

/// Build the answer to a subscription validation delivery.
///
/// # Errors
/// Returns an error if the delivery is not exactly one event carrying a
/// string `validationCode`.
pub fn subscription_validation_response(
    events: &[EventGridEvent],
) -> Result<SubscriptionValidationResponse, DeliveryError> {
    let [event] = events else {
        return Err(DeliveryError::UnexpectedEventCount(events.len()));
    };

    let data: SubscriptionValidationEventData = serde_json::from_value(event.data.clone())
        .map_err(|e| DeliveryError::InvalidValidationData(e.to_string()))?;

    Ok(SubscriptionValidationResponse {
        validation_response: data.validation_code,
    })
}
