//! Webhook payload decoder.
//!
//! Turns a verified body into an [`Event`] envelope. Only the envelope is
//! typed: `id`, `type` and the object at `data.object`. The object itself stays
//! a generic JSON tree so that unknown or future event types still decode, and
//! extra fields anywhere in the payload are ignored.
//!
//! # Decoding Strategy
//!
//! 1. The body is deserialized into a minimal raw envelope
//! 2. A missing `id`, `type` or `data.object` is a malformed payload
//! 3. An empty `type` is a malformed payload
//! 4. Everything else is carried through untouched

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::EventId;

use super::events::Event;
use super::signature::VerifiedPayload;

/// Error type for payloads that cannot be decoded into an event envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// JSON deserialization failed (includes missing `data.object`).
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A field has an invalid value.
    #[error("malformed payload: invalid value for {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: Map<String, Value>,
}

/// Decodes a verified payload into an [`Event`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use chrono::Utc;
/// use reader_webhook::webhooks::{compute_signature, decode, format_signature_header, verify};
///
/// let body = br#"{"id":"evt_1","type":"customer.created","data":{"object":{"id":"cus_1"}}}"#;
/// let ts = Utc::now().timestamp();
/// let header = format_signature_header(ts, &[compute_signature(ts, body, b"secret")]);
/// let verified = verify(body, &header, b"secret", Duration::from_secs(300)).unwrap();
///
/// let event = decode(&verified).unwrap();
/// assert_eq!(event.event_type, "customer.created");
/// ```
pub fn decode(payload: &VerifiedPayload) -> Result<Event, DecodeError> {
    let raw: RawEvent = serde_json::from_slice(payload.body())?;

    if raw.event_type.trim().is_empty() {
        return Err(DecodeError::InvalidField {
            field: "type",
            value: raw.event_type,
        });
    }

    Ok(Event {
        id: EventId::new(raw.id),
        event_type: raw.event_type,
        data_object: raw.data.object,
    })
}
