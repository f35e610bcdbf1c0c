//! Codec between domain events and their wire-ready encoded form.
//!
//! The codec is a pure, synchronous contract: `encode` and `decode` are
//! total over well-formed input, and `decode(encode(e))` must equal `e` on
//! id, type, domain id, creation time and data. Headers carry enough of the
//! event's fields that a backend can route without parsing the payload.

use std::collections::HashMap;

use crate::{EncodedEvent, EventClientError, EventicleEvent};

/// Wire header carrying the event id.
pub const HEADER_ID: &str = "id";
/// Wire header carrying the event type discriminator.
pub const HEADER_TYPE: &str = "type";
/// Wire header carrying the aggregate identity.
pub const HEADER_DOMAIN_ID: &str = "domainId";
/// Wire header carrying the creation timestamp (decimal epoch millis).
pub const HEADER_CREATED_AT: &str = "createdAt";
/// Extension header: emitting service name.
pub const HEADER_SOURCE: &str = "source";
/// Extension header: id of the causing event.
pub const HEADER_CAUSED_BY_ID: &str = "causedById";
/// Extension header: type of the causing event.
pub const HEADER_CAUSED_BY_TYPE: &str = "causedByType";

/// Converts events to and from [`EncodedEvent`].
///
/// Implementations must be deterministic (same event, same bytes) so wire
/// output is testable, and `decode` must treat an absent header as an empty
/// optional field rather than an error. The only decode failure mode is
/// [`EventClientError::MalformedPayload`], raised when the payload bytes
/// cannot be parsed; it is never retried internally.
pub trait EventClientCodec: Send + Sync {
    fn encode(&self, event: &EventicleEvent) -> Result<EncodedEvent, EventClientError>;
    fn decode(&self, encoded: &EncodedEvent) -> Result<EventicleEvent, EventClientError>;
}

/// Default codec: the payload is the UTF-8 JSON serialization of the
/// event's `data`, and all identity/routing fields travel as headers.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        JsonCodec
    }
}

impl EventClientCodec for JsonCodec {
    fn encode(&self, event: &EventicleEvent) -> Result<EncodedEvent, EventClientError> {
        let payload =
            serde_json::to_vec(&event.data).map_err(|e| EventClientError::MalformedPayload {
                reason: e.to_string(),
            })?;

        let mut headers = HashMap::new();
        headers.insert(HEADER_ID.to_string(), event.id.clone());
        headers.insert(HEADER_TYPE.to_string(), event.event_type.clone());
        headers.insert(HEADER_CREATED_AT.to_string(), event.created_at.to_string());
        if let Some(domain_id) = &event.domain_id {
            headers.insert(HEADER_DOMAIN_ID.to_string(), domain_id.clone());
        }
        if let Some(source) = &event.source {
            headers.insert(HEADER_SOURCE.to_string(), source.clone());
        }
        if let Some(caused_by_id) = &event.caused_by_id {
            headers.insert(HEADER_CAUSED_BY_ID.to_string(), caused_by_id.clone());
        }
        if let Some(caused_by_type) = &event.caused_by_type {
            headers.insert(HEADER_CAUSED_BY_TYPE.to_string(), caused_by_type.clone());
        }

        Ok(EncodedEvent::new(payload, headers))
    }

    fn decode(&self, encoded: &EncodedEvent) -> Result<EventicleEvent, EventClientError> {
        let data: serde_json::Value = serde_json::from_slice(&encoded.payload).map_err(|e| {
            EventClientError::MalformedPayload {
                reason: e.to_string(),
            }
        })?;

        // Absent headers are empty optionals, never an error.
        Ok(EventicleEvent {
            id: encoded.header(HEADER_ID).unwrap_or_default().to_string(),
            event_type: encoded.header(HEADER_TYPE).unwrap_or_default().to_string(),
            domain_id: encoded.header(HEADER_DOMAIN_ID).map(str::to_string),
            caused_by_id: encoded.header(HEADER_CAUSED_BY_ID).map(str::to_string),
            caused_by_type: encoded.header(HEADER_CAUSED_BY_TYPE).map(str::to_string),
            source: encoded.header(HEADER_SOURCE).map(str::to_string),
            created_at: encoded
                .header(HEADER_CREATED_AT)
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            data,
        })
    }
}
