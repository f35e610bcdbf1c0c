//! Domain events and their transport-neutral encoded form.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A domain event as application code sees it.
///
/// Events are immutable once constructed: build one with [`EventicleEvent::new`]
/// and the `with_*` / `caused_by` builders, then hand it to
/// [`EventClient::emit`](crate::EventClient::emit).
///
/// `domain_id` groups events belonging to one aggregate/entity; backends use
/// it for partitioning, and relative order is only guaranteed between events
/// that share it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventicleEvent {
    /// Unique identifier for this event.
    pub id: String,
    /// Discriminator used for routing and handling (e.g. "OrderCreated").
    pub event_type: String,
    /// Identity of the aggregate/entity this event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
    /// Id of the event that caused this one, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caused_by_id: Option<String>,
    /// Type of the event that caused this one, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caused_by_type: Option<String>,
    /// Name of the service that emitted the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Logical creation timestamp, milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Arbitrary structured payload.
    pub data: serde_json::Value,
}

impl EventicleEvent {
    /// Create a new event with a generated id and the current time.
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            domain_id: None,
            caused_by_id: None,
            caused_by_type: None,
            source: None,
            created_at: now_millis(),
            data,
        }
    }

    /// Set the aggregate identity this event belongs to.
    pub fn with_domain_id(mut self, domain_id: impl Into<String>) -> Self {
        self.domain_id = Some(domain_id.into());
        self
    }

    /// Set the emitting service name.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Record the event that caused this one.
    pub fn caused_by(
        mut self,
        caused_by_id: impl Into<String>,
        caused_by_type: impl Into<String>,
    ) -> Self {
        self.caused_by_id = Some(caused_by_id.into());
        self.caused_by_type = Some(caused_by_type.into());
        self
    }

    /// Deserialize `data` into a concrete type.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

/// The wire-ready form of an event: an opaque byte payload plus string
/// headers carrying enough of the event's fields to reconstruct it without
/// inspecting the payload.
///
/// Serializes with the payload as base64 text, so encoded events can be
/// stored in text-oriented rows (outbox tables, JSON logs) without loss.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncodedEvent {
    #[serde(with = "payload_serde")]
    pub payload: Vec<u8>,
    pub headers: HashMap<String, String>,
}

mod payload_serde {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(payload: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(payload).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

impl EncodedEvent {
    pub fn new(payload: Vec<u8>, headers: HashMap<String, String>) -> Self {
        Self { payload, headers }
    }

    /// Get a header value by key.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|s| s.as_str())
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
