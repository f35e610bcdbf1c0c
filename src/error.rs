use std::fmt;

use crate::EventicleEvent;

/// Error raised by a consumer handler. Boxed so handlers can surface any
/// domain error without the client caring about its concrete type.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Error taxonomy for stream clients.
///
/// No variant causes silent data loss: `MalformedPayload` and
/// `HandlerFailure` are routed per-event to a subscription's `on_error`
/// callback, while `PublishUnavailable` and `PersistFailure` reject the
/// originating `emit` call.
#[derive(Debug)]
pub enum EventClientError {
    /// The payload could not be parsed into the expected structured form.
    /// Non-fatal: routed to `on_error`, the subscription continues.
    MalformedPayload { reason: String },
    /// The backend could not be reached. Surfaced to the `emit` caller;
    /// retry policy is the caller's choice.
    PublishUnavailable { reason: String },
    /// The outbox write failed. Fatal to the emit call: durability was not
    /// achieved and no partial entry is left visible.
    PersistFailure { reason: String },
    /// A consumer handler failed for one event. Routed to `on_error` with
    /// the failing event; delivery continues with the next event.
    HandlerFailure {
        event: Box<EventicleEvent>,
        reason: String,
    },
}

impl fmt::Display for EventClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventClientError::MalformedPayload { reason } => {
                write!(f, "malformed payload: {}", reason)
            }
            EventClientError::PublishUnavailable { reason } => {
                write!(f, "publish unavailable: {}", reason)
            }
            EventClientError::PersistFailure { reason } => {
                write!(f, "outbox persist failed: {}", reason)
            }
            EventClientError::HandlerFailure { event, reason } => write!(
                f,
                "handler failed for event {} ({}): {}",
                event.id, event.event_type, reason
            ),
        }
    }
}

impl std::error::Error for EventClientError {}
