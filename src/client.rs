//! The unified stream client contract.
//!
//! Every component programs against [`EventClient`]: emit a batch, replay
//! history ("cold"), tail live events ("hot"), or both in one seamless
//! subscription. Backends implement the trait once; the outbox decorator
//! wraps any implementation without changing the read side.

use crate::subscription::EventSubscriptionControl;
use crate::{EventClientError, EventicleEvent, HandlerError};

/// Consumer callback. Invocations are strictly serialized per subscription,
/// so handlers can mutate downstream state without their own locking.
pub type EventHandler = Box<dyn FnMut(EventicleEvent) -> Result<(), HandlerError> + Send>;

/// Per-event error callback. Receives `HandlerFailure` (with the failing
/// event) and `MalformedPayload`; the subscription continues afterwards.
pub type ErrorHandler = Box<dyn FnMut(EventClientError) + Send>;

/// End-of-cold-replay callback; fires exactly once.
pub type DoneHandler = Box<dyn FnOnce() + Send>;

/// Configuration for a merged cold-then-hot subscription.
pub struct ColdHotConfig {
    /// Stream to subscribe to.
    pub stream: String,
    /// Consumer group for the live tail. When absent a fresh uuid-named
    /// group is used, so the subscription sees the full stream.
    pub group_id: Option<String>,
    /// Event handler.
    pub handler: EventHandler,
    /// Per-event error handler.
    pub on_error: ErrorHandler,
}

impl ColdHotConfig {
    pub fn new(stream: impl Into<String>, handler: EventHandler, on_error: ErrorHandler) -> Self {
        Self {
            stream: stream.into(),
            group_id: None,
            handler,
            on_error,
        }
    }

    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Group id to subscribe with, generating one when unset.
    pub(crate) fn effective_group_id(&self) -> String {
        self.group_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }
}

/// Broker-agnostic stream client.
///
/// Implementations might include:
/// - `InMemoryStreamClient` - for testing and single-process scenarios
/// - `KafkaStreamClient` - for Apache Kafka (external)
/// - `RedisStreamClient` - for Redis Streams (external)
///
/// plus [`OutboxEventClient`](crate::OutboxEventClient), which decorates any
/// of the above with outbox-backed reliable emission.
pub trait EventClient: Send + Sync {
    /// Append a batch of events atomically to one stream.
    ///
    /// Events from the same call that share a `domain_id` keep their
    /// relative order; unrelated calls are never batched together. An empty
    /// batch is a no-op. Fails with `PublishUnavailable` when the backend
    /// cannot be reached; the caller decides whether to retry.
    fn emit(&self, events: Vec<EventicleEvent>, stream: &str) -> Result<(), EventClientError>;

    /// Replay everything persisted to `stream` up to a high-water mark
    /// fixed at subscribe time, in persisted order, then invoke `on_done`
    /// exactly once and autonomously close the subscription.
    ///
    /// Events appended after the mark was captured are never delivered:
    /// the boundary is deliberately fixed so the semantics stay well
    /// defined under concurrent writers.
    fn cold_stream(
        &self,
        stream: &str,
        handler: EventHandler,
        on_error: ErrorHandler,
        on_done: DoneHandler,
    ) -> Result<EventSubscriptionControl, EventClientError>;

    /// Deliver only events appended after subscribe time, as a member of
    /// the named consumer group: two subscribers in one group split the
    /// stream, while distinct groups each see the full stream.
    fn hot_stream(
        &self,
        stream: &str,
        consumer_group: &str,
        handler: EventHandler,
        on_error: ErrorHandler,
    ) -> Result<EventSubscriptionControl, EventClientError>;

    /// Deliver full history followed seamlessly by live events, with no
    /// gap and no duplicate at the boundary.
    fn cold_hot_stream(
        &self,
        config: ColdHotConfig,
    ) -> Result<EventSubscriptionControl, EventClientError>;
}
