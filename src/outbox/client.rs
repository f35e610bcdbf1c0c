//! Outbox-backed stream client: reliable emission as a decorator.

use std::sync::Arc;

use crate::client::{ColdHotConfig, DoneHandler, ErrorHandler, EventClient, EventHandler};
use crate::config::EventClientConfig;
use crate::subscription::EventSubscriptionControl;
use crate::{EventClientError, EventicleEvent};

use super::sender::OutboxSender;
use super::store::{EventOutbox, OutboxEventList};

/// Decorates any [`EventClient`] with outbox-backed emission.
///
/// `emit` encodes the batch, persists it as one [`OutboxEventList`] and
/// then notifies the sender; it returns as soon as persistence succeeds.
/// The notify is best-effort — when it is lost, the periodic sweep
/// ([`sweep_outbox`](super::sweep_outbox)) discovers the entry and
/// publishes it through the delegate. All read operations pass through to
/// the delegate unchanged: the outbox intercepts only the write path.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use eventicle_streams::{
///     EventClient, EventClientConfig, EventicleEvent, InMemoryOutbox, InMemoryStreamClient,
///     NoopSender, OutboxEventClient,
/// };
///
/// let config = Arc::new(EventClientConfig::new());
/// let delegate = InMemoryStreamClient::new(Arc::clone(&config));
/// let outbox = InMemoryOutbox::new();
/// let client = OutboxEventClient::new(config, outbox.clone(), NoopSender, delegate);
///
/// client.emit(
///     vec![EventicleEvent::new("OrderCreated", serde_json::json!({}))],
///     "orders",
/// ).unwrap();
///
/// // Durably recorded, not yet published.
/// assert_eq!(outbox.len(), 1);
/// ```
pub struct OutboxEventClient<D, O, S> {
    config: Arc<EventClientConfig>,
    outbox: O,
    sender: S,
    delegate: D,
}

impl<D, O, S> OutboxEventClient<D, O, S> {
    pub fn new(config: Arc<EventClientConfig>, outbox: O, sender: S, delegate: D) -> Self {
        Self {
            config,
            outbox,
            sender,
            delegate,
        }
    }

    /// The wrapped direct client.
    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    /// The outbox store.
    pub fn outbox(&self) -> &O {
        &self.outbox
    }
}

impl<D, O, S> EventClient for OutboxEventClient<D, O, S>
where
    D: EventClient,
    O: EventOutbox,
    S: OutboxSender,
{
    fn emit(&self, events: Vec<EventicleEvent>, stream: &str) -> Result<(), EventClientError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut encoded = Vec::with_capacity(events.len());
        for mut event in events {
            if event.source.is_none() {
                event.source = Some(self.config.source().to_string());
            }
            encoded.push(self.config.codec().encode(&event)?);
        }

        self.outbox
            .persist(OutboxEventList::new(stream, encoded))
            .map_err(|e| EventClientError::PersistFailure {
                reason: e.to_string(),
            })?;

        // Durability is achieved; the wake is fire-and-forget.
        self.sender.notify();
        Ok(())
    }

    fn cold_stream(
        &self,
        stream: &str,
        handler: EventHandler,
        on_error: ErrorHandler,
        on_done: DoneHandler,
    ) -> Result<EventSubscriptionControl, EventClientError> {
        self.delegate.cold_stream(stream, handler, on_error, on_done)
    }

    fn hot_stream(
        &self,
        stream: &str,
        consumer_group: &str,
        handler: EventHandler,
        on_error: ErrorHandler,
    ) -> Result<EventSubscriptionControl, EventClientError> {
        self.delegate
            .hot_stream(stream, consumer_group, handler, on_error)
    }

    fn cold_hot_stream(
        &self,
        config: ColdHotConfig,
    ) -> Result<EventSubscriptionControl, EventClientError> {
        self.delegate.cold_hot_stream(config)
    }
}
