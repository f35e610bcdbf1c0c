//! In-memory stream backend for testing and single-process scenarios.
//!
//! This is the included implementation of [`EventClient`]: a thread-safe,
//! append-only log per stream, with consumer-group cursors for hot
//! delivery. Useful for:
//! - Unit and integration testing without external dependencies
//! - Single-process applications
//! - Development and prototyping
//!
//! Each stream is a single shard, so the per-shard independence of the
//! cold→hot handoff is trivial here; broker-backed implementations run the
//! same state machine once per partition.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

use crate::client::{ColdHotConfig, DoneHandler, ErrorHandler, EventClient, EventHandler};
use crate::codec::EventClientCodec;
use crate::config::EventClientConfig;
use crate::subscription::{DeliveryState, EventSubscriptionControl};
use crate::{EncodedEvent, EventClientError, EventicleEvent};

/// Per-stream append-only logs plus consumer-group cursors.
struct Shared {
    logs: RwLock<HashMap<String, Vec<EncodedEvent>>>,
    /// (stream, group) -> next index to claim. Members of one group share
    /// the cursor and compete for indices; distinct groups get their own.
    groups: Mutex<HashMap<(String, String), Arc<Mutex<usize>>>>,
    offline: AtomicBool,
}

/// In-memory [`EventClient`].
///
/// Cloning creates another handle to the same storage, so producers and
/// consumers can share one client across threads.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use eventicle_streams::{EventClient, EventClientConfig, EventicleEvent, InMemoryStreamClient};
///
/// let client = InMemoryStreamClient::new(Arc::new(EventClientConfig::new()));
/// client.emit(
///     vec![EventicleEvent::new("OrderCreated", serde_json::json!({"id": "123"}))],
///     "orders",
/// ).unwrap();
/// assert_eq!(client.stream_len("orders"), 1);
/// ```
#[derive(Clone)]
pub struct InMemoryStreamClient {
    config: Arc<EventClientConfig>,
    shared: Arc<Shared>,
}

impl InMemoryStreamClient {
    pub fn new(config: Arc<EventClientConfig>) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                logs: RwLock::new(HashMap::new()),
                groups: Mutex::new(HashMap::new()),
                offline: AtomicBool::new(false),
            }),
        }
    }

    /// Simulate broker unreachability: while offline, `emit` fails with
    /// `PublishUnavailable`. Subscriptions keep draining what was already
    /// appended.
    pub fn set_offline(&self, offline: bool) {
        self.shared.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of events persisted to a stream.
    pub fn stream_len(&self, stream: &str) -> usize {
        self.shared
            .logs
            .read()
            .unwrap()
            .get(stream)
            .map(|log| log.len())
            .unwrap_or(0)
    }

    /// All encoded events persisted to a stream, in order.
    pub fn stream_events(&self, stream: &str) -> Vec<EncodedEvent> {
        self.shared
            .logs
            .read()
            .unwrap()
            .get(stream)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop all streams and group cursors (useful for test cleanup).
    pub fn clear(&self) {
        self.shared.logs.write().unwrap().clear();
        self.shared.groups.lock().unwrap().clear();
    }

    /// Shared claim cursor for a consumer group, created at `start` when
    /// the group does not exist yet.
    fn group_cursor(&self, stream: &str, group: &str, start: usize) -> Arc<Mutex<usize>> {
        let mut groups = self.shared.groups.lock().unwrap();
        Arc::clone(
            groups
                .entry((stream.to_string(), group.to_string()))
                .or_insert_with(|| Arc::new(Mutex::new(start))),
        )
    }

    /// Claim the next unread index for a group, returning the event if one
    /// is available. The cursor lock serializes claims, so each index goes
    /// to exactly one group member.
    fn claim_next(&self, stream: &str, cursor: &Mutex<usize>) -> Option<EncodedEvent> {
        let logs = self.shared.logs.read().unwrap();
        let log = logs.get(stream)?;
        let mut next = cursor.lock().unwrap();
        if *next < log.len() {
            let event = log[*next].clone();
            *next += 1;
            Some(event)
        } else {
            None
        }
    }
}

/// Decode one encoded event and run it through the handler, routing decode
/// and handler failures to `on_error`. Delivery always continues afterwards.
fn deliver(
    codec: &dyn EventClientCodec,
    encoded: &EncodedEvent,
    handler: &mut EventHandler,
    on_error: &mut ErrorHandler,
) {
    match codec.decode(encoded) {
        Ok(event) => {
            if let Err(err) = handler(event.clone()) {
                on_error(EventClientError::HandlerFailure {
                    event: Box::new(event),
                    reason: err.to_string(),
                });
            }
        }
        Err(err) => on_error(err),
    }
}

/// True when the subscription has been asked to stop (or the control handle
/// was dropped and its channel disconnected after signalling).
fn stop_requested(stop_rx: &Receiver<()>) -> bool {
    match stop_rx.try_recv() {
        Ok(()) | Err(TryRecvError::Disconnected) => true,
        Err(TryRecvError::Empty) => false,
    }
}

const POLL_SLEEP: Duration = Duration::from_millis(1);

impl EventClient for InMemoryStreamClient {
    fn emit(&self, events: Vec<EventicleEvent>, stream: &str) -> Result<(), EventClientError> {
        if events.is_empty() {
            return Ok(());
        }
        if self.shared.offline.load(Ordering::SeqCst) {
            return Err(EventClientError::PublishUnavailable {
                reason: "in-memory backend is offline".to_string(),
            });
        }

        let mut encoded = Vec::with_capacity(events.len());
        for mut event in events {
            if event.source.is_none() {
                event.source = Some(self.config.source().to_string());
            }
            encoded.push(self.config.codec().encode(&event)?);
        }

        // One write-lock section per call: the batch lands atomically and
        // in order, and unrelated calls are never interleaved within it.
        let mut logs = self.shared.logs.write().unwrap();
        logs.entry(stream.to_string()).or_default().extend(encoded);
        Ok(())
    }

    fn cold_stream(
        &self,
        stream: &str,
        mut handler: EventHandler,
        mut on_error: ErrorHandler,
        on_done: DoneHandler,
    ) -> Result<EventSubscriptionControl, EventClientError> {
        // Fixed snapshot boundary: events appended after this point are
        // never delivered by this subscription.
        let high_water_mark = self.stream_len(stream);
        let client = self.clone();
        let stream = stream.to_string();
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            tracing::debug!(stream = %stream, high_water_mark, "cold replay starting");
            let mut next = 0;
            while next < high_water_mark {
                if stop_requested(&stop_rx) {
                    tracing::debug!(stream = %stream, position = next, "cold replay closed early");
                    return;
                }
                let encoded = {
                    let logs = client.shared.logs.read().unwrap();
                    logs.get(&stream).map(|log| log[next].clone())
                };
                if let Some(encoded) = &encoded {
                    deliver(client.config.codec(), encoded, &mut handler, &mut on_error);
                }
                next += 1;
            }
            // The subscription closes itself once the mark is reached;
            // on_done fires after the last at-or-below-mark delivery.
            tracing::debug!(stream = %stream, delivered = high_water_mark, "cold replay done");
            on_done();
        });

        Ok(EventSubscriptionControl::new(stop_tx, handle))
    }

    fn hot_stream(
        &self,
        stream: &str,
        consumer_group: &str,
        mut handler: EventHandler,
        mut on_error: ErrorHandler,
    ) -> Result<EventSubscriptionControl, EventClientError> {
        // A new group starts at the current end of stream (no history);
        // a known group name joins its existing cursor and competes.
        let cursor = self.group_cursor(stream, consumer_group, self.stream_len(stream));
        let client = self.clone();
        let stream = stream.to_string();
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            loop {
                if stop_requested(&stop_rx) {
                    break;
                }
                match client.claim_next(&stream, &cursor) {
                    Some(encoded) => {
                        deliver(client.config.codec(), &encoded, &mut handler, &mut on_error)
                    }
                    None => thread::sleep(POLL_SLEEP),
                }
            }
        });

        Ok(EventSubscriptionControl::new(stop_tx, handle))
    }

    fn cold_hot_stream(
        &self,
        config: ColdHotConfig,
    ) -> Result<EventSubscriptionControl, EventClientError> {
        let group_id = config.effective_group_id();
        // Position the live cursor exactly at the high-water mark before
        // replay starts: everything below the mark comes from the cold
        // pass, everything at or above it from the tail.
        let high_water_mark = self.stream_len(&config.stream);
        let cursor = self.group_cursor(&config.stream, &group_id, high_water_mark);
        {
            // A reused group name may carry a cursor below the mark; left
            // there, the tail would re-deliver events the replay covers.
            let mut next = cursor.lock().unwrap();
            if *next < high_water_mark {
                *next = high_water_mark;
            }
        }
        let client = self.clone();
        let stream_name = config.stream;
        let mut handler = config.handler;
        let mut on_error = config.on_error;
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            let mut state = DeliveryState::Replaying;
            let mut next = 0;
            tracing::debug!(stream = %stream_name, high_water_mark, group = %group_id, "cold/hot subscription starting");

            loop {
                if stop_requested(&stop_rx) {
                    state = DeliveryState::Closed;
                }
                match state {
                    DeliveryState::Replaying => {
                        if next < high_water_mark {
                            let encoded = {
                                let logs = client.shared.logs.read().unwrap();
                                logs.get(&stream_name).map(|log| log[next].clone())
                            };
                            if let Some(encoded) = &encoded {
                                deliver(
                                    client.config.codec(),
                                    encoded,
                                    &mut handler,
                                    &mut on_error,
                                );
                            }
                            next += 1;
                        } else {
                            state = DeliveryState::Seeking;
                        }
                    }
                    DeliveryState::Seeking => {
                        // The cursor was created at the mark; the seam
                        // is crossed without re-reading below it.
                        tracing::debug!(stream = %stream_name, position = high_water_mark, "switching to live tail");
                        state = DeliveryState::Tailing;
                    }
                    DeliveryState::Tailing => match client.claim_next(&stream_name, &cursor) {
                        Some(encoded) => deliver(
                            client.config.codec(),
                            &encoded,
                            &mut handler,
                            &mut on_error,
                        ),
                        None => thread::sleep(POLL_SLEEP),
                    },
                    DeliveryState::Closed => break,
                }
            }
        });

        Ok(EventSubscriptionControl::new(stop_tx, handle))
    }
}
