//! Notification triggers that wake the outbox publish loop.
//!
//! `notify` is fire-and-forget with no delivery guarantee: a lost wake is
//! harmless because the periodic sweep discovers pending entries anyway.
//! Implementations therefore log failures instead of propagating them.

use std::sync::mpsc::Sender;

#[cfg(feature = "emitter")]
use std::sync::Mutex;

#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;

/// Wakes whatever publishes the outbox. Decoupled from the publish loop so
/// the write path's latency never depends on the publish path's
/// availability.
pub trait OutboxSender: Send + Sync {
    fn notify(&self);
}

/// Sender for deployments where only the periodic sweep publishes.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSender;

impl OutboxSender for NoopSender {
    fn notify(&self) {}
}

/// Wakes an [`OutboxSweeperThread`](super::OutboxSweeperThread) over its
/// wake channel, so a sweep starts promptly after each emit instead of
/// waiting out the poll interval.
#[derive(Clone)]
pub struct ChannelSender {
    wake: Sender<()>,
}

impl ChannelSender {
    pub(crate) fn new(wake: Sender<()>) -> Self {
        Self { wake }
    }
}

impl OutboxSender for ChannelSender {
    fn notify(&self) {
        if self.wake.send(()).is_err() {
            tracing::warn!("outbox sweeper is gone; entry waits for the next periodic sweep");
        }
    }
}

/// Emits a wake notification on an in-process [`EventEmitter`], for hosts
/// that already route internal signals through one.
#[cfg(feature = "emitter")]
pub struct EmitterSender {
    emitter: Mutex<EventEmitter>,
    topic: String,
}

#[cfg(feature = "emitter")]
impl EmitterSender {
    pub fn new(emitter: EventEmitter) -> Self {
        Self::with_topic(emitter, "outbox.notify")
    }

    pub fn with_topic(emitter: EventEmitter, topic: impl Into<String>) -> Self {
        Self {
            emitter: Mutex::new(emitter),
            topic: topic.into(),
        }
    }
}

#[cfg(feature = "emitter")]
impl OutboxSender for EmitterSender {
    fn notify(&self) {
        self.emitter.lock().unwrap().emit(&self.topic, ());
    }
}
