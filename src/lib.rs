//! Broker-agnostic event streaming: a unified contract for emitting and
//! consuming domain events, plus a transactional outbox that guarantees
//! events are never lost between a local state change and their
//! publication.
//!
//! The [`EventClient`] trait is the seam every component programs against:
//! `emit` a batch, replay history with `cold_stream`, tail live events
//! with `hot_stream`, or get both seamlessly with `cold_hot_stream`. The
//! included [`InMemoryStreamClient`] backs the contract for tests and
//! single-process apps; broker adapters (Kafka, Redis Streams, ...) live
//! outside this crate and implement the same trait.
//!
//! [`OutboxEventClient`] decorates any client with at-least-once reliable
//! emission: events are encoded, durably persisted to an [`EventOutbox`],
//! and published later by a sweep ([`sweep_outbox`] /
//! [`OutboxSweeperThread`]) that removes entries only after a confirmed
//! publish.

mod client;
mod codec;
mod config;
mod error;
mod event;
mod memory;
mod outbox;
mod subscription;

pub use client::{ColdHotConfig, DoneHandler, ErrorHandler, EventClient, EventHandler};
pub use codec::{
    EventClientCodec, JsonCodec, HEADER_CAUSED_BY_ID, HEADER_CAUSED_BY_TYPE, HEADER_CREATED_AT,
    HEADER_DOMAIN_ID, HEADER_ID, HEADER_SOURCE, HEADER_TYPE,
};
pub use config::EventClientConfig;
pub use error::{EventClientError, HandlerError};
pub use event::{now_millis, EncodedEvent, EventicleEvent};
pub use memory::InMemoryStreamClient;
#[cfg(feature = "emitter")]
pub use outbox::EmitterSender;
pub use outbox::{
    sweep_outbox, ChannelSender, EventOutbox, InMemoryOutbox, NoopSender, OutboxError,
    OutboxEventClient, OutboxEventList, OutboxEventListWithId, OutboxSender, OutboxSweeperThread,
    SweepResult,
};
pub use subscription::{DeliveryState, EventSubscriptionControl};

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
