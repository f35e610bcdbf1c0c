//! Transactional-outbox emission: durably record first, publish later.
//!
//! ## Architecture
//!
//! ```text
//! producer ──emit()──▶ OutboxEventClient ──persist()──▶ EventOutbox
//!                            │                              ▲
//!                        notify()                      read/remove
//!                            ▼                              │
//!                      OutboxSender ···wake···▶ OutboxSweeperThread
//!                                                           │
//!                                                 emit() via delegate
//!                                                           ▼
//!                                                  broker EventClient
//! ```
//!
//! An event is durably recorded the instant `persist` returns, before any
//! stream consumer can see it; the gap between "recorded" and "published"
//! is bounded by the sweep interval, not by the caller. Entries are removed
//! only after a confirmed publish, so delivery is at-least-once and nothing
//! is silently dropped.

mod client;
mod sender;
mod store;
mod sweeper;

pub use client::OutboxEventClient;
#[cfg(feature = "emitter")]
pub use sender::EmitterSender;
pub use sender::{ChannelSender, NoopSender, OutboxSender};
pub use store::{
    EventOutbox, InMemoryOutbox, OutboxError, OutboxEventList, OutboxEventListWithId,
};
pub use sweeper::{sweep_outbox, OutboxSweeperThread, SweepResult};
