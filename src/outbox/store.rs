//! Durable staging store for events pending publication.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::EncodedEvent;

/// One durability batch: the encoded events of a single `emit` call,
/// written atomically alongside the triggering business transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboxEventList {
    /// Stream the events are destined for.
    pub stream: String,
    /// Encoded events in emit order.
    pub events: Vec<EncodedEvent>,
    /// When the batch was persisted.
    pub persisted_at: SystemTime,
}

impl OutboxEventList {
    /// Stamp a batch with the current time.
    pub fn new(stream: impl Into<String>, events: Vec<EncodedEvent>) -> Self {
        Self {
            stream: stream.into(),
            events,
            persisted_at: SystemTime::now(),
        }
    }
}

/// An outbox entry plus its store-assigned identity, used for deletion
/// after a confirmed publish.
#[derive(Clone, Debug, PartialEq)]
pub struct OutboxEventListWithId {
    pub id: u64,
    pub list: OutboxEventList,
}

/// Error type for outbox store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboxError {
    /// The underlying storage failed.
    Storage { reason: String },
    /// The entry could not be (de)serialized for storage.
    Serialization { reason: String },
}

impl fmt::Display for OutboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboxError::Storage { reason } => write!(f, "outbox storage error: {}", reason),
            OutboxError::Serialization { reason } => {
                write!(f, "outbox serialization error: {}", reason)
            }
        }
    }
}

impl std::error::Error for OutboxError {}

/// Durable append-only record of events pending publication.
///
/// Implementations must be crash-consistent: an entry persisted but not
/// yet removed must still be readable after a process restart. Removal is
/// never implied by persistence; the sweep removes entries only once their
/// events are confirmed published.
pub trait EventOutbox: Send + Sync {
    fn persist(&self, events: OutboxEventList) -> Result<(), OutboxError>;
    fn read_outbox(&self) -> Result<Vec<OutboxEventListWithId>, OutboxError>;
    fn remove_outbox_entries(&self, entries: &[OutboxEventListWithId]) -> Result<(), OutboxError>;
}

/// In-memory outbox for testing and single-process scenarios.
///
/// Entries are held as serialized rows (`id` + bitcode bytes), the same
/// shape a table-backed store would use, so tests can exercise the full
/// persist → read → remove path including row decoding. `snapshot` and
/// `from_rows` simulate a crash/restart: whatever rows existed before the
/// "crash" come back readable.
#[derive(Clone, Default)]
pub struct InMemoryOutbox {
    rows: Arc<Mutex<Vec<(u64, Vec<u8>)>>>,
    next_id: Arc<Mutex<u64>>,
}

impl InMemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously captured rows, as a restart would.
    pub fn from_rows(rows: Vec<(u64, Vec<u8>)>) -> Self {
        let next_id = rows.iter().map(|(id, _)| id + 1).max().unwrap_or(0);
        Self {
            rows: Arc::new(Mutex::new(rows)),
            next_id: Arc::new(Mutex::new(next_id)),
        }
    }

    /// Capture the raw rows as they would survive a crash.
    pub fn snapshot(&self) -> Vec<(u64, Vec<u8>)> {
        self.rows.lock().unwrap().clone()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().unwrap().is_empty()
    }

    /// Drop all entries (useful for test cleanup).
    pub fn clear(&self) {
        self.rows.lock().unwrap().clear();
    }
}

impl EventOutbox for InMemoryOutbox {
    fn persist(&self, events: OutboxEventList) -> Result<(), OutboxError> {
        // Serialize before touching the rows: a failed entry is never
        // partially visible.
        let bytes = bitcode::serialize(&events).map_err(|e| OutboxError::Serialization {
            reason: e.to_string(),
        })?;

        let mut next_id = self.next_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;
        self.rows.lock().unwrap().push((id, bytes));
        Ok(())
    }

    fn read_outbox(&self) -> Result<Vec<OutboxEventListWithId>, OutboxError> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .map(|(id, bytes)| {
                let list = bitcode::deserialize(bytes).map_err(|e| OutboxError::Serialization {
                    reason: e.to_string(),
                })?;
                Ok(OutboxEventListWithId { id: *id, list })
            })
            .collect()
    }

    fn remove_outbox_entries(&self, entries: &[OutboxEventListWithId]) -> Result<(), OutboxError> {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|(id, _)| !entries.iter().any(|entry| entry.id == *id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn encoded(event_type: &str) -> EncodedEvent {
        let mut headers = HashMap::new();
        headers.insert("type".to_string(), event_type.to_string());
        EncodedEvent::new(b"{}".to_vec(), headers)
    }

    #[test]
    fn persist_and_read() {
        let outbox = InMemoryOutbox::new();
        outbox
            .persist(OutboxEventList::new("orders", vec![encoded("A"), encoded("B")]))
            .unwrap();

        let entries = outbox.read_outbox().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].list.stream, "orders");
        assert_eq!(entries[0].list.events.len(), 2);
        assert_eq!(entries[0].list.events[0].header("type"), Some("A"));
    }

    #[test]
    fn remove_only_named_entries() {
        let outbox = InMemoryOutbox::new();
        outbox
            .persist(OutboxEventList::new("orders", vec![encoded("A")]))
            .unwrap();
        outbox
            .persist(OutboxEventList::new("orders", vec![encoded("B")]))
            .unwrap();

        let entries = outbox.read_outbox().unwrap();
        outbox.remove_outbox_entries(&entries[..1]).unwrap();

        let remaining = outbox.read_outbox().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].list.events[0].header("type"), Some("B"));
    }

    #[test]
    fn removal_is_not_implied_by_persistence() {
        let outbox = InMemoryOutbox::new();
        outbox
            .persist(OutboxEventList::new("orders", vec![encoded("A")]))
            .unwrap();

        // Reading twice returns the same entry until removal.
        assert_eq!(outbox.read_outbox().unwrap().len(), 1);
        assert_eq!(outbox.read_outbox().unwrap().len(), 1);
    }

    #[test]
    fn rows_survive_restart() {
        let outbox = InMemoryOutbox::new();
        outbox
            .persist(OutboxEventList::new("orders", vec![encoded("A")]))
            .unwrap();

        let restarted = InMemoryOutbox::from_rows(outbox.snapshot());
        let entries = restarted.read_outbox().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].list.events[0].header("type"), Some("A"));

        // Ids assigned after restart don't collide with survivors.
        restarted
            .persist(OutboxEventList::new("orders", vec![encoded("B")]))
            .unwrap();
        let entries = restarted.read_outbox().unwrap();
        assert_ne!(entries[0].id, entries[1].id);
    }
}
