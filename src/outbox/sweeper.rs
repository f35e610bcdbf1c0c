//! The outbox publish loop: drain pending entries through a delegate
//! client, removing each entry only after its publish is confirmed.

use std::sync::mpsc::{channel, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::client::EventClient;
use crate::codec::EventClientCodec;

use super::sender::ChannelSender;
use super::store::{EventOutbox, OutboxError};

/// Result of one sweep (or the accumulated totals of a sweeper thread).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepResult {
    /// Entries published and removed.
    pub entries_published: usize,
    /// Individual events republished through the delegate.
    pub events_published: usize,
    /// Entries left in place for a later retry.
    pub entries_failed: usize,
}

/// Publish every pending outbox entry through `delegate`, removing each
/// entry only after its `emit` succeeded.
///
/// Failed entries stay in the outbox for the next sweep: at-least-once,
/// never silently dropped. Entries whose rows cannot be decoded are also
/// left in place (and logged) so an operator can intervene.
pub fn sweep_outbox<O, C>(
    outbox: &O,
    delegate: &C,
    codec: &dyn EventClientCodec,
) -> Result<SweepResult, OutboxError>
where
    O: EventOutbox + ?Sized,
    C: EventClient + ?Sized,
{
    let mut result = SweepResult::default();

    for entry in outbox.read_outbox()? {
        let mut events = Vec::with_capacity(entry.list.events.len());
        let mut undecodable = false;
        for encoded in &entry.list.events {
            match codec.decode(encoded) {
                Ok(event) => events.push(event),
                Err(err) => {
                    tracing::warn!(entry = entry.id, error = %err, "undecodable outbox entry left in place");
                    undecodable = true;
                    break;
                }
            }
        }
        if undecodable {
            result.entries_failed += 1;
            continue;
        }

        let event_count = events.len();
        match delegate.emit(events, &entry.list.stream) {
            Ok(()) => {
                outbox.remove_outbox_entries(std::slice::from_ref(&entry))?;
                result.entries_published += 1;
                result.events_published += event_count;
            }
            Err(err) => {
                tracing::warn!(entry = entry.id, error = %err, "outbox publish failed; entry stays for retry");
                result.entries_failed += 1;
            }
        }
    }

    Ok(result)
}

/// A background thread that sweeps the outbox on a poll interval, or
/// promptly when woken through its [`ChannelSender`].
///
/// ## Example
///
/// ```ignore
/// let sweeper = OutboxSweeperThread::spawn(
///     outbox.clone(),
///     broker_client,
///     config.codec_arc(),
///     Duration::from_millis(500),
/// );
/// let client = OutboxEventClient::new(config, outbox, sweeper.sender(), delegate);
///
/// // ... emit through the outbox client ...
///
/// let stats = sweeper.stop();
/// println!("published {} events", stats.events_published);
/// ```
pub struct OutboxSweeperThread {
    wake_tx: Sender<()>,
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<SweepResult>>,
}

impl OutboxSweeperThread {
    /// Spawn a sweeper draining `outbox` through `delegate`.
    pub fn spawn<O, C>(
        outbox: O,
        delegate: C,
        codec: Arc<dyn EventClientCodec>,
        poll_interval: Duration,
    ) -> Self
    where
        O: EventOutbox + 'static,
        C: EventClient + 'static,
    {
        let (wake_tx, wake_rx) = channel();
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            let mut stats = SweepResult::default();

            loop {
                // Check for stop signal
                match stop_rx.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => break,
                    Err(TryRecvError::Empty) => {}
                }

                match sweep_outbox(&outbox, &delegate, codec.as_ref()) {
                    Ok(result) => {
                        stats.entries_published += result.entries_published;
                        stats.events_published += result.events_published;
                        stats.entries_failed += result.entries_failed;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "outbox read failed; retrying next sweep");
                    }
                }

                // Sleep until woken or the poll interval elapses.
                match wake_rx.recv_timeout(poll_interval) {
                    Ok(()) | Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => thread::sleep(poll_interval),
                }
            }

            stats
        });

        Self {
            wake_tx,
            stop_tx,
            handle: Some(handle),
        }
    }

    /// A sender that wakes this sweeper, for wiring into an
    /// [`OutboxEventClient`](super::OutboxEventClient).
    pub fn sender(&self) -> ChannelSender {
        ChannelSender::new(self.wake_tx.clone())
    }

    /// Signal the sweeper to stop and wait for it to finish.
    /// Returns the accumulated sweep statistics.
    pub fn stop(mut self) -> SweepResult {
        let _ = self.stop_tx.send(());
        let _ = self.wake_tx.send(());
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap_or_default()
        } else {
            SweepResult::default()
        }
    }

    /// Signal the sweeper to stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
        let _ = self.wake_tx.send(());
    }
}

impl Drop for OutboxSweeperThread {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        let _ = self.wake_tx.send(());
        // Don't join on drop - let the thread finish naturally
    }
}
