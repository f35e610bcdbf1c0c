//! Subscription control handles and the cold→hot delivery state machine.

use std::sync::mpsc::Sender;
use std::sync::Mutex;
use std::thread::JoinHandle;

/// Where a merged cold/hot subscription currently sources its events.
///
/// The transition rule is fixed: `Replaying` while the next position is
/// below the high-water mark captured at subscribe time; `Seeking` places
/// the live cursor exactly at the mark (so nothing below it is re-delivered
/// and nothing at or above it is skipped); `Tailing` delivers live events;
/// `Closed` once the loop has stopped. A pure cold subscription goes
/// `Replaying` → `Closed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryState {
    /// Delivering historical events below the captured high-water mark.
    Replaying,
    /// Positioning the live cursor at the high-water mark.
    Seeking,
    /// Delivering live events at or beyond the mark.
    Tailing,
    /// The delivery loop has stopped and released its resources.
    Closed,
}

/// Handle returned by every subscribe operation.
///
/// Owned exclusively by the caller; the client never closes it on the
/// caller's behalf, except that a pure cold subscription shuts its own
/// delivery loop down after `on_done`.
///
/// `close` signals the delivery loop, then blocks until the loop has fully
/// stopped: no delivery happens after it returns. Cancellation is
/// cooperative, taking effect between handler invocations, never mid-call.
/// Safe to call multiple times and concurrently with an in-flight delivery.
pub struct EventSubscriptionControl {
    stop_tx: Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl EventSubscriptionControl {
    pub(crate) fn new(stop_tx: Sender<()>, handle: JoinHandle<()>) -> Self {
        Self {
            stop_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Stop delivery and release the underlying session, blocking until the
    /// delivery loop has exited. Idempotent.
    pub fn close(&self) {
        let _ = self.stop_tx.send(());
        let handle = self.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Whether the delivery loop has been joined via `close`.
    ///
    /// A subscription that shut itself down (end of cold replay) still
    /// reports `false` until the owner calls `close`.
    pub fn is_closed(&self) -> bool {
        self.handle.lock().unwrap().is_none()
    }
}

impl Drop for EventSubscriptionControl {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        // Don't join on drop - let the loop wind down naturally
    }
}
