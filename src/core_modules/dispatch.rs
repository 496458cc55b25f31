// THEORY:
// The dispatch queue is the only seam between the perception core and the
// outside world. Two producers feed it — the pipeline worker and the
// no-detection monitor — and a single consumer drains it strictly in FIFO
// order, handing each token to the transport collaborator.
//
// Design points:
// 1.  **De-duplication**: a command equal to one already pending replaces it
//     at the back of the queue instead of piling up. The actuator only cares
//     about the latest intent, and a slow transport must not cause a burst
//     of identical tokens.
// 2.  **Bounded depth**: the queue never grows past its configured depth;
//     on overflow the oldest entry is dropped — stale intent loses to fresh
//     intent, consistent with the newest-frame-wins policy upstream.
// 3.  **Fire-and-forget hand-off**: the consumer enforces a minimum interval
//     between sends and treats transport errors as the collaborator's
//     problem: they are logged and the queue keeps flowing.
//
// The `Transport` trait is deliberately a plain synchronous
// `send(bytes) -> Result` — connection lifecycle, retries and reconnection
// all live on the other side of it.

use crate::core_modules::command::Command;
use crate::error::TransportError;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::info;

/// Minimum interval between two transport sends.
pub const MIN_COMMAND_INTERVAL: Duration = Duration::from_millis(10);

/// Default bound on pending commands.
pub const DISPATCH_QUEUE_DEPTH: usize = 32;

/// The outbound hand-off contract. Implementations own connection
/// lifecycle, retries and reconnection.
pub trait Transport: Send {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}

/// A transport that only logs, for demos and bench tests.
#[derive(Debug, Default)]
pub struct LoggingTransport;

impl Transport for LoggingTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        info!(token = %String::from_utf8_lossy(bytes).trim_end(), "command dispatched");
        Ok(())
    }
}

/// Bounded, de-duplicating multi-producer/single-consumer command queue.
#[derive(Clone)]
pub struct DispatchQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    pending: Mutex<VecDeque<Command>>,
    notify: Notify,
    depth: usize,
    closed: AtomicBool,
}

impl DispatchQueue {
    pub fn new(depth: usize) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                pending: Mutex::new(VecDeque::with_capacity(depth)),
                notify: Notify::new(),
                depth: depth.max(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Enqueues a command. Pending duplicates of the same value are removed
    /// first; on overflow the oldest entry is dropped.
    pub fn enqueue(&self, command: Command) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        {
            let mut pending = self.inner.pending.lock().unwrap();
            pending.retain(|c| *c != command);
            if pending.len() >= self.inner.depth {
                pending.pop_front();
            }
            pending.push_back(command);
        }
        self.inner.notify.notify_one();
    }

    /// Awaits the next command in FIFO order. Returns None once the queue is
    /// closed and drained.
    pub async fn dequeue(&self) -> Option<Command> {
        loop {
            let notified = self.inner.notify.notified();
            if let Some(command) = self.inner.pending.lock().unwrap().pop_front() {
                return Some(command);
            }
            if self.inner.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    /// Stops accepting new work and wakes the consumer so it can drain out.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
        self.inner.notify.notify_one();
    }

    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().unwrap().len()
    }
}
