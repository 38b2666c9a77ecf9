//! Producer → consumer hand-off.
//!
//! An unbounded FIFO fed by any number of producer threads and drained by a
//! single consumer thread:
//!   • `enqueue` never blocks on the consumer and succeeds while the queue is
//!     open.
//!   • `close` is idempotent; everything enqueued before it is still drained.
//!   • `drain` blocks while the queue is empty and open, and returns as soon as
//!     the cancellation token fires, discarding whatever is still queued.
//!
//! Close is a marker travelling through the same channel as the items, so
//! FIFO order decides what is drained. The `RwLock` only orders `enqueue`
//! against `close`: producers share the read side, `close` takes the write
//! side once.

use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use metrics::counter;
use parking_lot::RwLock;
use thiserror::Error;

use super::CancellationToken;

enum Slot<T> {
    Item(T),
    Closed,
}

/// Returned by `enqueue` after `close`, handing the item back.
#[derive(Debug, Error)]
#[error("handoff queue is closed")]
pub struct QueueClosed<T>(pub T);

pub struct HandoffQueue<T> {
    tx: Sender<Slot<T>>,
    rx: Receiver<Slot<T>>,
    closed: RwLock<bool>,
}

impl<T> HandoffQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx, closed: RwLock::new(false) }
    }

    pub fn enqueue(&self, item: T) -> Result<(), QueueClosed<T>> {
        let closed = self.closed.read();
        if *closed {
            return Err(QueueClosed(item));
        }
        // we own a receiver, so the channel cannot be disconnected
        self.tx.send(Slot::Item(item)).map_err(|e| match e.into_inner() {
            Slot::Item(item) => QueueClosed(item),
            Slot::Closed => unreachable!("only close() sends the marker"),
        })?;
        counter!("etwstream_actions_enqueued_total").increment(1);
        Ok(())
    }

    /// Returns `true` for the call that actually closed the queue.
    pub fn close(&self) -> bool {
        let mut closed = self.closed.write();
        if *closed {
            return false;
        }
        *closed = true;
        let _ = self.tx.send(Slot::Closed);
        true
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.read()
    }

    /// Blocking iterator for the single consumer thread.
    pub fn drain<'a>(&'a self, token: &'a CancellationToken) -> Drain<'a, T> {
        Drain { queue: self, token, finished: false }
    }
}

impl<T> Default for HandoffQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Drain<'a, T> {
    queue: &'a HandoffQueue<T>,
    token: &'a CancellationToken,
    finished: bool,
}

impl<T> Drain<'_, T> {
    fn stop(&mut self) -> Option<T> {
        self.finished = true;
        if self.token.is_cancelled() {
            let discarded = self.queue.rx.try_iter().filter(|s| matches!(s, Slot::Item(_))).count();
            counter!("etwstream_actions_discarded_total").increment(discarded as u64);
        }
        None
    }
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.finished {
            return None;
        }
        if self.token.is_cancelled() {
            return self.stop();
        }
        let (queue, token) = (self.queue, self.token);
        select! {
            recv(queue.rx) -> slot => match slot {
                // cancellation may have landed while we were picking the item
                Ok(Slot::Item(_)) if token.is_cancelled() => self.stop(),
                Ok(Slot::Item(item)) => Some(item),
                Ok(Slot::Closed) | Err(_) => self.stop(),
            },
            recv(token.signal()) -> _ => self.stop(),
        }
    }
}
