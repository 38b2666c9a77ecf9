//! In-process live provider.
//!
//! `LiveSource` is the subscription side, `SourceHandle` the producing side.
//! A handle delivers on the caller's thread to every observer subscribed at
//! that moment, which is how real tracing callbacks arrive: on arbitrary,
//! uncoordinated dispatcher threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use shared::TraceEvent;

use super::{EventSource, Observer, SourceError, Subscription};

#[derive(Clone)]
enum Terminal {
    Completed,
    Failed(SourceError),
}

struct Inner {
    name: String,
    next_id: AtomicU64,
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    observers: Vec<(u64, Arc<dyn Observer>)>,
    terminal: Option<Terminal>,
}

/// A named provider that any number of sessions may subscribe to.
#[derive(Clone)]
pub struct LiveSource {
    inner: Arc<Inner>,
}

/// Producer side of a `LiveSource`. Cheap to clone and `Send`.
#[derive(Clone)]
pub struct SourceHandle {
    inner: Arc<Inner>,
}

impl LiveSource {
    pub fn new(name: impl Into<String>) -> (Self, SourceHandle) {
        let inner = Arc::new(Inner {
            name: name.into(),
            next_id: AtomicU64::new(0),
            state: RwLock::new(State::default()),
        });
        (Self { inner: inner.clone() }, SourceHandle { inner })
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.state.read().observers.len()
    }
}

impl EventSource for LiveSource {
    fn subscribe(&self, observer: Arc<dyn Observer>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut state = self.inner.state.write();
            if state.terminal.is_none() {
                state.observers.push((id, observer));
                drop(state);
                let inner = Arc::downgrade(&self.inner);
                return Subscription::new(move || {
                    if let Some(inner) = inner.upgrade() {
                        inner.state.write().observers.retain(|(i, _)| *i != id);
                    }
                });
            }
        }

        // already terminated: replay the terminal signal
        let terminal = self.inner.state.read().terminal.clone();
        match terminal {
            Some(Terminal::Failed(e)) => observer.on_error(e),
            _ => observer.on_completed(),
        }
        Subscription::empty()
    }
}

impl SourceHandle {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Deliver one event to the current subscribers. Ignored after the source
    /// terminated.
    pub fn emit(&self, event: TraceEvent) {
        let observers = {
            let state = self.inner.state.read();
            if state.terminal.is_some() {
                return;
            }
            state.observers.iter().map(|(_, o)| o.clone()).collect::<Vec<_>>()
        };
        let Some((last, rest)) = observers.split_last() else { return };
        for o in rest {
            o.on_next(event.clone());
        }
        last.on_next(event);
    }

    pub fn fail(&self, error: SourceError) {
        if self.terminate(Terminal::Failed(error.clone())) {
            for o in self.snapshot_and_clear() {
                o.on_error(error.clone());
            }
        }
    }

    pub fn complete(&self) {
        if self.terminate(Terminal::Completed) {
            for o in self.snapshot_and_clear() {
                o.on_completed();
            }
        }
    }

    fn terminate(&self, terminal: Terminal) -> bool {
        let mut state = self.inner.state.write();
        if state.terminal.is_some() {
            return false;
        }
        state.terminal = Some(terminal);
        true
    }

    fn snapshot_and_clear(&self) -> Vec<Arc<dyn Observer>> {
        let observers = std::mem::take(&mut self.inner.state.write().observers);
        observers.into_iter().map(|(_, o)| o).collect()
    }
}
