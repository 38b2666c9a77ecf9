//! Fan-in of N sources into one.
//!
//! Events are forwarded in arrival order, with no reordering across sources.
//! The merged sequence completes once every input completed. The first error
//! from any input is forwarded and tears down every other input; nothing is
//! forwarded after it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::Level;
use parking_lot::Mutex;
use shared::TraceEvent;

use crate::source::{EventSource, Observer, SourceError, Subscription};
use crate::stream_log;

pub struct Merge {
    sources: Vec<Arc<dyn EventSource>>,
}

/// Combine `sources` into a single `EventSource`.
pub fn merge(sources: Vec<Arc<dyn EventSource>>) -> Merge {
    Merge { sources }
}

struct MergeState {
    downstream: Arc<dyn Observer>,
    remaining: AtomicUsize,
    stopped: AtomicBool,
    inputs: Mutex<Vec<Subscription>>,
}

impl MergeState {
    fn dispose_inputs(&self) {
        let inputs = std::mem::take(&mut *self.inputs.lock());
        for sub in &inputs {
            sub.unsubscribe();
        }
    }
}

struct MergeInput {
    state: Arc<MergeState>,
}

impl Observer for MergeInput {
    fn on_next(&self, event: TraceEvent) {
        if !self.state.stopped.load(Ordering::Acquire) {
            self.state.downstream.on_next(event);
        }
    }

    fn on_error(&self, error: SourceError) {
        if !self.state.stopped.swap(true, Ordering::AcqRel) {
            stream_log!(Level::Debug, "merge", "input failed, tearing down: {}", error);
            self.state.dispose_inputs();
            self.state.downstream.on_error(error);
        }
    }

    fn on_completed(&self) {
        if self.state.remaining.fetch_sub(1, Ordering::AcqRel) == 1
            && !self.state.stopped.swap(true, Ordering::AcqRel)
        {
            self.state.downstream.on_completed();
        }
    }
}

impl EventSource for Merge {
    fn subscribe(&self, observer: Arc<dyn Observer>) -> Subscription {
        if self.sources.is_empty() {
            observer.on_completed();
            return Subscription::empty();
        }

        let state = Arc::new(MergeState {
            downstream: observer,
            remaining: AtomicUsize::new(self.sources.len()),
            stopped: AtomicBool::new(false),
            inputs: Mutex::new(Vec::with_capacity(self.sources.len())),
        });

        for source in &self.sources {
            if state.stopped.load(Ordering::Acquire) {
                break;
            }
            let sub = source.subscribe(Arc::new(MergeInput { state: state.clone() }));
            state.inputs.lock().push(sub);
        }
        // an input may have failed while the others were still subscribing
        if state.stopped.load(Ordering::Acquire) {
            state.dispose_inputs();
        }

        Subscription::new(move || {
            state.stopped.store(true, Ordering::Release);
            state.dispose_inputs();
        })
    }
}
