//! Stateless per-event predicates.

use std::sync::Arc;

use metrics::counter;
use shared::{TraceEvent, TraceLevel};

use crate::source::{EventSource, Observer, SourceError, Subscription};

/// Drops the consumer's own events and everything less severe than
/// `threshold`. Both values are captured once, when the session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFilter {
    /// `None` disables self-exclusion.
    pub self_pid: Option<u32>,
    pub threshold: TraceLevel,
}

impl EventFilter {
    pub fn new(self_pid: Option<u32>, threshold: TraceLevel) -> Self {
        Self { self_pid, threshold }
    }

    /// Filter for the current process at `threshold`.
    pub fn for_current_process(threshold: TraceLevel) -> Self {
        Self::new(Some(std::process::id()), threshold)
    }

    pub fn admits(&self, event: &TraceEvent) -> bool {
        if self.self_pid == Some(event.process_id) {
            counter!("etwstream_events_dropped_total", "reason" => "self_process").increment(1);
            return false;
        }
        if event.level > self.threshold {
            counter!("etwstream_events_dropped_total", "reason" => "level").increment(1);
            return false;
        }
        counter!("etwstream_events_admitted_total").increment(1);
        true
    }
}

pub struct Filtered<S> {
    source: S,
    filter: EventFilter,
}

/// Wrap `source` so only events admitted by `filter` reach subscribers.
pub fn filter<S: EventSource>(source: S, filter: EventFilter) -> Filtered<S> {
    Filtered { source, filter }
}

struct FilterObserver {
    downstream: Arc<dyn Observer>,
    filter: EventFilter,
}

impl Observer for FilterObserver {
    fn on_next(&self, event: TraceEvent) {
        if self.filter.admits(&event) {
            self.downstream.on_next(event);
        }
    }

    fn on_error(&self, error: SourceError) {
        self.downstream.on_error(error);
    }

    fn on_completed(&self) {
        self.downstream.on_completed();
    }
}

impl<S: EventSource> EventSource for Filtered<S> {
    fn subscribe(&self, observer: Arc<dyn Observer>) -> Subscription {
        self.source.subscribe(Arc::new(FilterObserver { downstream: observer, filter: self.filter }))
    }
}
