//! Session controller.
//!
//! Owns one subscription lifetime end to end:
//!
//! 1. **Building**: descriptors accumulate, possibly over several batches.
//! 2. **Running**: descriptors are resolved, merged, filtered and subscribed.
//!    Each admitted event becomes a `PendingAction` on the hand-off queue;
//!    completion closes the queue; an error is latched (first one wins) and
//!    closes the queue.
//! 3. **Draining**: the calling thread replays the queue in FIFO order
//!    against the host.
//! 4. **Cancelled**: `SessionHandle::stop` fired; the drain loop exits
//!    without running what is still queued.
//! 5. **Closed**: every subscription is disposed; a latched error is returned
//!    once, as `SessionError::Terminated`, unless the session was stopped.
//!    A stopped session always closes cleanly.

pub mod error;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::Level;
use parking_lot::Mutex;
use shared::{TraceEvent, TraceLevel};

pub use error::{ErrorCategory, SessionError, TerminatingError};

use crate::host::{HostSink, ProcessNames, SystemProcessNames, TraceRecord};
use crate::pipeline::{CancellationToken, EventFilter, HandoffQueue, filter, merge};
use crate::source::{
    Empty, EventSource, Observer, ProviderRegistry, ResolutionError, SourceDescriptor, SourceError,
    Subscription, resolve,
};
use crate::stream_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Building,
    Running,
    Draining,
    Cancelled,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Least severe level still delivered.
    pub trace_level: TraceLevel,
    /// Coloured single lines instead of structured records.
    pub dump_with_color: bool,
    pub with_process_name: bool,
    pub with_provider_name: bool,
    /// Drop events raised by this very process.
    pub exclude_self: bool,
    /// Fail the session on an unresolvable descriptor instead of treating it
    /// as a source that never emits.
    pub strict_descriptors: bool,
    pub verbose: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            trace_level: TraceLevel::Verbose,
            dump_with_color: false,
            with_process_name: false,
            with_provider_name: false,
            exclude_self: true,
            strict_descriptors: false,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Pending actions the drain loop ran.
    pub delivered: u64,
    pub cancelled: bool,
}

type Render = dyn FnOnce(&mut dyn HostSink) -> io::Result<()> + Send;

/// Deferred render-and-emit work for one event, run on the consumer thread.
pub struct PendingAction(Box<Render>);

impl PendingAction {
    pub fn new(f: impl FnOnce(&mut dyn HostSink) -> io::Result<()> + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn invoke(self, host: &mut dyn HostSink) -> io::Result<()> {
        (self.0)(host)
    }
}

struct Renderer {
    dump_with_color: bool,
    with_process_name: bool,
    with_provider_name: bool,
    names: Arc<dyn ProcessNames>,
}

impl Renderer {
    fn action(self: &Arc<Self>, event: TraceEvent) -> PendingAction {
        let renderer = Arc::clone(self);
        PendingAction::new(move |host| {
            let record = TraceRecord::from_event(&event, renderer.names.as_ref());
            if renderer.dump_with_color {
                record.dump_with_color(host, renderer.with_process_name, renderer.with_provider_name)?;
            } else {
                host.write_object(&record)?;
            }
            host.write_verbose(&record.payload_or_message)
        })
    }
}

struct Shared {
    queue: HandoffQueue<PendingAction>,
    token: CancellationToken,
    subscriptions: Mutex<Vec<Subscription>>,
    disposed: AtomicBool,
    terminal: Mutex<Option<SourceError>>,
    state: Mutex<SessionState>,
}

impl Shared {
    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock();
        stream_log!(Level::Debug, "session", "{:?} -> {:?}", *state, next);
        *state = next;
    }

    fn adopt(&self, sub: Subscription) {
        self.subscriptions.lock().push(sub);
        // stop() may have run while we were subscribing
        if self.disposed.load(Ordering::SeqCst) {
            self.dispose_subscriptions();
        }
    }

    /// Idempotent; tolerates sources that never delivered anything.
    fn dispose_subscriptions(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        let subs = std::mem::take(&mut *self.subscriptions.lock());
        for sub in &subs {
            sub.unsubscribe();
        }
    }

    fn latch(&self, error: SourceError) {
        let mut terminal = self.terminal.lock();
        if terminal.is_none() {
            stream_log!(Level::Error, "session", "source failed: {}", error);
            *terminal = Some(error);
        }
    }
}

struct SessionObserver {
    shared: Arc<Shared>,
    renderer: Arc<Renderer>,
}

impl Observer for SessionObserver {
    fn on_next(&self, event: TraceEvent) {
        if self.shared.queue.enqueue(self.renderer.action(event)).is_err() {
            stream_log!(Level::Trace, "session", "event arrived after the queue closed");
        }
    }

    fn on_error(&self, error: SourceError) {
        self.shared.latch(error);
        self.shared.queue.close();
    }

    fn on_completed(&self) {
        stream_log!(Level::Debug, "session", "all sources completed");
        self.shared.queue.close();
    }
}

/// Stops a running session from another thread.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    /// Signal cancellation, then dispose every subscription. Safe to call
    /// repeatedly, before the session started, or after it closed.
    pub fn stop(&self) {
        if !self.shared.token.is_cancelled() {
            stream_log!(Level::Info, "session", "stop requested");
        }
        self.shared.token.cancel();
        self.shared.dispose_subscriptions();
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.lock()
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.token.is_cancelled()
    }
}

pub struct TraceSession {
    options: SessionOptions,
    descriptors: Vec<SourceDescriptor>,
    names: Arc<dyn ProcessNames>,
    shared: Arc<Shared>,
}

impl TraceSession {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            descriptors: Vec::new(),
            names: Arc::new(SystemProcessNames),
            shared: Arc::new(Shared {
                queue: HandoffQueue::new(),
                token: CancellationToken::new(),
                subscriptions: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
                terminal: Mutex::new(None),
                state: Mutex::new(SessionState::Building),
            }),
        }
    }

    pub fn with_process_names(mut self, names: Arc<dyn ProcessNames>) -> Self {
        self.names = names;
        self
    }

    pub fn descriptors(&self) -> &[SourceDescriptor] {
        &self.descriptors
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.lock()
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle { shared: Arc::clone(&self.shared) }
    }

    /// Add one batch of descriptors. Only valid while building.
    pub fn append<I>(&mut self, descriptors: I) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = SourceDescriptor>,
    {
        match self.state() {
            SessionState::Building => {
                self.descriptors.extend(descriptors);
                Ok(())
            }
            other => Err(SessionError::InvalidState(other)),
        }
    }

    fn resolve_all(&self, registry: &dyn ProviderRegistry) -> Result<Vec<Arc<dyn EventSource>>, ResolutionError> {
        let mut sources: Vec<Arc<dyn EventSource>> = Vec::with_capacity(self.descriptors.len());
        for descriptor in &self.descriptors {
            match resolve(descriptor, registry) {
                Ok(source) => sources.push(source),
                Err(e) if self.options.strict_descriptors => return Err(e),
                Err(e) => {
                    stream_log!(Level::Warn, "session", "'{}' will yield no events: {}", descriptor, e);
                    sources.push(Arc::new(Empty));
                }
            }
        }
        Ok(sources)
    }

    /// Build the pipeline, drain it on the calling thread until the sources
    /// complete, fail, or the session is stopped, then tear everything down.
    pub fn run(&mut self, registry: &dyn ProviderRegistry, host: &mut dyn HostSink) -> Result<SessionSummary, SessionError> {
        {
            let state = self.state();
            if state != SessionState::Building {
                return Err(SessionError::InvalidState(state));
            }
        }
        self.shared.set_state(SessionState::Running);

        let sources = match self.resolve_all(registry) {
            Ok(sources) => sources,
            Err(e) => {
                self.shared.queue.close();
                self.shared.set_state(SessionState::Closed);
                return Err(e.into());
            }
        };

        let shared = &self.shared;
        if !shared.token.is_cancelled() {
            let event_filter = if self.options.exclude_self {
                EventFilter::for_current_process(self.options.trace_level)
            } else {
                EventFilter::new(None, self.options.trace_level)
            };
            stream_log!(
                Level::Info,
                "session",
                "subscribing to {} source(s), level <= {}, self pid {:?}",
                sources.len(),
                event_filter.threshold,
                event_filter.self_pid
            );
            let observer = Arc::new(SessionObserver {
                shared: Arc::clone(shared),
                renderer: Arc::new(Renderer {
                    dump_with_color: self.options.dump_with_color,
                    with_process_name: self.options.with_process_name,
                    with_provider_name: self.options.with_provider_name,
                    names: Arc::clone(&self.names),
                }),
            });
            let pipeline = filter(merge(sources), event_filter);
            shared.adopt(pipeline.subscribe(observer));
        }

        shared.set_state(SessionState::Draining);
        let mut delivered = 0u64;
        let mut host_error = None;
        for action in shared.queue.drain(&shared.token) {
            if let Err(e) = action.invoke(host) {
                host_error = Some(e);
                break;
            }
            delivered += 1;
        }

        let cancelled = shared.token.is_cancelled();
        if cancelled {
            shared.set_state(SessionState::Cancelled);
        }
        shared.queue.close();
        shared.dispose_subscriptions();
        shared.set_state(SessionState::Closed);
        stream_log!(Level::Info, "session", "closed after {} event(s), cancelled={}", delivered, cancelled);

        if let Some(e) = host_error {
            return Err(SessionError::Host(e));
        }
        match shared.terminal.lock().take() {
            Some(error) if cancelled => {
                stream_log!(Level::Warn, "session", "ignoring source failure after stop: {}", error);
            }
            Some(error) => return Err(TerminatingError::new(error).into()),
            None => {}
        }
        Ok(SessionSummary { delivered, cancelled })
    }
}
