//! Push-based event sources.
//! -----------------------------------------------------------------------------
//! A **source** turns one provider into a sequence of `TraceEvent`s pushed to
//! an `Observer` on whatever thread the provider delivers on. Subscribing
//! returns a `Subscription`; unsubscribing detaches the observer and is safe
//! to repeat.
//!
//! The pipeline stages in `crate::pipeline` are themselves sources that wrap
//! other sources, so a whole session is one `subscribe` call on the outermost
//! stage.

pub mod adapter;
pub mod feed;
pub mod hub;
pub mod live;

use std::sync::Arc;

use parking_lot::Mutex;
use shared::TraceEvent;
use thiserror::Error;

pub use adapter::{
    IisSource, ProviderRegistry, ResolutionError, SourceDescriptor, WellKnownSource, resolve,
};
pub use hub::ProviderHub;
pub use live::{LiveSource, SourceHandle};

/// Failure raised by a provider mid-stream. Fatal to the session that
/// observes it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    #[error("event feed failed: {0}")]
    Feed(String),
}

/// Receiver side of a source. Callbacks may arrive concurrently from several
/// producer threads; after `on_error` or `on_completed` nothing further is
/// delivered by a well-behaved source.
pub trait Observer: Send + Sync {
    fn on_next(&self, event: TraceEvent);
    fn on_error(&self, error: SourceError);
    fn on_completed(&self);
}

/// A provider (or pipeline stage) that can be subscribed to.
pub trait EventSource: Send + Sync {
    fn subscribe(&self, observer: Arc<dyn Observer>) -> Subscription;
}

impl<S: EventSource + ?Sized> EventSource for Arc<S> {
    fn subscribe(&self, observer: Arc<dyn Observer>) -> Subscription {
        (**self).subscribe(observer)
    }
}

type Teardown = Box<dyn FnOnce() + Send>;

/// Handle to a live subscription. The teardown runs at most once, on the
/// first `unsubscribe()` or on drop.
pub struct Subscription {
    teardown: Mutex<Option<Teardown>>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self { teardown: Mutex::new(Some(Box::new(teardown))) }
    }

    /// Subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self { teardown: Mutex::new(None) }
    }

    pub fn unsubscribe(&self) {
        // take under the lock, run outside it: teardowns may re-enter
        let teardown = self.teardown.lock().take();
        if let Some(f) = teardown {
            f();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.teardown.lock().is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("closed", &self.is_closed()).finish()
    }
}

/// Source that completes as soon as it is subscribed to.
#[derive(Debug, Default, Clone, Copy)]
pub struct Empty;

impl EventSource for Empty {
    fn subscribe(&self, observer: Arc<dyn Observer>) -> Subscription {
        observer.on_completed();
        Subscription::empty()
    }
}
