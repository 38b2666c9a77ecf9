//! Provider registry backed by `LiveSource`s.
//!
//! The hub owns one live provider per requested name (or GUID). Producers
//! hand events to `dispatch`, which routes them by the event's provider name
//! or GUID to the provider a session opened. Events for providers nobody
//! opened are dropped here, before any session sees them.
//!
//! Once the hub has ended (`complete_all` / `fail_all`), providers opened
//! afterwards terminate the same way as soon as they are created.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::Level;
use parking_lot::RwLock;
use shared::TraceEvent;

use super::{EventSource, LiveSource, ProviderRegistry, ResolutionError, SourceError, SourceHandle};
use crate::stream_log;

#[derive(Clone)]
enum Ended {
    Completed,
    Failed(SourceError),
}

#[derive(Default)]
struct Providers {
    open: HashMap<String, (LiveSource, SourceHandle)>,
    ended: Option<Ended>,
}

#[derive(Default)]
pub struct ProviderHub {
    known: Option<HashSet<String>>,
    providers: RwLock<Providers>,
}

fn key(name: &str) -> String {
    name.trim().trim_matches(|c| c == '{' || c == '}').to_ascii_lowercase()
}

impl ProviderHub {
    /// Hub that accepts any provider name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub that only resolves the listed providers (names or GUIDs).
    pub fn with_known<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            known: Some(known.into_iter().map(|s| key(s.as_ref())).collect()),
            providers: RwLock::default(),
        }
    }

    /// Producer handle for an opened provider.
    pub fn handle(&self, name_or_guid: &str) -> Option<SourceHandle> {
        self.providers.read().open.get(&key(name_or_guid)).map(|(_, h)| h.clone())
    }

    /// Observers attached to an opened provider; 0 if it was never opened.
    pub fn subscriber_count(&self, name_or_guid: &str) -> usize {
        self.providers
            .read()
            .open
            .get(&key(name_or_guid))
            .map_or(0, |(source, _)| source.subscriber_count())
    }

    pub fn opened(&self) -> usize {
        self.providers.read().open.len()
    }

    /// Route one event to its provider. Returns `false` when no session
    /// opened that provider.
    pub fn dispatch(&self, event: TraceEvent) -> bool {
        let handle = {
            let providers = self.providers.read();
            let open = &providers.open;
            open.get(&key(&event.provider_name))
                .or_else(|| event.provider_guid.as_deref().and_then(|g| open.get(&key(g))))
                .map(|(_, h)| h.clone())
        };
        match handle {
            Some(h) => {
                h.emit(event);
                true
            }
            None => {
                stream_log!(Level::Trace, "hub", "no subscriber for provider '{}'", event.provider_name);
                false
            }
        }
    }

    pub fn complete_all(&self) {
        for h in self.end(Ended::Completed) {
            h.complete();
        }
    }

    pub fn fail_all(&self, error: SourceError) {
        for h in self.end(Ended::Failed(error.clone())) {
            h.fail(error.clone());
        }
    }

    pub fn has_ended(&self) -> bool {
        self.providers.read().ended.is_some()
    }

    /// Record the first ending and return the handles to terminate.
    fn end(&self, ended: Ended) -> Vec<SourceHandle> {
        let mut providers = self.providers.write();
        if providers.ended.is_some() {
            return Vec::new();
        }
        providers.ended = Some(ended);
        providers.open.values().map(|(_, h)| h.clone()).collect()
    }
}

impl ProviderRegistry for ProviderHub {
    fn open(&self, name_or_guid: &str) -> Result<Arc<dyn EventSource>, ResolutionError> {
        let k = key(name_or_guid);
        if k.is_empty() {
            return Err(ResolutionError::UnknownProvider(name_or_guid.into()));
        }
        if let Some(known) = &self.known {
            if !known.contains(&k) {
                return Err(ResolutionError::UnknownProvider(name_or_guid.into()));
            }
        }
        let mut providers = self.providers.write();
        let ended = providers.ended.clone();
        let (source, _) = providers.open.entry(k).or_insert_with(|| {
            stream_log!(Level::Debug, "hub", "opened provider '{}'", name_or_guid);
            let (source, handle) = LiveSource::new(name_or_guid);
            match ended {
                Some(Ended::Completed) => handle.complete(),
                Some(Ended::Failed(e)) => handle.fail(e),
                None => {}
            }
            (source, handle)
        });
        Ok(Arc::new(source.clone()))
    }
}
