//! Types shared by every stage of the trace pipeline.
//!
//! `events` holds the immutable record produced by a provider and the
//! severity order used for filtering; `constants` holds the provider tables
//! the command line resolves enumerator names against.

pub mod constants;
pub mod events;

pub use events::{ParseLevelError, PayloadField, TraceEvent, TraceLevel};
