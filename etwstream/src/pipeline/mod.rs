//! Event-stream composition.
//!
//! ```text
//!   source ─┐
//!   source ─┼─ merge ─ filter ─▶ observer ─▶ HandoffQueue ─▶ drain (consumer thread)
//!   source ─┘
//! ```
//!
//! `merge` and `filter` run inline on whichever producer thread delivers an
//! event and hold no mutable state beyond termination flags. The
//! `HandoffQueue` is the only synchronisation point between producers and
//! the single consumer.
//!
//! ## Metrics
//! `filter` and `queue` count admitted, dropped, enqueued and discarded
//! events through the `metrics` facade. The `etwstream` binary installs no
//! recorder, so these counters are no-ops unless an embedding application
//! installs one.

pub mod cancel;
pub mod filter;
pub mod merge;
pub mod queue;

pub use cancel::CancellationToken;
pub use filter::{EventFilter, Filtered, filter};
pub use merge::{Merge, merge};
pub use queue::{Drain, HandoffQueue, QueueClosed};
