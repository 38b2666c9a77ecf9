//! JSON-lines event feed.
//!
//! Bridges an external collector into a `ProviderHub`: one `TraceEvent` per
//! line, read on a dedicated thread and dispatched inline. Malformed lines
//! are logged and skipped. End of input completes every provider; a read
//! error fails every provider.

use std::io::BufRead;
use std::sync::Arc;
use std::thread;

use log::Level;
use shared::TraceEvent;

use super::{ProviderHub, SourceError};
use crate::stream_log;

/// Counters returned when the feed thread exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub lines: u64,
    pub dispatched: u64,
    pub unrouted: u64,
    pub malformed: u64,
}

pub fn spawn_feed<R>(reader: R, hub: Arc<ProviderHub>) -> thread::JoinHandle<FeedStats>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || run_feed(reader, &hub))
}

/// Blocking body of `spawn_feed`.
pub fn run_feed<R: BufRead>(reader: R, hub: &ProviderHub) -> FeedStats {
    let mut stats = FeedStats::default();
    stream_log!(Level::Info, "feed", "feed started");

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                stream_log!(Level::Error, "feed", "read error: {}", e);
                hub.fail_all(SourceError::Feed(e.to_string()));
                return stats;
            }
        };
        stats.lines += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TraceEvent>(&line) {
            Ok(ev) => {
                if hub.dispatch(ev) {
                    stats.dispatched += 1;
                } else {
                    stats.unrouted += 1;
                }
            }
            Err(e) => {
                stats.malformed += 1;
                stream_log!(Level::Warn, "feed", "skipping line {}: {}", stats.lines, e);
            }
        }
    }

    stream_log!(Level::Info, "feed", "feed exhausted after {} line(s)", stats.lines);
    hub.complete_all();
    stats
}
