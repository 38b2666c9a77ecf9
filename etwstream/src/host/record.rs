//! Display record for one event.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use shared::{TraceEvent, TraceLevel};

use super::{ConsoleColor, HostSink, ProcessNames};

/// What the host receives for each surviving event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub timestamp: DateTime<Utc>,
    pub level: TraceLevel,
    pub process_name: String,
    pub provider_name: String,
    pub event_name: String,
    pub payload_or_message: String,
}

/// Foreground for `level`, or `None` to keep the host's own foreground.
pub fn color_for(level: TraceLevel, background_is_white: bool) -> Option<ConsoleColor> {
    match level {
        TraceLevel::Critical => Some(ConsoleColor::Magenta),
        TraceLevel::Error => Some(ConsoleColor::Red),
        TraceLevel::Warning if background_is_white => Some(ConsoleColor::DarkYellow),
        TraceLevel::Warning => Some(ConsoleColor::Yellow),
        TraceLevel::Informational if background_is_white => Some(ConsoleColor::Black),
        TraceLevel::Informational => Some(ConsoleColor::Gray),
        TraceLevel::Verbose => Some(ConsoleColor::DarkGray),
        TraceLevel::Always => None,
    }
}

impl TraceRecord {
    pub fn from_event(event: &TraceEvent, names: &dyn ProcessNames) -> Self {
        Self {
            timestamp: event.timestamp,
            level: event.level,
            process_name: names.name_of(event.process_id),
            provider_name: event.provider_name.clone(),
            event_name: event.event_name.clone(),
            payload_or_message: event.payload_or_message(),
        }
    }

    /// `[timestamp][process][provider][event]:payload`; the bracketed process
    /// and provider segments are optional.
    pub fn colored_line(&self, with_process: bool, with_provider: bool) -> String {
        let mut line = format!("[{}]", self.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S%.3f"));
        if with_process {
            line.push_str(&format!("[{}]", self.process_name));
        }
        if with_provider {
            line.push_str(&format!("[{}]", self.provider_name));
        }
        line.push_str(&format!("[{}]:{}", self.event_name, self.payload_or_message));
        line
    }

    /// Write as one line, coloured by level against the host's background.
    pub fn dump_with_color(&self, host: &mut dyn HostSink, with_process: bool, with_provider: bool) -> std::io::Result<()> {
        let background = host.background();
        let foreground = color_for(self.level, background == ConsoleColor::White).unwrap_or_else(|| host.foreground());
        host.write_line(foreground, background, &self.colored_line(with_process, with_provider))
    }
}
