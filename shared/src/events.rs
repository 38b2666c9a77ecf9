//! Trace event model.
//!
//! A `TraceEvent` is what a provider hands to the pipeline: one timestamped,
//! leveled record attributed to a process and a provider. Once produced it is
//! never mutated; each stage either forwards it, drops it, or moves it into
//! the consumer action that renders it.
//!
//! ## Formats Supported
//! - `serde` for JSON (the console feed ingests events as JSON lines)
//!
//! ## Severity order
//! `TraceLevel` follows the ETW numbering, so "more severe" means
//! "numerically smaller": `Always < Critical < Error < Warning <
//! Informational < Verbose`. A threshold admits every level `<=` itself.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ETW event level. The derived `Ord` is the severity order used by filters.
///
/// Serializes as its name; deserializes from anything `FromStr` accepts or
/// from the bare level number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLevel")]
pub enum TraceLevel {
    Always = 0,
    Critical = 1,
    Error = 2,
    Warning = 3,
    Informational = 4,
    #[default]
    Verbose = 5,
}

impl TraceLevel {
    pub const ALL: [TraceLevel; 6] = [
        TraceLevel::Always,
        TraceLevel::Critical,
        TraceLevel::Error,
        TraceLevel::Warning,
        TraceLevel::Informational,
        TraceLevel::Verbose,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TraceLevel::Always => "Always",
            TraceLevel::Critical => "Critical",
            TraceLevel::Error => "Error",
            TraceLevel::Warning => "Warning",
            TraceLevel::Informational => "Informational",
            TraceLevel::Verbose => "Verbose",
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

impl fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid trace level '{0}'")]
pub struct ParseLevelError(pub String);

/// Accepts `"warning"`, `"Warning"`, `"3"`, …
impl FromStr for TraceLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<u8>() {
            return Self::from_u8(n).ok_or_else(|| ParseLevelError(s.into()));
        }
        Self::ALL
            .into_iter()
            .find(|lvl| lvl.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseLevelError(s.into()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLevel {
    Number(u8),
    Name(String),
}

impl TryFrom<RawLevel> for TraceLevel {
    type Error = ParseLevelError;

    fn try_from(raw: RawLevel) -> Result<Self, ParseLevelError> {
        match raw {
            RawLevel::Number(n) => Self::from_u8(n).ok_or_else(|| ParseLevelError(n.to_string())),
            RawLevel::Name(name) => name.parse(),
        }
    }
}

/// One named payload value, in provider declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadField {
    pub name: String,
    pub value: String,
}

impl PayloadField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// A single trace record emitted by an instrumented process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub timestamp: DateTime<Utc>,
    pub level: TraceLevel,
    pub process_id: u32,
    #[serde(default)]
    pub thread_id: u32,
    pub provider_name: String,
    #[serde(default)]
    pub provider_guid: Option<String>,
    #[serde(default)]
    pub event_id: u16,
    pub event_name: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub payload: Vec<PayloadField>,
}

impl TraceEvent {
    /// Minimal event stamped with the current time; the remaining fields
    /// default to zero / empty.
    pub fn new(
        level: TraceLevel,
        process_id: u32,
        provider_name: impl Into<String>,
        event_name: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            process_id,
            thread_id: 0,
            provider_name: provider_name.into(),
            provider_guid: None,
            event_id: 0,
            event_name: event_name.into(),
            message: None,
            payload: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.push(PayloadField::new(name, value));
        self
    }

    /// The formatted message when the provider supplied one, otherwise the
    /// payload as `name=value` pairs.
    pub fn payload_or_message(&self) -> String {
        match self.message.as_deref() {
            Some(msg) if !msg.is_empty() => msg.to_owned(),
            _ => self
                .payload
                .iter()
                .map(|f| format!("{}={}", f.name, f.value))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}
