// src/config/model.rs

use serde::Deserialize;
use shared::{ParseLevelError, TraceLevel};
use std::time::Duration;
use thiserror::Error;

use crate::session::SessionOptions;
use crate::source::SourceDescriptor;

/// Top-level runtime config
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub session: SessionConfig,
}

/// Mirror of the `[logging]` table
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]            pub enable: bool,
    #[serde(default)]            pub file:   Option<String>,
    #[serde(default = "default_level")] pub level: String,
}
fn default_level() -> String { "INFO".into() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enable: false, file: None, level: default_level() }
    }
}

/// Mirror of the `[session]` table. Every key is optional; command-line
/// flags override whatever is set here.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Provider names or GUIDs.
    pub providers:          Vec<String>,
    pub well_known:         Vec<String>,
    pub iis:                Vec<String>,
    pub trace_level:        String,
    pub dump_with_color:    bool,
    pub with_process_name:  bool,
    pub with_provider_name: bool,
    pub exclude_self:       bool,
    pub strict_descriptors: bool,
    pub verbose:            bool,
    /// e.g. `"30s"`, `"5m"`
    pub max_duration:       Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let options = SessionOptions::default();
        Self {
            providers:          Vec::new(),
            well_known:         Vec::new(),
            iis:                Vec::new(),
            trace_level:        options.trace_level.to_string(),
            dump_with_color:    options.dump_with_color,
            with_process_name:  options.with_process_name,
            with_provider_name: options.with_provider_name,
            exclude_self:       options.exclude_self,
            strict_descriptors: options.strict_descriptors,
            verbose:            options.verbose,
            max_duration:       None,
        }
    }
}

impl SessionConfig {
    pub fn options(&self) -> Result<SessionOptions, ConfigError> {
        Ok(SessionOptions {
            trace_level:        self.trace_level.parse::<TraceLevel>()?,
            dump_with_color:    self.dump_with_color,
            with_process_name:  self.with_process_name,
            with_provider_name: self.with_provider_name,
            exclude_self:       self.exclude_self,
            strict_descriptors: self.strict_descriptors,
            verbose:            self.verbose,
        })
    }

    pub fn max_duration(&self) -> Result<Option<Duration>, ConfigError> {
        self.max_duration
            .as_deref()
            .map(|s| humantime::parse_duration(s).map_err(|e| ConfigError::InvalidDuration(s.into(), e)))
            .transpose()
    }

    /// Descriptors in file order: providers, then well-known, then IIS.
    pub fn descriptors(&self) -> Vec<SourceDescriptor> {
        let providers = self.providers.iter().cloned().map(SourceDescriptor::NameOrGuid);
        let well_known = self.well_known.iter().cloned().map(SourceDescriptor::WellKnown);
        let iis = self.iis.iter().cloned().map(SourceDescriptor::Iis);
        providers.chain(well_known).chain(iis).collect()
    }
}

/// All the ways config loading can go wrong
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid trace level: {0}")]
    InvalidLevel(#[from] ParseLevelError),

    #[error("invalid duration '{0}': {1}")]
    InvalidDuration(String, #[source] humantime::DurationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
