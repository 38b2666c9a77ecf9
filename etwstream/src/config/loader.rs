// src/config/loader.rs

//! # Configuration Loader
//!
//! Reads a TOML file and deserializes it into `Config`. A missing file is
//! not an error for `load_or_default`: the tool runs fine on flags alone.

use log::Level;
use std::{fs, path::Path};

use crate::config::model::{Config, ConfigError};
use crate::stream_log;

/// Load and parse the configuration from `path`.
/// Logs at DEBUG before reading and INFO on success.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    stream_log!(Level::Debug, "config", "Reading config from {:?}", path);
    let txt = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&txt)?;
    // surface bad values now rather than when the session starts
    cfg.session.options()?;
    cfg.session.max_duration()?;
    stream_log!(Level::Info, "config", "Loaded config from {:?}", path);
    Ok(cfg)
}

/// Like `load`, but a file that does not exist yields the defaults.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        stream_log!(Level::Debug, "config", "No config at {:?}, using defaults", path);
        return Ok(Config::default());
    }
    load(path)
}
