//! Command-line flags. Flags override the config file; descriptors given on
//! the command line are appended after the ones from the file.

use std::path::PathBuf;
use std::time::Duration;

use etwstream::session::SessionOptions;
use etwstream::source::SourceDescriptor;
use shared::{ParseLevelError, TraceLevel};
use thiserror::Error;

pub const USAGE: &str = "\
Usage: etwstream [OPTIONS] [PROVIDER]...

Streams trace events for the given providers (names or GUIDs). Events are
read as JSON lines from stdin.

Options:
  --well-known NAME   add a well-known provider group (repeatable)
  --iis NAME          add an IIS provider group (repeatable)
  --level LEVEL       least severe level to show (name or 0-5)
  --color             one coloured line per event instead of JSON
  --with-process      include the process name in coloured lines
  --with-provider     include the provider name in coloured lines
  --include-self      keep events raised by this process
  --strict            fail on providers that cannot be resolved
  --verbose           echo each payload on stderr
  --duration D        stop after D (e.g. 30s, 5m)
  --config PATH       TOML config file (default: etwstream.toml)
  -h, --help          show this help";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("missing value for {0}")]
    MissingValue(String),

    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error(transparent)]
    InvalidLevel(#[from] ParseLevelError),

    #[error("invalid duration '{0}': {1}")]
    InvalidDuration(String, #[source] humantime::DurationError),
}

#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub config: Option<PathBuf>,
    /// In command-line order.
    pub descriptors: Vec<SourceDescriptor>,
    pub level: Option<TraceLevel>,
    pub color: bool,
    pub with_process: bool,
    pub with_provider: bool,
    pub include_self: bool,
    pub strict: bool,
    pub verbose: bool,
    pub duration: Option<Duration>,
    pub help: bool,
}

impl Args {
    /// Layer the flags over options loaded from the config file.
    pub fn apply(&self, mut options: SessionOptions) -> SessionOptions {
        if let Some(level) = self.level {
            options.trace_level = level;
        }
        options.dump_with_color |= self.color;
        options.with_process_name |= self.with_process;
        options.with_provider_name |= self.with_provider;
        options.exclude_self &= !self.include_self;
        options.strict_descriptors |= self.strict;
        options.verbose |= self.verbose;
        options
    }
}

/// Parse everything after the program name.
pub fn parse<I>(args: I) -> Result<Args, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().ok_or_else(|| CliError::MissingValue(flag.into()));
        match arg.as_str() {
            "--well-known" => parsed.descriptors.push(SourceDescriptor::WellKnown(value(&arg)?)),
            "--iis" => parsed.descriptors.push(SourceDescriptor::Iis(value(&arg)?)),
            "--level" => parsed.level = Some(value(&arg)?.parse()?),
            "--duration" => {
                let raw = value(&arg)?;
                let d = humantime::parse_duration(&raw).map_err(|e| CliError::InvalidDuration(raw, e))?;
                parsed.duration = Some(d);
            }
            "--config" => parsed.config = Some(PathBuf::from(value(&arg)?)),
            "--color" => parsed.color = true,
            "--with-process" => parsed.with_process = true,
            "--with-provider" => parsed.with_provider = true,
            "--include-self" => parsed.include_self = true,
            "--strict" => parsed.strict = true,
            "--verbose" => parsed.verbose = true,
            "-h" | "--help" => parsed.help = true,
            flag if flag.starts_with('-') => return Err(CliError::UnknownOption(flag.into())),
            name => parsed.descriptors.push(SourceDescriptor::NameOrGuid(name.to_owned())),
        }
    }
    Ok(parsed)
}
