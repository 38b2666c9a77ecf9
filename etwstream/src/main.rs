// src/main.rs

//! Console entry-point.
//!
//! 1. Parse flags, load the TOML config & set up structured logging
//! 2. Start the stdin feed that stands in for the tracing subsystem
//! 3. Arm Ctrl-C and the optional time limit to stop the session
//! 4. Run the session on this thread until the feed ends or a stop arrives
//! 5. Exit non-zero if the session terminated with an error
//!
// ───── project modules ──────────────────────────────────────────────────────
mod cli;

// ───── std / 3rd-party imports ──────────────────────────────────────────────
use anyhow::{Context, Result};
use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;
use std::{
    io,
    path::{Path, PathBuf},
    process,
    sync::Arc,
    thread,
    time::Duration,
};

// ───── local imports ────────────────────────────────────────────────────────
use etwstream::config::{Config, LoggingConfig, load_or_default};
use etwstream::host::ConsoleHost;
use etwstream::session::{SessionError, SessionHandle, TraceSession};
use etwstream::source::ProviderHub;
use etwstream::source::feed::spawn_feed;

const DEFAULT_CONFIG: &str = "etwstream.toml";

// ───── helpers ──────────────────────────────────────────────────────────────

/// Configure global logging as requested in `[logging]`. Diagnostics go to
/// stderr so stdout stays a clean record stream.
fn setup_logging(logging: &LoggingConfig) -> Result<(), fern::InitError> {
    let level = match logging.level.to_uppercase().as_str() {
        "OFF" => LevelFilter::Off,
        "ERROR" => LevelFilter::Error,
        "WARN" => LevelFilter::Warn,
        "DEBUG" => LevelFilter::Debug,
        "TRACE" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    let log_path = logging
        .enable
        .then(|| PathBuf::from(logging.file.as_deref().unwrap_or("etwstream.log")));

    let mut dispatch = Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!(
                "[{}][{:5}][{}][pid={}][tid={:?}] {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(), // component tag from stream_log!
                process::id(),
                thread::current().id(),
                msg
            ))
        })
        .level(level)
        .chain(io::stderr());

    if let Some(path) = log_path {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}

/// Stop the session on Ctrl-C. The runtime lives on its own thread so the
/// drain loop keeps the main thread.
fn arm_ctrl_c(handle: SessionHandle) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("signal runtime")?;
    thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            rt.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        log::warn!("Ctrl-C received, stopping session");
                        handle.stop();
                    }
                    Err(e) => log::error!("cannot listen for Ctrl-C: {}", e),
                }
            })
        })
        .context("spawn ctrl-c thread")?;
    Ok(())
}

fn arm_time_limit(handle: SessionHandle, limit: Duration) -> Result<()> {
    thread::Builder::new()
        .name("time-limit".into())
        .spawn(move || {
            thread::sleep(limit);
            if !handle.is_stopped() {
                log::info!("time limit of {} reached", humantime::format_duration(limit));
                handle.stop();
            }
        })
        .context("spawn time-limit thread")?;
    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    load_or_default(path).with_context(|| format!("loading {}", path.display()))
}

// ───── session logic ────────────────────────────────────────────────────────

fn run() -> Result<i32> {
    // 1 ─ Flags, config, logging
    let args = cli::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{}", cli::USAGE);
        return Ok(0);
    }
    let config_path = args.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = load_config(&config_path)?;
    setup_logging(&config.logging).context("logging setup")?;

    let options = args.apply(config.session.options()?);
    let limit = args.duration.or(config.session.max_duration()?);

    let mut session = TraceSession::new(options.clone());
    session.append(config.session.descriptors())?;
    session.append(args.descriptors)?;
    if session.descriptors().is_empty() {
        eprintln!("{}", cli::USAGE);
        return Ok(2);
    }

    // 2 ─ Event feed
    let hub = Arc::new(ProviderHub::new());
    let stdin = io::stdin();
    let _feed = spawn_feed(io::BufReader::new(stdin), Arc::clone(&hub));

    // 3 ─ Stop triggers
    arm_ctrl_c(session.handle())?;
    if let Some(limit) = limit {
        arm_time_limit(session.handle(), limit)?;
    }

    // 4 ─ Drain on this thread
    let mut host = ConsoleHost::stdio(options.verbose);
    match session.run(hub.as_ref(), &mut host) {
        Ok(summary) => {
            log::info!("delivered {} event(s), cancelled={}", summary.delivered, summary.cancelled);
            Ok(0)
        }
        // 5 ─ Terminating error
        Err(SessionError::Terminated(e)) => {
            eprintln!("etwstream: {} [{:?}]", e, e.category);
            Ok(1)
        }
        Err(e) => Err(e).context("session failed"),
    }
}

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!(
                "[{}][ERROR][main] {:#}",
                Local::now().to_rfc3339(),
                e
            );
            process::exit(1);
        }
    }
}
