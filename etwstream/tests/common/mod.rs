// tests/common/mod.rs
#![allow(dead_code)]

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use etwstream::host::{ConsoleColor, HostSink, ProcessNames, TraceRecord};
use etwstream::session::{SessionError, SessionOptions, SessionSummary, TraceSession};
use etwstream::source::{ProviderHub, SourceDescriptor};
use shared::{TraceEvent, TraceLevel};

/// Host that keeps every record in memory.
#[derive(Default)]
pub struct RecordingHost {
    pub objects: Vec<TraceRecord>,
    pub lines: Vec<String>,
    pub verbose: Vec<String>,
}

impl RecordingHost {
    pub fn event_names(&self) -> Vec<String> {
        self.objects.iter().map(|r| r.event_name.clone()).collect()
    }
}

impl HostSink for RecordingHost {
    fn write_object(&mut self, record: &TraceRecord) -> io::Result<()> {
        self.objects.push(record.clone());
        Ok(())
    }

    fn write_line(&mut self, _fg: ConsoleColor, _bg: ConsoleColor, line: &str) -> io::Result<()> {
        self.lines.push(line.to_owned());
        Ok(())
    }

    fn write_verbose(&mut self, message: &str) -> io::Result<()> {
        self.verbose.push(message.to_owned());
        Ok(())
    }

    fn foreground(&self) -> ConsoleColor {
        ConsoleColor::Gray
    }

    fn background(&self) -> ConsoleColor {
        ConsoleColor::Black
    }
}

/// Skips OS lookups; every process is "test".
pub struct FixedNames;

impl ProcessNames for FixedNames {
    fn name_of(&self, _pid: u32) -> String {
        "test".into()
    }
}

/// A pid that is never the test process.
pub const OTHER_PID: u32 = 4;

pub fn ev(level: TraceLevel, provider: &str, name: impl Into<String>) -> TraceEvent {
    TraceEvent::new(level, OTHER_PID, provider, name)
}

pub fn named(n: &str) -> SourceDescriptor {
    SourceDescriptor::NameOrGuid(n.into())
}

pub fn session(options: SessionOptions, descriptors: Vec<SourceDescriptor>) -> TraceSession {
    let mut session = TraceSession::new(options).with_process_names(Arc::new(FixedNames));
    session.append(descriptors).unwrap();
    session
}

pub type Outcome<H> = (Result<SessionSummary, SessionError>, H);

/// Run `session` on its own thread; the test thread plays the producers.
pub fn spawn_session<H>(mut session: TraceSession, hub: Arc<ProviderHub>, mut host: H) -> JoinHandle<Outcome<H>>
where
    H: HostSink + Send + 'static,
{
    thread::spawn(move || {
        let result = session.run(hub.as_ref(), &mut host);
        (result, host)
    })
}

/// Block until the session has subscribed to `provider`.
pub fn wait_for_subscriber(hub: &ProviderHub, provider: &str) {
    wait_until(|| hub.subscriber_count(provider) > 0);
}

pub fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Join with a deadline so a hung session fails the test instead of the run.
pub fn join_within<T: Send + 'static>(handle: JoinHandle<T>, limit: Duration) -> T {
    let deadline = Instant::now() + limit;
    while !handle.is_finished() {
        assert!(Instant::now() < deadline, "session did not finish within {limit:?}");
        thread::sleep(Duration::from_millis(1));
    }
    handle.join().unwrap()
}
