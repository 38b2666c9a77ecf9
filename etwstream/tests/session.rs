// tests/session.rs

mod common;

use std::io::{self, Cursor};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender, bounded};
use etwstream::host::{ConsoleColor, ConsoleHost, HostSink, TraceRecord};
use etwstream::session::{ErrorCategory, SessionError, SessionOptions, SessionState};
use etwstream::source::feed::run_feed;
use etwstream::source::{ProviderHub, SourceDescriptor, SourceError, WellKnownSource};
use shared::{TraceEvent, TraceLevel};

use common::*;

const LIMIT: Duration = Duration::from_secs(10);

#[test]
fn delivers_every_admitted_event_in_source_order() {
    let hub = Arc::new(ProviderHub::new());
    let s = session(SessionOptions::default(), vec![named("A"), named("B")]);
    let run = spawn_session(s, hub.clone(), RecordingHost::default());
    wait_for_subscriber(&hub, "A");
    wait_for_subscriber(&hub, "B");

    let a = hub.handle("A").unwrap();
    let b = hub.handle("B").unwrap();
    let producers = [(a, "a"), (b, "b")].map(|(h, tag)| {
        thread::spawn(move || {
            for i in 0..200 {
                h.emit(ev(TraceLevel::Informational, h.name(), format!("{tag}{i}")));
            }
            h.complete();
        })
    });
    for p in producers {
        p.join().unwrap();
    }

    let (result, host) = join_within(run, LIMIT);
    let summary = result.unwrap();
    assert_eq!(summary.delivered, 400);
    assert!(!summary.cancelled);

    for tag in ["a", "b"] {
        let seq: Vec<u32> = host
            .event_names()
            .iter()
            .filter_map(|n| n.strip_prefix(tag))
            .map(|n| n.parse().unwrap())
            .collect();
        assert_eq!(seq, (0..200).collect::<Vec<_>>(), "order of {tag}");
    }
}

#[test]
fn own_process_events_are_excluded_at_every_level() {
    let hub = Arc::new(ProviderHub::new());
    let s = session(SessionOptions::default(), vec![named("P")]);
    let run = spawn_session(s, hub.clone(), RecordingHost::default());
    wait_for_subscriber(&hub, "P");

    let h = hub.handle("P").unwrap();
    for level in TraceLevel::ALL {
        h.emit(TraceEvent::new(level, std::process::id(), "P", format!("self-{level}")));
        h.emit(ev(level, "P", format!("other-{level}")));
    }
    h.complete();

    let (result, host) = join_within(run, LIMIT);
    assert_eq!(result.unwrap().delivered, 6);
    assert!(host.event_names().iter().all(|n| n.starts_with("other-")));
}

#[test]
fn threshold_is_inclusive() {
    let hub = Arc::new(ProviderHub::new());
    let options = SessionOptions { trace_level: TraceLevel::Warning, ..Default::default() };
    let s = session(options, vec![named("P")]);
    let run = spawn_session(s, hub.clone(), RecordingHost::default());
    wait_for_subscriber(&hub, "P");

    let h = hub.handle("P").unwrap();
    for level in TraceLevel::ALL {
        h.emit(ev(level, "P", level.as_str()));
    }
    h.complete();

    let (result, host) = join_within(run, LIMIT);
    assert_eq!(result.unwrap().delivered, 4);
    assert_eq!(host.event_names(), ["Always", "Critical", "Error", "Warning"]);
}

/// Blocks inside the first write until the test opens the gate.
struct GatedHost {
    inner: RecordingHost,
    entered: Sender<()>,
    gate: Receiver<()>,
    first: bool,
}

impl HostSink for GatedHost {
    fn write_object(&mut self, record: &TraceRecord) -> io::Result<()> {
        if std::mem::take(&mut self.first) {
            self.entered.send(()).unwrap();
            self.gate.recv().unwrap();
        }
        self.inner.write_object(record)
    }
    fn write_line(&mut self, fg: ConsoleColor, bg: ConsoleColor, line: &str) -> io::Result<()> {
        self.inner.write_line(fg, bg, line)
    }
    fn write_verbose(&mut self, message: &str) -> io::Result<()> {
        self.inner.write_verbose(message)
    }
    fn foreground(&self) -> ConsoleColor {
        self.inner.foreground()
    }
    fn background(&self) -> ConsoleColor {
        self.inner.background()
    }
}

#[test]
fn stop_discards_buffered_actions() {
    const BUFFERED: usize = 50;

    let hub = Arc::new(ProviderHub::new());
    let s = session(SessionOptions::default(), vec![named("P")]);
    let handle = s.handle();
    let (entered_tx, entered_rx) = bounded(1);
    let (gate_tx, gate_rx) = bounded(1);
    let host = GatedHost { inner: RecordingHost::default(), entered: entered_tx, gate: gate_rx, first: true };
    let run = spawn_session(s, hub.clone(), host);
    wait_for_subscriber(&hub, "P");

    let h = hub.handle("P").unwrap();
    for i in 0..=BUFFERED {
        h.emit(ev(TraceLevel::Error, "P", format!("e{i}")));
    }
    // consumer is now parked inside the first action with BUFFERED queued
    entered_rx.recv_timeout(LIMIT).unwrap();
    handle.stop();
    gate_tx.send(()).unwrap();

    let (result, host) = join_within(run, LIMIT);
    let summary = result.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.delivered, 1);
    assert_eq!(host.inner.event_names(), ["e0"]);
    assert_eq!(hub.subscriber_count("P"), 0);
    assert_eq!(handle.state(), SessionState::Closed);
}

#[test]
fn stop_wakes_an_idle_session() {
    let hub = Arc::new(ProviderHub::new());
    let s = session(SessionOptions::default(), vec![named("Quiet")]);
    let handle = s.handle();
    let run = spawn_session(s, hub.clone(), RecordingHost::default());
    wait_for_subscriber(&hub, "Quiet");

    handle.stop();
    let (result, _) = join_within(run, LIMIT);
    assert_eq!(result.unwrap().delivered, 0);
    assert_eq!(hub.subscriber_count("Quiet"), 0);
}

#[test]
fn stop_after_source_failure_closes_cleanly() {
    let hub = Arc::new(ProviderHub::new());
    let s = session(SessionOptions::default(), vec![named("P"), named("Q")]);
    let handle = s.handle();
    let (entered_tx, entered_rx) = bounded(1);
    let (gate_tx, gate_rx) = bounded(1);
    let host = GatedHost { inner: RecordingHost::default(), entered: entered_tx, gate: gate_rx, first: true };
    let run = spawn_session(s, hub.clone(), host);
    wait_for_subscriber(&hub, "P");
    wait_for_subscriber(&hub, "Q");

    let h = hub.handle("P").unwrap();
    h.emit(ev(TraceLevel::Error, "P", "e0"));
    h.emit(ev(TraceLevel::Error, "P", "e1"));
    entered_rx.recv_timeout(LIMIT).unwrap();
    // the failure is latched while the consumer is still busy with e0
    h.fail(SourceError::Feed("boom".into()));
    handle.stop();
    gate_tx.send(()).unwrap();

    let (result, host) = join_within(run, LIMIT);
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => panic!("a stopped session must not surface a failure, got {e:?}"),
    };
    assert!(summary.cancelled);
    assert_eq!(summary.delivered, 1);
    assert_eq!(host.inner.event_names(), ["e0"]);
    assert_eq!(hub.subscriber_count("P"), 0);
    assert_eq!(hub.subscriber_count("Q"), 0);
    assert_eq!(handle.state(), SessionState::Closed);
}

#[test]
fn one_failing_source_terminates_the_session_and_disposes_all() {
    let hub = Arc::new(ProviderHub::new());
    let names = ["A", "B", "C"];
    let s = session(SessionOptions::default(), names.iter().map(|n| named(n)).collect());
    let run = spawn_session(s, hub.clone(), RecordingHost::default());
    for n in names {
        wait_for_subscriber(&hub, n);
    }

    hub.handle("A").unwrap().emit(ev(TraceLevel::Error, "A", "before"));
    let failure = SourceError::Provider { provider: "B".into(), message: "session lost".into() };
    hub.handle("B").unwrap().fail(failure.clone());
    hub.handle("C").unwrap().fail(SourceError::Feed("second".into()));

    let (result, host) = join_within(run, LIMIT);
    match result {
        Err(SessionError::Terminated(e)) => {
            assert_eq!(e.error_id, "1");
            assert_eq!(e.category, ErrorCategory::OperationStopped);
            assert_eq!(e.source, failure);
        }
        other => panic!("expected a terminating error, got {other:?}"),
    }
    assert_eq!(host.event_names(), ["before"]);
    for n in names {
        assert_eq!(hub.subscriber_count(n), 0, "{n} still subscribed");
    }
}

#[test]
fn unknown_well_known_group_yields_nothing() {
    let hub = Arc::new(ProviderHub::new());
    let s = session(
        SessionOptions::default(),
        vec![SourceDescriptor::WellKnown("NoSuchGroup".into()), named("Real")],
    );
    let run = spawn_session(s, hub.clone(), RecordingHost::default());
    wait_for_subscriber(&hub, "Real");

    let h = hub.handle("Real").unwrap();
    h.emit(ev(TraceLevel::Error, "Real", "one"));
    h.emit(ev(TraceLevel::Error, "Real", "two"));
    h.complete();

    let (result, host) = join_within(run, LIMIT);
    assert_eq!(result.unwrap().delivered, 2);
    assert_eq!(host.event_names(), ["one", "two"]);
}

#[test]
fn strict_resolution_fails_before_subscribing() {
    let hub = ProviderHub::new();
    let options = SessionOptions { strict_descriptors: true, ..Default::default() };
    let mut s = session(options, vec![named("Real"), SourceDescriptor::Iis("NoSuchGroup".into())]);

    let result = s.run(&hub, &mut RecordingHost::default());
    assert!(matches!(result, Err(SessionError::Resolution(_))));
    assert_eq!(hub.subscriber_count("Real"), 0);
    assert_eq!(s.state(), SessionState::Closed);
}

#[test]
fn well_known_groups_open_their_providers() {
    let hub = Arc::new(ProviderHub::new());
    let s = session(SessionOptions::default(), vec![SourceDescriptor::WellKnown("tpleventsource".into())]);
    let run = spawn_session(s, hub.clone(), RecordingHost::default());
    let provider = WellKnownSource::TplEventSource.provider_name();
    wait_for_subscriber(&hub, provider);

    let h = hub.handle(provider).unwrap();
    h.emit(ev(TraceLevel::Informational, provider, "TaskScheduled"));
    h.complete();

    let (result, host) = join_within(run, LIMIT);
    assert_eq!(result.unwrap().delivered, 1);
    assert_eq!(host.objects[0].provider_name, provider);
}

#[test]
fn stopping_is_idempotent_at_any_point() {
    let hub = Arc::new(ProviderHub::new());
    let s = session(SessionOptions::default(), vec![named("P")]);
    let handle = s.handle();

    // before start
    handle.stop();
    handle.stop();
    let run = spawn_session(s, hub.clone(), RecordingHost::default());
    let (result, _) = join_within(run, LIMIT);
    let summary = result.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.delivered, 0);

    // after close
    handle.stop();
    assert_eq!(handle.state(), SessionState::Closed);
}

#[test]
fn stopping_from_many_threads_is_safe() {
    let hub = Arc::new(ProviderHub::new());
    let s = session(SessionOptions::default(), vec![named("P")]);
    let handle = s.handle();
    let run = spawn_session(s, hub.clone(), RecordingHost::default());
    wait_for_subscriber(&hub, "P");

    let stoppers: Vec<_> = (0..4)
        .map(|_| {
            let handle = handle.clone();
            thread::spawn(move || handle.stop())
        })
        .collect();
    for s in stoppers {
        s.join().unwrap();
    }
    let (result, _) = join_within(run, LIMIT);
    assert!(result.unwrap().cancelled);
}

struct FailingHost;

impl HostSink for FailingHost {
    fn write_object(&mut self, _: &TraceRecord) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
    }
    fn write_line(&mut self, _: ConsoleColor, _: ConsoleColor, _: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
    }
    fn write_verbose(&mut self, _: &str) -> io::Result<()> {
        Ok(())
    }
    fn foreground(&self) -> ConsoleColor {
        ConsoleColor::Gray
    }
    fn background(&self) -> ConsoleColor {
        ConsoleColor::Black
    }
}

#[test]
fn host_failure_ends_the_session() {
    let hub = Arc::new(ProviderHub::new());
    let s = session(SessionOptions::default(), vec![named("P")]);
    let run = spawn_session(s, hub.clone(), FailingHost);
    wait_for_subscriber(&hub, "P");

    hub.handle("P").unwrap().emit(ev(TraceLevel::Error, "P", "x"));

    let (result, _) = join_within(run, LIMIT);
    match result {
        Err(SessionError::Host(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("expected a host error, got {other:?}"),
    }
    assert_eq!(hub.subscriber_count("P"), 0);
}

#[test]
fn json_feed_reaches_the_console() {
    let hub = Arc::new(ProviderHub::new());
    let options = SessionOptions { trace_level: TraceLevel::Error, ..Default::default() };
    let s = session(options, vec![named("MyCompany-App")]);
    let run = spawn_session(s, hub.clone(), ConsoleHost::new(Vec::new(), Vec::new(), false));
    wait_for_subscriber(&hub, "MyCompany-App");

    let feed = [
        r#"{"timestamp":"2025-01-01T00:00:00Z","level":"Error","process_id":4,"provider_name":"MyCompany-App","event_name":"Crash","message":"boom"}"#,
        r#"{"timestamp":"2025-01-01T00:00:01Z","level":"Verbose","process_id":4,"provider_name":"MyCompany-App","event_name":"Chatter"}"#,
        "not json",
        r#"{"timestamp":"2025-01-01T00:00:02Z","level":"Critical","process_id":4,"provider_name":"Elsewhere","event_name":"Unrouted"}"#,
    ]
    .join("\n");
    let stats = run_feed(Cursor::new(feed), &hub);
    assert_eq!((stats.dispatched, stats.unrouted, stats.malformed), (2, 1, 1));

    let (result, host) = join_within(run, LIMIT);
    assert_eq!(result.unwrap().delivered, 1);
    let (out, _) = host.into_inner();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 1);
    let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record["event_name"], "Crash");
    assert_eq!(record["payload_or_message"], "boom");
}
