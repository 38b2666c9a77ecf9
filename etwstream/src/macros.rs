/// Logs a line tagged with a pipeline component as its target, so the fern
/// format prints it in the `[target]` slot.
/// Usage:
/// ```rust
/// use etwstream::stream_log;
/// use log::Level;
/// stream_log!(Level::Info, "session", "Session started with {} source(s)", 3);
/// ```
/// Logs like:
/// [2025-04-25T16:32:10+02:00][INFO ][session][pid=4568][tid=ThreadId(1)] Session started with 3 source(s)
#[macro_export]
macro_rules! stream_log {
    ($level:expr, $component:expr, $($arg:tt)+) => {
        log::log!(target: $component, $level, $($arg)+)
    };
}
