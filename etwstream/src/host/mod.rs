//! Consumer-side presentation.
//!
//! Everything here runs on the single consumer thread: the session's drain
//! loop turns each surviving event into a `TraceRecord` and hands it to a
//! `HostSink`, either as a structured object or as one coloured line.

pub mod console;
pub mod process;
pub mod record;

use std::io;

pub use console::ConsoleHost;
pub use process::{ProcessNames, SystemProcessNames};
pub use record::{TraceRecord, color_for};

/// The sixteen console colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkCyan,
    DarkRed,
    DarkMagenta,
    DarkYellow,
    Gray,
    DarkGray,
    Blue,
    Green,
    Cyan,
    Red,
    Magenta,
    Yellow,
    White,
}

impl ConsoleColor {
    /// SGR foreground code; add 10 for the background code.
    pub fn ansi_code(self) -> u8 {
        match self {
            ConsoleColor::Black => 30,
            ConsoleColor::DarkRed => 31,
            ConsoleColor::DarkGreen => 32,
            ConsoleColor::DarkYellow => 33,
            ConsoleColor::DarkBlue => 34,
            ConsoleColor::DarkMagenta => 35,
            ConsoleColor::DarkCyan => 36,
            ConsoleColor::Gray => 37,
            ConsoleColor::DarkGray => 90,
            ConsoleColor::Red => 91,
            ConsoleColor::Green => 92,
            ConsoleColor::Yellow => 93,
            ConsoleColor::Blue => 94,
            ConsoleColor::Magenta => 95,
            ConsoleColor::Cyan => 96,
            ConsoleColor::White => 97,
        }
    }
}

/// Output surface of the interactive host.
pub trait HostSink {
    /// One structured item per surviving event.
    fn write_object(&mut self, record: &TraceRecord) -> io::Result<()>;

    /// One pre-formatted line in the given colours.
    fn write_line(&mut self, foreground: ConsoleColor, background: ConsoleColor, line: &str) -> io::Result<()>;

    /// Verbose channel; hosts may discard it.
    fn write_verbose(&mut self, message: &str) -> io::Result<()>;

    fn foreground(&self) -> ConsoleColor;

    fn background(&self) -> ConsoleColor;
}
