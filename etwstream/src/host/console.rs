//! Terminal host: JSON lines on stdout, ANSI-coloured lines, verbose output
//! on stderr.

use std::io::{self, Write};

use super::{ConsoleColor, HostSink, TraceRecord};

pub struct ConsoleHost<W: Write = io::Stdout, E: Write = io::Stderr> {
    out: W,
    err: E,
    verbose: bool,
    foreground: ConsoleColor,
    background: ConsoleColor,
}

impl ConsoleHost {
    pub fn stdio(verbose: bool) -> Self {
        Self::new(io::stdout(), io::stderr(), verbose)
    }
}

impl<W: Write, E: Write> ConsoleHost<W, E> {
    pub fn new(out: W, err: E, verbose: bool) -> Self {
        Self {
            out,
            err,
            verbose,
            foreground: ConsoleColor::Gray,
            background: ConsoleColor::Black,
        }
    }

    pub fn into_inner(self) -> (W, E) {
        (self.out, self.err)
    }
}

impl<W: Write, E: Write> HostSink for ConsoleHost<W, E> {
    fn write_object(&mut self, record: &TraceRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }

    fn write_line(&mut self, foreground: ConsoleColor, background: ConsoleColor, line: &str) -> io::Result<()> {
        writeln!(
            self.out,
            "\x1b[{};{}m{}\x1b[0m",
            foreground.ansi_code(),
            background.ansi_code() + 10,
            line
        )?;
        self.out.flush()
    }

    fn write_verbose(&mut self, message: &str) -> io::Result<()> {
        if self.verbose {
            writeln!(self.err, "VERBOSE: {message}")?;
        }
        Ok(())
    }

    fn foreground(&self) -> ConsoleColor {
        self.foreground
    }

    fn background(&self) -> ConsoleColor {
        self.background
    }
}
