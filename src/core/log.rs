//! Leveled diagnostics passed explicitly to every component.
//!
//! A `Logger` never influences what gets rewritten; it only decides which
//! messages reach stderr (or the in-memory capture used by tests).

use std::cell::RefCell;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Warn,
    Info,
    Debug,
    /// Every substitution and every dry-run output line.
    Raw,
}

impl Verbosity {
    /// Map a repeated `-v` flag count to a level. Warnings are always shown.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Verbosity::Warn,
            1 => Verbosity::Info,
            2 => Verbosity::Debug,
            _ => Verbosity::Raw,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Warn => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
            Verbosity::Raw => "raw",
        }
    }
}

#[derive(Debug)]
enum LogSink {
    Stderr,
    Memory(RefCell<Vec<String>>),
}

#[derive(Debug)]
pub struct Logger {
    verbosity: Verbosity,
    sink: LogSink,
}

impl Logger {
    pub fn stderr(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            sink: LogSink::Stderr,
        }
    }

    pub fn quiet() -> Self {
        Self::stderr(Verbosity::Quiet)
    }

    /// Keep messages in memory instead of printing them.
    pub fn capture(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            sink: LogSink::Memory(RefCell::new(Vec::new())),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn enabled(&self, level: Verbosity) -> bool {
        level != Verbosity::Quiet && level <= self.verbosity
    }

    pub fn warn(&self, message: impl FnOnce() -> String) {
        self.emit(Verbosity::Warn, message);
    }

    pub fn info(&self, message: impl FnOnce() -> String) {
        self.emit(Verbosity::Info, message);
    }

    pub fn debug(&self, message: impl FnOnce() -> String) {
        self.emit(Verbosity::Debug, message);
    }

    pub fn raw(&self, message: impl FnOnce() -> String) {
        self.emit(Verbosity::Raw, message);
    }

    /// Captured messages, formatted as `[level] message`. Empty for stderr loggers.
    pub fn captured(&self) -> Vec<String> {
        match &self.sink {
            LogSink::Stderr => Vec::new(),
            LogSink::Memory(lines) => lines.borrow().clone(),
        }
    }

    fn emit(&self, level: Verbosity, message: impl FnOnce() -> String) {
        if !self.enabled(level) {
            return;
        }

        let line = format!("[{}] {}", level.label(), message());
        match &self.sink {
            LogSink::Stderr => {
                // A closed stderr is not worth failing a migration over.
                let _ = writeln!(io::stderr().lock(), "{}", line);
            }
            LogSink::Memory(lines) => lines.borrow_mut().push(line),
        }
    }
}
