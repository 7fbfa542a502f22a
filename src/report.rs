//! Console status lines for service actions.
//!
//! The protocol is the classic init-script layout: an action line printed
//! without a trailing newline, a status suffix right-aligned to the terminal
//! width, then any warning or failure detail lines. Consumers parsing
//! service-manager output rely on exactly that ordering.
use std::{
    cell::Cell,
    io::{self, Write},
};

use terminal_size::{Width, terminal_size};

/// Suffix completing a successful action line.
const OK_SUFFIX: &str = "[ OK ]";

/// Suffix completing a failed action line.
const FAIL_SUFFIX: &str = "[fail]";

/// Fallback width when the output is not a terminal.
const DEFAULT_COLUMNS: usize = 80;

/// Sink for the status-line protocol.
///
/// The service controller only talks to this trait; the console
/// implementation below renders to stdout and tests substitute a recording
/// implementation.
pub trait Reporter {
    /// Logs the start of an action, e.g. "Starting foo service.". Must be
    /// followed by exactly one [`Reporter::status`] call.
    fn action(&self, msg: &str);

    /// Completes the pending action line with an aligned OK/fail suffix.
    fn status(&self, ok: bool);

    /// Logs a success detail line.
    fn success(&self, msg: &str);

    /// Logs a warning detail line.
    fn warning(&self, msg: &str);

    /// Logs a failure detail line.
    fn failure(&self, msg: &str);
}

/// Writes the protocol to stdout, aligned to the terminal width.
pub struct ConsoleReporter {
    service: String,
    margin: usize,
    fill: Cell<usize>,
}

impl ConsoleReporter {
    /// Creates a reporter for `service`, probing the terminal for its width.
    pub fn new(service: impl Into<String>) -> Self {
        let columns = terminal_size()
            .map(|(Width(w), _)| usize::from(w))
            .unwrap_or(DEFAULT_COLUMNS);
        Self::with_columns(service, columns)
    }

    /// Creates a reporter aligned to a fixed column count.
    pub fn with_columns(service: impl Into<String>, columns: usize) -> Self {
        let columns = if columns > OK_SUFFIX.len() {
            columns
        } else {
            DEFAULT_COLUMNS
        };

        Self {
            service: service.into(),
            margin: columns - OK_SUFFIX.len() - 1,
            fill: Cell::new(0),
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_fill(&self) -> usize {
        self.fill.get()
    }
}

impl Reporter for ConsoleReporter {
    fn action(&self, msg: &str) {
        print!(" * {msg}");
        let _ = io::stdout().flush();
        self.fill
            .set(self.margin.saturating_sub(3 + msg.chars().count()));
    }

    fn status(&self, ok: bool) {
        let suffix = if ok { OK_SUFFIX } else { FAIL_SUFFIX };
        println!("{:width$}{suffix}", "", width = self.fill.get());
        self.fill.set(0);
    }

    fn success(&self, msg: &str) {
        println!("{}: * {msg}", self.service);
    }

    fn warning(&self, msg: &str) {
        println!("{}: * warning: {msg}", self.service);
    }

    fn failure(&self, msg: &str) {
        println!("{}: * failure: {msg}", self.service);
    }
}
