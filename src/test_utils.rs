//! Test support utilities.
use std::sync::{Arc, Mutex};

use crate::report::Reporter;

/// Reporter that records every protocol line so tests can assert on content
/// and ordering. Clones share the same line buffer.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded line, in emission order.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn push(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
    }
}

impl Reporter for RecordingReporter {
    fn action(&self, msg: &str) {
        self.push(format!("action:{msg}"));
    }

    fn status(&self, ok: bool) {
        self.push(format!("status:{}", if ok { "ok" } else { "fail" }));
    }

    fn success(&self, msg: &str) {
        self.push(format!("success:{msg}"));
    }

    fn warning(&self, msg: &str) {
        self.push(format!("warning:{msg}"));
    }

    fn failure(&self, msg: &str) {
        self.push(format!("failure:{msg}"));
    }
}
