//! Durable record of which process, if any, represents the running service.
use std::{
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use nix::{errno::Errno, sys::signal, unistd::Pid};

use crate::{error::PidFileError, report::Reporter};

/// Service state derived on demand from the PID record, following the LSB
/// status-code vocabulary. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// The recorded process is alive.
    Running,
    /// A PID file exists but its content is unusable.
    StoppedWithPidfile,
    /// A lock file exists without a live process. Part of the LSB vocabulary
    /// but never produced here; this implementation takes no locks.
    StoppedWithLock,
    /// No record exists, or the recorded process is gone.
    Stopped,
    /// The record could not be read.
    Unknown,
}

impl ServiceStatus {
    /// LSB status code surfaced by the `status` verb.
    pub fn code(&self) -> i32 {
        match self {
            ServiceStatus::Running => 0,
            ServiceStatus::StoppedWithPidfile => 1,
            ServiceStatus::StoppedWithLock => 2,
            ServiceStatus::Stopped => 3,
            ServiceStatus::Unknown => 4,
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ServiceStatus::Running => "running",
            ServiceStatus::StoppedWithPidfile => "stopped (PID file exists)",
            ServiceStatus::StoppedWithLock => "stopped (lock file exists)",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Unknown => "unknown",
        };
        write!(f, "{text}")
    }
}

/// What the caller expects [`PidFile::resolve`] to find. On a mismatch the
/// `[fail]` status suffix is emitted from inside `resolve`, before any
/// warning lines, so the suffix lands on the caller's pending action line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// The service should be running; anything else fails the action line.
    Running,
    /// The service should be stopped; a live process fails the action line.
    Stopped,
    /// No expectation; nothing is emitted beyond warnings.
    None,
}

/// Detail lines collected while inspecting the record, replayed through the
/// reporter after the status suffix.
enum Note {
    Warning(String),
    Failure(String),
}

/// A PID record at a fixed filesystem path.
///
/// The record is plain decimal text. It is written exclusively by the live
/// detached process; any controller that finds the recorded process dead
/// reaps the stale file.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Binds a record to `path`. The file need not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path this record lives at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the record and probes the recorded process for liveness.
    ///
    /// Corrupt records are discarded with a warning and stale records are
    /// reaped, so the returned status reflects reality rather than leftover
    /// files. An unreadable file is reported as [`ServiceStatus::Unknown`]
    /// and left in place.
    pub fn resolve(
        &self,
        expect: Expectation,
        report: &dyn Reporter,
    ) -> (Option<Pid>, ServiceStatus) {
        let (pid, status, notes) = self.inspect();

        let mismatch = match expect {
            Expectation::Running => status != ServiceStatus::Running,
            Expectation::Stopped => status == ServiceStatus::Running,
            Expectation::None => false,
        };
        if mismatch {
            report.status(false);
        }

        for note in notes {
            match note {
                Note::Warning(msg) => report.warning(&msg),
                Note::Failure(msg) => report.failure(&msg),
            }
        }

        (pid, status)
    }

    fn inspect(&self) -> (Option<Pid>, ServiceStatus, Vec<Note>) {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return (None, ServiceStatus::Stopped, Vec::new());
            }
            Err(err) => {
                let note = Note::Warning(format!("Failed to read PID file: {err}"));
                return (None, ServiceStatus::Unknown, vec![note]);
            }
        };

        let pid = match contents.trim().parse::<i32>() {
            Ok(pid) if pid > 0 => Pid::from_raw(pid),
            _ => {
                let mut notes = vec![Note::Warning(format!(
                    "Invalid PID in PID file: {:?}",
                    contents.trim()
                ))];
                if let Err(err) = self.remove() {
                    notes.push(Note::Failure(format!(
                        "Failed to remove corrupt PID file: {err}"
                    )));
                }
                return (None, ServiceStatus::StoppedWithPidfile, notes);
            }
        };

        if process_alive(pid) {
            (Some(pid), ServiceStatus::Running, Vec::new())
        } else {
            match self.remove() {
                Ok(()) => (None, ServiceStatus::Stopped, Vec::new()),
                Err(err) => (
                    None,
                    ServiceStatus::StoppedWithPidfile,
                    vec![Note::Failure(format!(
                        "Failed to remove stale PID file: {err}"
                    ))],
                ),
            }
        }
    }

    /// Writes `pid` as decimal text, truncating any previous record.
    ///
    /// A failure here is fatal to the detachment sequence; the process must
    /// not run untracked.
    pub fn persist(&self, pid: u32) -> Result<(), PidFileError> {
        fs::write(&self.path, pid.to_string())?;
        Ok(())
    }

    /// Removes the record. An already-missing file is not an error; callers
    /// log real failures as warnings and move on.
    pub fn clear(&self) -> Result<(), PidFileError> {
        self.remove()?;
        Ok(())
    }

    fn remove(&self) -> Result<(), std::io::Error> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Signal-0 liveness probe. EPERM means the process exists but belongs to
/// someone else, which still counts as alive.
pub fn process_alive(pid: Pid) -> bool {
    match signal::kill(pid, None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}
