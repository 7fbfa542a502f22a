//! Escalating termination of the recorded service process.
use std::{
    thread,
    time::{Duration, Instant},
};

use nix::{
    errno::Errno,
    sys::signal::{self, Signal},
    unistd::Pid,
};
use tracing::debug;

use crate::pidfile::process_alive;

/// Retry schedule for graceful termination.
///
/// `retries` and `timeout` are independent limits; whichever is exhausted
/// first triggers escalation to SIGKILL.
#[derive(Debug, Clone)]
pub struct StopPolicy {
    /// Number of SIGTERM deliveries before escalating.
    pub retries: u32,
    /// Sleep between deliveries.
    pub interval: Duration,
    /// Ceiling on the total time spent on graceful termination.
    pub timeout: Duration,
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            interval: Duration::from_millis(100),
            timeout: Duration::from_secs(1),
        }
    }
}

/// How the target ended up dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMethod {
    /// The process exited on SIGTERM, or was already gone.
    Graceful,
    /// SIGKILL was required.
    Forced,
}

/// Drives `pid` to termination: SIGTERM with retries, then SIGKILL.
///
/// A target that vanishes at any step (ESRCH) already stopped, which is a
/// success. Any other delivery error aborts the attempt so the caller can
/// surface it; the PID record is left alone for diagnosis.
pub fn terminate(pid: Pid, policy: &StopPolicy) -> Result<StopMethod, Errno> {
    let deadline = Instant::now() + policy.timeout;

    for attempt in 0..policy.retries.max(1) {
        debug!("Sending SIGTERM to {pid} (attempt {})", attempt + 1);
        match signal::kill(pid, Signal::SIGTERM) {
            Ok(()) => {}
            Err(Errno::ESRCH) => return Ok(StopMethod::Graceful),
            Err(err) => return Err(err),
        }

        thread::sleep(policy.interval);
        if !process_alive(pid) {
            return Ok(StopMethod::Graceful);
        }

        if Instant::now() >= deadline {
            break;
        }
    }

    debug!("{pid} survived SIGTERM; sending SIGKILL");
    match signal::kill(pid, Signal::SIGKILL) {
        Ok(()) => Ok(StopMethod::Forced),
        // Exited between the last probe and the kill.
        Err(Errno::ESRCH) => Ok(StopMethod::Graceful),
        Err(err) => Err(err),
    }
}
