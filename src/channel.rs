//! One-shot startup synchronisation between the launcher and the detached
//! process.
//!
//! The channel is a pipe created fresh for each start attempt and carries a
//! single outcome byte. The write end enforces the at-most-one-message
//! invariant by consuming itself on report; the read end never blocks past
//! its configured timeout.
use std::{
    fs::File,
    io::{Read, Write},
    os::fd::AsFd,
    time::Duration,
};

use nix::{
    poll::{PollFd, PollFlags, PollTimeout, poll},
    unistd::pipe,
};

use crate::error::ChannelError;

/// Outcome of a detached process's initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The workload reached steady state.
    Success,
    /// The workload could not initialise.
    Failure,
}

impl Outcome {
    fn from_byte(byte: u8) -> Result<Self, ChannelError> {
        match byte {
            0 => Ok(Outcome::Success),
            1 => Ok(Outcome::Failure),
            other => Err(ChannelError::BadOutcome(other)),
        }
    }

    fn byte(self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::Failure => 1,
        }
    }
}

/// Read end of the channel, owned by the launcher until its wait returns.
pub struct StartupChannel {
    rx: File,
}

/// Write end of the channel, owned by the detached process.
///
/// Reporting consumes the handle, so at most one outcome can ever be sent.
/// Dropping it unreported closes the pipe, which the launcher observes as
/// [`ChannelError::Closed`].
pub struct StartupReporter {
    tx: File,
}

/// Creates a fresh channel for one start attempt.
pub fn startup_channel() -> Result<(StartupChannel, StartupReporter), ChannelError> {
    let (rx, tx) = pipe()?;
    Ok((
        StartupChannel { rx: File::from(rx) },
        StartupReporter { tx: File::from(tx) },
    ))
}

impl StartupChannel {
    /// Blocks for at most `timeout` waiting for the outcome byte, then
    /// closes the read end.
    pub fn wait(mut self, timeout: Duration) -> Result<Outcome, ChannelError> {
        let ready = {
            let mut fds = [PollFd::new(self.rx.as_fd(), PollFlags::POLLIN)];
            let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
            let timeout = PollTimeout::try_from(millis).unwrap_or(PollTimeout::MAX);
            poll(&mut fds, timeout)?
        };

        if ready == 0 {
            return Err(ChannelError::TimedOut);
        }

        let mut buf = [0u8; 1];
        match self.rx.read(&mut buf)? {
            0 => Err(ChannelError::Closed),
            _ => Outcome::from_byte(buf[0]),
        }
    }
}

impl StartupReporter {
    /// Reports successful initialisation.
    pub fn success(self) {
        self.send(Outcome::Success);
    }

    /// Reports failed initialisation.
    pub fn failure(self) {
        self.send(Outcome::Failure);
    }

    fn send(mut self, outcome: Outcome) {
        // A vanished reader means nobody is waiting any more; there is no
        // one left to report the error to either.
        let _ = self.tx.write_all(&[outcome.byte()]);
    }
}
