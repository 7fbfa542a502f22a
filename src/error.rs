//! Error handling for initd.
use thiserror::Error;

/// Error type for PID file operations.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// Error reading or writing the PID file.
    #[error("Failed to access PID file: {0}")]
    Io(#[from] std::io::Error),

    /// The file exists but does not hold a positive decimal PID.
    #[error("Invalid PID in PID file: {0:?}")]
    InvalidPid(String),
}

/// Error type for the one-shot startup channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The pipe could not be created, polled, or read.
    #[error("Startup channel I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// No startup report arrived before the deadline.
    #[error("Timed out waiting for the startup report")]
    TimedOut,

    /// The write end was closed without a report being sent.
    #[error("Startup channel closed before a report arrived")]
    Closed,

    /// The byte read from the channel was not a known outcome.
    #[error("Unrecognised startup outcome byte: {0}")]
    BadOutcome(u8),
}

impl From<nix::errno::Errno> for ChannelError {
    fn from(err: nix::errno::Errno) -> Self {
        ChannelError::Io(std::io::Error::from(err))
    }
}

/// Error type for the detachment sequence, as observed by the launcher.
#[derive(Debug, Error)]
pub enum DetachError {
    /// The startup channel could not be created.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The detachment split itself could not be performed.
    #[error("Failed to fork detached process: {0}")]
    Fork(nix::errno::Errno),
}

/// Error type for the Route 53 synchroniser workload.
#[derive(Debug, Error)]
pub enum DnsError {
    /// The `aws` CLI could not be spawned.
    #[error("Failed to run the aws CLI: {0}")]
    Cli(#[from] std::io::Error),

    /// The `aws` CLI ran but reported an error.
    #[error("aws CLI exited with {status}: {stderr}")]
    CliFailed {
        /// Exit status of the CLI invocation.
        status: std::process::ExitStatus,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The CLI output was not the expected JSON document.
    #[error("Failed to parse aws CLI output: {0}")]
    Parse(#[from] serde_json::Error),

    /// The public IP lookup failed at the transport level.
    #[error("Public IP lookup failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The public IP endpoint answered with a non-success status.
    #[error("Public IP endpoint returned status {0}")]
    HttpStatus(reqwest::StatusCode),

    /// The public IP endpoint returned something that is not an address.
    #[error("Public IP endpoint returned an unparsable address: {0:?}")]
    BadAddress(String),

    /// No A record in the hosted zone matches the configured domain.
    #[error("No A record matches domain '{0}'")]
    MissingRecord(String),

    /// The matching A record carries no address value.
    #[error("Matching A record has no address value")]
    EmptyRecord,
}
