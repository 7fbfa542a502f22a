//! The service controller: standard control verbs over a detachable
//! workload.
use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::ValueEnum;

use crate::{
    channel::{Outcome, StartupReporter},
    detach::spawn_detached,
    error::ChannelError,
    pidfile::{Expectation, PidFile, ServiceStatus},
    report::{ConsoleReporter, Reporter},
    stop::{StopMethod, StopPolicy, terminate},
};

/// Exit codes shared by every control verb, following the LSB convention:
/// success only on a genuine state change, no-action when the requested
/// state already held, failure when a change was attempted and did not
/// happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// The requested state change happened.
    Success,
    /// The service was already in the requested state.
    NoAction,
    /// The state change was attempted and did not succeed.
    Failure,
}

impl ExitCode {
    /// Process exit code for this outcome.
    pub fn code(&self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::NoAction => 1,
            ExitCode::Failure => 2,
        }
    }
}

/// The service-control verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ControlVerb {
    /// Detach and run the workload.
    Start,
    /// Terminate the running instance.
    Stop,
    /// Stop, then start.
    Restart,
    /// Restart only if currently running.
    TryRestart,
    /// Re-apply configuration; a restart by default.
    Reload,
    /// Unconditional reload.
    ForceReload,
    /// Report the derived service state.
    Status,
}

/// A long-running task the controller can run detached.
///
/// Implementations must eventually consume the [`StartupReporter`] passed to
/// `run`: `success` on reaching steady state, `failure` when initialisation
/// cannot complete. Returning from `run` ends the process. `terminate` is
/// invoked asynchronously on the termination signal and releases whatever
/// the task holds; the controller clears the PID record on exit regardless
/// of whether it completes.
pub trait Workload: Send + Sync + 'static {
    /// Entry point, invoked once detachment is complete.
    fn run(&self, startup: StartupReporter);

    /// Termination request delivered via the termination signal.
    fn terminate(&self);
}

/// Static configuration for one service identity.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Service name used in status and log lines.
    pub name: String,
    /// Path of the PID record.
    pub pidfile: PathBuf,
    /// How long the launcher waits for the startup report.
    pub startup_timeout: Duration,
    /// Termination retry schedule.
    pub stop: StopPolicy,
}

impl ServiceOptions {
    /// Options with the default timeouts.
    pub fn new(name: impl Into<String>, pidfile: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            pidfile: pidfile.into(),
            startup_timeout: Duration::from_secs(10),
            stop: StopPolicy::default(),
        }
    }
}

/// Orchestrates the lifecycle of a single detached service.
///
/// Exactly one controller instance is assumed to operate on a given PID-file
/// path at a time; the record itself is only ever written by the live
/// detached process.
pub struct Service {
    opts: ServiceOptions,
    pidfile: PidFile,
    workload: Arc<dyn Workload>,
    reporter: Box<dyn Reporter>,
}

impl Service {
    /// Creates a controller reporting to the console.
    pub fn new(opts: ServiceOptions, workload: Arc<dyn Workload>) -> Self {
        let reporter = Box::new(ConsoleReporter::new(opts.name.clone()));
        Self::with_reporter(opts, workload, reporter)
    }

    /// Creates a controller with a custom status sink.
    pub fn with_reporter(
        opts: ServiceOptions,
        workload: Arc<dyn Workload>,
        reporter: Box<dyn Reporter>,
    ) -> Self {
        let pidfile = PidFile::new(&opts.pidfile);
        Self {
            opts,
            pidfile,
            workload,
            reporter,
        }
    }

    /// Runs `verb` and returns the code the process should exit with: the
    /// LSB status code for `status`, the verb's [`ExitCode`] otherwise.
    pub fn dispatch(&self, verb: ControlVerb) -> i32 {
        match verb {
            ControlVerb::Start => self.start().code(),
            ControlVerb::Stop => self.stop().code(),
            ControlVerb::Restart => self.restart().code(),
            ControlVerb::TryRestart => self.try_restart().code(),
            ControlVerb::Reload => self.reload().code(),
            ControlVerb::ForceReload => self.force_reload().code(),
            ControlVerb::Status => {
                let status = self.status();
                self.reporter.success(&format!("service is {status}"));
                status.code()
            }
        }
    }

    /// Starts the service unless it is already running.
    ///
    /// Only the launcher returns from this call; the detached branch enters
    /// the workload and exits with it.
    pub fn start(&self) -> ExitCode {
        self.reporter
            .action(&format!("Starting {} service.", self.opts.name));

        let (_, status) = self
            .pidfile
            .resolve(Expectation::Stopped, self.reporter.as_ref());
        if !matches!(
            status,
            ServiceStatus::Stopped | ServiceStatus::StoppedWithPidfile
        ) {
            return ExitCode::NoAction;
        }

        let channel = match spawn_detached(&self.pidfile, &self.workload) {
            Ok(channel) => channel,
            Err(err) => {
                self.reporter.status(false);
                self.reporter.failure(&err.to_string());
                return ExitCode::Failure;
            }
        };

        match channel.wait(self.opts.startup_timeout) {
            Ok(Outcome::Success) => {
                self.reporter.status(true);
                ExitCode::Success
            }
            Ok(Outcome::Failure) => {
                self.reporter.status(false);
                ExitCode::Failure
            }
            Err(err @ (ChannelError::TimedOut | ChannelError::Closed)) => {
                self.reporter.status(false);
                self.reporter.failure(&format!("{err}."));
                ExitCode::Failure
            }
            Err(err) => {
                self.reporter.status(false);
                self.reporter
                    .failure(&format!("Error reading from startup channel: {err}"));
                ExitCode::Failure
            }
        }
    }

    /// Stops the running service, escalating to SIGKILL if it will not die.
    pub fn stop(&self) -> ExitCode {
        self.reporter
            .action(&format!("Stopping {} service.", self.opts.name));

        let (pid, status) = self
            .pidfile
            .resolve(Expectation::Running, self.reporter.as_ref());
        let Some(pid) = pid else {
            return match status {
                // An unreadable record leaves no process to signal, which is
                // a failed stop rather than a no-op.
                ServiceStatus::Unknown => {
                    self.reporter.failure("Cannot stop: PID file is unreadable.");
                    ExitCode::Failure
                }
                _ => ExitCode::NoAction,
            };
        };

        match terminate(pid, &self.opts.stop) {
            Ok(method) => {
                // The record mutation must be settled before the status
                // suffix that reports on it.
                let cleared = self.pidfile.clear();
                self.reporter.status(true);
                if let Err(err) = cleared {
                    self.reporter
                        .warning(&format!("Failed to remove PID file: {err}"));
                }
                if method == StopMethod::Forced {
                    self.reporter.warning("Service terminated via SIGKILL.");
                }
                ExitCode::Success
            }
            Err(err) => {
                self.reporter.status(false);
                self.reporter
                    .failure(&format!("Unable to stop service: {err}"));
                ExitCode::Failure
            }
        }
    }

    /// Stops then starts. A failed stop short-circuits; the controller never
    /// starts on top of an instance it could not remove.
    pub fn restart(&self) -> ExitCode {
        match self.stop() {
            ExitCode::Success | ExitCode::NoAction => self.start(),
            ExitCode::Failure => ExitCode::Failure,
        }
    }

    /// Restarts only if the service is currently running.
    pub fn try_restart(&self) -> ExitCode {
        let (_, status) = self
            .pidfile
            .resolve(Expectation::None, self.reporter.as_ref());
        if status == ServiceStatus::Running {
            self.restart()
        } else {
            ExitCode::NoAction
        }
    }

    /// Re-applies configuration. Defaults to a full restart; a workload with
    /// a cheaper reload path wraps the controller rather than the controller
    /// special-casing it.
    pub fn reload(&self) -> ExitCode {
        self.restart()
    }

    /// Unconditional reload.
    pub fn force_reload(&self) -> ExitCode {
        self.restart()
    }

    /// Current state of the service, derived from the PID record.
    pub fn status(&self) -> ServiceStatus {
        let (_, status) = self
            .pidfile
            .resolve(Expectation::None, self.reporter.as_ref());
        status
    }
}
