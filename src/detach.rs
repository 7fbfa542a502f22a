//! Detachment of the service process from its launcher and terminal.
use std::{
    fs::OpenOptions,
    io::{self, Write},
    os::fd::AsRawFd,
    process,
    sync::Arc,
};

use nix::{
    sys::stat::{Mode, umask},
    unistd::{ForkResult, chdir, fork, setsid},
};
use tracing::{error, info, warn};

use crate::{
    channel::{StartupChannel, StartupReporter, startup_channel},
    error::DetachError,
    pidfile::PidFile,
    service::Workload,
};

/// Splits off a detached process running `workload`.
///
/// Returns only in the launcher, with the channel the new process reports
/// its startup outcome on. The detached branch resets its permission mask,
/// starts a new session, pins its working directory to `/`, installs the
/// termination handler, persists its PID, closes the inherited standard
/// streams, and enters the workload; it exits when the workload returns and
/// never returns control here.
pub fn spawn_detached(
    pidfile: &PidFile,
    workload: &Arc<dyn Workload>,
) -> Result<StartupChannel, DetachError> {
    // Anything still buffered on the launcher side would otherwise be
    // flushed a second time by the child after the split.
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();

    let (channel, reporter) = startup_channel()?;

    match unsafe { fork() } {
        Ok(ForkResult::Parent { .. }) => {
            // The write end belongs to the child; holding it open here would
            // keep the read end from ever seeing EOF.
            drop(reporter);
            Ok(channel)
        }
        Ok(ForkResult::Child) => {
            drop(channel);
            run_detached(pidfile.clone(), Arc::clone(workload), reporter)
        }
        Err(err) => Err(DetachError::Fork(err)),
    }
}

/// The detached branch of the split.
fn run_detached(pidfile: PidFile, workload: Arc<dyn Workload>, startup: StartupReporter) -> ! {
    umask(Mode::empty());
    if let Err(err) = setsid() {
        warn!("Failed to start a new session: {err}");
    }
    // Pin the working directory so unmounting the launch directory cannot
    // strand the process.
    if let Err(err) = chdir("/") {
        warn!("Failed to change working directory to /: {err}");
    }

    if let Err(err) = install_termination_handler(pidfile.clone(), Arc::clone(&workload)) {
        error!("Failed to install termination handler: {err}");
        startup.failure();
        process::exit(1);
    }

    if let Err(err) = pidfile.persist(process::id()) {
        error!("Failed to write PID file: {err}");
        startup.failure();
        process::exit(1);
    }
    let guard = ClearOnExit {
        pidfile: pidfile.clone(),
    };

    if let Err(err) = redirect_standard_streams() {
        error!("Failed to redirect standard streams: {err}");
        startup.failure();
        drop(guard);
        process::exit(1);
    }

    workload.run(startup);

    info!("Workload returned; shutting down");
    drop(guard);
    process::exit(0);
}

/// Clears the PID record however the workload ends, including panics.
struct ClearOnExit {
    pidfile: PidFile,
}

impl Drop for ClearOnExit {
    fn drop(&mut self) {
        if let Err(err) = self.pidfile.clear() {
            warn!("Failed to remove PID file: {err}");
        }
    }
}

/// Registers the termination-signal handler for this service instance.
///
/// The handler runs on a dedicated thread, so the workload's cleanup is
/// ordinary code rather than async-signal-safe code. The PID record is
/// cleared before the workload's handler runs; the on-exit guarantee must
/// hold even if `terminate` stalls.
fn install_termination_handler(
    pidfile: PidFile,
    workload: Arc<dyn Workload>,
) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        info!("Termination signal received");
        if let Err(err) = pidfile.clear() {
            warn!("Failed to remove PID file: {err}");
        }
        workload.terminate();
        process::exit(0);
    })
}

/// Points the inherited standard streams at `/dev/null`. The detached
/// process must never touch the launcher's terminal again.
fn redirect_standard_streams() -> io::Result<()> {
    let devnull = OpenOptions::new().read(true).write(true).open("/dev/null")?;

    let fd = devnull.as_raw_fd();
    unsafe {
        libc::dup2(fd, libc::STDIN_FILENO);
        libc::dup2(fd, libc::STDOUT_FILENO);
        libc::dup2(fd, libc::STDERR_FILENO);
    }

    Ok(())
}
