//! A dummy service used to exercise the framework end to end. It appends
//! heartbeat lines to a data file while running and marks its own
//! termination, so tests can observe every lifecycle transition from the
//! outside.
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::PathBuf,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use clap::Parser;

use initd::{
    channel::StartupReporter,
    service::{ControlVerb, Service, ServiceOptions, Workload},
};

#[derive(Parser)]
#[command(name = "dummyd")]
#[command(about = "Dummy service for exercising the service framework", long_about = None)]
struct Cli {
    /// Control verb to run.
    #[arg(value_enum)]
    verb: ControlVerb,

    /// Directory holding the PID file and data file.
    #[arg(long)]
    dir: PathBuf,

    /// Report startup failure instead of entering the heartbeat loop.
    #[arg(long)]
    fail: bool,

    /// Never report a startup outcome.
    #[arg(long)]
    hang: bool,

    /// Seconds the launcher waits for the startup report.
    #[arg(long = "startup-timeout", default_value = "10")]
    startup_timeout: u64,
}

struct DummyWorkload {
    data_path: PathBuf,
    fail: bool,
    hang: bool,
    data: Mutex<Option<File>>,
}

impl DummyWorkload {
    fn write_line(&self, line: &str) {
        if let Ok(mut guard) = self.data.lock()
            && let Some(file) = guard.as_mut()
        {
            let _ = writeln!(file, "{line}");
            let _ = file.flush();
        }
    }
}

impl Workload for DummyWorkload {
    fn run(&self, startup: StartupReporter) {
        if self.fail {
            startup.failure();
            return;
        }
        if self.hang {
            // Keep the reporter open without ever writing so the launcher's
            // wait genuinely times out instead of observing a closed pipe.
            let _startup = startup;
            loop {
                thread::sleep(Duration::from_secs(3600));
            }
        }

        let file = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.data_path)
        {
            Ok(file) => file,
            Err(_) => {
                startup.failure();
                return;
            }
        };

        if let Ok(mut guard) = self.data.lock() {
            *guard = Some(file);
        }
        startup.success();

        loop {
            self.write_line("beat");
            thread::sleep(Duration::from_millis(100));
        }
    }

    fn terminate(&self) {
        self.write_line("terminated");
    }
}

fn main() {
    let args = Cli::parse();

    let workload = Arc::new(DummyWorkload {
        data_path: args.dir.join("dummy.dat"),
        fail: args.fail,
        hang: args.hang,
        data: Mutex::new(None),
    });

    let mut opts = ServiceOptions::new("dummyd", args.dir.join("dummy.pid"));
    opts.startup_timeout = Duration::from_secs(args.startup_timeout);

    let service = Service::new(opts, workload);
    std::process::exit(service.dispatch(args.verb));
}
