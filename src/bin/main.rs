use std::{fs::OpenOptions, path::PathBuf, process, sync::Arc, time::Duration};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use initd::{
    dns::{DnsConfig, DnsSync},
    service::{ControlVerb, Service, ServiceOptions},
};

/// Command-line interface for the DNS synchroniser service.
#[derive(Parser)]
#[command(name = "dnsyncd", version, author)]
#[command(
    about = "Keeps a Route 53 A record pointed at this host's public IP",
    long_about = None
)]
struct Cli {
    /// Control verb to run.
    #[arg(value_enum)]
    verb: ControlVerb,

    /// Fully qualified record name, including the trailing dot.
    #[arg(long)]
    domain: String,

    /// Route 53 hosted-zone ID.
    #[arg(long = "zone-id")]
    zone_id: String,

    /// Path of the PID file.
    #[arg(long, default_value = "/var/run/dnsyncd.pid")]
    pidfile: PathBuf,

    /// Path of the daemon log file.
    #[arg(long = "log-file", default_value = "/var/log/dnsyncd.log")]
    log_file: PathBuf,

    /// Endpoint that echoes back the caller's public address.
    #[arg(long = "ip-url", default_value = "http://ip.42.pl/raw")]
    ip_url: String,

    /// Seconds between steady-state record checks.
    #[arg(long = "check-interval", default_value = "300")]
    check_interval: u64,

    /// Seconds between initialisation retries.
    #[arg(long = "retry-interval", default_value = "10")]
    retry_interval: u64,

    /// Seconds the launcher waits for the startup report.
    #[arg(long = "startup-timeout", default_value = "10")]
    startup_timeout: u64,
}

fn main() {
    let args = Cli::parse();
    init_logging(&args);

    if !args.domain.ends_with('.') {
        eprintln!("Value for --domain must end with '.'");
        process::exit(2);
    }

    let mut config = DnsConfig::new(&args.domain, &args.zone_id);
    config.ip_url = args.ip_url.clone();
    config.check_interval = Duration::from_secs(args.check_interval);
    config.retry_interval = Duration::from_secs(args.retry_interval);

    let workload = match DnsSync::new(config) {
        Ok(workload) => Arc::new(workload),
        Err(err) => {
            eprintln!("Failed to initialise HTTP client: {err}");
            process::exit(2);
        }
    };

    let mut opts = ServiceOptions::new("dnsyncd", &args.pidfile);
    opts.startup_timeout = Duration::from_secs(args.startup_timeout);

    let service = Service::new(opts, workload);
    process::exit(service.dispatch(args.verb));
}

/// Routes `tracing` output to the daemon log file.
///
/// The file is opened before any fork so the detached process inherits a
/// usable descriptor after its standard streams are closed. When the file
/// cannot be opened the daemon simply runs unlogged; the console status
/// protocol is unaffected.
fn init_logging(args: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)
    {
        Ok(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .try_init();
        }
        Err(err) => {
            eprintln!("Failed to open log file {:?}: {err}", args.log_file);
        }
    }
}
