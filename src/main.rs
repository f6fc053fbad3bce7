use clap::ArgAction;
use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use gateway::DiscoveryConfig;
use gateway::DiscoveryReport;
use gateway::Dispatcher;
use gateway::GatewayError;
use gateway::PlatformFamily;

/// Find the default gateway, or the local address of its interface.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Print the ipv4 address of the default route's interface instead
    #[arg(short, long)]
    interface: bool,

    /// Read the route table the way this platform family does (linux, android, darwin, bsd, solaris, windows)
    #[arg(short, long)]
    platform: Option<PlatformFamily>,

    /// Seconds one route tool may run, 0 waits forever
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,

    /// Print the result as json
    #[arg(long)]
    json: bool,

    /// Print every source that was tried
    #[arg(long)]
    trace: bool,

    /// Log more, repeat for debug output
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn print_result<T: Serialize>(
    value: &T,
    ip: &str,
    json: bool,
) -> Result<(), GatewayError> {
    if json {
        println!("{}", serde_json::to_string(value)?);
    } else {
        println!("{}", ip);
    }
    Ok(())
}

fn run(args: &Args) -> Result<(), GatewayError> {
    let timeout = match args.timeout {
        0 => None,
        t => Some(Duration::from_secs(t)),
    };
    let mut config = DiscoveryConfig::new().with_timeout(timeout);
    if let Some(p) = args.platform {
        config = config.with_platform(p);
    }
    let dispatcher = Dispatcher::new(&config);

    let show_report = |report: &DiscoveryReport| {
        if args.trace {
            eprintln!("{}", report);
        }
    };
    if args.interface {
        let (result, report) = dispatcher.discover_interface_address_with_report();
        show_report(&report);
        let r = result?;
        print_result(&r, &r.ip.to_string(), args.json)
    } else {
        let (result, report) = dispatcher.discover_gateway_with_report();
        show_report(&report);
        let r = result?;
        print_result(&r, &r.ip.to_string(), args.json)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    match run(&args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gateway: {}", e);
            ExitCode::FAILURE
        }
    }
}
