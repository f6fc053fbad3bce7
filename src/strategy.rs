use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;
use prettytable::row;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::str::FromStr;
use tracing::debug;
use tracing::warn;

use crate::GatewayResult;
use crate::InterfaceResult;
use crate::command::CommandRunner;
use crate::command::RawOutput;
use crate::command::SourceCommand;
use crate::command::SystemRunner;
use crate::config::DiscoveryConfig;
use crate::error::GatewayError;
use crate::interface::InterfaceLookup;
use crate::interface::SystemInterfaces;
use crate::interface::route_interface_ipv4;
use crate::route::RouteParser;
use crate::route::RouteRecord;
use crate::route::bsd;
use crate::route::linux;
use crate::route::solaris;
use crate::route::windows;

/// Platform families that share one way of reading the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformFamily {
    Windows,
    Linux,
    Android,
    Darwin,
    Bsd, // freebsd, netbsd, openbsd, dragonfly
    Solaris, // solaris and illumos
    Unsupported,
}

impl PlatformFamily {
    pub fn current() -> PlatformFamily {
        PlatformFamily::from_os(std::env::consts::OS)
    }
    /// Map a `std::env::consts::OS` value onto its family.
    pub fn from_os(os: &str) -> PlatformFamily {
        match os {
            "windows" => PlatformFamily::Windows,
            "linux" => PlatformFamily::Linux,
            "android" => PlatformFamily::Android,
            "macos" | "ios" => PlatformFamily::Darwin,
            "freebsd" | "netbsd" | "openbsd" | "dragonfly" => PlatformFamily::Bsd,
            "solaris" | "illumos" => PlatformFamily::Solaris,
            _ => PlatformFamily::Unsupported,
        }
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PlatformFamily::Windows => "windows",
            PlatformFamily::Linux => "linux",
            PlatformFamily::Android => "android",
            PlatformFamily::Darwin => "darwin",
            PlatformFamily::Bsd => "bsd",
            PlatformFamily::Solaris => "solaris",
            PlatformFamily::Unsupported => "unsupported",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for PlatformFamily {
    type Err = String;
    fn from_str(s: &str) -> Result<PlatformFamily, String> {
        let s = s.to_lowercase();
        match s.as_str() {
            "darwin" => Ok(PlatformFamily::Darwin),
            "bsd" => Ok(PlatformFamily::Bsd),
            "unsupported" => Ok(PlatformFamily::Unsupported),
            _ => match PlatformFamily::from_os(&s) {
                PlatformFamily::Unsupported => Err(format!("unknown platform [{}]", s)),
                p => Ok(p),
            },
        }
    }
}

/// What a non-zero exit status means for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Any failure status fails the source.
    Strict,
    /// Failure status is expected, the output still counts if there is any.
    AllowFailureWithOutput,
}

/// One data source of a strategy chain: where the table comes from and how
/// to read it.
#[derive(Debug, Clone)]
pub struct RouteSource {
    pub name: &'static str,
    pub command: SourceCommand,
    pub parser: RouteParser,
    pub exit: ExitPolicy,
}

impl RouteSource {
    pub fn new(name: &'static str, command: SourceCommand, parser: RouteParser) -> RouteSource {
        RouteSource {
            name,
            command,
            parser,
            exit: ExitPolicy::Strict,
        }
    }
    pub fn with_exit_policy(mut self, exit: ExitPolicy) -> RouteSource {
        self.exit = exit;
        self
    }
    /// Check the exit status, then parse.
    pub fn parse(&self, output: &RawOutput) -> Result<RouteRecord, GatewayError> {
        let tolerated = match self.exit {
            ExitPolicy::Strict => output.success,
            ExitPolicy::AllowFailureWithOutput => output.success || !output.stdout.is_empty(),
        };
        if !tolerated {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GatewayError::CommandFailed {
                command: self.command.to_string(),
                code: output.code,
                stderr,
            });
        }
        (self.parser)(&output.stdout)
    }
}

/// The ordered sources one platform family tries.
#[derive(Debug, Clone)]
pub struct Strategy {
    pub platform: PlatformFamily,
    pub sources: Vec<RouteSource>,
}

impl Strategy {
    pub fn new(platform: PlatformFamily, sources: Vec<RouteSource>) -> Strategy {
        Strategy { platform, sources }
    }
    pub fn for_platform(platform: PlatformFamily, config: &DiscoveryConfig) -> Strategy {
        let route_get = || {
            RouteSource::new(
                "route get",
                SourceCommand::exec("/sbin/route", &["-n", "get", "0.0.0.0"]),
                bsd::parse_darwin_route_get,
            )
        };
        let bsd_netstat = || {
            RouteSource::new(
                "netstat",
                SourceCommand::exec("netstat", &["-rn"]),
                bsd::parse_bsd_netstat,
            )
        };
        let sources = match platform {
            PlatformFamily::Windows => vec![RouteSource::new(
                "route print",
                SourceCommand::exec("route", &["print", "0.0.0.0"]),
                windows::parse_windows_route,
            )],
            PlatformFamily::Linux => vec![
                RouteSource::new(
                    "proc route",
                    SourceCommand::read_file("/proc/net/route"),
                    linux::parse_linux_proc_route,
                ),
                RouteSource::new(
                    "route",
                    SourceCommand::exec("route", &["-n"]),
                    linux::parse_linux_route,
                ),
                RouteSource::new(
                    "ip route",
                    SourceCommand::exec("ip", &["route", "show"]),
                    linux::parse_linux_ip_route,
                ),
            ],
            // some android builds have no default route in the table, or
            // several 0.0.0.0 routes with the same metric
            PlatformFamily::Android => {
                let mut sources = vec![
                    RouteSource::new(
                        "route",
                        SourceCommand::exec("/system/bin/route", &["-n"]),
                        linux::parse_linux_route,
                    ),
                    RouteSource::new(
                        "ip route",
                        SourceCommand::exec("/system/bin/ip", &["route", "show"]),
                        linux::parse_linux_ip_route,
                    ),
                ];
                #[cfg(feature = "ping")]
                sources.push(ping_source(config.ping_target));
                sources
            }
            PlatformFamily::Darwin => vec![route_get(), bsd_netstat()],
            PlatformFamily::Bsd => vec![bsd_netstat(), route_get()],
            PlatformFamily::Solaris => vec![RouteSource::new(
                "netstat",
                SourceCommand::exec("netstat", &["-rn"]),
                solaris::parse_solaris_netstat,
            )],
            PlatformFamily::Unsupported => Vec::new(),
        };
        #[cfg(not(feature = "ping"))]
        let _ = config;
        Strategy { platform, sources }
    }
}

/// A one hop ping, the router answering "time to live exceeded" is the
/// gateway. An unanswered probe can take a second.
#[cfg(feature = "ping")]
fn ping_source(target: Ipv4Addr) -> RouteSource {
    let target = target.to_string();
    RouteSource::new(
        "ping",
        SourceCommand::exec(
            "/system/bin/ping",
            &["-n", "-c", "1", "-t", "1", "-W", "1", &target],
        ),
        linux::parse_linux_ping,
    )
    .with_exit_policy(ExitPolicy::AllowFailureWithOutput)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    NotStarted,
    Trying(usize),
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    Found(String),
    Failed(String),
}

/// One step of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub source: String,
    pub command: String,
    pub outcome: AttemptOutcome,
}

/// Every source a dispatch tried, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub platform: PlatformFamily,
    pub attempts: Vec<Attempt>,
}

impl DiscoveryReport {
    pub fn new(platform: PlatformFamily) -> DiscoveryReport {
        DiscoveryReport {
            platform,
            attempts: Vec::new(),
        }
    }
}

impl fmt::Display for DiscoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut table = Table::new();
        let title = format!("Gateway Discovery ({})", self.platform);
        table.add_row(Row::new(vec![Cell::new(&title).style_spec("c").with_hspan(4)]));
        table.add_row(row![c -> "#", c -> "source", c -> "command", c -> "result"]);
        for (i, a) in self.attempts.iter().enumerate() {
            let number_str = format!("#{}", i + 1);
            let result_str = match &a.outcome {
                AttemptOutcome::Found(s) => s.clone(),
                AttemptOutcome::Failed(e) => format!("failed: {}", e),
            };
            table.add_row(row![c -> number_str, c -> a.source, a.command, result_str]);
        }
        write!(f, "{}", table)
    }
}

/// Walks a strategy chain until one source yields a usable answer.
pub struct Dispatcher {
    strategy: Strategy,
    runner: Box<dyn CommandRunner>,
    lookup: Box<dyn InterfaceLookup>,
}

impl Dispatcher {
    /// Dispatcher for the configured (or running) platform, backed by the
    /// real commands and interfaces of this host.
    pub fn new(config: &DiscoveryConfig) -> Dispatcher {
        let strategy = Strategy::for_platform(config.platform(), config);
        Dispatcher::with_parts(strategy, SystemRunner::new(config.timeout), SystemInterfaces)
    }
    pub fn with_parts(
        strategy: Strategy,
        runner: impl CommandRunner + 'static,
        lookup: impl InterfaceLookup + 'static,
    ) -> Dispatcher {
        Dispatcher {
            strategy,
            runner: Box::new(runner),
            lookup: Box::new(lookup),
        }
    }
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }
    fn attempt<T>(
        &self,
        source: &RouteSource,
        extract: &dyn Fn(&RouteRecord) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let output = self.runner.run(&source.command)?;
        let record = source.parse(&output)?;
        extract(&record)
    }
    fn dispatch<T: fmt::Display>(
        &self,
        extract: &dyn Fn(&RouteRecord) -> Result<T, GatewayError>,
        report: &mut DiscoveryReport,
    ) -> Result<T, GatewayError> {
        let mut state = DispatchState::NotStarted;
        debug!("dispatch {} state: {:?}", self.strategy.platform, state);
        let mut last_error = None;
        for (i, source) in self.strategy.sources.iter().enumerate() {
            state = DispatchState::Trying(i);
            debug!("dispatch state: {:?}, source [{}]", state, source.name);
            let attempt = |outcome| Attempt {
                source: source.name.to_string(),
                command: source.command.to_string(),
                outcome,
            };
            match self.attempt(source, extract) {
                Ok(value) => {
                    state = DispatchState::Succeeded;
                    debug!("dispatch state: {:?}, [{}] gave {}", state, source.name, value);
                    report.attempts.push(attempt(AttemptOutcome::Found(value.to_string())));
                    return Ok(value);
                }
                Err(e) => {
                    warn!("route source [{}] failed: {}", source.name, e);
                    report.attempts.push(attempt(AttemptOutcome::Failed(e.to_string())));
                    last_error = Some(e);
                }
            }
        }
        state = DispatchState::Failed;
        debug!("dispatch state: {:?}", state);
        match last_error {
            Some(e) => Err(e),
            None => Err(GatewayError::NotImplemented {
                platform: self.strategy.platform.to_string(),
            }),
        }
    }
    pub fn discover_gateway_with_report(
        &self,
    ) -> (Result<GatewayResult, GatewayError>, DiscoveryReport) {
        let mut report = DiscoveryReport::new(self.strategy.platform);
        let extract = |r: &RouteRecord| -> Result<IpAddr, GatewayError> { r.gateway_ip() };
        let result = self.dispatch(&extract, &mut report);
        (result.map(|ip| GatewayResult { ip }), report)
    }
    pub fn discover_gateway(&self) -> Result<GatewayResult, GatewayError> {
        self.discover_gateway_with_report().0
    }
    pub fn discover_interface_address_with_report(
        &self,
    ) -> (Result<InterfaceResult, GatewayError>, DiscoveryReport) {
        let mut report = DiscoveryReport::new(self.strategy.platform);
        let lookup = self.lookup.as_ref();
        let extract = |r: &RouteRecord| -> Result<Ipv4Addr, GatewayError> {
            route_interface_ipv4(r, lookup)
        };
        let result = self.dispatch(&extract, &mut report);
        (result.map(|ip| InterfaceResult { ip }), report)
    }
    pub fn discover_interface_address(&self) -> Result<InterfaceResult, GatewayError> {
        self.discover_interface_address_with_report().0
    }
}
