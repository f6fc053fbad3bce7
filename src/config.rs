use std::net::Ipv4Addr;
use std::time::Duration;

use crate::strategy::PlatformFamily;

/// How long one route tool may run before it is killed.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
/// a.root-servers.net, probed with ttl 1 when no route table is readable.
pub const DEFAULT_PING_TARGET: Ipv4Addr = Ipv4Addr::new(198, 41, 0, 4);

/// Knobs of one discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub platform: Option<PlatformFamily>, // None means the running platform
    pub timeout: Option<Duration>,        // None waits for commands forever
    pub ping_target: Ipv4Addr,
}

impl Default for DiscoveryConfig {
    fn default() -> DiscoveryConfig {
        DiscoveryConfig {
            platform: None,
            timeout: Some(DEFAULT_COMMAND_TIMEOUT),
            ping_target: DEFAULT_PING_TARGET,
        }
    }
}

impl DiscoveryConfig {
    pub fn new() -> DiscoveryConfig {
        DiscoveryConfig::default()
    }
    pub fn with_platform(mut self, platform: PlatformFamily) -> DiscoveryConfig {
        self.platform = Some(platform);
        self
    }
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> DiscoveryConfig {
        self.timeout = timeout;
        self
    }
    pub fn with_ping_target(mut self, target: Ipv4Addr) -> DiscoveryConfig {
        self.ping_target = target;
        self
    }
    pub fn platform(&self) -> PlatformFamily {
        match self.platform {
            Some(p) => p,
            None => PlatformFamily::current(),
        }
    }
}
