#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("lib.md")]
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::net::Ipv4Addr;

pub mod command;
pub mod config;
pub mod error;
pub mod interface;
pub mod route;
pub mod strategy;
pub mod utils;

pub use command::CommandRunner;
pub use command::RawOutput;
pub use command::SourceCommand;
pub use command::SystemRunner;
pub use config::DiscoveryConfig;
pub use error::GatewayError;
pub use interface::InterfaceLookup;
pub use interface::StaticInterfaces;
pub use interface::SystemInterfaces;
pub use route::RouteIface;
pub use route::RouteRecord;
pub use strategy::DiscoveryReport;
pub use strategy::Dispatcher;
pub use strategy::PlatformFamily;
pub use strategy::Strategy;

/// The next hop of the default route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResult {
    pub ip: IpAddr,
}

impl fmt::Display for GatewayResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "gateway {}", self.ip)
    }
}

/// The local ipv4 address of the interface carrying the default route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceResult {
    pub ip: Ipv4Addr,
}

impl fmt::Display for InterfaceResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "interface {}", self.ip)
    }
}

/// Gateway of the default route on the running platform.
///
/// ```rust,no_run
/// let gateway = gateway::discover_gateway().unwrap();
/// println!("{}", gateway.ip);
/// ```
pub fn discover_gateway() -> Result<GatewayResult, GatewayError> {
    Dispatcher::new(&DiscoveryConfig::default()).discover_gateway()
}

/// Local ipv4 address of the interface that holds the default route.
pub fn discover_gateway_interface_address() -> Result<InterfaceResult, GatewayError> {
    Dispatcher::new(&DiscoveryConfig::default()).discover_interface_address()
}

/// Shorthand for [`discover_gateway`] returning the bare address.
pub fn get() -> Result<IpAddr, GatewayError> {
    Ok(discover_gateway()?.ip)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_result_display() {
        let g = GatewayResult {
            ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)),
        };
        assert_eq!(g.to_string(), "gateway 192.168.1.1");
        let i = InterfaceResult {
            ip: Ipv4Addr::new(192, 168, 1, 10),
        };
        assert_eq!(i.to_string(), "interface 192.168.1.10");
        let json = serde_json::to_string(&g).unwrap();
        assert_eq!(json, r#"{"ip":"192.168.1.1"}"#);
    }
}
