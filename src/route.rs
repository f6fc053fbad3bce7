use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;

use crate::error::GatewayError;
use crate::utils::parse_ip_field;

pub mod bsd;
pub mod linux;
pub mod solaris;
pub mod windows;

/// Turns the raw output of one route tool into the default route row.
pub type RouteParser = fn(&[u8]) -> Result<RouteRecord, GatewayError>;

/// How a route table names the interface of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteIface {
    Name(String), // e.g. eth0, en0
    Addr(String), // windows reports the interface by its address
}

impl fmt::Display for RouteIface {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RouteIface::Name(n) => write!(f, "{}", n),
            RouteIface::Addr(a) => write!(f, "{}", a),
        }
    }
}

/// The default route row picked out of a route table, still as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub destination: String,          // destination column, "default" or 0.0.0.0
    pub gateway: String,              // gateway column as printed
    pub interface: Option<RouteIface>, // not every table carries one
    pub flags: Option<String>,        // route flags, when the table has them
}

impl RouteRecord {
    pub fn new(destination: &str, gateway: &str) -> RouteRecord {
        RouteRecord {
            destination: destination.to_string(),
            gateway: gateway.to_string(),
            interface: None,
            flags: None,
        }
    }
    pub fn with_interface(mut self, interface: RouteIface) -> RouteRecord {
        self.interface = Some(interface);
        self
    }
    pub fn with_flags(mut self, flags: &str) -> RouteRecord {
        self.flags = Some(flags.to_string());
        self
    }
    /// The gateway column as an address, `CantParse` if it is not one.
    pub fn gateway_ip(&self) -> Result<IpAddr, GatewayError> {
        parse_ip_field("gateway", &self.gateway)
    }
}

impl fmt::Display for RouteRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut output = format!("dst: {}, via: {}", self.destination, self.gateway);
        if let Some(i) = &self.interface {
            output += &format!(", dev: {}", i);
        }
        if let Some(flags) = &self.flags {
            output += &format!(", flags: {}", flags);
        }
        write!(f, "{}", output)
    }
}

pub use bsd::parse_bsd_netstat;
pub use bsd::parse_bsd_netstat_gateway;
pub use bsd::parse_darwin_route_get;
pub use bsd::parse_darwin_route_get_gateway;
pub use linux::parse_linux_ip_route;
pub use linux::parse_linux_ip_route_gateway;
#[cfg(feature = "ping")]
pub use linux::parse_linux_ping;
pub use linux::parse_linux_proc_route;
pub use linux::parse_linux_proc_route_gateway;
pub use linux::parse_linux_route;
pub use linux::parse_linux_route_gateway;
pub use solaris::parse_solaris_netstat;
pub use solaris::parse_solaris_netstat_gateway;
pub use windows::parse_windows_gateway;
pub use windows::parse_windows_interface_ip;
pub use windows::parse_windows_route;
