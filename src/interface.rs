use pnet::datalink::NetworkInterface;
use pnet::datalink::interfaces;
use pnet::ipnetwork::IpNetwork;
use std::collections::HashMap;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use tracing::debug;

use crate::error::GatewayError;
use crate::route::RouteIface;
use crate::route::RouteRecord;

/// Interface enumeration seen by the resolver.
///
/// Implementations are shared between discovery calls and must not mutate
/// anything while answering.
pub trait InterfaceLookup: Send + Sync {
    fn interface_by_name(&self, name: &str) -> Result<NetworkInterface, GatewayError>;
    fn addrs(&self, iface: &NetworkInterface) -> Result<Vec<IpNetwork>, GatewayError>;
}

/// The interfaces of this host, through pnet.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceLookup for SystemInterfaces {
    fn interface_by_name(&self, name: &str) -> Result<NetworkInterface, GatewayError> {
        for interface in interfaces() {
            if interface.name == name {
                return Ok(interface);
            }
        }
        Err(GatewayError::InterfaceLookupFailed {
            iface: name.to_string(),
            reason: String::from("no such interface"),
        })
    }
    fn addrs(&self, iface: &NetworkInterface) -> Result<Vec<IpNetwork>, GatewayError> {
        Ok(iface.ips.clone())
    }
}

/// A fixed interface table, for hosts where the caller already knows the
/// interfaces and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticInterfaces {
    interfaces: HashMap<String, NetworkInterface>,
}

impl StaticInterfaces {
    pub fn new() -> StaticInterfaces {
        StaticInterfaces {
            interfaces: HashMap::new(),
        }
    }
    pub fn with_interface(mut self, name: &str, ips: Vec<IpNetwork>) -> StaticInterfaces {
        let index = self.interfaces.len() as u32 + 1;
        let interface = NetworkInterface {
            name: name.to_string(),
            description: String::new(),
            index,
            mac: None,
            ips,
            flags: 0,
        };
        self.interfaces.insert(name.to_string(), interface);
        self
    }
}

impl InterfaceLookup for StaticInterfaces {
    fn interface_by_name(&self, name: &str) -> Result<NetworkInterface, GatewayError> {
        match self.interfaces.get(name) {
            Some(i) => Ok(i.clone()),
            None => Err(GatewayError::InterfaceLookupFailed {
                iface: name.to_string(),
                reason: String::from("not in the interface table"),
            }),
        }
    }
    fn addrs(&self, iface: &NetworkInterface) -> Result<Vec<IpNetwork>, GatewayError> {
        Ok(iface.ips.clone())
    }
}

/// First ipv4 address bound to the interface `name`.
/// IPv6 addresses, link-local ones included, are skipped.
pub fn interface_ipv4(name: &str, lookup: &dyn InterfaceLookup) -> Result<Ipv4Addr, GatewayError> {
    let iface = lookup.interface_by_name(name)?;
    for ipnetwork in lookup.addrs(&iface)? {
        match ipnetwork.ip() {
            IpAddr::V4(ipv4) => {
                debug!("interface {} has ipv4 {}", name, ipv4);
                return Ok(ipv4);
            }
            IpAddr::V6(ipv6) => debug!("interface {} skip ipv6 {}", name, ipv6),
        }
    }
    Err(GatewayError::NoIpv4Address {
        iface: name.to_string(),
    })
}

/// Local ipv4 address of the interface that carries `record`.
pub fn route_interface_ipv4(
    record: &RouteRecord,
    lookup: &dyn InterfaceLookup,
) -> Result<Ipv4Addr, GatewayError> {
    match &record.interface {
        Some(RouteIface::Name(name)) => interface_ipv4(name, lookup),
        Some(RouteIface::Addr(addr)) => match addr.parse() {
            Ok(ip) => Ok(ip),
            Err(_) => Err(GatewayError::cant_parse("interface", addr)),
        },
        None => Err(GatewayError::MissingInterface),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet::ipnetwork::Ipv4Network;
    use pnet::ipnetwork::Ipv6Network;

    fn lookup() -> StaticInterfaces {
        let link_local = IpNetwork::V6(Ipv6Network::new("fe80::42:66ff:fe89:8a6b".parse().unwrap(), 64).unwrap());
        let v4 = IpNetwork::V4(Ipv4Network::new(Ipv4Addr::new(192, 168, 2, 1), 24).unwrap());
        StaticInterfaces::new()
            .with_interface("wlp4s0", vec![link_local, v4])
            .with_interface("utun3", vec![link_local])
    }

    #[test]
    fn test_interface_ipv4() {
        let ip = interface_ipv4("wlp4s0", &lookup()).unwrap();
        assert_eq!(ip, Ipv4Addr::new(192, 168, 2, 1));
    }
    #[test]
    fn test_interface_errors() {
        let err = interface_ipv4("eth9", &lookup()).unwrap_err();
        assert!(matches!(err, GatewayError::InterfaceLookupFailed { .. }));
        let err = interface_ipv4("utun3", &lookup()).unwrap_err();
        assert!(matches!(err, GatewayError::NoIpv4Address { .. }));
        assert!(err.is_not_found());
    }
    #[test]
    fn test_route_interface() {
        let r = RouteRecord::new("default", "foo").with_interface(RouteIface::Name(String::from("wlp4s0")));
        assert_eq!(route_interface_ipv4(&r, &lookup()).unwrap(), Ipv4Addr::new(192, 168, 2, 1));

        let r = RouteRecord::new("0.0.0.0", "10.88.88.2").with_interface(RouteIface::Addr(String::from("10.88.88.149")));
        assert_eq!(route_interface_ipv4(&r, &lookup()).unwrap(), Ipv4Addr::new(10, 88, 88, 149));

        let r = RouteRecord::new("default", "172.16.32.1");
        let err = route_interface_ipv4(&r, &lookup()).unwrap_err();
        assert!(matches!(err, GatewayError::MissingInterface));
    }
}
