#[cfg(feature = "ping")]
use regex::Regex;
use std::net::IpAddr;
use tracing::debug;
use tracing::warn;

use crate::error::GatewayError;
use crate::route::RouteIface;
use crate::route::RouteRecord;
use crate::utils::proc_hex_ipv4;
use crate::utils::split_fields;

const PROC_ROUTE_SEP: char = '\t';
const PROC_IFACE_FIELD: usize = 0;
const PROC_DESTINATION_FIELD: usize = 1;
const PROC_GATEWAY_FIELD: usize = 2;
const PROC_FLAGS_FIELD: usize = 3;
const PROC_MASK_FIELD: usize = 7;
// Iface Destination Gateway Flags RefCnt Use Metric Mask MTU Window IRTT
const PROC_MIN_FIELDS: usize = 11;

/// Pick the default route out of `/proc/net/route`.
///
/// ```text
/// Iface   Destination Gateway     Flags   RefCnt  Use Metric  Mask        MTU Window  IRTT
/// eno1    00000000    C900A8C0    0003    0   0   100 00000000    0   0   0
/// eno1    0000A8C0    00000000    0001    0   0   100 00FFFFFF    0   0   0
/// ```
/// The default route is the row whose destination and mask are both zero.
/// A short row anywhere means the file can not be trusted.
pub fn parse_linux_proc_route(output: &[u8]) -> Result<RouteRecord, GatewayError> {
    let output = String::from_utf8_lossy(output);
    // skip header line
    for row in output.lines().skip(1) {
        if row.trim().is_empty() {
            continue;
        }
        let tokens: Vec<&str> = row.split(PROC_ROUTE_SEP).map(|x| x.trim()).collect();
        if tokens.len() < PROC_MIN_FIELDS {
            warn!("proc route row [{}] has only {} fields", row, tokens.len());
            return Err(GatewayError::cant_parse("route row", row));
        }

        let destination = tokens[PROC_DESTINATION_FIELD];
        let mask = tokens[PROC_MASK_FIELD];
        let is_default = |hex: &str, field: &'static str| match proc_hex_ipv4(hex) {
            Some(ip) => Ok(ip.is_unspecified()),
            None => Err(GatewayError::cant_parse(field, hex)),
        };
        if !(is_default(destination, "destination")? && is_default(mask, "mask")?) {
            continue;
        }

        // keep the raw hex when it does not decode, gateway_ip() reports it
        let gateway_hex = tokens[PROC_GATEWAY_FIELD];
        let gateway = match proc_hex_ipv4(gateway_hex) {
            Some(ip) => ip.to_string(),
            None => gateway_hex.to_string(),
        };
        let record = RouteRecord::new(destination, &gateway)
            .with_interface(RouteIface::Name(tokens[PROC_IFACE_FIELD].to_string()))
            .with_flags(tokens[PROC_FLAGS_FIELD]);
        debug!("proc default route: {}", record);
        return Ok(record);
    }
    Err(GatewayError::NoGatewayFound)
}

pub fn parse_linux_proc_route_gateway(output: &[u8]) -> Result<IpAddr, GatewayError> {
    parse_linux_proc_route(output)?.gateway_ip()
}

/// Pick the default route out of `route -n`.
///
/// ```text
/// Kernel IP routing table
/// Destination     Gateway         Genmask         Flags Metric Ref    Use Iface
/// 0.0.0.0         192.168.1.1     0.0.0.0         UG    0      0        0 eth0
/// ```
pub fn parse_linux_route(output: &[u8]) -> Result<RouteRecord, GatewayError> {
    let output = String::from_utf8_lossy(output);
    for line in output.lines() {
        let fields = split_fields(line);
        if fields.first() != Some(&"0.0.0.0") {
            continue;
        }
        if fields.len() < 2 {
            return Err(GatewayError::cant_parse("route row", line));
        }
        let mut record = RouteRecord::new(fields[0], fields[1]);
        if fields.len() >= 4 {
            record = record.with_flags(fields[3]);
        }
        if fields.len() >= 8 {
            let iface = fields[fields.len() - 1];
            record = record.with_interface(RouteIface::Name(iface.to_string()));
        }
        debug!("route -n default route: {}", record);
        return Ok(record);
    }
    Err(GatewayError::NoGatewayFound)
}

pub fn parse_linux_route_gateway(output: &[u8]) -> Result<IpAddr, GatewayError> {
    parse_linux_route(output)?.gateway_ip()
}

/// Pick the default route out of `ip route show`.
///
/// ```text
/// default via 192.168.178.1 dev wlp3s0  metric 303
/// 192.168.178.0/24 dev wlp3s0  proto kernel  scope link  src 192.168.178.76  metric 303
/// ```
pub fn parse_linux_ip_route(output: &[u8]) -> Result<RouteRecord, GatewayError> {
    let output = String::from_utf8_lossy(output);
    for line in output.lines() {
        let fields = split_fields(line);
        if fields.first() != Some(&"default") {
            continue;
        }
        let gateway = match fields.get(2) {
            Some(g) => *g,
            None => return Err(GatewayError::cant_parse("route row", line)),
        };
        let mut record = RouteRecord::new(fields[0], gateway);
        if let Some(i) = fields.iter().position(|f| *f == "dev") {
            if let Some(dev) = fields.get(i + 1) {
                record = record.with_interface(RouteIface::Name(dev.to_string()));
            }
        }
        debug!("ip route default route: {}", record);
        return Ok(record);
    }
    Err(GatewayError::NoGatewayFound)
}

pub fn parse_linux_ip_route_gateway(output: &[u8]) -> Result<IpAddr, GatewayError> {
    parse_linux_ip_route(output)?.gateway_ip()
}

/// Infer the gateway from a one hop ping that ran out of TTL.
///
/// ```text
/// PING 198.41.0.4 (198.41.0.4) 56(84) bytes of data.
/// From 192.168.1.1 icmp_seq=1 Time to live exceeded
/// ```
/// The router that dropped the probe is the first hop, the gateway. Other
/// `From` lines, such as `Destination Host Unreachable`, come from the host
/// itself and are skipped.
#[cfg(feature = "ping")]
pub fn parse_linux_ping(output: &[u8]) -> Result<RouteRecord, GatewayError> {
    let output = String::from_utf8_lossy(output);
    let from_re = Regex::new(r"^\s*From\s+(?P<addr>[^\s:]+):?\s")?;
    let exceeded_re = Regex::new(r"(?i)\btime (to live )?exceeded\b")?;
    for line in output.lines() {
        match from_re.captures(line) {
            Some(_) if !exceeded_re.is_match(line) => {
                debug!("ping reply [{}] is not a ttl exceeded", line.trim());
                continue;
            }
            Some(caps) => {
                let addr = caps.name("addr").map_or("", |m| m.as_str());
                let record = RouteRecord::new("default", addr);
                debug!("ping first hop: {}", record);
                return Ok(record);
            }
            None => continue,
        }
    }
    Err(GatewayError::NoGatewayFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LINUX: &[u8] = include_bytes!("../../tests/linux_proc_route.txt");
    const LINUX_NO_ROUTE: &[u8] = include_bytes!("../../tests/linux_proc_route_no_default.txt");
    const LINUX_ROUTE_N: &[u8] = include_bytes!("../../tests/linux_route_n.txt");
    const LINUX_IP_ROUTE: &[u8] = include_bytes!("../../tests/linux_ip_route.txt");

    #[test]
    fn test_proc_route() {
        let r = parse_linux_proc_route(LINUX).unwrap();
        assert_eq!(r.gateway, "192.168.8.1");
        assert_eq!(r.interface, Some(RouteIface::Name(String::from("wlp4s0"))));
        let ip = parse_linux_proc_route_gateway(LINUX).unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(192, 168, 8, 1)));
    }
    #[test]
    fn test_proc_route_decode() {
        let header = "Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT\n";
        let row = "eth0\t00000000\t0101A8C0\t0003\t0\t0\t0\t00000000\t0\t0\t0\n";
        let table = format!("{}{}", header, row);
        let ip = parse_linux_proc_route_gateway(table.as_bytes()).unwrap();
        assert_eq!(ip.to_string(), "192.168.1.1");

        let row = "eth0\t00000000\t0100000A\t0003\t0\t0\t0\t00000000\t0\t0\t0\n";
        let table = format!("{}{}", header, row);
        let ip = parse_linux_proc_route_gateway(table.as_bytes()).unwrap();
        assert_eq!(ip.to_string(), "10.0.0.1");
    }
    #[test]
    fn test_proc_route_errors() {
        let err = parse_linux_proc_route_gateway(LINUX_NO_ROUTE).unwrap_err();
        assert!(matches!(err, GatewayError::NoGatewayFound));
        let err = parse_linux_proc_route_gateway(b"").unwrap_err();
        assert!(matches!(err, GatewayError::NoGatewayFound));

        // a short row poisons the whole table, even after the default route
        let table = "Iface\tDestination\tGateway\n\
                     eth0\t0000A8C0\t00000000\n\
                     eth0\t00000000\t0101A8C0\t0003\t0\t0\t0\t00000000\t0\t0\t0\n";
        let err = parse_linux_proc_route(table.as_bytes()).unwrap_err();
        assert!(matches!(err, GatewayError::CantParse { .. }));

        let table = "Iface\tDestination\tGateway\tFlags\tRefCnt\tUse\tMetric\tMask\tMTU\tWindow\tIRTT\n\
                     eth0\t00000000\tZZ01A8C0\t0003\t0\t0\t0\t00000000\t0\t0\t0\n";
        let record = parse_linux_proc_route(table.as_bytes()).unwrap();
        assert_eq!(record.interface, Some(RouteIface::Name(String::from("eth0"))));
        let err = record.gateway_ip().unwrap_err();
        assert!(matches!(err, GatewayError::CantParse { .. }));
    }
    #[test]
    fn test_route_n() {
        let r = parse_linux_route(LINUX_ROUTE_N).unwrap();
        assert_eq!(r.gateway, "192.168.1.1");
        assert_eq!(r.flags.as_deref(), Some("UG"));
        assert_eq!(r.interface, Some(RouteIface::Name(String::from("wlp3s0"))));

        let err = parse_linux_route_gateway(b"").unwrap_err();
        assert!(matches!(err, GatewayError::NoGatewayFound));
        let bad = b"0.0.0.0         *               0.0.0.0         U     0      0        0 ppp0\n";
        let err = parse_linux_route_gateway(bad).unwrap_err();
        assert!(matches!(err, GatewayError::CantParse { .. }));
    }
    #[test]
    fn test_ip_route() {
        let r = parse_linux_ip_route(LINUX_IP_ROUTE).unwrap();
        assert_eq!(r.gateway, "192.168.178.1");
        assert_eq!(r.interface, Some(RouteIface::Name(String::from("wlp3s0"))));

        let err = parse_linux_ip_route_gateway(b"10.0.0.0/8 dev eth0 scope link\n").unwrap_err();
        assert!(matches!(err, GatewayError::NoGatewayFound));
        let err = parse_linux_ip_route_gateway(b"default dev rmnet0 scope link\n").unwrap_err();
        assert!(matches!(err, GatewayError::CantParse { .. }));
    }
    #[cfg(feature = "ping")]
    #[test]
    fn test_ping() {
        let output = b"PING 198.41.0.4 (198.41.0.4) 56(84) bytes of data.\n\
                       From 192.168.1.1 icmp_seq=1 Time to live exceeded\n\
                       \n\
                       --- 198.41.0.4 ping statistics ---\n\
                       1 packets transmitted, 0 received, +1 errors, 100% packet loss, time 0ms\n";
        let r = parse_linux_ping(output).unwrap();
        assert_eq!(r.gateway_ip().unwrap().to_string(), "192.168.1.1");

        let toybox = b"From 10.0.0.1: icmp_seq=1 Time to live exceeded\n";
        let r = parse_linux_ping(toybox).unwrap();
        assert_eq!(r.gateway, "10.0.0.1");

        let exceeded = b"From 10.0.0.1 icmp_seq=1 Time exceeded: Hop limit\n";
        let r = parse_linux_ping(exceeded).unwrap();
        assert_eq!(r.gateway, "10.0.0.1");

        // the next hop never answered arp, the host reports itself
        let unreachable = b"PING 198.41.0.4 (198.41.0.4) 56(84) bytes of data.\n\
                            From 192.168.1.10 icmp_seq=1 Destination Host Unreachable\n";
        let err = parse_linux_ping(unreachable).unwrap_err();
        assert!(matches!(err, GatewayError::NoGatewayFound));

        let silent = b"PING 198.41.0.4 (198.41.0.4) 56(84) bytes of data.\n";
        let err = parse_linux_ping(silent).unwrap_err();
        assert!(matches!(err, GatewayError::NoGatewayFound));
    }
}
