use std::net::IpAddr;
use tracing::debug;

use crate::error::GatewayError;
use crate::route::RouteIface;
use crate::route::RouteRecord;
use crate::utils::TableLayout;
use crate::utils::split_fields;

/// Pick the default route out of solaris or illumos `netstat -rn`.
///
/// ```text
/// Routing Table: IPv4
///   Destination           Gateway           Flags  Ref     Use     Interface
/// -------------------- -------------------- ----- ----- ---------- ---------
/// default              172.16.32.1          UG        2      76284 net0
/// 127.0.0.1            127.0.0.1            UH        2         24 lo0
/// ```
/// The column count differs between releases, so the gateway offset is read
/// from the header row. Flags are not checked here.
pub fn parse_solaris_netstat(output: &[u8]) -> Result<RouteRecord, GatewayError> {
    let output = String::from_utf8_lossy(output);
    let mut layout: Option<TableLayout> = None;
    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("Routing Table:") && trimmed.contains("IPv6") {
            break;
        }
        let fields = split_fields(trimmed);
        if let Some(l) = TableLayout::from_header(&fields) {
            debug!("solaris netstat layout: {:?}", l);
            layout = Some(l);
            continue;
        }
        if fields.first() != Some(&"default") {
            continue;
        }
        let layout = match layout {
            Some(l) => l,
            None => {
                debug!("solaris default route [{}] before any header row", trimmed);
                return Err(GatewayError::cant_parse("route row", trimmed));
            }
        };

        let gateway = match fields.get(layout.gateway) {
            Some(g) => *g,
            None => return Err(GatewayError::cant_parse("route row", trimmed)),
        };
        let mut record = RouteRecord::new(fields[0], gateway);
        if let Some(f) = layout.flags.and_then(|i| fields.get(i)) {
            record = record.with_flags(f);
        }
        if let Some(iface) = layout.iface.and_then(|i| fields.get(i)) {
            record = record.with_interface(RouteIface::Name(iface.to_string()));
        }
        debug!("solaris default route: {}", record);
        return Ok(record);
    }
    Err(GatewayError::NoGatewayFound)
}

pub fn parse_solaris_netstat_gateway(output: &[u8]) -> Result<IpAddr, GatewayError> {
    parse_solaris_netstat(output)?.gateway_ip()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLARIS: &[u8] = include_bytes!("../../tests/solaris_netstat.txt");
    const ILLUMOS: &[u8] = include_bytes!("../../tests/illumos_netstat.txt");
    const SOLARIS_VERBOSE: &[u8] = include_bytes!("../../tests/solaris_netstat_verbose.txt");
    const SOLARIS_NO_ROUTE: &[u8] = include_bytes!("../../tests/solaris_netstat_no_route.txt");
    const SOLARIS_BAD_ROUTE: &[u8] = include_bytes!("../../tests/solaris_netstat_bad_route.txt");

    #[test]
    fn test_solaris() {
        let r = parse_solaris_netstat(SOLARIS).unwrap();
        assert_eq!(r.gateway_ip().unwrap().to_string(), "172.16.32.1");
        assert_eq!(r.interface, Some(RouteIface::Name(String::from("net0"))));
        assert_eq!(r.flags.as_deref(), Some("UG"));
    }
    #[test]
    fn test_illumos() {
        // the default row has no interface column
        let r = parse_solaris_netstat(ILLUMOS).unwrap();
        assert_eq!(r.gateway_ip().unwrap().to_string(), "172.16.32.1");
        assert_eq!(r.interface, None);
    }
    #[test]
    fn test_solaris_errors() {
        let err = parse_solaris_netstat_gateway(SOLARIS_NO_ROUTE).unwrap_err();
        assert!(matches!(err, GatewayError::NoGatewayFound));
        let err = parse_solaris_netstat_gateway(b"").unwrap_err();
        assert!(matches!(err, GatewayError::NoGatewayFound));

        let r = parse_solaris_netstat(SOLARIS_BAD_ROUTE).unwrap();
        assert_eq!(r.interface, Some(RouteIface::Name(String::from("net0"))));
        let err = r.gateway_ip().unwrap_err();
        assert!(matches!(err, GatewayError::CantParse { .. }));
    }
    #[test]
    fn test_solaris_verbose_columns() {
        // netstat -rnv puts a mask column before the gateway
        let r = parse_solaris_netstat(SOLARIS_VERBOSE).unwrap();
        assert_eq!(r.gateway_ip().unwrap().to_string(), "172.16.32.1");
        assert_eq!(r.interface, Some(RouteIface::Name(String::from("net0"))));
        assert_eq!(r.flags.as_deref(), Some("UG"));
    }
    #[test]
    fn test_solaris_no_flag_check() {
        let table = b"Routing Table: IPv4\n\
                      Destination Gateway Flags Ref Use Interface\n\
                      default 10.0.0.1 U 1 0 e1000g0\n";
        let ip = parse_solaris_netstat_gateway(table).unwrap();
        assert_eq!(ip.to_string(), "10.0.0.1");
    }
}
