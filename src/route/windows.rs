use std::net::IpAddr;
use std::net::Ipv4Addr;
use tracing::debug;

use crate::error::GatewayError;
use crate::route::RouteIface;
use crate::route::RouteRecord;
use crate::utils::is_separator;
use crate::utils::split_fields;

// The active routes block opens after the third separator line.
const ACTIVE_ROUTES_SEPARATOR: usize = 3;
// Default route row sits two lines below the block opening line.
const DEFAULT_ROW_OFFSET: usize = 2;
// Network Destination, Netmask, Gateway, Interface, Metric
const MIN_COLUMNS: usize = 5;

/// Pick the default route out of `route print 0.0.0.0`.
///
/// The output always looks like this:
/// ```text
/// ===========================================================================
/// Interface List
///   8 ...00 12 3f a7 17 ba ...... Intel(R) PRO/100 VE Network Connection
///   1 ........................... Software Loopback Interface 1
/// ===========================================================================
/// IPv4 Route Table
/// ===========================================================================
/// Active Routes:
/// Network Destination        Netmask          Gateway       Interface  Metric
///           0.0.0.0          0.0.0.0      192.168.1.1    192.168.1.100     20
/// ===========================================================================
/// ```
/// The headers are localized, so the block is found by counting separators
/// and never by its title.
pub fn parse_windows_route(output: &[u8]) -> Result<RouteRecord, GatewayError> {
    let output = String::from_utf8_lossy(output);
    let lines: Vec<&str> = output.lines().collect();

    let mut sep = 0;
    for (idx, line) in lines.iter().enumerate() {
        if sep == ACTIVE_ROUTES_SEPARATOR {
            let row = match lines.get(idx + DEFAULT_ROW_OFFSET) {
                Some(r) => *r,
                None => {
                    debug!("windows route table ends before the default route row");
                    return Err(GatewayError::NoGatewayFound);
                }
            };
            if lines[idx + 1..=idx + DEFAULT_ROW_OFFSET]
                .iter()
                .any(|l| is_separator(l))
            {
                debug!("windows active routes block closes before [{}]", row.trim());
                return Err(GatewayError::NoGatewayFound);
            }
            let fields = split_fields(row);
            if fields.len() < MIN_COLUMNS {
                return Err(GatewayError::cant_parse("route row", row.trim()));
            }
            let record = RouteRecord::new(fields[0], fields[2])
                .with_interface(RouteIface::Addr(fields[3].to_string()));
            debug!("windows default route: {}", record);
            return Ok(record);
        }
        if is_separator(line) {
            sep += 1;
        }
    }
    Err(GatewayError::NoGatewayFound)
}

pub fn parse_windows_gateway(output: &[u8]) -> Result<IpAddr, GatewayError> {
    parse_windows_route(output)?.gateway_ip()
}

/// The interface column of the default route. It is checked on its own,
/// so a rubbish gateway column does not hide a good interface address.
pub fn parse_windows_interface_ip(output: &[u8]) -> Result<Ipv4Addr, GatewayError> {
    let record = parse_windows_route(output)?;
    match record.interface {
        Some(RouteIface::Addr(a)) => match a.parse() {
            Ok(ip) => Ok(ip),
            Err(_) => Err(GatewayError::cant_parse("interface", &a)),
        },
        _ => Err(GatewayError::MissingInterface),
    }
}
