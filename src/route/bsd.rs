use std::net::IpAddr;
use tracing::debug;

use crate::error::GatewayError;
use crate::route::RouteIface;
use crate::route::RouteRecord;
use crate::utils::FLAG_GATEWAY;
use crate::utils::FLAG_UP;
use crate::utils::TableLayout;
use crate::utils::flags_contain;
use crate::utils::split_fields;

/// Pick the default route out of BSD or darwin `netstat -rn`.
///
/// ```text
/// Routing tables
///
/// Internet:
/// Destination        Gateway            Flags           Netif Expire
/// default            link#17            UCSg            utun3
/// default            192.168.1.1        UGScIg          en0
/// 127.0.0.1          127.0.0.1          UH              lo0
///
/// Internet6:
/// Destination                       Gateway                       Flags      Netif Expire
/// default                           fe80::%utun0                  UGcIg       utun0
/// ```
/// A host can carry several `default` rows (tunnels), only the one flagged
/// both up and gateway is the real default gateway.
pub fn parse_bsd_netstat(output: &[u8]) -> Result<RouteRecord, GatewayError> {
    let output = String::from_utf8_lossy(output);
    let mut layout = TableLayout::BSD;
    for line in output.lines() {
        let trimmed = line.trim();
        // only the ipv4 section matters
        if trimmed.starts_with("Internet6") {
            break;
        }
        let fields = split_fields(trimmed);
        if let Some(l) = TableLayout::from_header(&fields) {
            layout = l;
            continue;
        }
        if fields.first() != Some(&"default") {
            continue;
        }

        let flags = match layout.flags {
            Some(i) => fields.get(i).copied().unwrap_or(""),
            None => "",
        };
        if !flags_contain(flags, &[FLAG_UP, FLAG_GATEWAY]) {
            debug!("skip default route [{}], flags [{}] lack U or G", trimmed, flags);
            continue;
        }
        let gateway = match fields.get(layout.gateway) {
            Some(g) => *g,
            None => return Err(GatewayError::cant_parse("route row", trimmed)),
        };
        let mut record = RouteRecord::new(fields[0], gateway).with_flags(flags);
        if let Some(iface) = layout.iface.and_then(|i| fields.get(i)) {
            record = record.with_interface(RouteIface::Name(iface.to_string()));
        }
        debug!("netstat default route: {}", record);
        return Ok(record);
    }
    Err(GatewayError::NoGatewayFound)
}

pub fn parse_bsd_netstat_gateway(output: &[u8]) -> Result<IpAddr, GatewayError> {
    parse_bsd_netstat(output)?.gateway_ip()
}

/// Pick the default route out of `route -n get 0.0.0.0`.
///
/// ```text
///    route to: default
/// destination: default
///        mask: default
///     gateway: 192.168.1.1
///   interface: en0
///       flags: <UP,GATEWAY,DONE,STATIC,PRCLONING>
/// ```
pub fn parse_darwin_route_get(output: &[u8]) -> Result<RouteRecord, GatewayError> {
    let output = String::from_utf8_lossy(output);
    let mut destination = "default";
    let mut gateway = None;
    let mut iface = None;
    let mut flags = None;
    for line in output.lines() {
        let fields = split_fields(line);
        if fields.len() < 2 {
            continue;
        }
        match fields[0] {
            "destination:" => destination = fields[1],
            "gateway:" => {
                if gateway.is_none() {
                    gateway = Some(fields[1]);
                }
            }
            "interface:" => iface = Some(fields[1]),
            "flags:" => flags = Some(fields[1]),
            _ => (),
        }
    }

    match gateway {
        Some(g) => {
            let mut record = RouteRecord::new(destination, g);
            if let Some(i) = iface {
                record = record.with_interface(RouteIface::Name(i.to_string()));
            }
            if let Some(f) = flags {
                record = record.with_flags(f);
            }
            debug!("route get default route: {}", record);
            Ok(record)
        }
        None => Err(GatewayError::NoGatewayFound),
    }
}

pub fn parse_darwin_route_get_gateway(output: &[u8]) -> Result<IpAddr, GatewayError> {
    parse_darwin_route_get(output)?.gateway_ip()
}
