use std::net::IpAddr;
use std::net::Ipv4Addr;
use tracing::debug;

use crate::error::GatewayError;

/// Flag letter for a route that is up.
pub const FLAG_UP: char = 'U';
/// Flag letter for a route through a gateway router.
pub const FLAG_GATEWAY: char = 'G';

pub fn split_fields(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Lines made of a run of `=` delimit the blocks of a windows route table.
pub fn is_separator(line: &str) -> bool {
    line.trim_start().starts_with("=======")
}

/// Remove the BSD zone suffix from an address.
/// fe80::1%en0 => fe80::1
pub fn strip_scope(value: &str) -> &str {
    match value.split_once('%') {
        Some((addr, _)) => addr,
        None => value,
    }
}

pub fn parse_ip(value: &str) -> Option<IpAddr> {
    strip_scope(value).parse().ok()
}

/// Parse a column that must hold an address, `CantParse` otherwise.
pub fn parse_ip_field(field: &'static str, value: &str) -> Result<IpAddr, GatewayError> {
    match parse_ip(value) {
        Some(ip) => Ok(ip),
        None => {
            debug!("column {} holds [{}], not an address", field, value);
            Err(GatewayError::cant_parse(field, value))
        }
    }
}

/// Every required flag letter shows up in `flags`.
pub fn flags_contain(flags: &str, required: &[char]) -> bool {
    required.iter().all(|f| flags.contains(*f))
}

/// Decode one 8 digit hex column of `/proc/net/route`.
/// The kernel prints the u32 in host (little-endian) order, so the text
/// `0100000A` is the byte sequence 0A 00 00 01.
pub fn decode_proc_hex(value: &str) -> Option<[u8; 4]> {
    let mut buf = [0u8; 4];
    match hex::decode_to_slice(value, &mut buf) {
        Ok(_) => {
            buf.reverse();
            Some(buf)
        }
        Err(e) => {
            debug!("proc route hex [{}] decode failed: {}", value, e);
            None
        }
    }
}

pub fn proc_hex_ipv4(value: &str) -> Option<Ipv4Addr> {
    decode_proc_hex(value).map(Ipv4Addr::from)
}

/// Column positions of a `netstat -rn` style table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub gateway: usize,
    pub flags: Option<usize>,
    pub iface: Option<usize>,
}

impl TableLayout {
    /// Classic BSD layout: Destination Gateway Flags Netif.
    pub const BSD: TableLayout = TableLayout {
        gateway: 1,
        flags: Some(2),
        iface: Some(3),
    };
    /// Build a layout from a header row such as
    /// `Destination Gateway Flags Refs Use Mtu Interface`.
    /// Returns None when the row is not a header.
    pub fn from_header(fields: &[&str]) -> Option<TableLayout> {
        let first = fields.first()?;
        if !first.starts_with("Destination") {
            return None;
        }
        let gateway = fields.iter().position(|f| *f == "Gateway")?;
        let flags = fields.iter().position(|f| matches!(*f, "Flags" | "Flg"));
        let iface = fields
            .iter()
            .position(|f| matches!(*f, "Netif" | "Interface" | "Iface" | "If" | "Device"));
        Some(TableLayout {
            gateway,
            flags,
            iface,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_flags_contain() {
        let cases = [
            ("UGS", true),
            ("UH", false),
            ("U", false),
            ("UHS", false),
            ("UHl", false),
            ("UGScIg", true),
        ];
        for (flags, expected) in cases {
            assert_eq!(
                flags_contain(flags, &[FLAG_UP, FLAG_GATEWAY]),
                expected,
                "flags {}",
                flags
            );
        }
    }
    #[test]
    fn test_proc_hex() {
        assert_eq!(proc_hex_ipv4("0100000A"), Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(proc_hex_ipv4("0101A8C0"), Some(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(proc_hex_ipv4("00000000"), Some(Ipv4Addr::UNSPECIFIED));
        assert_eq!(proc_hex_ipv4("0101A8"), None);
        assert_eq!(proc_hex_ipv4("zz01A8C0"), None);
    }
    #[test]
    fn test_parse_ip() {
        let ip: IpAddr = "fe80::1".parse().unwrap();
        assert_eq!(parse_ip("fe80::1%en0"), Some(ip));
        assert_eq!(parse_ip("link#17"), None);
        let err = parse_ip_field("gateway", "foo").unwrap_err();
        assert!(matches!(err, GatewayError::CantParse { field: "gateway", .. }));
    }
    #[test]
    fn test_round_trip() {
        for text in ["192.168.1.1", "10.0.0.1", "2001:db8::1"] {
            let ip = parse_ip(text).unwrap();
            assert_eq!(parse_ip(&ip.to_string()), Some(ip));
        }
    }
    #[test]
    fn test_layout() {
        let netbsd = split_fields("Destination Gateway Flags Refs Use Mtu Interface");
        let layout = TableLayout::from_header(&netbsd).unwrap();
        assert_eq!(layout.gateway, 1);
        assert_eq!(layout.flags, Some(2));
        assert_eq!(layout.iface, Some(6));

        let darwin = split_fields("Destination        Gateway            Flags           Netif Expire");
        assert_eq!(TableLayout::from_header(&darwin), Some(TableLayout::BSD));

        let verbose = split_fields("Destination Mask Gateway Device MTU Ref Flg Out In/Fwd");
        let layout = TableLayout::from_header(&verbose).unwrap();
        assert_eq!(layout.gateway, 2);
        assert_eq!(layout.flags, Some(6));
        assert_eq!(layout.iface, Some(3));

        let row = split_fields("default            10.88.88.2         UGS         em0");
        assert_eq!(TableLayout::from_header(&row), None);
    }
}
