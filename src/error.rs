use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /* PARSE ERROR */
    #[error("no gateway found")]
    NoGatewayFound,
    #[error("can not parse {field} value [{value}]")]
    CantParse { field: &'static str, value: String },

    /* PLATFORM ERROR */
    #[error("gateway discovery is not implemented for platform [{platform}]")]
    NotImplemented { platform: String },

    /* INTERFACE ERROR */
    #[error("can not look up interface [{iface}]: {reason}")]
    InterfaceLookupFailed { iface: String, reason: String },
    #[error("interface [{iface}] has no ipv4 address")]
    NoIpv4Address { iface: String },
    #[error("the default route does not name its interface")]
    MissingInterface,

    /* COMMAND ERROR */
    #[error("command [{command}] exited with status {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("command [{command}] did not finish within {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    /* OTHER ERROR */
    #[error("std error")]
    IOError(#[from] std::io::Error),
    #[error("regex error")]
    RegexError(#[from] regex::Error),
    #[error("serde json error")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl GatewayError {
    pub(crate) fn cant_parse(field: &'static str, value: &str) -> GatewayError {
        GatewayError::CantParse {
            field,
            value: value.to_string(),
        }
    }
    /// True for the "nothing matched" family: no default route, or an
    /// interface without an IPv4 address.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GatewayError::NoGatewayFound | GatewayError::NoIpv4Address { .. }
        )
    }
}
