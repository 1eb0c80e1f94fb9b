//! IP network (CIDR) leaf type.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use thiserror::Error;

/// An IP network in CIDR notation, such as `10.0.0.0/8` or `2001:db8::/32`.
///
/// Parsing keeps the address as written; [`network`](IpNetwork::network)
/// returns it with the host bits cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpNetwork {
    addr: IpAddr,
    prefix: u8,
}

/// Error returned when a CIDR string cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IpNetworkError {
    /// No `/` separator.
    #[error("missing prefix length in `{0}`")]
    MissingPrefix(String),

    /// The address part is not an IP address.
    #[error("invalid address `{0}`")]
    InvalidAddress(String),

    /// The prefix is not a number or is too large for the address family.
    #[error("invalid prefix length `{prefix}` (max {max})")]
    InvalidPrefix {
        /// The prefix as written.
        prefix: String,
        /// Largest prefix for the address family.
        max: u8,
    },
}

impl IpNetwork {
    /// Creates a network, checking the prefix against the address family.
    ///
    /// # Errors
    ///
    /// Returns an error if `prefix` exceeds 32 (IPv4) or 128 (IPv6).
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, IpNetworkError> {
        let max = max_prefix(addr);
        if prefix > max {
            return Err(IpNetworkError::InvalidPrefix {
                prefix: prefix.to_string(),
                max,
            });
        }
        Ok(Self { addr, prefix })
    }

    /// The address as written.
    #[must_use]
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// The prefix length.
    #[must_use]
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// The network address (host bits cleared).
    #[must_use]
    pub fn network(&self) -> IpAddr {
        match self.addr {
            IpAddr::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4) & v4_mask(self.prefix))),
            IpAddr::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6) & v6_mask(self.prefix))),
        }
    }

    /// Returns true if `ip` falls inside this network.
    #[must_use]
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = v4_mask(self.prefix);
                u32::from(net) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = v6_mask(self.prefix);
                u128::from(net) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}

fn max_prefix(addr: IpAddr) -> u8 {
    if addr.is_ipv4() {
        32
    } else {
        128
    }
}

fn v4_mask(prefix: u8) -> u32 {
    u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0)
}

fn v6_mask(prefix: u8) -> u128 {
    u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0)
}

impl FromStr for IpNetwork {
    type Err = IpNetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| IpNetworkError::MissingPrefix(s.to_string()))?;
        let addr: IpAddr = addr
            .parse()
            .map_err(|_| IpNetworkError::InvalidAddress(addr.to_string()))?;
        let max = max_prefix(addr);
        let invalid = || IpNetworkError::InvalidPrefix {
            prefix: prefix.to_string(),
            max,
        };
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        Self::new(addr, prefix).map_err(|_| invalid())
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v4() {
        let net: IpNetwork = "192.168.1.77/24".parse().unwrap();
        assert_eq!(net.prefix(), 24);
        assert_eq!(net.network(), "192.168.1.0".parse::<IpAddr>().unwrap());
        assert!(net.contains("192.168.1.200".parse().unwrap()));
        assert!(!net.contains("192.168.2.1".parse().unwrap()));
        assert_eq!(net.to_string(), "192.168.1.77/24");
    }

    #[test]
    fn test_parse_v6() {
        let net: IpNetwork = "2001:db8::/32".parse().unwrap();
        assert!(net.contains("2001:db8:ffff::1".parse().unwrap()));
        assert!(!net.contains("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_zero_prefix_matches_everything() {
        let net: IpNetwork = "0.0.0.0/0".parse().unwrap();
        assert!(net.contains("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "10.0.0.1".parse::<IpNetwork>(),
            Err(IpNetworkError::MissingPrefix(_))
        ));
        assert!(matches!(
            "10.0.0/8".parse::<IpNetwork>(),
            Err(IpNetworkError::InvalidAddress(_))
        ));
        assert!(matches!(
            "10.0.0.0/33".parse::<IpNetwork>(),
            Err(IpNetworkError::InvalidPrefix { max: 32, .. })
        ));
        assert!("10.0.0.0/+8".parse::<IpNetwork>().is_err());
    }
}
