//! Netmask, prefix-length and CIDR conversions.
//!
//! These helpers never fail: malformed input falls back to
//! [`DEFAULT_PREFIX_LEN`] so a bad netmask degrades the precision of a
//! read-back rather than failing the caller. Callers that require
//! correctness must validate their input first.

use std::net::Ipv4Addr;

/// Prefix length assumed when a netmask cannot be parsed.
pub const DEFAULT_PREFIX_LEN: u8 = 24;

/// Convert a dotted-quad netmask to a prefix length by counting set bits.
///
/// # Example
///
/// ```
/// use hostnet::util::addr::netmask_to_prefix;
///
/// assert_eq!(netmask_to_prefix("255.255.255.0"), 24);
/// assert_eq!(netmask_to_prefix("255.255.0.0"), 16);
/// assert_eq!(netmask_to_prefix("not-a-mask"), 24); // fallback
/// ```
pub fn netmask_to_prefix(netmask: &str) -> u8 {
    netmask
        .parse::<Ipv4Addr>()
        .map(|mask| u32::from(mask).count_ones() as u8)
        .unwrap_or(DEFAULT_PREFIX_LEN)
}

/// Convert a prefix length to a dotted-quad netmask.
///
/// Prefix lengths above 32 fall back to [`DEFAULT_PREFIX_LEN`].
///
/// # Example
///
/// ```
/// use hostnet::util::addr::prefix_to_netmask;
///
/// assert_eq!(prefix_to_netmask(24).to_string(), "255.255.255.0");
/// assert_eq!(prefix_to_netmask(0).to_string(), "0.0.0.0");
/// ```
pub fn prefix_to_netmask(prefix: u8) -> Ipv4Addr {
    let prefix = if prefix > 32 { DEFAULT_PREFIX_LEN } else { prefix };
    let mask = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    };
    Ipv4Addr::from(mask)
}

/// Combine an IP address and dotted-quad netmask into CIDR notation.
///
/// # Example
///
/// ```
/// use hostnet::util::addr::to_cidr;
///
/// assert_eq!(to_cidr("192.168.1.10", "255.255.255.0"), "192.168.1.10/24");
/// ```
pub fn to_cidr(ip: &str, netmask: &str) -> String {
    format!("{}/{}", ip, netmask_to_prefix(netmask))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_netmask_to_prefix() {
        assert_eq!(netmask_to_prefix("255.255.255.255"), 32);
        assert_eq!(netmask_to_prefix("255.255.255.0"), 24);
        assert_eq!(netmask_to_prefix("255.255.254.0"), 23);
        assert_eq!(netmask_to_prefix("255.0.0.0"), 8);
        assert_eq!(netmask_to_prefix("0.0.0.0"), 0);
    }

    #[test]
    fn test_malformed_netmask_falls_back() {
        assert_eq!(netmask_to_prefix(""), DEFAULT_PREFIX_LEN);
        assert_eq!(netmask_to_prefix("255.255"), DEFAULT_PREFIX_LEN);
        assert_eq!(netmask_to_prefix("garbage"), DEFAULT_PREFIX_LEN);
    }

    #[test]
    fn test_prefix_to_netmask() {
        assert_eq!(prefix_to_netmask(32), Ipv4Addr::new(255, 255, 255, 255));
        assert_eq!(prefix_to_netmask(16), Ipv4Addr::new(255, 255, 0, 0));
        assert_eq!(prefix_to_netmask(1), Ipv4Addr::new(128, 0, 0, 0));
        assert_eq!(prefix_to_netmask(0), Ipv4Addr::new(0, 0, 0, 0));
        // Out of range falls back to /24.
        assert_eq!(prefix_to_netmask(33), Ipv4Addr::new(255, 255, 255, 0));
    }

    #[test]
    fn test_round_trip() {
        for prefix in 0..=32u8 {
            let mask = prefix_to_netmask(prefix);
            assert_eq!(netmask_to_prefix(&mask.to_string()), prefix);
        }
    }

    #[test]
    fn test_to_cidr() {
        assert_eq!(to_cidr("192.168.1.10", "255.255.255.0"), "192.168.1.10/24");
        assert_eq!(to_cidr("10.0.0.5", "255.255.0.0"), "10.0.0.5/16");
        // Malformed netmask: documented /24 fallback.
        assert_eq!(to_cidr("10.0.0.5", "bogus"), "10.0.0.5/24");
    }
}
