//! Core data model: observed and desired interface state.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::addr;

/// Observed state of one NIC, rebuilt from the live system on every
/// inventory request, never cached.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InterfaceState {
    /// Kernel interface name.
    pub name: String,
    /// First IPv4 address, if any.
    pub ip_address: Option<String>,
    /// Dotted-quad netmask derived from the address prefix length.
    pub netmask: Option<String>,
    /// Default-route gateway bound to this device, if any.
    pub gateway: Option<String>,
    /// System resolver addresses, in configured order.
    pub dns_servers: Vec<String>,
    /// Whether the persisted backend config requests DHCP.
    pub is_dhcp: bool,
    /// Whether the link is administratively up.
    pub is_active: bool,
}

/// Desired configuration for one interface, supplied by an operator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DesiredConfig {
    /// Static IPv4 address; required unless `is_dhcp` is set.
    pub ip_address: Option<Ipv4Addr>,
    /// Dotted-quad netmask; required unless `is_dhcp` is set.
    pub netmask: Option<Ipv4Addr>,
    /// Optional default-route gateway.
    #[serde(default)]
    pub gateway: Option<Ipv4Addr>,
    /// Optional nameserver list.
    #[serde(default)]
    pub dns_servers: Option<Vec<IpAddr>>,
    /// Request DHCP instead of a static address. Static fields are
    /// ignored by backends when set.
    #[serde(default)]
    pub is_dhcp: bool,
}

impl DesiredConfig {
    /// Reject payloads a backend could not act on. Static configuration
    /// requires both address and netmask; DHCP requires nothing.
    pub fn validate(&self) -> Result<()> {
        if self.is_dhcp {
            return Ok(());
        }
        if self.ip_address.is_none() || self.netmask.is_none() {
            return Err(Error::InvalidConfig(
                "static configuration requires ip_address and netmask".to_string(),
            ));
        }
        Ok(())
    }

    /// The static address in CIDR notation.
    ///
    /// Only meaningful after [`validate`](Self::validate) on a non-DHCP
    /// config; absent fields fall back to the /24 default of the
    /// address-math helpers.
    pub fn cidr(&self) -> String {
        let ip = self
            .ip_address
            .map(|a| a.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let mask = self
            .netmask
            .map(|m| m.to_string())
            .unwrap_or_else(|| addr::prefix_to_netmask(addr::DEFAULT_PREFIX_LEN).to_string());
        addr::to_cidr(&ip, &mask)
    }

    /// Nameserver list as strings, empty when none were supplied.
    pub fn dns_strings(&self) -> Vec<String> {
        self.dns_servers
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|a| a.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_config() -> DesiredConfig {
        DesiredConfig {
            ip_address: Some(Ipv4Addr::new(10, 0, 0, 5)),
            netmask: Some(Ipv4Addr::new(255, 255, 255, 0)),
            gateway: Some(Ipv4Addr::new(10, 0, 0, 1)),
            dns_servers: Some(vec!["1.1.1.1".parse().unwrap()]),
            is_dhcp: false,
        }
    }

    #[test]
    fn test_validate_static_requires_address() {
        assert!(static_config().validate().is_ok());

        let mut cfg = static_config();
        cfg.netmask = None;
        assert!(cfg.validate().is_err());

        let mut cfg = static_config();
        cfg.ip_address = None;
        let err = cfg.validate().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_validate_dhcp_ignores_static_fields() {
        let cfg = DesiredConfig {
            ip_address: None,
            netmask: None,
            gateway: None,
            dns_servers: None,
            is_dhcp: true,
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_cidr() {
        assert_eq!(static_config().cidr(), "10.0.0.5/24");
    }

    #[test]
    fn test_deserialize_minimal_dhcp_payload() {
        let cfg: DesiredConfig = serde_json::from_str(r#"{"is_dhcp": true}"#).unwrap();
        assert!(cfg.is_dhcp);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_deserialize_static_payload() {
        let cfg: DesiredConfig = serde_json::from_str(
            r#"{"ip_address": "192.168.1.50", "netmask": "255.255.255.0", "gateway": "192.168.1.1"}"#,
        )
        .unwrap();
        assert!(!cfg.is_dhcp);
        assert_eq!(cfg.cidr(), "192.168.1.50/24");
        assert!(cfg.dns_strings().is_empty());
    }
}
