//! Netplan YAML document model and on-disk store.
//!
//! One YAML file is one [`Document`]: a `network.ethernets` mapping from
//! interface name to its settings. The [`NetplanStore`] owns the config
//! directory and guarantees that an interface is defined by at most one
//! document at any time.

mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use store::{DocumentEntry, NetplanStore};

use crate::types::DesiredConfig;

/// A complete netplan document, one per YAML file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// The `network:` section.
    pub network: NetworkSection,
}

impl Document {
    /// A document defining exactly one interface.
    pub fn single(interface: &str, settings: EthernetSettings) -> Self {
        let mut ethernets = BTreeMap::new();
        ethernets.insert(interface.to_string(), settings);
        Self {
            network: NetworkSection {
                version: 2,
                renderer: None,
                ethernets,
            },
        }
    }

    /// Interface names defined by this document.
    pub fn interfaces(&self) -> Vec<String> {
        self.network.ethernets.keys().cloned().collect()
    }

    /// Whether this document defines `interface`.
    pub fn defines(&self, interface: &str) -> bool {
        self.network.ethernets.contains_key(interface)
    }
}

/// The `network:` section of a netplan document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkSection {
    /// Netplan schema version, always 2.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Optional renderer override (`networkd` or `NetworkManager`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renderer: Option<String>,
    /// Per-interface settings, keyed by interface name. BTreeMap keeps
    /// serialization deterministic.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ethernets: BTreeMap<String, EthernetSettings>,
}

fn default_version() -> u32 {
    2
}

/// Per-interface settings block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EthernetSettings {
    /// Request IPv4 via DHCP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp4: Option<bool>,
    /// Static addresses in CIDR notation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<String>>,
    /// Static routes; the engine writes a single default route.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<RouteEntry>>,
    /// Nameserver block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<Nameservers>,
}

impl EthernetSettings {
    /// Build the settings block for a desired configuration.
    ///
    /// DHCP requests carry only the `dhcp4` flag; static requests carry
    /// the CIDR address, a default route when a gateway was supplied,
    /// and the nameserver list when given. Static fields are never
    /// written for DHCP.
    pub fn from_desired(config: &DesiredConfig) -> Self {
        if config.is_dhcp {
            return Self {
                dhcp4: Some(true),
                ..Self::default()
            };
        }

        Self {
            dhcp4: None,
            addresses: Some(vec![config.cidr()]),
            routes: config.gateway.map(|gw| {
                vec![RouteEntry {
                    to: "default".to_string(),
                    via: gw.to_string(),
                }]
            }),
            nameservers: config.dns_servers.as_ref().map(|_| Nameservers {
                addresses: config.dns_strings(),
            }),
        }
    }

    /// Whether this block requests DHCP.
    pub fn is_dhcp(&self) -> bool {
        self.dhcp4.unwrap_or(false)
    }
}

/// One entry of a `routes:` list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteEntry {
    /// Route destination; `default` for the default route.
    pub to: String,
    /// Next-hop gateway.
    pub via: String,
}

/// The `nameservers:` block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Nameservers {
    /// Nameserver addresses.
    pub addresses: Vec<String>,
}
