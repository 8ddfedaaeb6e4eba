//! Live interface state, read from `ip -j` JSON output.
//!
//! The kernel is the source of truth for addresses and link state;
//! DHCP intent comes from whichever configuration store the detected
//! backend uses, and resolver addresses from `resolv.conf`.

use std::path::PathBuf;

use serde::Deserialize;

use crate::backend::legacy::InterfacesFile;
use crate::env::{BackendKind, HostEnv};
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::netplan::NetplanStore;
use crate::types::InterfaceState;
use crate::util::{addr, ifname};

/// One `ip -j addr show` entry.
#[derive(Debug, Deserialize)]
struct LinkEntry {
    ifname: String,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    addr_info: Vec<AddrInfo>,
}

#[derive(Debug, Deserialize)]
struct AddrInfo {
    #[serde(default)]
    family: String,
    #[serde(default)]
    local: String,
    #[serde(default)]
    prefixlen: u8,
}

/// One `ip -j route show` entry.
#[derive(Debug, Deserialize)]
struct RouteEntry {
    #[serde(default)]
    dst: String,
    gateway: Option<String>,
    dev: Option<String>,
}

/// A routing table row as surfaced to callers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RouteInfo {
    pub destination: String,
    pub gateway: Option<String>,
    pub device: Option<String>,
}

/// Extract the `nameserver` addresses from resolv.conf text.
fn parse_nameservers(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match fields.next() {
                Some("nameserver") => fields.next().map(str::to_string),
                _ => None,
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Inventory<R> {
    runner: R,
    backend: BackendKind,
    netplan: NetplanStore,
    interfaces_file: PathBuf,
    resolv_conf: PathBuf,
}

impl<R: CommandRunner> Inventory<R> {
    pub fn new(runner: R, env: &HostEnv) -> Self {
        Self {
            runner,
            backend: env.backend,
            netplan: NetplanStore::new(),
            interfaces_file: PathBuf::from("/etc/network/interfaces"),
            resolv_conf: PathBuf::from("/etc/resolv.conf"),
        }
    }

    /// Override the configuration store locations (tests).
    pub fn with_stores(
        mut self,
        netplan: NetplanStore,
        interfaces_file: impl Into<PathBuf>,
        resolv_conf: impl Into<PathBuf>,
    ) -> Self {
        self.netplan = netplan;
        self.interfaces_file = interfaces_file.into();
        self.resolv_conf = resolv_conf.into();
        self
    }

    /// State of every public interface.
    pub async fn list(&self) -> Result<Vec<InterfaceState>> {
        Ok(self
            .states()
            .await?
            .into_iter()
            .filter(|s| ifname::is_public(&s.name))
            .collect())
    }

    /// State of every interface, loopback and virtual ones included.
    pub async fn list_all(&self) -> Result<Vec<InterfaceState>> {
        self.states().await
    }

    /// State of one public interface. Fails closed on system and
    /// virtual interface names before touching the host.
    pub async fn get(&self, name: &str) -> Result<InterfaceState> {
        ifname::ensure_public(name)?;
        self.states()
            .await?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::InterfaceNotFound {
                name: name.to_string(),
            })
    }

    /// The main routing table.
    pub async fn routes(&self) -> Result<Vec<RouteInfo>> {
        let out = self
            .runner
            .run("ip", &["-j", "route", "show"])
            .await?
            .require_success()?;
        let entries: Vec<RouteEntry> = serde_json::from_str(&out.stdout)?;
        Ok(entries
            .into_iter()
            .map(|r| RouteInfo {
                destination: if r.dst.is_empty() {
                    "default".to_string()
                } else {
                    r.dst
                },
                gateway: r.gateway,
                device: r.dev,
            })
            .collect())
    }

    /// Configured resolver addresses.
    pub fn dns_servers(&self) -> Vec<String> {
        match std::fs::read_to_string(&self.resolv_conf) {
            Ok(content) => parse_nameservers(&content),
            Err(_) => Vec::new(),
        }
    }

    async fn states(&self) -> Result<Vec<InterfaceState>> {
        let out = self
            .runner
            .run("ip", &["-j", "addr", "show"])
            .await?
            .require_success()?;
        let links: Vec<LinkEntry> = serde_json::from_str(&out.stdout)?;

        let gateways = self.default_gateways().await;
        let dns = self.dns_servers();

        Ok(links
            .into_iter()
            .map(|link| {
                let v4 = link.addr_info.iter().find(|a| a.family == "inet");
                InterfaceState {
                    ip_address: v4.map(|a| a.local.clone()),
                    netmask: v4.map(|a| addr::prefix_to_netmask(a.prefixlen).to_string()),
                    gateway: gateways
                        .iter()
                        .find(|(dev, _)| *dev == link.ifname)
                        .map(|(_, gw)| gw.clone()),
                    dns_servers: dns.clone(),
                    is_dhcp: self.dhcp_enabled(&link.ifname),
                    is_active: link.flags.iter().any(|f| f == "UP"),
                    name: link.ifname,
                }
            })
            .collect())
    }

    /// Default gateways keyed by outgoing device.
    async fn default_gateways(&self) -> Vec<(String, String)> {
        let out = match self.runner.run("ip", &["-j", "route", "show", "default"]).await {
            Ok(out) if out.success => out,
            _ => return Vec::new(),
        };
        let entries: Vec<RouteEntry> = match serde_json::from_str(&out.stdout) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        entries
            .into_iter()
            .filter_map(|r| Some((r.dev?, r.gateway?)))
            .collect()
    }

    /// Whether the interface is configured for DHCP in the backend's
    /// own store. Interfaces with no persisted stanza count as static.
    fn dhcp_enabled(&self, name: &str) -> bool {
        match self.backend {
            BackendKind::Netplan => self
                .netplan
                .list()
                .unwrap_or_default()
                .iter()
                .filter_map(|entry| entry.document.as_ref().ok())
                .filter_map(|doc| doc.network.ethernets.get(name))
                .any(|settings| settings.is_dhcp()),
            BackendKind::LegacyInterfaces => {
                match std::fs::read_to_string(&self.interfaces_file) {
                    Ok(content) => InterfacesFile::parse(&content)
                        .is_dhcp(name)
                        .unwrap_or(false),
                    Err(_) => false,
                }
            }
            _ => false,
        }
    }
}
