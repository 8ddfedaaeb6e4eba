//! ifupdown (`/etc/network/interfaces`) backend adapter.

use std::path::{Path, PathBuf};

use super::{ApplyReport, link_cycle};
use crate::direct::DirectApplier;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::types::DesiredConfig;

const INTERFACES_FILE: &str = "/etc/network/interfaces";

/// Parsed `/etc/network/interfaces` document.
///
/// The file is kept as a sequence of blocks so an edit to one
/// interface stanza leaves every other line untouched, comments and
/// `source` directives included.
#[derive(Debug, Clone, Default)]
pub struct InterfacesFile {
    blocks: Vec<Block>,
}

#[derive(Debug, Clone)]
enum Block {
    /// A line outside any stanza: comments, blanks, `source` lines.
    Plain(String),
    /// An `auto` or `allow-*` marker naming one or more interfaces.
    Marker { keyword: String, interfaces: Vec<String> },
    /// An `iface <name> inet <method>` stanza with its option lines.
    Iface {
        interface: String,
        method: String,
        options: Vec<String>,
    },
}

fn starts_stanza(trimmed: &str) -> bool {
    trimmed.starts_with("iface ")
        || trimmed.starts_with("auto ")
        || trimmed.starts_with("allow-")
        || trimmed.starts_with("mapping ")
        || trimmed.starts_with("source ")
        || trimmed.starts_with("source-directory ")
}

impl InterfacesFile {
    pub fn parse(content: &str) -> Self {
        let mut blocks = Vec::new();
        let mut current: Option<(String, String, Vec<String>)> = None;

        for line in content.lines() {
            let trimmed = line.trim();

            if starts_stanza(trimmed) {
                if let Some((interface, method, options)) = current.take() {
                    blocks.push(Block::Iface { interface, method, options });
                }
                let mut words = trimmed.split_whitespace();
                let keyword = words.next().unwrap_or_default().to_string();
                if keyword == "iface" {
                    let interface = words.next().unwrap_or_default().to_string();
                    // Skip the address family word ("inet"/"inet6").
                    let method = words.nth(1).unwrap_or_default().to_string();
                    current = Some((interface, method, Vec::new()));
                } else if keyword == "auto" || keyword.starts_with("allow-") {
                    blocks.push(Block::Marker {
                        keyword,
                        interfaces: words.map(str::to_string).collect(),
                    });
                } else {
                    blocks.push(Block::Plain(line.to_string()));
                }
                continue;
            }

            match &mut current {
                // Option lines belong to the open stanza; a blank line
                // closes it so trailing whitespace is not swallowed.
                Some((_, _, options)) if !trimmed.is_empty() => {
                    options.push(trimmed.to_string());
                }
                Some(_) if trimmed.is_empty() => {
                    if let Some((interface, method, options)) = current.take() {
                        blocks.push(Block::Iface { interface, method, options });
                    }
                    blocks.push(Block::Plain(String::new()));
                }
                _ => blocks.push(Block::Plain(line.to_string())),
            }
        }
        if let Some((interface, method, options)) = current.take() {
            blocks.push(Block::Iface { interface, method, options });
        }

        Self { blocks }
    }

    /// Interfaces with an `iface` stanza, in file order.
    pub fn interfaces(&self) -> Vec<String> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Iface { interface, .. } => Some(interface.clone()),
                _ => None,
            })
            .collect()
    }

    /// `Some(true)` for a dhcp stanza, `Some(false)` for any other
    /// method, `None` when the interface has no stanza.
    pub fn is_dhcp(&self, name: &str) -> Option<bool> {
        self.blocks.iter().find_map(|b| match b {
            Block::Iface { interface, method, .. } if interface == name => {
                Some(method == "dhcp")
            }
            _ => None,
        })
    }

    /// Drop the interface's stanza and its `auto`/`allow-*` markers.
    /// Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.blocks.len();
        let mut marker_shrunk = false;
        self.blocks.retain_mut(|b| match b {
            Block::Iface { interface, .. } => interface != name,
            Block::Marker { interfaces, .. } => {
                let len = interfaces.len();
                interfaces.retain(|i| i != name);
                marker_shrunk |= interfaces.len() != len;
                !interfaces.is_empty()
            }
            Block::Plain(_) => true,
        });
        self.blocks.len() != before || marker_shrunk
    }

    /// Replace (or add) the interface's stanza with one expressing the
    /// desired state.
    pub fn upsert(&mut self, name: &str, config: &DesiredConfig) {
        self.remove(name);
        if !matches!(self.blocks.last(), Some(Block::Plain(l)) if l.is_empty())
            && !self.blocks.is_empty()
        {
            self.blocks.push(Block::Plain(String::new()));
        }
        self.blocks.push(Block::Marker {
            keyword: "auto".to_string(),
            interfaces: vec![name.to_string()],
        });

        if config.is_dhcp {
            self.blocks.push(Block::Iface {
                interface: name.to_string(),
                method: "dhcp".to_string(),
                options: Vec::new(),
            });
            return;
        }

        let mut options = Vec::new();
        if let Some(ip) = config.ip_address {
            options.push(format!("address {ip}"));
        }
        if let Some(mask) = config.netmask {
            options.push(format!("netmask {mask}"));
        }
        if let Some(gw) = config.gateway {
            options.push(format!("gateway {gw}"));
        }
        let dns = config.dns_strings();
        if !dns.is_empty() {
            options.push(format!("dns-nameservers {}", dns.join(" ")));
        }
        self.blocks.push(Block::Iface {
            interface: name.to_string(),
            method: "static".to_string(),
            options,
        });
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Plain(line) => {
                    out.push_str(line);
                    out.push('\n');
                }
                Block::Marker { keyword, interfaces } => {
                    out.push_str(keyword);
                    for i in interfaces {
                        out.push(' ');
                        out.push_str(i);
                    }
                    out.push('\n');
                }
                Block::Iface { interface, method, options } => {
                    out.push_str(&format!("iface {interface} inet {method}\n"));
                    for opt in options {
                        out.push_str("    ");
                        out.push_str(opt);
                        out.push('\n');
                    }
                }
            }
        }
        out
    }
}

/// Adapter editing `/etc/network/interfaces` and cycling interfaces
/// with `ifdown`/`ifup`, with `ip` as the fallback when ifupdown is
/// broken or absent.
#[derive(Debug, Clone)]
pub struct LegacyBackend<R> {
    runner: R,
    path: PathBuf,
    direct: DirectApplier<R>,
}

impl<R: CommandRunner + Clone> LegacyBackend<R> {
    pub fn new(runner: R) -> Self {
        Self {
            direct: DirectApplier::new(runner.clone()),
            path: PathBuf::from(INTERFACES_FILE),
            runner,
        }
    }

    /// Override the interfaces file location (tests).
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Override the direct applier (tests).
    pub fn with_direct(mut self, direct: DirectApplier<R>) -> Self {
        self.direct = direct;
        self
    }

    pub(super) fn runner(&self) -> &R {
        &self.runner
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<InterfacesFile> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(InterfacesFile::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(InterfacesFile::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Rewrite the interface's stanza, cycle it through ifupdown, then
    /// apply the addresses directly so the live state matches the
    /// request even when the ifupdown scripts reject the stanza.
    pub async fn configure(&self, name: &str, config: &DesiredConfig) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();

        let mut file = self.load()?;
        file.upsert(name, config);
        std::fs::write(&self.path, file.render())?;
        report.action(format!("wrote {}", self.path.display()));

        // The interface may already be down; only ifup has to work.
        if let Ok(out) = self.runner.run("ifdown", &[name]).await {
            if !out.success {
                tracing::debug!(interface = name, "ifdown failed before reconfigure");
            }
        }

        let up = async {
            self.runner.run("ifup", &[name]).await?.require_success()?;
            crate::error::Result::Ok(())
        }
        .await;

        match up {
            Ok(()) => {
                report.action(format!("ifup {name}"));
                // ifup already made the state live; a direct-apply
                // hiccup here must not fail the operation.
                match self.direct.apply(name, config).await {
                    Ok(inner) => report.merge(inner),
                    Err(e) => report.degrade("direct address apply", e),
                }
            }
            Err(e) => {
                report.degrade(format!("ifup {name}"), e);
                // The direct apply below is the last resort and must
                // run even when the link refuses to cycle.
                if let Err(e) = link_cycle(&self.runner, name, &mut report).await {
                    report.degrade(format!("link {name} cycle"), e);
                }
                report.merge(self.direct.apply(name, config).await?);
            }
        }

        Ok(report)
    }

    /// Cycle the interface through ifupdown, falling back to `ip`.
    pub async fn restart(&self, name: &str) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();

        let cycled = async {
            if let Ok(out) = self.runner.run("ifdown", &[name]).await {
                if !out.success {
                    tracing::debug!(interface = name, "ifdown failed during restart");
                }
            }
            self.runner.run("ifup", &[name]).await?.require_success()?;
            crate::error::Result::Ok(())
        }
        .await;

        match cycled {
            Ok(()) => {
                report.action(format!("restarted {name} via ifupdown"));
                Ok(report)
            }
            Err(e) => {
                report.degrade("restart via ifupdown", e);
                link_cycle(&self.runner, name, &mut report).await?;
                Ok(report)
            }
        }
    }

    /// Restart the networking service, preferring systemd and falling
    /// back to the sysvinit script.
    pub(super) async fn restart_networking(&self, report: &mut ApplyReport) {
        let systemd = async {
            self.runner
                .run("systemctl", &["restart", "networking"])
                .await?
                .require_success()?;
            crate::error::Result::Ok(())
        }
        .await;

        if systemd.is_ok() {
            report.action("restarted networking service");
            return;
        }

        let sysv = async {
            self.runner
                .run("/etc/init.d/networking", &["restart"])
                .await?
                .require_success()?;
            crate::error::Result::Ok(())
        }
        .await;

        match sysv {
            Ok(()) => report.action("restarted networking via init script"),
            Err(e) => report.degrade("restart networking service", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::exec::fake::FakeRunner;

    const SAMPLE: &str = "\
# The loopback interface
auto lo
iface lo inet loopback

auto eth0
iface eth0 inet dhcp

auto eth1
iface eth1 inet static
    address 192.168.1.9
    netmask 255.255.255.0
";

    fn static_config() -> DesiredConfig {
        DesiredConfig {
            ip_address: Some(Ipv4Addr::new(10, 0, 0, 5)),
            netmask: Some(Ipv4Addr::new(255, 255, 255, 0)),
            gateway: Some(Ipv4Addr::new(10, 0, 0, 1)),
            dns_servers: Some(vec!["8.8.8.8".parse().unwrap()]),
            is_dhcp: false,
        }
    }

    #[test]
    fn test_parse_finds_all_stanzas() {
        let file = InterfacesFile::parse(SAMPLE);
        assert_eq!(file.interfaces(), vec!["lo", "eth0", "eth1"]);
        assert_eq!(file.is_dhcp("eth0"), Some(true));
        assert_eq!(file.is_dhcp("eth1"), Some(false));
        assert_eq!(file.is_dhcp("eth2"), None);
    }

    #[test]
    fn test_remove_drops_stanza_and_marker() {
        let mut file = InterfacesFile::parse(SAMPLE);
        assert!(file.remove("eth0"));
        let rendered = file.render();
        assert!(!rendered.contains("eth0"));
        assert!(rendered.contains("iface eth1 inet static"));
        assert!(rendered.contains("# The loopback interface"));
        assert!(!file.remove("eth0"));
    }

    #[test]
    fn test_remove_trims_shared_auto_line() {
        let mut file = InterfacesFile::parse("auto eth0 eth1\niface eth0 inet dhcp\niface eth1 inet dhcp\n");
        assert!(file.remove("eth0"));
        assert_eq!(file.render(), "auto eth1\niface eth1 inet dhcp\n");
    }

    #[test]
    fn test_upsert_replaces_existing_stanza() {
        let mut file = InterfacesFile::parse(SAMPLE);
        file.upsert("eth0", &static_config());
        let rendered = file.render();
        assert_eq!(rendered.matches("iface eth0").count(), 1);
        assert!(rendered.contains("iface eth0 inet static"));
        assert!(rendered.contains("    address 10.0.0.5"));
        assert!(rendered.contains("    netmask 255.255.255.0"));
        assert!(rendered.contains("    gateway 10.0.0.1"));
        assert!(rendered.contains("    dns-nameservers 8.8.8.8"));
        // Other stanzas survive the rewrite.
        assert!(rendered.contains("iface eth1 inet static"));
        assert!(rendered.contains("iface lo inet loopback"));
    }

    #[test]
    fn test_upsert_dhcp_has_no_options() {
        let mut file = InterfacesFile::default();
        let config = DesiredConfig { is_dhcp: true, ..static_config() };
        file.upsert("eth0", &config);
        assert_eq!(file.render(), "auto eth0\niface eth0 inet dhcp\n");
    }

    #[test]
    fn test_roundtrip_preserves_content() {
        let file = InterfacesFile::parse(SAMPLE);
        let reparsed = InterfacesFile::parse(&file.render());
        assert_eq!(reparsed.interfaces(), file.interfaces());
    }

    #[tokio::test]
    async fn test_configure_writes_file_and_cycles_interface() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("interfaces");
        std::fs::write(&path, SAMPLE).unwrap();

        let runner = FakeRunner::new();
        let backend = LegacyBackend::new(runner.clone())
            .with_path(&path)
            .with_direct(
                DirectApplier::new(runner.clone())
                    .with_resolv_conf(tmp.path().join("resolv.conf")),
            );

        let report = backend.configure("eth0", &static_config()).await.unwrap();
        assert!(report.is_clean());
        assert!(runner.ran("ifdown eth0"));
        assert!(runner.ran("ifup eth0"));
        // Live state is applied directly even after a clean ifup.
        assert!(runner.ran("ip addr add 10.0.0.5/24 dev eth0"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("iface eth0 inet static"));
    }

    #[tokio::test]
    async fn test_configure_missing_file_starts_fresh() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("interfaces");

        let runner = FakeRunner::new();
        let backend = LegacyBackend::new(runner.clone())
            .with_path(&path)
            .with_direct(
                DirectApplier::new(runner.clone())
                    .with_resolv_conf(tmp.path().join("resolv.conf")),
            );
        backend.configure("eth0", &static_config()).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("auto eth0\n"));
    }

    #[tokio::test]
    async fn test_configure_ifup_failure_falls_back_to_direct() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("interfaces");

        let runner = FakeRunner::new().fail("ifup eth0", "Cannot find device");
        let backend = LegacyBackend::new(runner.clone())
            .with_path(&path)
            .with_direct(
                DirectApplier::new(runner.clone())
                    .with_resolv_conf(tmp.path().join("resolv.conf")),
            );

        let report = backend.configure("eth0", &static_config()).await.unwrap();
        assert!(!report.is_clean());
        assert!(runner.ran("ip link set dev eth0 up"));
        assert!(runner.ran("ip addr add 10.0.0.5/24 dev eth0"));
    }

    #[tokio::test]
    async fn test_configure_reaches_direct_apply_when_link_refuses_to_cycle() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("interfaces");

        let runner = FakeRunner::new()
            .fail("ifup eth0", "Cannot find device")
            .fail("ip link set dev eth0 up", "RTNETLINK answers: operation not permitted");
        let backend = LegacyBackend::new(runner.clone())
            .with_path(&path)
            .with_direct(
                DirectApplier::new(runner.clone())
                    .with_resolv_conf(tmp.path().join("resolv.conf")),
            );

        let report = backend.configure("eth0", &static_config()).await.unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.degraded.len(), 2);
        // The addresses still land on the live interface.
        assert!(runner.ran("ip addr add 10.0.0.5/24 dev eth0"));
    }

    #[tokio::test]
    async fn test_restart_prefers_ifupdown() {
        let runner = FakeRunner::new();
        let backend = LegacyBackend::new(runner.clone());
        let report = backend.restart("eth0").await.unwrap();
        assert!(report.is_clean());
        assert_eq!(runner.calls(), vec!["ifdown eth0", "ifup eth0"]);
    }

    #[tokio::test]
    async fn test_restart_falls_back_to_ip() {
        let runner = FakeRunner::new().missing("ifup");
        let backend = LegacyBackend::new(runner.clone());
        let report = backend.restart("eth0").await.unwrap();
        assert!(!report.is_clean());
        assert!(runner.ran("ip link set dev eth0 up"));
    }

    #[tokio::test]
    async fn test_restart_networking_falls_back_to_init_script() {
        let runner = FakeRunner::new().fail("systemctl restart networking", "not booted with systemd");
        let backend = LegacyBackend::new(runner.clone());
        let mut report = ApplyReport::default();
        backend.restart_networking(&mut report).await;
        assert!(report.is_clean());
        assert!(runner.ran("/etc/init.d/networking restart"));
    }
}
