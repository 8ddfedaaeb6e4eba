//! Direct link/address/route application.
//!
//! Bypasses the detected backend and manipulates live state with the
//! `ip` tool. Invoked whenever a backend-specific activation step is
//! uncertain, so the observed interface state matches the request even
//! when the persisted configuration could not be activated. Note the
//! converse: state applied here is not persisted anywhere.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::backend::ApplyReport;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::types::DesiredConfig;

/// Applies a desired configuration directly to the live interface.
#[derive(Debug, Clone)]
pub struct DirectApplier<R> {
    runner: R,
    resolv_conf: PathBuf,
}

impl<R: CommandRunner> DirectApplier<R> {
    /// Applier writing DNS state to `/etc/resolv.conf`.
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            resolv_conf: PathBuf::from("/etc/resolv.conf"),
        }
    }

    /// Override the resolver config path (tests).
    pub fn with_resolv_conf(mut self, path: impl Into<PathBuf>) -> Self {
        self.resolv_conf = path.into();
        self
    }

    /// Bring `name` to the desired state with `ip` (and a DHCP client).
    ///
    /// For static requests the address add must succeed; gateway and
    /// DNS are best-effort and reported as degraded on failure. For
    /// DHCP, an absent or failing client is tolerated and degraded.
    pub async fn apply(&self, name: &str, config: &DesiredConfig) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();
        tracing::debug!(interface = name, "applying configuration directly");

        // Best-effort: the link may already be up.
        let _ = self.runner.run("ip", &["link", "set", "dev", name, "up"]).await;

        if config.is_dhcp {
            self.apply_dhcp(name, &mut report).await;
        } else {
            self.apply_static(name, config, &mut report).await?;
        }

        Ok(report)
    }

    async fn apply_dhcp(&self, name: &str, report: &mut ApplyReport) {
        let _ = self.runner.run("ip", &["addr", "flush", "dev", name]).await;

        let result = match self.runner.run("dhclient", &[name]).await {
            Ok(out) => out.require_success().map(|_| ()),
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(()) => report.action(format!("started DHCP client on {name}")),
            Err(e) => report.degrade(format!("start DHCP client on {name}"), e),
        }
    }

    async fn apply_static(
        &self,
        name: &str,
        config: &DesiredConfig,
        report: &mut ApplyReport,
    ) -> Result<()> {
        let cidr = config.cidr();

        let _ = self.runner.run("ip", &["addr", "flush", "dev", name]).await;

        self.runner
            .run("ip", &["addr", "add", &cidr, "dev", name])
            .await?
            .require_success()?;
        report.action(format!("added address {cidr} to {name}"));

        if let Some(gateway) = config.gateway {
            let gateway = gateway.to_string();
            let _ = self
                .runner
                .run("ip", &["route", "del", "default", "dev", name])
                .await;

            let result = match self
                .runner
                .run("ip", &["route", "add", "default", "via", &gateway, "dev", name])
                .await
            {
                Ok(out) => out.require_success().map(|_| ()),
                Err(e) => Err(e.into()),
            };
            match result {
                Ok(()) => report.action(format!("set default route via {gateway} on {name}")),
                Err(e) => report.degrade(format!("set default route via {gateway}"), e),
            }
        }

        if let Some(servers) = config.dns_servers.as_ref() {
            if !servers.is_empty() {
                match self.write_nameservers(&config.dns_strings()) {
                    Ok(()) => report.action(format!(
                        "updated nameservers: {}",
                        config.dns_strings().join(", ")
                    )),
                    Err(e) => report.degrade("update nameservers", e),
                }
            }
        }

        Ok(())
    }

    fn write_nameservers(&self, servers: &[String]) -> io::Result<()> {
        let current = match fs::read_to_string(&self.resolv_conf) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };
        fs::write(&self.resolv_conf, merge_nameservers(&current, servers))
    }
}

/// Replace the `nameserver` lines of a resolv.conf, keeping everything
/// else (options, search domains, comments) untouched.
fn merge_nameservers(content: &str, servers: &[String]) -> String {
    let mut lines: Vec<String> = content
        .lines()
        .filter(|line| !line.trim_start().starts_with("nameserver"))
        .map(|line| line.to_string())
        .collect();

    for server in servers {
        lines.push(format!("nameserver {server}"));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::exec::fake::FakeRunner;

    fn static_config() -> DesiredConfig {
        DesiredConfig {
            ip_address: Some(Ipv4Addr::new(10, 0, 0, 5)),
            netmask: Some(Ipv4Addr::new(255, 255, 255, 0)),
            gateway: Some(Ipv4Addr::new(10, 0, 0, 1)),
            dns_servers: None,
            is_dhcp: false,
        }
    }

    fn dhcp_config() -> DesiredConfig {
        DesiredConfig {
            ip_address: None,
            netmask: None,
            gateway: None,
            dns_servers: None,
            is_dhcp: true,
        }
    }

    #[tokio::test]
    async fn test_static_apply_sequence() {
        let runner = FakeRunner::new();
        let applier = DirectApplier::new(runner.clone());

        let report = applier.apply("eth0", &static_config()).await.unwrap();
        assert!(report.is_clean());

        let calls = runner.calls();
        assert_eq!(
            calls,
            vec![
                "ip link set dev eth0 up",
                "ip addr flush dev eth0",
                "ip addr add 10.0.0.5/24 dev eth0",
                "ip route del default dev eth0",
                "ip route add default via 10.0.0.1 dev eth0",
            ]
        );
    }

    #[tokio::test]
    async fn test_static_apply_surfaces_address_failure() {
        let runner = FakeRunner::new().fail("ip addr add", "permission denied");
        let applier = DirectApplier::new(runner);

        let err = applier.apply("eth0", &static_config()).await.unwrap_err();
        assert!(err.to_string().contains("permission denied"));
    }

    #[tokio::test]
    async fn test_gateway_failure_is_degraded() {
        let runner = FakeRunner::new().fail("ip route add", "network unreachable");
        let applier = DirectApplier::new(runner.clone());

        let report = applier.apply("eth0", &static_config()).await.unwrap();
        assert_eq!(report.degraded.len(), 1);
        assert!(report.degraded[0].operation.contains("default route"));
        // The address was still added.
        assert!(runner.ran("ip addr add 10.0.0.5/24 dev eth0"));
    }

    #[tokio::test]
    async fn test_dhcp_flushes_then_starts_client() {
        let runner = FakeRunner::new();
        let applier = DirectApplier::new(runner.clone());

        let report = applier.apply("eth0", &dhcp_config()).await.unwrap();
        assert!(report.is_clean());
        assert!(runner.ran("ip addr flush dev eth0"));
        assert!(runner.ran("dhclient eth0"));
    }

    #[tokio::test]
    async fn test_missing_dhcp_client_is_degraded_not_fatal() {
        let runner = FakeRunner::new().missing("dhclient");
        let applier = DirectApplier::new(runner);

        let report = applier.apply("eth0", &dhcp_config()).await.unwrap();
        assert_eq!(report.degraded.len(), 1);
        assert!(report.degraded[0].error.contains("dhclient"));
    }

    #[tokio::test]
    async fn test_dns_rewrite() {
        let tmp = tempfile::tempdir().unwrap();
        let resolv = tmp.path().join("resolv.conf");
        fs::write(&resolv, "search example.com\nnameserver 10.0.0.2\noptions edns0\n").unwrap();

        let mut config = static_config();
        config.dns_servers = Some(vec!["8.8.8.8".parse().unwrap(), "1.1.1.1".parse().unwrap()]);

        let applier = DirectApplier::new(FakeRunner::new()).with_resolv_conf(&resolv);
        let report = applier.apply("eth0", &config).await.unwrap();
        assert!(report.is_clean());

        let written = fs::read_to_string(&resolv).unwrap();
        assert_eq!(
            written,
            "search example.com\noptions edns0\nnameserver 8.8.8.8\nnameserver 1.1.1.1\n"
        );
    }

    #[test]
    fn test_merge_nameservers_on_empty_file() {
        let merged = merge_nameservers("", &["9.9.9.9".to_string()]);
        assert_eq!(merged, "nameserver 9.9.9.9\n");
    }
}
