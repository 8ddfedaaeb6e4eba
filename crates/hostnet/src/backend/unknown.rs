//! Fallback adapter for hosts whose configuration system is either
//! unrecognized or one we cannot write to (systemd-networkd).
//!
//! No configuration is persisted; only link-level operations via `ip`
//! are available.

use super::{ApplyReport, link_cycle};
use crate::env::BackendKind;
use crate::error::Result;
use crate::exec::CommandRunner;

#[derive(Debug, Clone)]
pub struct UnknownBackend<R> {
    runner: R,
    kind: BackendKind,
}

impl<R: CommandRunner + Clone> UnknownBackend<R> {
    pub fn new(runner: R, kind: BackendKind) -> Self {
        Self { runner, kind }
    }

    /// The detected kind this adapter is standing in for.
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub(super) fn runner(&self) -> &R {
        &self.runner
    }

    /// Cycle the link with `ip`; there is no service to go through.
    pub async fn restart(&self, name: &str) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();
        link_cycle(&self.runner, name, &mut report).await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::fake::FakeRunner;

    #[tokio::test]
    async fn test_restart_cycles_link() {
        let runner = FakeRunner::new();
        let backend = UnknownBackend::new(runner.clone(), BackendKind::Unknown);
        let report = backend.restart("eth0").await.unwrap();
        assert!(report.actions.iter().any(|a| a.contains("cycled")));
        assert_eq!(
            runner.calls(),
            vec!["ip link set dev eth0 down", "ip link set dev eth0 up"]
        );
    }

    #[tokio::test]
    async fn test_restart_surfaces_link_failure() {
        let runner = FakeRunner::new().fail("ip link set dev eth0 up", "no such device");
        let backend = UnknownBackend::new(runner.clone(), BackendKind::SystemdNetworkd);
        assert!(backend.restart("eth0").await.is_err());
    }
}
