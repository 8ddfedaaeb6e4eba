//! NetworkManager backend adapter.
//!
//! NetworkManager owns its own configuration store, so this adapter
//! only cycles devices and restarts the service; writes go through
//! the unsupported-backend error in [`super::Backend::configure`].

use super::{ApplyReport, link_cycle};
use crate::error::Result;
use crate::exec::CommandRunner;

#[derive(Debug, Clone)]
pub struct NetworkManagerBackend<R> {
    runner: R,
}

impl<R: CommandRunner + Clone> NetworkManagerBackend<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub(super) fn runner(&self) -> &R {
        &self.runner
    }

    /// Cycle the connection via `nmcli`, falling back to a plain link
    /// cycle when nmcli is broken or absent.
    pub async fn restart(&self, name: &str) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();

        let cycled = async {
            if let Ok(out) = self.runner.run("nmcli", &["connection", "down", name]).await {
                if !out.success {
                    tracing::debug!(interface = name, "nmcli down failed before up");
                }
            }
            self.runner
                .run("nmcli", &["connection", "up", name])
                .await?
                .require_success()?;
            crate::error::Result::Ok(())
        }
        .await;

        match cycled {
            Ok(()) => {
                report.action(format!("restarted {name} via nmcli"));
                Ok(report)
            }
            Err(e) => {
                report.degrade("restart via nmcli", e);
                link_cycle(&self.runner, name, &mut report).await?;
                Ok(report)
            }
        }
    }

    /// Restart the NetworkManager service to re-read its profiles.
    pub(super) async fn restart_service(&self, report: &mut ApplyReport) {
        let restarted = async {
            self.runner
                .run("systemctl", &["restart", "NetworkManager"])
                .await?
                .require_success()?;
            crate::error::Result::Ok(())
        }
        .await;

        match restarted {
            Ok(()) => report.action("restarted NetworkManager"),
            Err(e) => report.degrade("restart NetworkManager", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::fake::FakeRunner;

    #[tokio::test]
    async fn test_restart_cycles_connection_with_nmcli() {
        let runner = FakeRunner::new();
        let backend = NetworkManagerBackend::new(runner.clone());
        let report = backend.restart("eth0").await.unwrap();
        assert!(report.is_clean());
        assert_eq!(
            runner.calls(),
            vec!["nmcli connection down eth0", "nmcli connection up eth0"]
        );
    }

    #[tokio::test]
    async fn test_restart_falls_back_when_nmcli_missing() {
        let runner = FakeRunner::new().missing("nmcli");
        let backend = NetworkManagerBackend::new(runner.clone());
        let report = backend.restart("eth0").await.unwrap();
        assert!(!report.is_clean());
        assert!(runner.ran("ip link set dev eth0 up"));
    }

    #[tokio::test]
    async fn test_restart_service_degrades_on_failure() {
        let runner = FakeRunner::new().fail("systemctl", "unit not found");
        let backend = NetworkManagerBackend::new(runner.clone());
        let mut report = ApplyReport::default();
        backend.restart_service(&mut report).await;
        assert!(!report.is_clean());
    }
}
