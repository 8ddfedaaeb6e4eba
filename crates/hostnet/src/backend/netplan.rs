//! Netplan backend adapter.

use super::{ApplyReport, link_cycle, link_set};
use crate::direct::DirectApplier;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::netplan::{EthernetSettings, NetplanStore};
use crate::types::DesiredConfig;

/// Adapter persisting state through [`NetplanStore`] and activating it
/// with `netplan apply`, or `netplan generate` plus direct application
/// inside containers, where a privileged apply cannot work.
#[derive(Debug, Clone)]
pub struct NetplanBackend<R> {
    runner: R,
    store: NetplanStore,
    direct: DirectApplier<R>,
    container: bool,
}

impl<R: CommandRunner + Clone> NetplanBackend<R> {
    /// Adapter over the standard `/etc/netplan` directory.
    pub fn new(runner: R, container: bool) -> Self {
        Self {
            direct: DirectApplier::new(runner.clone()),
            store: NetplanStore::new(),
            runner,
            container,
        }
    }

    /// Override the document store (tests).
    pub fn with_store(mut self, store: NetplanStore) -> Self {
        self.store = store;
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

    /// The document store backing this adapter.
    pub fn store(&self) -> &NetplanStore {
        &self.store
    }

    /// Persist the desired state, then activate it.
    ///
    /// On the host, `netplan apply` is attempted and the direct applier
    /// steps in only when it fails or is absent. In a container only
    /// `netplan generate` runs, immediately followed by direct
    /// application so the change is observable without a privileged
    /// apply.
    pub async fn configure(&self, name: &str, config: &DesiredConfig) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();

        let settings = EthernetSettings::from_desired(config);
        let path = self.store.upsert(name, settings)?;
        report.action(format!("wrote {}", path.display()));

        if !self.store.validate(&path, &self.runner).await {
            report.degrade(
                "validate netplan document",
                format!("{} failed validation", path.display()),
            );
        }

        if self.container {
            match self.generate().await {
                Ok(()) => report.action("netplan generate"),
                Err(e) => report.degrade("netplan generate", e),
            }
            report.merge(self.direct.apply(name, config).await?);
        } else {
            match self.apply().await {
                Ok(()) => report.action("netplan apply"),
                Err(e) => {
                    report.degrade("netplan apply", e);
                    report.merge(self.direct.apply(name, config).await?);
                }
            }
        }

        Ok(report)
    }

    /// Link down, re-apply (or generate in containers), link up; any
    /// failure falls back to a plain link cycle.
    pub async fn restart(&self, name: &str) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();

        let primary: Result<()> = async {
            link_set(&self.runner, name, "down").await?.require_success()?;
            if self.container {
                // Generate refreshes backend files but needs no init system;
                // its failure does not abort the cycle.
                if let Err(e) = self.generate().await {
                    tracing::debug!(error = %e, "netplan generate during restart failed");
                }
            } else {
                self.apply().await?;
            }
            link_set(&self.runner, name, "up").await?.require_success()?;
            Ok(())
        }
        .await;

        match primary {
            Ok(()) => {
                report.action(format!("restarted {name} via netplan"));
                Ok(report)
            }
            Err(e) => {
                report.degrade("restart via netplan", e);
                link_cycle(&self.runner, name, &mut report).await?;
                Ok(report)
            }
        }
    }

    /// `netplan apply` on hosts, `netplan generate` in containers.
    pub(super) async fn apply_or_generate(&self) -> Result<&'static str> {
        if self.container {
            self.generate().await?;
            Ok("netplan generate (container mode)")
        } else {
            self.apply().await?;
            Ok("netplan apply")
        }
    }

    async fn apply(&self) -> Result<()> {
        self.runner
            .run("netplan", &["apply"])
            .await?
            .require_success()?;
        Ok(())
    }

    async fn generate(&self) -> Result<()> {
        self.runner
            .run("netplan", &["generate"])
            .await?
            .require_success()?;
        Ok(())
    }
}
