//! Configuration backend adapters.
//!
//! One adapter per detected subsystem translates a [`DesiredConfig`]
//! into that subsystem's persisted state and triggers its activation
//! mechanism. Activation is layered: when the primary mechanism fails
//! or is unavailable (containers, missing tools), the adapters fall
//! back until the live interface state matches the request, and only
//! exhaustion of every fallback surfaces as an error. Secondary steps
//! that fail without compromising the primary action are reported as
//! degraded, never swallowed silently.

pub mod legacy;
mod netplan;
mod nm;
mod unknown;

use serde::Serialize;

use crate::env::{BackendKind, HostEnv};
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::types::DesiredConfig;
use crate::util::ifname;

pub use legacy::LegacyBackend;
pub use netplan::NetplanBackend;
pub use nm::NetworkManagerBackend;
pub use unknown::UnknownBackend;

/// A secondary step that failed without failing the parent operation.
#[derive(Debug, Clone, Serialize)]
pub struct DegradedStep {
    /// What was being attempted.
    pub operation: String,
    /// The underlying error text.
    pub error: String,
}

impl std::fmt::Display for DegradedStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.operation, self.error)
    }
}

/// Outcome of a mutating backend operation.
///
/// An `Ok(ApplyReport)` means the primary action succeeded; `degraded`
/// lists every best-effort step that failed along the way.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    /// Steps performed, in order.
    pub actions: Vec<String>,
    /// Best-effort steps that failed.
    pub degraded: Vec<DegradedStep>,
}

impl ApplyReport {
    /// Record a completed step.
    pub fn action(&mut self, action: impl Into<String>) {
        self.actions.push(action.into());
    }

    /// Record a failed best-effort step.
    pub fn degrade(&mut self, operation: impl Into<String>, error: impl ToString) {
        let step = DegradedStep {
            operation: operation.into(),
            error: error.to_string(),
        };
        tracing::warn!(operation = %step.operation, error = %step.error, "degraded step");
        self.degraded.push(step);
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: ApplyReport) {
        self.actions.extend(other.actions);
        self.degraded.extend(other.degraded);
    }

    /// Whether every step, including best-effort ones, succeeded.
    pub fn is_clean(&self) -> bool {
        self.degraded.is_empty()
    }
}

/// Backend adapter, selected once at construction from the detected
/// environment.
#[derive(Debug, Clone)]
pub enum Backend<R> {
    /// Netplan YAML store plus `netplan generate`/`apply`.
    Netplan(NetplanBackend<R>),
    /// Legacy `/etc/network/interfaces` plus ifupdown.
    Legacy(LegacyBackend<R>),
    /// NetworkManager; restart-only, no persisted configure.
    NetworkManager(NetworkManagerBackend<R>),
    /// No usable subsystem; link toggling only.
    Unknown(UnknownBackend<R>),
}

impl<R: CommandRunner + Clone> Backend<R> {
    /// Select the adapter for the detected environment.
    ///
    /// systemd-networkd has no configure or restart implementation in
    /// this engine and maps to the link-toggling adapter.
    pub fn from_env(env: &HostEnv, runner: R) -> Self {
        match env.backend {
            BackendKind::Netplan => Self::Netplan(NetplanBackend::new(runner, env.container)),
            BackendKind::LegacyInterfaces => Self::Legacy(LegacyBackend::new(runner)),
            BackendKind::NetworkManager => {
                Self::NetworkManager(NetworkManagerBackend::new(runner))
            }
            BackendKind::SystemdNetworkd | BackendKind::Unknown => {
                Self::Unknown(UnknownBackend::new(runner, env.backend))
            }
        }
    }

    /// Persist and activate a desired configuration for one interface.
    ///
    /// Fails closed on non-public interface names and invalid payloads
    /// before touching any state.
    pub async fn configure(&self, name: &str, config: &DesiredConfig) -> Result<ApplyReport> {
        ifname::ensure_public(name)?;
        config.validate()?;
        match self {
            Self::Netplan(b) => b.configure(name, config).await,
            Self::Legacy(b) => b.configure(name, config).await,
            Self::NetworkManager(_) => Err(Error::UnsupportedBackend {
                kind: BackendKind::NetworkManager.as_str().to_string(),
            }),
            Self::Unknown(b) => Err(Error::UnsupportedBackend {
                kind: b.kind().as_str().to_string(),
            }),
        }
    }

    /// Cycle an interface through its backend-specific restart path,
    /// with a plain link down/up fallback.
    pub async fn restart(&self, name: &str) -> Result<ApplyReport> {
        ifname::ensure_public(name)?;
        match self {
            Self::Netplan(b) => b.restart(name).await,
            Self::Legacy(b) => b.restart(name).await,
            Self::NetworkManager(b) => b.restart(name).await,
            Self::Unknown(b) => b.restart(name).await,
        }
    }

    /// Bring the link administratively up. Netplan additionally
    /// re-applies its configuration, best-effort.
    pub async fn enable(&self, name: &str) -> Result<ApplyReport> {
        ifname::ensure_public(name)?;
        let mut report = ApplyReport::default();

        link_set(self.runner(), name, "up")
            .await?
            .require_success()?;
        report.action(format!("link {name} up"));

        if let Self::Netplan(b) = self {
            match b.apply_or_generate().await {
                Ok(action) => report.action(action),
                Err(e) => report.degrade("netplan re-apply", e),
            }
        }

        Ok(report)
    }

    /// Bring the link administratively down.
    pub async fn disable(&self, name: &str) -> Result<ApplyReport> {
        ifname::ensure_public(name)?;
        let mut report = ApplyReport::default();
        link_set(self.runner(), name, "down")
            .await?
            .require_success()?;
        report.action(format!("link {name} down"));
        Ok(report)
    }

    /// Re-apply the whole persisted configuration through the
    /// backend's service-level mechanism.
    ///
    /// Failures are reported as degraded steps; callers inspect
    /// [`ApplyReport::is_clean`] rather than an `Err`.
    pub async fn apply_all(&self) -> ApplyReport {
        let mut report = ApplyReport::default();
        match self {
            Self::Netplan(b) => match b.apply_or_generate().await {
                Ok(action) => report.action(action),
                Err(e) => report.degrade("netplan", e),
            },
            Self::Legacy(b) => b.restart_networking(&mut report).await,
            Self::NetworkManager(b) => b.restart_service(&mut report).await,
            Self::Unknown(b) => {
                report.degrade(
                    "apply configuration",
                    format!("no apply action for {} config type", b.kind()),
                );
            }
        }
        report
    }

    fn runner(&self) -> &R {
        match self {
            Self::Netplan(b) => b.runner(),
            Self::Legacy(b) => b.runner(),
            Self::NetworkManager(b) => b.runner(),
            Self::Unknown(b) => b.runner(),
        }
    }
}

/// `ip link set dev <name> <state>`.
pub(crate) async fn link_set<R: CommandRunner>(
    runner: &R,
    name: &str,
    state: &str,
) -> Result<crate::exec::CmdOutput> {
    Ok(runner
        .run("ip", &["link", "set", "dev", name, state])
        .await?)
}

/// Plain link down/up cycle, the final fallback of every restart path.
/// The down step is allowed to fail; the up step must succeed.
pub(crate) async fn link_cycle<R: CommandRunner>(
    runner: &R,
    name: &str,
    report: &mut ApplyReport,
) -> Result<()> {
    if let Ok(out) = link_set(runner, name, "down").await {
        if !out.success {
            tracing::debug!(interface = name, "link down failed before up");
        }
    }
    link_set(runner, name, "up").await?.require_success()?;
    report.action(format!("link {name} cycled"));
    Ok(())
}
