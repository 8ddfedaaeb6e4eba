//! Host environment detection.
//!
//! Classifies the active network-configuration subsystem and decides
//! whether the process is running inside a container, where `systemd`
//! and `netplan apply` do not function. Both facts are computed once at
//! startup and carried in an immutable [`HostEnv`] that is passed by
//! reference into every component; there is no live re-detection.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// The host's active network-configuration subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Ubuntu netplan YAML under `/etc/netplan`.
    #[serde(rename = "netplan")]
    Netplan,
    /// Debian-style `/etc/network/interfaces`.
    #[serde(rename = "interfaces")]
    LegacyInterfaces,
    /// NetworkManager keyfiles under `/etc/NetworkManager`.
    #[serde(rename = "networkmanager")]
    NetworkManager,
    /// systemd-networkd units under `/etc/systemd/network`.
    SystemdNetworkd,
    /// None of the known subsystems present.
    Unknown,
}

impl BackendKind {
    /// Human-readable description, as reported by the API.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Netplan => "Ubuntu/Netplan configuration",
            Self::LegacyInterfaces => "Debian/Ubuntu traditional interfaces",
            Self::NetworkManager => "NetworkManager configuration",
            Self::SystemdNetworkd => "Systemd-networkd configuration",
            Self::Unknown => "Unknown configuration type",
        }
    }

    /// Wire name of the kind (`netplan`, `interfaces`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Netplan => "netplan",
            Self::LegacyInterfaces => "interfaces",
            Self::NetworkManager => "networkmanager",
            Self::SystemdNetworkd => "systemd-networkd",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filesystem locations probed during detection.
///
/// Injectable so detection can be tested against a scratch directory.
#[derive(Debug, Clone)]
pub struct DetectPaths {
    /// Netplan configuration directory.
    pub netplan_dir: PathBuf,
    /// NetworkManager per-connection keyfile directory.
    pub nm_connections_dir: PathBuf,
    /// Legacy ifupdown interfaces file.
    pub interfaces_file: PathBuf,
    /// systemd-networkd unit directory.
    pub networkd_dir: PathBuf,
    /// Docker container marker file.
    pub dockerenv: PathBuf,
    /// PID 1 control-group membership file.
    pub pid1_cgroup: PathBuf,
}

impl Default for DetectPaths {
    fn default() -> Self {
        Self {
            netplan_dir: PathBuf::from("/etc/netplan"),
            nm_connections_dir: PathBuf::from("/etc/NetworkManager/system-connections"),
            interfaces_file: PathBuf::from("/etc/network/interfaces"),
            networkd_dir: PathBuf::from("/etc/systemd/network"),
            dockerenv: PathBuf::from("/.dockerenv"),
            pid1_cgroup: PathBuf::from("/proc/1/cgroup"),
        }
    }
}

/// Immutable per-process host facts.
#[derive(Debug, Clone, Copy)]
pub struct HostEnv {
    /// The detected configuration backend.
    pub backend: BackendKind,
    /// Whether privileged restart operations must be suppressed.
    pub container: bool,
}

impl HostEnv {
    /// Detect the environment from the standard filesystem locations.
    pub fn detect() -> Self {
        Self::detect_with(&DetectPaths::default())
    }

    /// Detect the environment from explicit probe paths.
    pub fn detect_with(paths: &DetectPaths) -> Self {
        let backend = detect_backend(paths);
        let container = detect_container(paths);
        tracing::info!(backend = %backend, container, "detected host environment");
        Self { backend, container }
    }
}

/// First match wins: netplan, NetworkManager, legacy interfaces,
/// systemd-networkd.
fn detect_backend(paths: &DetectPaths) -> BackendKind {
    if dir_non_empty(&paths.netplan_dir) {
        return BackendKind::Netplan;
    }
    if paths.nm_connections_dir.exists() {
        return BackendKind::NetworkManager;
    }
    if paths.interfaces_file.exists() {
        return BackendKind::LegacyInterfaces;
    }
    if paths.networkd_dir.exists() {
        return BackendKind::SystemdNetworkd;
    }
    BackendKind::Unknown
}

fn detect_container(paths: &DetectPaths) -> bool {
    if paths.dockerenv.exists() {
        return true;
    }

    if std::env::var_os("container").is_some() || std::env::var_os("DOCKER_CONTAINER").is_some() {
        return true;
    }

    match std::fs::read_to_string(&paths.pid1_cgroup) {
        Ok(content) => cgroup_mentions_container(&content),
        Err(_) => false,
    }
}

/// Whether PID 1's cgroup membership names a known container runtime.
fn cgroup_mentions_container(content: &str) -> bool {
    content.contains("docker") || content.contains("containerd")
}

fn dir_non_empty(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => false,
    }
}
