//! Error types for network configuration operations.

use std::io;

/// Result type for network configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while inspecting or mutating host network state.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON deserialization error (e.g. `ip -j` output).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (netplan document) error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An external tool exited with a non-zero status.
    #[error("{command} failed: {stderr}")]
    CommandFailed {
        /// The command line that failed.
        command: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// An external tool is not installed on this host.
    #[error("tool not found: {program}")]
    ToolMissing {
        /// The program that could not be spawned.
        program: String,
    },

    /// Interface name does not match any public NIC grammar.
    #[error("interface {name} is not a public network interface")]
    NotPublicInterface {
        /// The rejected interface name.
        name: String,
    },

    /// Interface absent from the current inventory.
    #[error("interface not found: {name}")]
    InterfaceNotFound {
        /// The interface name that was not found.
        name: String,
    },

    /// The detected configuration backend cannot persist interface state.
    #[error("configuration backend {kind} is not supported for this operation")]
    UnsupportedBackend {
        /// Wire name of the backend kind.
        kind: String,
    },

    /// Hostname rejected by the RFC-1123 label grammar.
    #[error("invalid hostname: {reason}")]
    InvalidHostname {
        /// Why the hostname was rejected.
        reason: String,
    },

    /// Interface configuration payload rejected before any mutation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Check if this error is a caller mistake (4xx-equivalent).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NotPublicInterface { .. }
                | Self::UnsupportedBackend { .. }
                | Self::InvalidHostname { .. }
                | Self::InvalidConfig(_)
        )
    }

    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::InterfaceNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(
            Error::NotPublicInterface {
                name: "docker0".into()
            }
            .is_validation()
        );
        assert!(
            Error::InvalidHostname {
                reason: "empty".into()
            }
            .is_validation()
        );
        assert!(
            Error::InterfaceNotFound {
                name: "eth9".into()
            }
            .is_not_found()
        );
        assert!(
            !Error::CommandFailed {
                command: "netplan apply".into(),
                stderr: "boom".into()
            }
            .is_validation()
        );
    }

    #[test]
    fn test_error_messages() {
        let err = Error::NotPublicInterface {
            name: "veth1234".into(),
        };
        assert_eq!(
            err.to_string(),
            "interface veth1234 is not a public network interface"
        );

        let err = Error::ToolMissing {
            program: "netplan".into(),
        };
        assert_eq!(err.to_string(), "tool not found: netplan");
    }
}
