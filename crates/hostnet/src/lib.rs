//! Host network configuration engine.
//!
//! The crate detects which configuration system owns a host's network
//! setup (netplan, ifupdown, NetworkManager, or systemd-networkd)
//! and routes declarative interface configuration through it, with a
//! direct `ip`-based applier as the last rung of every fallback chain.
//!
//! ```no_run
//! use hostnet::{Backend, DesiredConfig, HostEnv, SystemRunner};
//!
//! # async fn demo() -> hostnet::Result<()> {
//! let env = HostEnv::detect();
//! let backend = Backend::from_env(&env, SystemRunner::default());
//! let config: DesiredConfig = serde_json::from_str(r#"{"is_dhcp": true}"#)?;
//! let report = backend.configure("eth0", &config).await?;
//! for action in &report.actions {
//!     println!("{action}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod direct;
pub mod env;
pub mod error;
pub mod exec;
pub mod hostname;
pub mod inventory;
pub mod netplan;
pub mod types;
pub mod util;

pub use backend::{ApplyReport, Backend, DegradedStep};
pub use direct::DirectApplier;
pub use env::{BackendKind, DetectPaths, HostEnv};
pub use error::{Error, Result};
pub use exec::{CommandRunner, SystemRunner};
pub use hostname::HostnameStore;
pub use inventory::{Inventory, RouteInfo};
pub use netplan::NetplanStore;
pub use types::{DesiredConfig, InterfaceState};
