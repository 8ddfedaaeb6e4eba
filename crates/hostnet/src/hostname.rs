//! Host name reads and writes.
//!
//! Reads walk a fallback chain (`hostnamectl`, `hostname`, the
//! `/etc/hostname` file) so the call succeeds even on stripped-down
//! containers. Writes push the new name through every layer that is
//! present and keep `/etc/hosts` in sync so `sudo` and friends do not
//! start complaining about an unresolvable name.

use std::path::PathBuf;

use crate::backend::ApplyReport;
use crate::error::{Error, Result};
use crate::exec::CommandRunner;

const FALLBACK_NAME: &str = "unknown";

/// Maximum label length per RFC 1123.
const MAX_LABEL_LEN: usize = 63;

/// Check a candidate host name against the RFC 1123 label grammar.
/// The static host name is a single label, so dots are rejected.
pub fn validate_hostname(name: &str) -> Result<()> {
    let fail = |reason: &str| {
        Err(Error::InvalidHostname {
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return fail("name is empty");
    }
    if name.len() > MAX_LABEL_LEN {
        return fail("name exceeds 63 characters");
    }
    if name.starts_with('-') || name.ends_with('-') {
        return fail("name starts or ends with a hyphen");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return fail("name contains characters outside [a-z0-9-]");
    }
    Ok(())
}

/// Rewrite the `127.0.1.1` entry of an `/etc/hosts` document to point
/// at `name`. The result has exactly one `127.0.1.1` line, and a
/// `127.0.0.1 localhost` line is synthesized when the file lacks one.
/// All other lines pass through untouched.
fn rewrite_hosts(content: &str, name: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut rewrote = false;
    let mut has_localhost = false;

    for line in content.lines() {
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("127.0.1.1") => {
                if !rewrote {
                    lines.push(format!("127.0.1.1\t{name}"));
                    rewrote = true;
                }
            }
            first => {
                if first == Some("127.0.0.1") && fields.any(|f| f == "localhost") {
                    has_localhost = true;
                }
                lines.push(line.to_string());
            }
        }
    }
    if !rewrote {
        lines.push(format!("127.0.1.1\t{name}"));
    }
    if !has_localhost {
        lines.insert(0, "127.0.0.1\tlocalhost".to_string());
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[derive(Debug, Clone)]
pub struct HostnameStore<R> {
    runner: R,
    hostname_file: PathBuf,
    hosts_file: PathBuf,
}

impl<R: CommandRunner> HostnameStore<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            hostname_file: PathBuf::from("/etc/hostname"),
            hosts_file: PathBuf::from("/etc/hosts"),
        }
    }

    /// Override the file locations (tests).
    pub fn with_files(
        mut self,
        hostname_file: impl Into<PathBuf>,
        hosts_file: impl Into<PathBuf>,
    ) -> Self {
        self.hostname_file = hostname_file.into();
        self.hosts_file = hosts_file.into();
        self
    }

    /// The current host name, via the first layer that answers.
    pub async fn get(&self) -> String {
        for (program, args) in [
            ("hostnamectl", &["--static"][..]),
            ("hostname", &[][..]),
        ] {
            if let Ok(out) = self.runner.run(program, args).await {
                let name = out.stdout.trim();
                if out.success && !name.is_empty() {
                    return name.to_string();
                }
            }
        }

        if let Ok(content) = std::fs::read_to_string(&self.hostname_file) {
            let name = content.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }

        FALLBACK_NAME.to_string()
    }

    /// Set the host name through every mechanism present.
    ///
    /// Fatal only when both the hostname service and the
    /// `/etc/hostname` write fail; every other layer degrades.
    pub async fn set(&self, name: &str) -> Result<ApplyReport> {
        let name = &name.trim().to_lowercase();
        validate_hostname(name)?;
        let mut report = ApplyReport::default();

        let service = async {
            self.runner
                .run("hostnamectl", &["set-hostname", name])
                .await?
                .require_success()?;
            Result::Ok(())
        }
        .await;

        let service_ok = match service {
            Ok(()) => {
                report.action(format!("hostnamectl set-hostname {name}"));
                true
            }
            Err(e) => {
                report.degrade("hostnamectl set-hostname", e);
                // hostnamectl would have set the kernel name too;
                // without it, set the transient name directly.
                match self.runner.run("hostname", &[name]).await {
                    Ok(out) if out.success => {
                        report.action(format!("transient hostname set to {name}"));
                    }
                    Ok(out) => report.degrade("set transient hostname", out.stderr.trim()),
                    Err(e) => report.degrade("set transient hostname", e),
                }
                false
            }
        };

        match std::fs::write(&self.hostname_file, format!("{name}\n")) {
            Ok(()) => report.action(format!("wrote {}", self.hostname_file.display())),
            Err(e) if service_ok => {
                report.degrade(format!("write {}", self.hostname_file.display()), e);
            }
            Err(e) => return Err(e.into()),
        }

        match self.sync_hosts(name) {
            Ok(()) => report.action(format!("updated {}", self.hosts_file.display())),
            Err(e) => report.degrade("update hosts file", e),
        }

        Ok(report)
    }

    fn sync_hosts(&self, name: &str) -> Result<()> {
        let current = match std::fs::read_to_string(&self.hosts_file) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        std::fs::write(&self.hosts_file, rewrite_hosts(&current, name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::fake::FakeRunner;

    fn store(runner: &FakeRunner, dir: &std::path::Path) -> HostnameStore<FakeRunner> {
        HostnameStore::new(runner.clone())
            .with_files(dir.join("hostname"), dir.join("hosts"))
    }

    #[test]
    fn test_validate_accepts_common_names() {
        for name in ["web01", "a", "node-3", "web-server-01", "0host"] {
            assert!(validate_hostname(name).is_ok(), "{name}");
        }
        assert!(validate_hostname(&"a".repeat(63)).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        for name in ["", "-start", "end-", "My_Host!", "Upper", "sp ace"] {
            assert!(validate_hostname(name).is_err(), "{name:?}");
        }
        assert!(validate_hostname(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_validate_rejects_dotted_names() {
        for name in ["node-3.example.com", "a.b", "trailing.", ".leading"] {
            assert!(validate_hostname(name).is_err(), "{name:?}");
        }
    }

    #[test]
    fn test_rewrite_hosts_replaces_existing_entry() {
        let hosts = "127.0.0.1 localhost\n127.0.1.1 oldname oldname.lan\n::1 ip6-localhost\n";
        let out = rewrite_hosts(hosts, "newname");
        assert!(out.contains("127.0.1.1\tnewname\n"));
        assert!(!out.contains("oldname"));
        assert!(out.contains("127.0.0.1 localhost"));
        assert!(out.contains("::1 ip6-localhost"));
    }

    #[test]
    fn test_rewrite_hosts_appends_when_missing() {
        let out = rewrite_hosts("127.0.0.1 localhost\n", "box");
        assert!(out.ends_with("127.0.1.1\tbox\n"));
    }

    #[test]
    fn test_rewrite_hosts_collapses_duplicate_entries() {
        let out = rewrite_hosts("127.0.1.1 a\n127.0.1.1 b\n", "c");
        assert_eq!(out.matches("127.0.1.1").count(), 1);
    }

    #[test]
    fn test_rewrite_hosts_synthesizes_localhost_line() {
        let out = rewrite_hosts("", "box");
        assert!(out.starts_with("127.0.0.1\tlocalhost\n"));
    }

    #[tokio::test]
    async fn test_get_prefers_hostnamectl() {
        let runner = FakeRunner::new().ok("hostnamectl --static", "fromctl\n");
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(store(&runner, tmp.path()).get().await, "fromctl");
    }

    #[tokio::test]
    async fn test_get_falls_back_to_file_then_unknown() {
        let runner = FakeRunner::new()
            .missing("hostnamectl")
            .missing("hostname");
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&runner, tmp.path());

        assert_eq!(store.get().await, "unknown");

        std::fs::write(tmp.path().join("hostname"), "fromfile\n").unwrap();
        assert_eq!(store.get().await, "fromfile");
    }

    #[tokio::test]
    async fn test_set_writes_files_and_hosts_entry() {
        let runner = FakeRunner::new();
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("hosts"), "127.0.0.1 localhost\n127.0.1.1 old\n").unwrap();

        let report = store(&runner, tmp.path()).set("fresh").await.unwrap();
        assert!(report.is_clean());
        assert!(runner.ran("hostnamectl set-hostname fresh"));

        let hostname = std::fs::read_to_string(tmp.path().join("hostname")).unwrap();
        assert_eq!(hostname, "fresh\n");
        let hosts = std::fs::read_to_string(tmp.path().join("hosts")).unwrap();
        assert!(hosts.contains("127.0.1.1\tfresh"));
        assert!(!hosts.contains("old"));
    }

    #[tokio::test]
    async fn test_set_degrades_without_hostnamectl() {
        let runner = FakeRunner::new().missing("hostnamectl");
        let tmp = tempfile::tempdir().unwrap();

        let report = store(&runner, tmp.path()).set("fresh").await.unwrap();
        assert!(!report.is_clean());
        assert!(runner.ran("hostname fresh"));
        assert!(std::fs::read_to_string(tmp.path().join("hostname")).is_ok());
    }

    #[tokio::test]
    async fn test_set_rejects_invalid_name_before_any_side_effect() {
        let runner = FakeRunner::new();
        let tmp = tempfile::tempdir().unwrap();

        let err = store(&runner, tmp.path()).set("bad_name").await.unwrap_err();
        assert!(err.is_validation());
        assert!(runner.calls().is_empty());
        assert!(!tmp.path().join("hostname").exists());
    }

    #[tokio::test]
    async fn test_set_file_write_failure_is_fatal_only_without_service() {
        let tmp = tempfile::tempdir().unwrap();
        let unwritable = tmp.path().join("missing-dir").join("hostname");

        let runner = FakeRunner::new();
        let store = HostnameStore::new(runner.clone())
            .with_files(&unwritable, tmp.path().join("hosts"));
        let report = store.set("fresh").await.unwrap();
        assert!(!report.is_clean());

        let runner = FakeRunner::new().missing("hostnamectl");
        let store = HostnameStore::new(runner)
            .with_files(&unwritable, tmp.path().join("hosts"));
        assert!(store.set("fresh").await.is_err());
    }

    #[tokio::test]
    async fn test_set_normalizes_case_and_whitespace() {
        let runner = FakeRunner::new();
        let tmp = tempfile::tempdir().unwrap();

        store(&runner, tmp.path()).set("  Web01 ").await.unwrap();
        let hostname = std::fs::read_to_string(tmp.path().join("hostname")).unwrap();
        assert_eq!(hostname, "web01\n");
    }
}
