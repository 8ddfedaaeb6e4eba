//! On-disk netplan document store.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use super::{Document, EthernetSettings};
use crate::error::{Error, Result};
use crate::exec::CommandRunner;

/// One enumerated document: its path and either the parsed document or
/// the parse error. A broken file never aborts enumeration of the rest.
#[derive(Debug)]
pub struct DocumentEntry {
    /// Absolute path of the YAML file.
    pub path: PathBuf,
    /// Parsed document, or why parsing failed.
    pub document: Result<Document>,
}

impl DocumentEntry {
    /// Interface names defined by this document; empty when unparsable.
    pub fn interfaces(&self) -> Vec<String> {
        match &self.document {
            Ok(doc) => doc.interfaces(),
            Err(_) => Vec::new(),
        }
    }
}

/// Store over a netplan configuration directory.
///
/// Invariant: after `upsert`, exactly one document defines the interface
/// with exactly the new settings; after `remove`, none does. There is no
/// locking: two concurrent writers to the same interface race with
/// last-writer-wins semantics.
#[derive(Debug, Clone)]
pub struct NetplanStore {
    dir: PathBuf,
}

impl NetplanStore {
    /// Store over the standard `/etc/netplan` directory.
    pub fn new() -> Self {
        Self::at("/etc/netplan")
    }

    /// Store over an explicit directory.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory this store owns.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Enumerate `*.yaml` documents in deterministic order.
    ///
    /// Returns an empty list when the directory does not exist.
    pub fn list(&self) -> Result<Vec<DocumentEntry>> {
        let mut paths = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "yaml") {
                paths.push(path);
            }
        }
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|path| DocumentEntry {
                document: read_document(&path),
                path,
            })
            .collect())
    }

    /// Persist `settings` as the sole definition of `interface`.
    ///
    /// Any pre-existing definition across all documents is removed
    /// first, then a fresh single-interface document is written as
    /// `01-<interface>.yaml` with owner-only permissions (netplan files
    /// may carry credentials in general use).
    pub fn upsert(&self, interface: &str, settings: EthernetSettings) -> Result<PathBuf> {
        self.remove(interface);

        fs::create_dir_all(&self.dir)?;
        let path = self.document_path(interface);
        let doc = Document::single(interface, settings);
        write_document(&path, &doc)?;
        tracing::info!(path = %path.display(), interface, "wrote netplan document");
        Ok(path)
    }

    /// Remove every definition of `interface` across all documents.
    ///
    /// A document whose only interface it is gets deleted; otherwise the
    /// interface block is dropped and the document rewritten. Failures
    /// on individual documents are logged and skipped; cleanup is
    /// best-effort and continues across the rest. Returns a description
    /// of each action taken.
    pub fn remove(&self, interface: &str) -> Vec<String> {
        let mut actions = Vec::new();

        let entries = match self.list() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate netplan documents");
                return actions;
            }
        };

        for entry in entries {
            let mut doc = match entry.document {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(path = %entry.path.display(), error = %e, "skipping unparsable netplan document");
                    continue;
                }
            };

            if !doc.defines(interface) {
                continue;
            }

            doc.network.ethernets.remove(interface);

            let result = if doc.network.ethernets.is_empty() {
                fs::remove_file(&entry.path).map_err(Error::from).map(|()| {
                    format!("removed {}", entry.path.display())
                })
            } else {
                write_document(&entry.path, &doc)
                    .map(|()| format!("updated {}", entry.path.display()))
            };

            match result {
                Ok(action) => {
                    tracing::info!(path = %entry.path.display(), interface, "{action}");
                    actions.push(action);
                }
                Err(e) => {
                    tracing::warn!(path = %entry.path.display(), error = %e, "could not clean up netplan document");
                }
            }
        }

        actions
    }

    /// Check a document, preferring the backend's own syntax checker.
    ///
    /// Falls back to a plain YAML parse when the checker is absent. A
    /// file failing both is invalid.
    pub async fn validate<R: CommandRunner>(&self, path: &Path, runner: &R) -> bool {
        let path_str = path.to_string_lossy();
        match runner.run("netplan", &["info", &path_str]).await {
            Ok(output) => output.success,
            Err(_) => read_document(path).is_ok(),
        }
    }

    /// Deterministic document path for an interface.
    pub fn document_path(&self, interface: &str) -> PathBuf {
        self.dir.join(format!("01-{interface}.yaml"))
    }
}

impl Default for NetplanStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read_document(path: &Path) -> Result<Document> {
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

fn write_document(path: &Path, doc: &Document) -> Result<()> {
    let yaml = serde_yaml::to_string(doc)?;
    fs::write(path, yaml)?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}
