//! Netplan document maintenance endpoints.

use std::os::unix::fs::PermissionsExt;
use std::time::UNIX_EPOCH;

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use hostnet::util::ifname;
use hostnet::{CommandRunner, Error};

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn files<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
) -> ApiResult<Json<Value>> {
    let mut files = Vec::new();
    for entry in state.netplan.list()? {
        let meta = std::fs::metadata(&entry.path)?;
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs());

        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        files.push(match &entry.document {
            Ok(_) => json!({
                "name": name,
                "path": entry.path,
                "size": meta.len(),
                "modified": modified,
                "interfaces": entry.interfaces(),
            }),
            Err(e) => json!({
                "name": name,
                "path": entry.path,
                "size": meta.len(),
                "modified": modified,
                "interfaces": [],
                "error": e.to_string(),
            }),
        });
    }

    Ok(Json(json!({
        "directory": state.netplan.dir(),
        "files": files,
    })))
}

pub async fn validate<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
) -> ApiResult<Json<Value>> {
    let mut results = Vec::new();
    for entry in state.netplan.list()? {
        let valid = state.netplan.validate(&entry.path, &state.runner).await;

        let mode = std::fs::metadata(&entry.path)?.permissions().mode() & 0o777;
        let permissions_warning = (mode != 0o600)
            .then(|| format!("mode {mode:03o}, expected 600"));

        results.push(json!({
            "name": entry.path.file_name().map(|n| n.to_string_lossy().into_owned()),
            "valid": valid,
            "error": entry.document.as_ref().err().map(ToString::to_string),
            "permissions_warning": permissions_warning,
        }));
    }

    Ok(Json(json!({ "files": results })))
}

/// Remove every netplan definition of one interface.
///
/// The target is an interface name, never a file name; documents that
/// also define other interfaces are rewritten, not deleted.
pub async fn cleanup<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    ifname::ensure_public(&name)?;

    let defined = state
        .netplan
        .list()?
        .iter()
        .any(|entry| entry.interfaces().iter().any(|i| i == &name));
    if !defined {
        return Err(Error::InterfaceNotFound { name }.into());
    }

    let actions = state.netplan.remove(&name);
    Ok(Json(json!({ "removed": name, "actions": actions })))
}
