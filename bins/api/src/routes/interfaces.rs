//! Interface read and mutation endpoints.

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use hostnet::util::ifname;
use hostnet::{ApplyReport, CommandRunner, DesiredConfig, InterfaceState};

use crate::error::ApiResult;
use crate::state::AppState;

fn report_json(report: ApplyReport) -> Json<Value> {
    Json(json!({
        "success": report.is_clean(),
        "actions": report.actions,
        "degraded": report.degraded,
    }))
}

pub async fn list<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
) -> ApiResult<Json<Vec<InterfaceState>>> {
    Ok(Json(state.inventory.list().await?))
}

/// Every interface on the host, loopback and virtual devices
/// included, tagged by whether the mutation endpoints accept it.
pub async fn list_all<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
) -> ApiResult<Json<Value>> {
    let interfaces: Vec<Value> = state
        .inventory
        .list_all()
        .await?
        .into_iter()
        .map(|s| {
            json!({
                "name": s.name,
                "type": if ifname::is_public(&s.name) { "public" } else { "system" },
                "is_active": s.is_active,
                "ip_address": s.ip_address,
            })
        })
        .collect();
    Ok(Json(json!({ "interfaces": interfaces })))
}

pub async fn get_one<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
    Path(name): Path<String>,
) -> ApiResult<Json<InterfaceState>> {
    Ok(Json(state.inventory.get(&name).await?))
}

pub async fn configure<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
    Path(name): Path<String>,
    Json(config): Json<DesiredConfig>,
) -> ApiResult<Json<Value>> {
    // Refuse to persist settings for interfaces the host does not have.
    state.inventory.get(&name).await?;
    let report = state.backend.configure(&name, &config).await?;
    Ok(report_json(report))
}

pub async fn restart<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    let report = state.backend.restart(&name).await?;
    Ok(report_json(report))
}

pub async fn enable<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    let report = state.backend.enable(&name).await?;
    Ok(report_json(report))
}

pub async fn disable<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    let report = state.backend.disable(&name).await?;
    Ok(report_json(report))
}
