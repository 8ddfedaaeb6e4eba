//! Network-wide read and apply endpoints.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use hostnet::CommandRunner;

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn status<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
) -> ApiResult<Json<Value>> {
    let interfaces = state.inventory.list().await?;
    let routes = state.inventory.routes().await.unwrap_or_default();

    Ok(Json(json!({
        "config_type": state.env.backend.as_str(),
        "container": state.env.container,
        "interfaces": interfaces,
        "routes": routes,
        "dns_servers": state.inventory.dns_servers(),
    })))
}

pub async fn dns<R: CommandRunner + Clone>(State(state): State<AppState<R>>) -> Json<Value> {
    Json(json!({ "dns_servers": state.inventory.dns_servers() }))
}

pub async fn routes<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "routes": state.inventory.routes().await? })))
}

/// Re-apply the whole persisted configuration. Failures show up as
/// degraded steps in a 200 response; the caller decides how hard to
/// react.
pub async fn apply_config<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
) -> Json<Value> {
    let report = state.backend.apply_all().await;
    Json(json!({
        "success": report.is_clean(),
        "actions": report.actions,
        "degraded": report.degraded,
    }))
}
