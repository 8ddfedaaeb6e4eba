//! Host name endpoints.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use hostnet::CommandRunner;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetHostnameRequest {
    pub hostname: String,
}

pub async fn current<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
) -> Json<Value> {
    Json(json!({ "hostname": state.hostname.get().await }))
}

/// Set the host name. A request naming the current hostname is a
/// no-op and reports `changed: false` without touching anything.
pub async fn set<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
    Json(req): Json<SetHostnameRequest>,
) -> ApiResult<Json<Value>> {
    let requested = req.hostname.trim().to_lowercase();
    let current = state.hostname.get().await;
    if requested == current {
        return Ok(Json(json!({
            "hostname": current,
            "changed": false,
        })));
    }

    let report = state.hostname.set(&requested).await?;
    Ok(Json(json!({
        "hostname": requested,
        "changed": true,
        "actions": report.actions,
        "degraded": report.degraded,
    })))
}
