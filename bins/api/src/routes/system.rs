//! Service metadata and environment endpoints.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use hostnet::CommandRunner;

use crate::error::ApiResult;
use crate::state::AppState;

/// Tools whose presence callers commonly care about when deciding
/// whether a degraded report is expected.
const PROBED_TOOLS: &[&str] = &["hostnamectl", "netplan", "ifup", "nmcli", "systemctl", "ip"];

pub async fn index() -> Json<Value> {
    Json(json!({
        "service": "hostnet-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn config_type<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
) -> Json<Value> {
    Json(json!({
        "config_type": state.env.backend.as_str(),
        "description": state.env.backend.description(),
        "container": state.env.container,
    }))
}

pub async fn container_status<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
) -> Json<Value> {
    let mut tools = serde_json::Map::new();
    for tool in PROBED_TOOLS {
        let present = matches!(
            state.runner.run("which", &[*tool]).await,
            Ok(out) if out.success
        );
        tools.insert((*tool).to_string(), Value::Bool(present));
    }

    Json(json!({
        "container": state.env.container,
        "environment": if state.env.container { "container" } else { "host" },
        "tools": tools,
    }))
}

pub async fn info<R: CommandRunner + Clone>(
    State(state): State<AppState<R>>,
) -> ApiResult<Json<Value>> {
    let hostname = state.hostname.get().await;
    let interfaces = state.inventory.list().await?;
    let active = interfaces.iter().filter(|i| i.is_active).count();

    Ok(Json(json!({
        "hostname": hostname,
        "config_type": state.env.backend.as_str(),
        "container": state.env.container,
        "interface_count": interfaces.len(),
        "active_interface_count": active,
        "dns_servers": state.inventory.dns_servers(),
    })))
}
