//! Route table.

use axum::Router;
use axum::routing::{delete, get, post};

use hostnet::CommandRunner;

use crate::state::AppState;

pub mod hostname;
pub mod interfaces;
pub mod netplan;
pub mod network;
pub mod system;

pub fn router<R>(state: AppState<R>) -> Router
where
    R: CommandRunner + Clone + 'static,
{
    Router::new()
        .route("/", get(system::index))
        .route("/system/info", get(system::info::<R>))
        .route("/container/status", get(system::container_status::<R>))
        .route("/hostname", get(hostname::current::<R>))
        .route("/hostname", post(hostname::set::<R>))
        .route("/network/config-type", get(system::config_type::<R>))
        .route("/network/status", get(network::status::<R>))
        .route("/network/dns", get(network::dns::<R>))
        .route("/network/routes", get(network::routes::<R>))
        .route("/network/apply-config", post(network::apply_config::<R>))
        .route("/network/interfaces", get(interfaces::list::<R>))
        .route("/network/interfaces/all", get(interfaces::list_all::<R>))
        .route("/network/interfaces/{name}", get(interfaces::get_one::<R>))
        .route(
            "/network/interfaces/{name}/configure",
            post(interfaces::configure::<R>),
        )
        .route(
            "/network/interfaces/{name}/restart",
            post(interfaces::restart::<R>),
        )
        .route(
            "/network/interfaces/{name}/enable",
            post(interfaces::enable::<R>),
        )
        .route(
            "/network/interfaces/{name}/disable",
            post(interfaces::disable::<R>),
        )
        .route("/network/netplan/files", get(netplan::files::<R>))
        .route("/network/netplan/validate", post(netplan::validate::<R>))
        .route(
            "/network/netplan/cleanup/{name}",
            delete(netplan::cleanup::<R>),
        )
        .with_state(state)
}
