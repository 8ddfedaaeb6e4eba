//! hostnet-api - HTTP surface over the hostnet engine.
//!
//! The router builder lives in the library so integration tests can
//! drive the full stack with a scripted command runner.

use axum::Router;
use tower_http::trace::TraceLayer;

use hostnet::CommandRunner;

pub mod error;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Build the application router over a prepared state.
pub fn router<R>(state: AppState<R>) -> Router
where
    R: CommandRunner + Clone + 'static,
{
    routes::router(state).layer(TraceLayer::new_for_http())
}
