//! hostnet-api server binary.

use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use hostnet_api::AppState;

/// HTTP API for host network configuration
#[derive(Parser, Debug)]
#[command(name = "hostnet-api")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "HOSTNET_BIND")]
    bind: IpAddr,

    /// Port to listen on
    #[arg(long, default_value_t = 8000, env = "HOSTNET_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let state = AppState::detect();
    info!(
        backend = state.env.backend.as_str(),
        container = state.env.container,
        "detected host environment"
    );

    let app = hostnet_api::router(state);

    let addr = SocketAddr::from((args.bind, args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        return;
    }
    info!("shutting down");
}
