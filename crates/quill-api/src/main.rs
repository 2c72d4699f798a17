//! Quill REST API entry point.
//!
//! Binary name: `quill`
//!
//! Reads settings from the environment, wires the application state, and
//! serves the chat API until Ctrl+C or SIGTERM.

mod http;
mod state;

use quill_infra::config::Settings;
use quill_observe::tracing_setup::{init_tracing, otel_enabled_from_env, shutdown_tracing};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(otel_enabled_from_env())
        .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))?;

    let settings = Settings::from_env();
    let bind_addr = settings.bind_addr.clone();
    let state = AppState::init(settings)?;
    let manager = state.manager.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "quill API listening");

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.shutdown().await;
    shutdown_tracing();
    tracing::info!("server stopped");

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
