//! Server startup and graceful shutdown.

use anyhow::Result;
use axum::Router;
use ingest_core::Config;

pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Listens for Ctrl+C (SIGINT) and SIGTERM. In-flight ingest tasks are
/// detached `tokio::spawn`s (§5: "If the process is shut down, in-flight
/// tasks abort; partial state is left durable") — shutdown here only stops
/// accepting new HTTP connections.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C signal"),
        _ = terminate => tracing::info!("received terminate signal"),
    }

    tracing::info!("shutting down gracefully");
    ingest_infra::shutdown_telemetry().await;
}
