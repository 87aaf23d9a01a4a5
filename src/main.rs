use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use campusflow::logging::{init_tracing, shutdown_tracer};
use campusflow::metrics::{init_metrics, metrics_app};
use campusflow::router::init_router;
use campusflow::state::init_app_state;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_METRICS_PORT: u16 = 3001;

fn port_from_env(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let metrics_handle = match init_metrics() {
        Ok(handle) => handle,
        Err(e) => {
            warn!(error = %e, "Prometheus recorder unavailable, metrics disabled");
            None
        }
    };

    let state = init_app_state().await?;
    sqlx::migrate!("./migrations")
        .run(&state.db)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations applied");

    if let Some(limiters) = state.rate_limiters.clone() {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
                limiters.retain_recent();
            }
        });
    }

    if let Some(handle) = metrics_handle {
        let metrics_port = port_from_env("METRICS_PORT", DEFAULT_METRICS_PORT);
        let listener = TcpListener::bind(("0.0.0.0", metrics_port))
            .await
            .with_context(|| format!("Failed to bind metrics port {metrics_port}"))?;
        info!(port = metrics_port, "Metrics available at /metrics");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, metrics_app(handle)).await {
                error!(error = %e, "Metrics server stopped");
            }
        });
    }

    let port = port_from_env("PORT", DEFAULT_PORT);
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    info!(port, "Server running");
    info!("Swagger UI available at http://localhost:{port}/swagger-ui");
    info!("Scalar UI available at http://localhost:{port}/scalar");

    axum::serve(
        listener,
        init_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    shutdown_tracer();
    Ok(())
}
