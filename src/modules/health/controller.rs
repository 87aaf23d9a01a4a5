use std::collections::BTreeMap;
use std::future::Future;
use std::time::{Duration, Instant};

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tokio::time::timeout;
use tracing::warn;

use crate::modules::health::model::{ComponentStatus, HealthReport};
use crate::state::AppState;

const CHECK_TIMEOUT: Duration = Duration::from_secs(3);

async fn check_component<F, E>(name: &'static str, check: F) -> ComponentStatus
where
    F: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let outcome = timeout(CHECK_TIMEOUT, check).await;
    let elapsed = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(())) => ComponentStatus::healthy(elapsed),
        Ok(Err(e)) => {
            warn!(component = name, error = %e, "Health check failed");
            ComponentStatus::unhealthy(elapsed, e.to_string())
        }
        Err(_) => {
            warn!(component = name, "Health check timed out");
            ComponentStatus::unhealthy(elapsed, "timed out".to_string())
        }
    }
}

fn respond(report: HealthReport) -> (StatusCode, Json<HealthReport>) {
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database and cache reachable", body = HealthReport),
        (status = 503, description = "A dependency is down", body = HealthReport)
    ),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let mut checks = BTreeMap::new();
    checks.insert("database", check_component("database", campusflow_db::ping(&state.db)).await);
    if let Some(cache) = state.cache() {
        checks.insert("cache", check_component("cache", cache.ping()).await);
    }
    respond(HealthReport::from_checks(checks))
}

#[utoipa::path(
    get,
    path = "/readiness",
    responses(
        (status = 200, description = "Ready for traffic", body = HealthReport),
        (status = 503, description = "Database unreachable", body = HealthReport)
    ),
    tag = "Health"
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let mut checks = BTreeMap::new();
    checks.insert("database", check_component("database", campusflow_db::ping(&state.db)).await);
    respond(HealthReport::from_checks(checks))
}

#[utoipa::path(
    get,
    path = "/liveness",
    responses((status = 200, description = "Process is up")),
    tag = "Health"
)]
pub async fn liveness() -> Json<Value> {
    Json(json!({ "status": "alive" }))
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service name, version and docs location")),
    tag = "Health"
)]
pub async fn index() -> Json<Value> {
    Json(json!({
        "name": "campusflow",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/swagger-ui",
    }))
}
