use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{health, index, liveness, readiness};

pub fn init_health_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/readiness", get(readiness))
        .route("/liveness", get(liveness))
}
