use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::*;

pub fn init_student_portal_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/attendance", get(attendance))
        .route("/assignments", get(assignments))
        .route("/assignments/{id}/submit", post(submit_assignment))
        .route("/grades", get(grades))
        .route("/timetable", get(timetable))
        .route("/fees", get(fees))
}
