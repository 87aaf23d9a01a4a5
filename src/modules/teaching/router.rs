use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::*;

pub fn init_teaching_router() -> Router<AppState> {
    Router::new()
        .route("/classes", get(classes))
        .route("/timetable", get(timetable))
        .route("/attendance", get(list_attendance).post(mark_attendance))
        .route(
            "/assignments",
            get(list_assignments).post(create_assignment),
        )
        .route(
            "/assignments/{id}",
            get(get_assignment).put(update_assignment),
        )
        .route("/assignments/{id}/publish", post(publish_assignment))
        .route("/assignments/{id}/close", post(close_assignment))
        .route("/assignments/{id}/submissions", get(list_submissions))
        .route("/submissions/{id}/grade", post(grade_submission))
        .route(
            "/assessments",
            get(list_assessments).post(create_assessment),
        )
        .route("/assessments/{id}/grades", get(list_grades).post(save_grades))
        .route("/assessments/{id}/publish-grades", post(publish_grades))
}
