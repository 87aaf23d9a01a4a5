use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{child_attendance, child_fees, child_grades, children};

pub fn init_parent_portal_router() -> Router<AppState> {
    Router::new()
        .route("/children", get(children))
        .route("/children/{student_id}/attendance", get(child_attendance))
        .route("/children/{student_id}/grades", get(child_grades))
        .route("/children/{student_id}/fees", get(child_fees))
}
