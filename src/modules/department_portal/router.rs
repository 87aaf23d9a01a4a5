use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

use super::controller::*;

pub fn init_department_portal_router() -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview))
        .route("/subjects", get(subjects))
        .route("/sections", get(sections))
        .route("/teachers", get(teachers))
        .route(
            "/announcements",
            get(list_announcements).post(create_announcement),
        )
        .route(
            "/announcements/{id}",
            put(update_announcement).delete(delete_announcement),
        )
}
