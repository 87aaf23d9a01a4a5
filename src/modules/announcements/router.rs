use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{
    create_announcement, delete_announcement, get_announcement, list_announcements,
    update_announcement,
};

pub fn init_announcements_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_announcements).post(create_announcement))
        .route(
            "/{id}",
            get(get_announcement)
                .put(update_announcement)
                .delete(delete_announcement),
        )
}
