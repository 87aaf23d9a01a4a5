use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{create_entry, delete_entry, get_entry, list_entries, update_entry};

pub fn init_timetable_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_entries).post(create_entry))
        .route(
            "/{id}",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
}
