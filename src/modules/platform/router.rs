use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    comment_any_ticket, comment_college_ticket, create_global_announcement, create_setting,
    delete_global_announcement, delete_setting, get_any_ticket, get_college_ticket,
    get_global_announcement, get_setting, list_all_tickets, list_college_tickets,
    list_global_announcements, list_settings, open_ticket, update_global_announcement,
    update_setting, update_ticket,
};

pub fn init_college_tickets_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_college_tickets).post(open_ticket))
        .route("/{id}", get(get_college_ticket))
        .route("/{id}/comments", post(comment_college_ticket))
}

pub fn init_company_tickets_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all_tickets))
        .route("/{id}", get(get_any_ticket).put(update_ticket))
        .route("/{id}/comments", post(comment_any_ticket))
}

pub fn init_company_settings_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_settings).post(create_setting))
        .route(
            "/{key}",
            get(get_setting).put(update_setting).delete(delete_setting),
        )
}

pub fn init_company_announcements_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_global_announcements).post(create_global_announcement))
        .route(
            "/{id}",
            get(get_global_announcement)
                .put(update_global_announcement)
                .delete(delete_global_announcement),
        )
}
