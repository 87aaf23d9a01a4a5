use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    change_password, get_profile, my_announcements, platform_announcements, public_settings,
    update_profile,
};

pub fn init_account_router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", post(change_password))
        .route("/announcements", get(my_announcements))
        .route("/platform-announcements", get(platform_announcements))
        .route("/settings", get(public_settings))
}
