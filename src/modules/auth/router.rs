use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    forgot_password, login, logout, me, refresh_token, reset_password, signup,
};

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/signup", post(signup))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/logout", post(logout))
        .route("/me", get(me))
}
