use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{cancel_fee, create_fee, get_fee, list_fees, mark_overdue, pay_fee};

pub fn init_fees_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_fees).post(create_fee))
        .route("/mark-overdue", post(mark_overdue))
        .route("/{id}", get(get_fee))
        .route("/{id}/pay", post(pay_fee))
        .route("/{id}/cancel", post(cancel_fee))
}
