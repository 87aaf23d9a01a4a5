use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{list_college_audit_logs, list_company_audit_logs};

pub fn init_college_audit_router() -> Router<AppState> {
    Router::new().route("/", get(list_college_audit_logs))
}

pub fn init_company_audit_router() -> Router<AppState> {
    Router::new().route("/", get(list_company_audit_logs))
}
