use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

use super::controller::{
    activate_tenant, add_domain, company_dashboard, create_tenant, delete_domain, delete_tenant,
    get_tenant, get_tenant_usage, list_domains, list_tenants, suspend_tenant, update_tenant,
    verify_domain,
};

pub fn init_tenants_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tenants).post(create_tenant))
        .route(
            "/{id}",
            get(get_tenant).put(update_tenant).delete(delete_tenant),
        )
        .route("/{id}/suspend", post(suspend_tenant))
        .route("/{id}/activate", post(activate_tenant))
        .route("/{id}/usage", get(get_tenant_usage))
        .route("/{id}/domains", get(list_domains).post(add_domain))
}

pub fn init_company_domains_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/verify", post(verify_domain))
        .route("/{id}", delete(delete_domain))
}

pub fn init_company_dashboard_router() -> Router<AppState> {
    Router::new().route("/", get(company_dashboard))
}
