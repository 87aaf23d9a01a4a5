use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::{Router, middleware};
use campusflow_cache::{CacheControl, cache_control, etag_middleware};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::middleware::access::enforce_portal_access;
use crate::middleware::audit::audit_middleware;
use crate::middleware::rate_limit::{with_auth_limit, with_general_limit};
use crate::middleware::tenancy::{TENANT_ID_HEADER, tenant_middleware};
use crate::modules::academics::{
    init_academic_years_router, init_departments_router, init_enrollments_router,
    init_parent_links_router, init_sections_router, init_subjects_router,
    init_teacher_assignments_router,
};
use crate::modules::account::init_account_router;
use crate::modules::announcements::init_announcements_router;
use crate::modules::audit::{init_college_audit_router, init_company_audit_router};
use crate::modules::auth::init_auth_router;
use crate::modules::billing::{
    init_billing_router, init_company_coupons_router, init_company_invoices_router,
    init_company_payments_router, init_company_plans_router, init_company_subscriptions_router,
    init_pricing_router, init_subscription_router,
};
use crate::modules::department_portal::init_department_portal_router;
use crate::modules::fees::init_fees_router;
use crate::modules::health::init_health_router;
use crate::modules::parent_portal::init_parent_portal_router;
use crate::modules::platform::{
    init_college_tickets_router, init_company_announcements_router, init_company_settings_router,
    init_company_tickets_router,
};
use crate::modules::student_portal::init_student_portal_router;
use crate::modules::teaching::init_teaching_router;
use crate::modules::tenants::{
    init_company_dashboard_router, init_company_domains_router, init_tenants_router,
};
use crate::modules::timetable::init_timetable_router;
use crate::modules::users::{init_roles_router, init_users_router};
use crate::state::AppState;

const PRICING_MAX_AGE: u64 = 300;

/// Super admin portal.
fn company_router() -> Router<AppState> {
    Router::new()
        .nest("/tenants", init_tenants_router())
        .nest("/domains", init_company_domains_router())
        .nest("/dashboard", init_company_dashboard_router())
        .nest("/audit-logs", init_company_audit_router())
        .nest("/support-tickets", init_company_tickets_router())
        .nest("/settings", init_company_settings_router())
        .nest("/announcements", init_company_announcements_router())
        .nest("/plans", init_company_plans_router())
        .nest("/coupons", init_company_coupons_router())
        .nest("/subscriptions", init_company_subscriptions_router())
        .nest("/payments", init_company_payments_router())
        .nest("/invoices", init_company_invoices_router())
}

/// Tenant admin portal.
fn college_router() -> Router<AppState> {
    Router::new()
        .nest("/users", init_users_router())
        .nest("/roles", init_roles_router())
        .nest("/departments", init_departments_router())
        .nest("/subjects", init_subjects_router())
        .nest("/academic-years", init_academic_years_router())
        .nest("/sections", init_sections_router())
        .nest("/enrollments", init_enrollments_router())
        .nest("/teacher-assignments", init_teacher_assignments_router())
        .nest("/parent-links", init_parent_links_router())
        .nest("/timetable", init_timetable_router())
        .nest("/announcements", init_announcements_router())
        .nest("/audit-logs", init_college_audit_router())
        .nest("/support-tickets", init_college_tickets_router())
        .nest("/fees", init_fees_router())
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = state
        .cors_config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(TENANT_ID_HEADER),
        ])
        .allow_credentials(true)
}

pub fn init_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", with_auth_limit(init_auth_router(), &state))
        .nest("/account", init_account_router())
        .nest(
            "/pricing",
            init_pricing_router()
                .layer(middleware::from_fn(etag_middleware))
                .layer(cache_control(CacheControl::Public {
                    max_age: PRICING_MAX_AGE,
                })),
        )
        .nest("/subscription", init_subscription_router())
        .nest("/billing", init_billing_router())
        .nest("/company", company_router())
        .nest("/college", college_router())
        .nest("/dept", init_department_portal_router())
        .nest("/teacher", init_teaching_router())
        .nest("/student", init_student_portal_router())
        .nest("/parent", init_parent_portal_router());
    let api = with_general_limit(api, &state);

    // Layers run bottom-up: the last one added sees the request first.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .merge(init_health_router())
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), enforce_portal_access))
        .layer(middleware::from_fn_with_state(state.clone(), tenant_middleware))
        .with_state(state.clone())
        .layer(cors_layer(&state))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
