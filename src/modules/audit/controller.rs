use axum::{
    Json,
    extract::{Query, State},
};
use campusflow_core::{AppError, Paginated};
use campusflow_models::AuditLog;
use tracing::instrument;

use crate::middleware::auth::{RequireReportsView, RequireTenantsManage};
use crate::middleware::tenancy::TenantScope;
use crate::modules::audit::model::AuditLogFilterParams;
use crate::modules::audit::service::AuditService;
use crate::state::AppState;

/// Audit trail of the caller's college
#[utoipa::path(
    get,
    path = "/api/college/audit-logs",
    params(AuditLogFilterParams),
    responses(
        (status = 200, description = "Audit log page", body = Paginated<AuditLog>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Audit",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_college_audit_logs(
    State(state): State<AppState>,
    _auth: RequireReportsView,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<AuditLogFilterParams>,
) -> Result<Json<Paginated<AuditLog>>, AppError> {
    let logs = AuditService::list(&state.db, Some(tenant_id), filters).await?;
    Ok(Json(logs))
}

/// Audit trail across every tenant
#[utoipa::path(
    get,
    path = "/api/company/audit-logs",
    params(AuditLogFilterParams),
    responses(
        (status = 200, description = "Audit log page", body = Paginated<AuditLog>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Audit",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_company_audit_logs(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Query(filters): Query<AuditLogFilterParams>,
) -> Result<Json<Paginated<AuditLog>>, AppError> {
    let logs = AuditService::list(&state.db, None, filters).await?;
    Ok(Json(logs))
}
