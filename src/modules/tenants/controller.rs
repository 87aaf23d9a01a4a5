use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use campusflow_core::{AppError, Paginated};
use campusflow_models::{Tenant, TenantDomain, TenantId};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::RequireTenantsManage;
use crate::modules::tenants::model::{
    CompanyDashboard, CreateDomainDto, CreateTenantDto, TenantFilterParams, TenantUsage,
    UpdateTenantDto,
};
use crate::modules::tenants::service::TenantService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Create a college
#[utoipa::path(
    post,
    path = "/api/company/tenants",
    request_body = CreateTenantDto,
    responses(
        (status = 201, description = "Tenant created", body = Tenant),
        (status = 400, description = "Duplicate name, reserved subdomain or unknown plan"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Tenants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn create_tenant(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    ValidatedJson(dto): ValidatedJson<CreateTenantDto>,
) -> Result<(StatusCode, Json<Tenant>), AppError> {
    let tenant = TenantService::create_tenant(&state.db, &state.tenancy_config, dto).await?;
    Ok((StatusCode::CREATED, Json(tenant)))
}

#[utoipa::path(
    get,
    path = "/api/company/tenants",
    params(TenantFilterParams),
    responses(
        (status = 200, description = "Tenants", body = Paginated<Tenant>),
        (status = 403, description = "Forbidden")
    ),
    tag = "Tenants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_tenants(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Query(filters): Query<TenantFilterParams>,
) -> Result<Json<Paginated<Tenant>>, AppError> {
    Ok(Json(TenantService::list_tenants(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/company/tenants/{id}",
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant", body = Tenant),
        (status = 404, description = "Tenant not found")
    ),
    tag = "Tenants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_tenant(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<Json<Tenant>, AppError> {
    Ok(Json(TenantService::get_tenant(&state.db, TenantId::from(id)).await?))
}

#[utoipa::path(
    put,
    path = "/api/company/tenants/{id}",
    params(("id" = Uuid, Path, description = "Tenant ID")),
    request_body = UpdateTenantDto,
    responses(
        (status = 200, description = "Tenant updated", body = Tenant),
        (status = 404, description = "Tenant not found")
    ),
    tag = "Tenants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_tenant(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateTenantDto>,
) -> Result<Json<Tenant>, AppError> {
    let tenant =
        TenantService::update_tenant(&state.db, state.cache(), TenantId::from(id), dto).await?;
    Ok(Json(tenant))
}

/// Delete a college and everything it owns
#[utoipa::path(
    delete,
    path = "/api/company/tenants/{id}",
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 204, description = "Tenant deleted"),
        (status = 404, description = "Tenant not found")
    ),
    tag = "Tenants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_tenant(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    TenantService::delete_tenant(&state.db, state.cache(), TenantId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/company/tenants/{id}/suspend",
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant suspended", body = Tenant),
        (status = 404, description = "Tenant not found")
    ),
    tag = "Tenants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn suspend_tenant(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<Json<Tenant>, AppError> {
    let tenant =
        TenantService::set_active(&state.db, state.cache(), TenantId::from(id), false).await?;
    Ok(Json(tenant))
}

#[utoipa::path(
    post,
    path = "/api/company/tenants/{id}/activate",
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant activated", body = Tenant),
        (status = 404, description = "Tenant not found")
    ),
    tag = "Tenants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn activate_tenant(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<Json<Tenant>, AppError> {
    let tenant =
        TenantService::set_active(&state.db, state.cache(), TenantId::from(id), true).await?;
    Ok(Json(tenant))
}

/// Usage counters against plan limits
#[utoipa::path(
    get,
    path = "/api/company/tenants/{id}/usage",
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Usage", body = TenantUsage),
        (status = 404, description = "Tenant not found")
    ),
    tag = "Tenants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_tenant_usage(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<Json<TenantUsage>, AppError> {
    Ok(Json(TenantService::usage(&state.db, TenantId::from(id)).await?))
}

#[utoipa::path(
    get,
    path = "/api/company/tenants/{id}/domains",
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Custom domains", body = Vec<TenantDomain>),
        (status = 404, description = "Tenant not found")
    ),
    tag = "Tenants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_domains(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TenantDomain>>, AppError> {
    Ok(Json(TenantService::list_domains(&state.db, TenantId::from(id)).await?))
}

/// Register a custom domain
#[utoipa::path(
    post,
    path = "/api/company/tenants/{id}/domains",
    params(("id" = Uuid, Path, description = "Tenant ID")),
    request_body = CreateDomainDto,
    responses(
        (status = 201, description = "Domain added", body = TenantDomain),
        (status = 400, description = "Domain already registered"),
        (status = 404, description = "Tenant not found")
    ),
    tag = "Tenants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn add_domain(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateDomainDto>,
) -> Result<(StatusCode, Json<TenantDomain>), AppError> {
    let domain =
        TenantService::add_domain(&state.db, state.cache(), TenantId::from(id), dto).await?;
    Ok((StatusCode::CREATED, Json(domain)))
}

#[utoipa::path(
    post,
    path = "/api/company/domains/{id}/verify",
    params(("id" = Uuid, Path, description = "Domain ID")),
    responses(
        (status = 200, description = "Domain verified", body = TenantDomain),
        (status = 404, description = "Domain not found")
    ),
    tag = "Tenants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn verify_domain(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<Json<TenantDomain>, AppError> {
    Ok(Json(TenantService::verify_domain(&state.db, state.cache(), id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/company/domains/{id}",
    params(("id" = Uuid, Path, description = "Domain ID")),
    responses(
        (status = 204, description = "Domain removed"),
        (status = 404, description = "Domain not found")
    ),
    tag = "Tenants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_domain(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    TenantService::delete_domain(&state.db, state.cache(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Platform-wide tenant, user and revenue figures
#[utoipa::path(
    get,
    path = "/api/company/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = CompanyDashboard),
        (status = 403, description = "Forbidden")
    ),
    tag = "Tenants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn company_dashboard(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
) -> Result<Json<CompanyDashboard>, AppError> {
    Ok(Json(TenantService::dashboard(&state.db).await?))
}
