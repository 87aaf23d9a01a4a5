use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use campusflow_core::{AppError, Paginated};
use campusflow_models::FeePayment;
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::RequireBillingManage;
use crate::middleware::tenancy::TenantScope;
use crate::modules::fees::model::{CreateFeeDto, FeeFilterParams, OverdueMarked, PayFeeDto};
use crate::modules::fees::service::FeeService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/college/fees",
    request_body = CreateFeeDto,
    responses(
        (status = 201, description = "Pending fee with a fresh receipt number", body = FeePayment),
        (status = 400, description = "Unknown student or section"),
        (status = 422, description = "Amount must be positive")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn create_fee(
    State(state): State<AppState>,
    _auth: RequireBillingManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateFeeDto>,
) -> Result<(StatusCode, Json<FeePayment>), AppError> {
    let fee = FeeService::create_fee(&state.db, tenant_id, dto).await?;
    Ok((StatusCode::CREATED, Json(fee)))
}

#[utoipa::path(
    get,
    path = "/api/college/fees",
    params(FeeFilterParams),
    responses((status = 200, description = "Fees", body = Paginated<FeePayment>)),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_fees(
    State(state): State<AppState>,
    _auth: RequireBillingManage,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<FeeFilterParams>,
) -> Result<Json<Paginated<FeePayment>>, AppError> {
    Ok(Json(FeeService::list_fees(&state.db, tenant_id, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/college/fees/{id}",
    params(("id" = Uuid, Path, description = "Fee ID")),
    responses(
        (status = 200, description = "Fee", body = FeePayment),
        (status = 404, description = "Fee not found")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_fee(
    State(state): State<AppState>,
    _auth: RequireBillingManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<FeePayment>, AppError> {
    Ok(Json(FeeService::get_fee(&state.db, tenant_id, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/college/fees/{id}/pay",
    params(("id" = Uuid, Path, description = "Fee ID")),
    request_body = PayFeeDto,
    responses(
        (status = 200, description = "Fee paid", body = FeePayment),
        (status = 400, description = "Fee already paid or cancelled"),
        (status = 404, description = "Fee not found")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn pay_fee(
    State(state): State<AppState>,
    _auth: RequireBillingManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<PayFeeDto>,
) -> Result<Json<FeePayment>, AppError> {
    Ok(Json(FeeService::pay_fee(&state.db, tenant_id, id, dto).await?))
}

#[utoipa::path(
    post,
    path = "/api/college/fees/{id}/cancel",
    params(("id" = Uuid, Path, description = "Fee ID")),
    responses(
        (status = 200, description = "Fee cancelled", body = FeePayment),
        (status = 400, description = "Fee already paid or cancelled"),
        (status = 404, description = "Fee not found")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn cancel_fee(
    State(state): State<AppState>,
    _auth: RequireBillingManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<FeePayment>, AppError> {
    Ok(Json(FeeService::cancel_fee(&state.db, tenant_id, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/college/fees/mark-overdue",
    responses((status = 200, description = "Number of fees now overdue", body = OverdueMarked)),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn mark_overdue(
    State(state): State<AppState>,
    _auth: RequireBillingManage,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<OverdueMarked>, AppError> {
    let marked = FeeService::mark_overdue(&state.db, tenant_id).await?;
    Ok(Json(OverdueMarked { marked }))
}
