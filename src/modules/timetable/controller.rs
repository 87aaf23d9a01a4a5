use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use campusflow_core::AppError;
use campusflow_models::{TimetableEntry, TimetableSlot};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::RequireDepartmentsManage;
use crate::middleware::tenancy::TenantScope;
use crate::modules::timetable::model::{
    CreateTimetableEntryDto, TimetableFilterParams, UpdateTimetableEntryDto,
};
use crate::modules::timetable::service::TimetableService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Book a timetable slot
///
/// A section holds one class per day and period, and a teacher teaches at
/// most one class per day and period.
#[utoipa::path(
    post,
    path = "/api/college/timetable",
    request_body = CreateTimetableEntryDto,
    responses(
        (status = 201, description = "Slot booked", body = TimetableEntry),
        (status = 400, description = "Slot taken, teacher busy or invalid times")
    ),
    tag = "Timetable",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn create_entry(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateTimetableEntryDto>,
) -> Result<(StatusCode, Json<TimetableEntry>), AppError> {
    let entry = TimetableService::create_entry(&state.db, tenant_id, dto).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    get,
    path = "/api/college/timetable",
    params(TimetableFilterParams),
    responses((status = 200, description = "Timetable slots", body = Vec<TimetableSlot>)),
    tag = "Timetable",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_entries(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<TimetableFilterParams>,
) -> Result<Json<Vec<TimetableSlot>>, AppError> {
    Ok(Json(
        TimetableService::list_entries(&state.db, tenant_id, filters).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/college/timetable/{id}",
    params(("id" = Uuid, Path, description = "Timetable entry ID")),
    responses(
        (status = 200, description = "Timetable entry", body = TimetableEntry),
        (status = 404, description = "Timetable entry not found")
    ),
    tag = "Timetable",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_entry(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<TimetableEntry>, AppError> {
    Ok(Json(TimetableService::get_entry(&state.db, tenant_id, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/college/timetable/{id}",
    params(("id" = Uuid, Path, description = "Timetable entry ID")),
    request_body = UpdateTimetableEntryDto,
    responses(
        (status = 200, description = "Slot updated", body = TimetableEntry),
        (status = 400, description = "Slot taken, teacher busy or invalid times"),
        (status = 404, description = "Timetable entry not found")
    ),
    tag = "Timetable",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_entry(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateTimetableEntryDto>,
) -> Result<Json<TimetableEntry>, AppError> {
    Ok(Json(
        TimetableService::update_entry(&state.db, tenant_id, id, dto).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/college/timetable/{id}",
    params(("id" = Uuid, Path, description = "Timetable entry ID")),
    responses(
        (status = 204, description = "Slot freed"),
        (status = 404, description = "Timetable entry not found")
    ),
    tag = "Timetable",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_entry(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    TimetableService::delete_entry(&state.db, tenant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
