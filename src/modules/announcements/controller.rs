use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use campusflow_core::{AppError, Paginated};
use campusflow_models::Announcement;
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::RequireUsersManage;
use crate::middleware::tenancy::TenantScope;
use crate::modules::announcements::model::{
    AnnouncementFilterParams, CreateAnnouncementDto, UpdateAnnouncementDto,
};
use crate::modules::announcements::service::AnnouncementService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/college/announcements",
    request_body = CreateAnnouncementDto,
    responses(
        (status = 201, description = "Announcement posted", body = Announcement),
        (status = 400, description = "Unknown department or section, or expiry in the past")
    ),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_announcement(
    State(state): State<AppState>,
    RequireUsersManage(auth_user): RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateAnnouncementDto>,
) -> Result<(StatusCode, Json<Announcement>), AppError> {
    let posted_by = auth_user.user_id()?;
    let announcement =
        AnnouncementService::create_announcement(&state.db, tenant_id, None, posted_by, dto)
            .await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

#[utoipa::path(
    get,
    path = "/api/college/announcements",
    params(AnnouncementFilterParams),
    responses((status = 200, description = "Announcements, newest first", body = Paginated<Announcement>)),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_announcements(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<AnnouncementFilterParams>,
) -> Result<Json<Paginated<Announcement>>, AppError> {
    Ok(Json(
        AnnouncementService::list_announcements(&state.db, tenant_id, None, filters).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/college/announcements/{id}",
    params(("id" = Uuid, Path, description = "Announcement ID")),
    responses(
        (status = 200, description = "Announcement", body = Announcement),
        (status = 404, description = "Announcement not found")
    ),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_announcement(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<Announcement>, AppError> {
    Ok(Json(
        AnnouncementService::get_announcement(&state.db, tenant_id, None, id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/college/announcements/{id}",
    params(("id" = Uuid, Path, description = "Announcement ID")),
    request_body = UpdateAnnouncementDto,
    responses(
        (status = 200, description = "Announcement updated", body = Announcement),
        (status = 404, description = "Announcement not found")
    ),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_announcement(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateAnnouncementDto>,
) -> Result<Json<Announcement>, AppError> {
    Ok(Json(
        AnnouncementService::update_announcement(&state.db, tenant_id, None, id, dto).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/college/announcements/{id}",
    params(("id" = Uuid, Path, description = "Announcement ID")),
    responses(
        (status = 204, description = "Announcement deleted"),
        (status = 404, description = "Announcement not found")
    ),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_announcement(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    AnnouncementService::delete_announcement(&state.db, tenant_id, None, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
