use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use campusflow_core::{AppError, Paginated};
use campusflow_models::{Announcement, Department, Section, Subject, TenantId, UserRef};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::middleware::tenancy::TenantScope;
use crate::modules::academics::{SectionService, SubjectService};
use crate::modules::announcements::AnnouncementService;
use crate::modules::announcements::model::{
    AnnouncementFilterParams, CreateAnnouncementDto, UpdateAnnouncementDto,
};
use crate::modules::department_portal::model::DepartmentOverview;
use crate::modules::department_portal::service::DepartmentPortalService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

async fn own_department(
    state: &AppState,
    tenant_id: TenantId,
    auth_user: &AuthUser,
) -> Result<Department, AppError> {
    DepartmentPortalService::own_department(&state.db, tenant_id, auth_user.user_id()?).await
}

/// Dashboard of the department the caller heads
#[utoipa::path(
    get,
    path = "/api/dept/overview",
    responses(
        (status = 200, description = "Department with head counts", body = DepartmentOverview),
        (status = 403, description = "No department assigned")
    ),
    tag = "Department Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn overview(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<DepartmentOverview>, AppError> {
    let department = own_department(&state, tenant_id, &auth_user).await?;
    Ok(Json(
        DepartmentPortalService::overview(&state.db, department).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/dept/subjects",
    responses((status = 200, description = "Subjects of the department", body = Vec<Subject>)),
    tag = "Department Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn subjects(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<Vec<Subject>>, AppError> {
    let department = own_department(&state, tenant_id, &auth_user).await?;
    Ok(Json(
        SubjectService::list_for_department(&state.db, tenant_id, department.id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/dept/sections",
    responses((status = 200, description = "Sections of the department", body = Vec<Section>)),
    tag = "Department Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn sections(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<Vec<Section>>, AppError> {
    let department = own_department(&state, tenant_id, &auth_user).await?;
    Ok(Json(
        SectionService::list_for_department(&state.db, tenant_id, department.id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/dept/teachers",
    responses((status = 200, description = "Teachers assigned to the department's subjects", body = Vec<UserRef>)),
    tag = "Department Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn teachers(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<Vec<UserRef>>, AppError> {
    let department = own_department(&state, tenant_id, &auth_user).await?;
    Ok(Json(
        DepartmentPortalService::teachers(&state.db, &department).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/dept/announcements",
    request_body = CreateAnnouncementDto,
    responses(
        (status = 201, description = "Announcement posted to the department", body = Announcement),
        (status = 403, description = "No department assigned")
    ),
    tag = "Department Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_announcement(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateAnnouncementDto>,
) -> Result<(StatusCode, Json<Announcement>), AppError> {
    let department = own_department(&state, tenant_id, &auth_user).await?;
    let announcement = AnnouncementService::create_announcement(
        &state.db,
        tenant_id,
        Some(department.id),
        auth_user.user_id()?,
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

#[utoipa::path(
    get,
    path = "/api/dept/announcements",
    params(AnnouncementFilterParams),
    responses((status = 200, description = "Department announcements", body = Paginated<Announcement>)),
    tag = "Department Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_announcements(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<AnnouncementFilterParams>,
) -> Result<Json<Paginated<Announcement>>, AppError> {
    let department = own_department(&state, tenant_id, &auth_user).await?;
    Ok(Json(
        AnnouncementService::list_announcements(&state.db, tenant_id, Some(department.id), filters)
            .await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/dept/announcements/{id}",
    params(("id" = Uuid, Path, description = "Announcement ID")),
    request_body = UpdateAnnouncementDto,
    responses(
        (status = 200, description = "Announcement updated", body = Announcement),
        (status = 404, description = "Announcement not found in this department")
    ),
    tag = "Department Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_announcement(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateAnnouncementDto>,
) -> Result<Json<Announcement>, AppError> {
    let department = own_department(&state, tenant_id, &auth_user).await?;
    Ok(Json(
        AnnouncementService::update_announcement(&state.db, tenant_id, Some(department.id), id, dto)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/dept/announcements/{id}",
    params(("id" = Uuid, Path, description = "Announcement ID")),
    responses(
        (status = 204, description = "Announcement deleted"),
        (status = 404, description = "Announcement not found in this department")
    ),
    tag = "Department Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_announcement(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let department = own_department(&state, tenant_id, &auth_user).await?;
    AnnouncementService::delete_announcement(&state.db, tenant_id, Some(department.id), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
