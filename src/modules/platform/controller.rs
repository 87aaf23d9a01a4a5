use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use campusflow_core::{AppError, Paginated};
use campusflow_models::{
    GlobalAnnouncement, SettingView, SupportTicket, TicketComment, TicketWithComments,
};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::{AuthUser, RequireTenantsManage};
use crate::middleware::tenancy::TenantScope;
use crate::modules::platform::model::{
    CreateCommentDto, CreateGlobalAnnouncementDto, CreateSettingDto, CreateTicketDto,
    TicketFilterParams, UpdateGlobalAnnouncementDto, UpdateSettingDto, UpdateTicketDto,
};
use crate::modules::platform::service::{GlobalAnnouncementService, SettingService, TicketService};
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Open a support ticket for the caller's college
#[utoipa::path(
    post,
    path = "/api/college/support-tickets",
    request_body = CreateTicketDto,
    responses(
        (status = 201, description = "Ticket opened", body = SupportTicket),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Support",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn open_ticket(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateTicketDto>,
) -> Result<(StatusCode, Json<SupportTicket>), AppError> {
    let created_by = auth_user.user_id()?;
    let ticket = TicketService::create_ticket(&state.db, tenant_id, created_by, dto).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

#[utoipa::path(
    get,
    path = "/api/college/support-tickets",
    params(TicketFilterParams),
    responses(
        (status = 200, description = "Tickets of the college", body = Paginated<SupportTicket>)
    ),
    tag = "Support",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_college_tickets(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<TicketFilterParams>,
) -> Result<Json<Paginated<SupportTicket>>, AppError> {
    let tickets = TicketService::list_tickets(&state.db, Some(tenant_id), filters).await?;
    Ok(Json(tickets))
}

#[utoipa::path(
    get,
    path = "/api/college/support-tickets/{id}",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Ticket with its public comments", body = TicketWithComments),
        (status = 404, description = "Ticket not found")
    ),
    tag = "Support",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_college_ticket(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketWithComments>, AppError> {
    let ticket = TicketService::get_ticket(&state.db, id, Some(tenant_id)).await?;
    Ok(Json(ticket))
}

#[utoipa::path(
    post,
    path = "/api/college/support-tickets/{id}/comments",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    request_body = CreateCommentDto,
    responses(
        (status = 201, description = "Comment added", body = TicketComment),
        (status = 404, description = "Ticket not found")
    ),
    tag = "Support",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn comment_college_ticket(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateCommentDto>,
) -> Result<(StatusCode, Json<TicketComment>), AppError> {
    let author = auth_user.user_id()?;
    let comment =
        TicketService::add_comment(&state.db, id, Some(tenant_id), author, dto).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    get,
    path = "/api/company/support-tickets",
    params(TicketFilterParams),
    responses(
        (status = 200, description = "Tickets across all colleges", body = Paginated<SupportTicket>),
        (status = 403, description = "Forbidden")
    ),
    tag = "Support",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_all_tickets(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Query(filters): Query<TicketFilterParams>,
) -> Result<Json<Paginated<SupportTicket>>, AppError> {
    Ok(Json(TicketService::list_tickets(&state.db, None, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/company/support-tickets/{id}",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Ticket with every comment", body = TicketWithComments),
        (status = 404, description = "Ticket not found")
    ),
    tag = "Support",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_any_ticket(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketWithComments>, AppError> {
    Ok(Json(TicketService::get_ticket(&state.db, id, None).await?))
}

/// Change status, priority or assignee
#[utoipa::path(
    put,
    path = "/api/company/support-tickets/{id}",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    request_body = UpdateTicketDto,
    responses(
        (status = 200, description = "Ticket updated", body = SupportTicket),
        (status = 400, description = "Assignee is not a platform administrator"),
        (status = 404, description = "Ticket not found")
    ),
    tag = "Support",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_ticket(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateTicketDto>,
) -> Result<Json<SupportTicket>, AppError> {
    Ok(Json(TicketService::update_ticket(&state.db, id, dto).await?))
}

#[utoipa::path(
    post,
    path = "/api/company/support-tickets/{id}/comments",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    request_body = CreateCommentDto,
    responses(
        (status = 201, description = "Comment added", body = TicketComment),
        (status = 404, description = "Ticket not found")
    ),
    tag = "Support",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth, dto))]
pub async fn comment_any_ticket(
    State(state): State<AppState>,
    RequireTenantsManage(auth): RequireTenantsManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateCommentDto>,
) -> Result<(StatusCode, Json<TicketComment>), AppError> {
    let author = auth.user_id()?;
    let comment = TicketService::add_comment(&state.db, id, None, author, dto).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    get,
    path = "/api/company/settings",
    responses((status = 200, description = "All settings", body = Vec<SettingView>)),
    tag = "Settings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_settings(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
) -> Result<Json<Vec<SettingView>>, AppError> {
    Ok(Json(SettingService::list_settings(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/api/company/settings",
    request_body = CreateSettingDto,
    responses(
        (status = 201, description = "Setting created", body = SettingView),
        (status = 400, description = "Duplicate key")
    ),
    tag = "Settings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn create_setting(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    ValidatedJson(dto): ValidatedJson<CreateSettingDto>,
) -> Result<(StatusCode, Json<SettingView>), AppError> {
    let setting = SettingService::create_setting(&state.db, state.cache(), dto).await?;
    Ok((StatusCode::CREATED, Json(setting)))
}

#[utoipa::path(
    get,
    path = "/api/company/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting", body = SettingView),
        (status = 404, description = "Setting not found")
    ),
    tag = "Settings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_setting(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(key): Path<String>,
) -> Result<Json<SettingView>, AppError> {
    Ok(Json(SettingService::get_setting(&state.db, &key).await?))
}

#[utoipa::path(
    put,
    path = "/api/company/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    request_body = UpdateSettingDto,
    responses(
        (status = 200, description = "Setting updated", body = SettingView),
        (status = 404, description = "Setting not found")
    ),
    tag = "Settings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_setting(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(key): Path<String>,
    ValidatedJson(dto): ValidatedJson<UpdateSettingDto>,
) -> Result<Json<SettingView>, AppError> {
    let setting = SettingService::update_setting(&state.db, state.cache(), &key, dto).await?;
    Ok(Json(setting))
}

#[utoipa::path(
    delete,
    path = "/api/company/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 204, description = "Setting deleted"),
        (status = 404, description = "Setting not found")
    ),
    tag = "Settings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_setting(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    SettingService::delete_setting(&state.db, state.cache(), &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/company/announcements",
    responses((status = 200, description = "Global announcements", body = Vec<GlobalAnnouncement>)),
    tag = "Global Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_global_announcements(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
) -> Result<Json<Vec<GlobalAnnouncement>>, AppError> {
    Ok(Json(GlobalAnnouncementService::list_announcements(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/api/company/announcements",
    request_body = CreateGlobalAnnouncementDto,
    responses(
        (status = 201, description = "Announcement created", body = GlobalAnnouncement),
        (status = 400, description = "End date before start date")
    ),
    tag = "Global Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth, dto))]
pub async fn create_global_announcement(
    State(state): State<AppState>,
    RequireTenantsManage(auth): RequireTenantsManage,
    ValidatedJson(dto): ValidatedJson<CreateGlobalAnnouncementDto>,
) -> Result<(StatusCode, Json<GlobalAnnouncement>), AppError> {
    let created_by = auth.user_id()?;
    let announcement =
        GlobalAnnouncementService::create_announcement(&state.db, created_by, dto).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

#[utoipa::path(
    get,
    path = "/api/company/announcements/{id}",
    params(("id" = Uuid, Path, description = "Announcement ID")),
    responses(
        (status = 200, description = "Announcement", body = GlobalAnnouncement),
        (status = 404, description = "Announcement not found")
    ),
    tag = "Global Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_global_announcement(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<Json<GlobalAnnouncement>, AppError> {
    Ok(Json(GlobalAnnouncementService::get_announcement(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/company/announcements/{id}",
    params(("id" = Uuid, Path, description = "Announcement ID")),
    request_body = UpdateGlobalAnnouncementDto,
    responses(
        (status = 200, description = "Announcement updated", body = GlobalAnnouncement),
        (status = 400, description = "End date before start date"),
        (status = 404, description = "Announcement not found")
    ),
    tag = "Global Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_global_announcement(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateGlobalAnnouncementDto>,
) -> Result<Json<GlobalAnnouncement>, AppError> {
    let announcement =
        GlobalAnnouncementService::update_announcement(&state.db, id, dto).await?;
    Ok(Json(announcement))
}

#[utoipa::path(
    delete,
    path = "/api/company/announcements/{id}",
    params(("id" = Uuid, Path, description = "Announcement ID")),
    responses(
        (status = 204, description = "Announcement deleted"),
        (status = 404, description = "Announcement not found")
    ),
    tag = "Global Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_global_announcement(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    GlobalAnnouncementService::delete_announcement(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
