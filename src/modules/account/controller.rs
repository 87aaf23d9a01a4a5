use axum::{Json, extract::State};
use campusflow_core::AppError;
use campusflow_models::{
    Announcement, GlobalAnnouncement, MessageResponse, SettingView, UserWithRole,
};
use tracing::instrument;

use crate::middleware::auth::AuthUser;
use crate::middleware::tenancy::TenantScope;
use crate::modules::account::model::{ChangePasswordDto, UpdateProfileDto};
use crate::modules::account::service::AccountService;
use crate::modules::announcements::AnnouncementService;
use crate::modules::platform::{GlobalAnnouncementService, SettingService};
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// The signed-in user's profile
#[utoipa::path(
    get,
    path = "/api/account/profile",
    responses(
        (status = 200, description = "Profile with role", body = UserWithRole),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Account",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserWithRole>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(AccountService::get_profile(&state.db, user_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/account/profile",
    request_body = UpdateProfileDto,
    responses(
        (status = 200, description = "Profile updated", body = UserWithRole),
        (status = 422, description = "Validation error")
    ),
    tag = "Account",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<UpdateProfileDto>,
) -> Result<Json<UserWithRole>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(
        AccountService::update_profile(&state.db, user_id, dto).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/account/change-password",
    request_body = ChangePasswordDto,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password wrong or unchanged")
    ),
    tag = "Account",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<ChangePasswordDto>,
) -> Result<Json<MessageResponse>, AppError> {
    let user_id = auth_user.user_id()?;
    AccountService::change_password(&state.db, &state.email_config, user_id, dto).await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// College announcements addressed to the caller's role
#[utoipa::path(
    get,
    path = "/api/account/announcements",
    responses((status = 200, description = "Live announcements", body = Vec<Announcement>)),
    tag = "Account",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn my_announcements(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<Vec<Announcement>>, AppError> {
    let role = auth_user
        .role()
        .ok_or_else(|| AppError::forbidden("No role assigned".to_string()))?;
    let user_id = auth_user.user_id()?;
    Ok(Json(
        AnnouncementService::visible_for(&state.db, tenant_id, role, user_id).await?,
    ))
}

/// Platform notices currently shown to the caller's college
#[utoipa::path(
    get,
    path = "/api/account/platform-announcements",
    responses((status = 200, description = "Visible platform announcements", body = Vec<GlobalAnnouncement>)),
    tag = "Account",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn platform_announcements(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<GlobalAnnouncement>>, AppError> {
    Ok(Json(
        GlobalAnnouncementService::visible_for(&state.db, auth_user.tenant_id()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/account/settings",
    responses((status = 200, description = "Public system settings", body = Vec<SettingView>)),
    tag = "Account",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn public_settings(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<SettingView>>, AppError> {
    Ok(Json(
        SettingService::public_settings(&state.db, state.cache()).await?,
    ))
}
