use axum::{Json, extract::State, http::StatusCode};
use campusflow_core::AppError;
use campusflow_models::{
    AuthUserSummary, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    RefreshTokenRequest, ResetPasswordRequest, SignupRequest,
};
use tracing::instrument;

use crate::middleware::audit::ClientInfo;
use crate::middleware::auth::AuthUser;
use crate::modules::auth::service::AuthService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 422, description = "Validation error")
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, client, dto), fields(user.email = %dto.email))]
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    ValidatedJson(dto): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = AuthService::login(&state.db, &state.jwt_config, dto, &client).await?;
    Ok(Json(response))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New tokens", body = LoginResponse),
        (status = 401, description = "Invalid or expired refresh token")
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn refresh_token(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<RefreshTokenRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = AuthService::refresh(&state.db, &state.jwt_config, dto).await?;
    Ok(Json(response))
}

/// Register a college and its first administrator
///
/// The college starts on a 14 day trial of the free plan.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "College created and administrator signed in", body = LoginResponse),
        (status = 400, description = "Name, subdomain or email already taken"),
        (status = 422, description = "Validation error")
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    let response = AuthService::signup(
        &state.db,
        &state.jwt_config,
        &state.email_config,
        &state.tenancy_config,
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Request a password reset link
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Same answer whether or not the account exists", body = MessageResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let response = AuthService::forgot_password(&state.db, &state.email_config, dto).await?;
    Ok(Json(response))
}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid or expired reset token"),
        (status = 422, description = "Validation error")
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, client, dto))]
pub async fn reset_password(
    State(state): State<AppState>,
    client: ClientInfo,
    ValidatedJson(dto): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let response =
        AuthService::reset_password(&state.db, &state.email_config, dto, &client).await?;
    Ok(Json(response))
}

/// Sign out
///
/// Tokens are stateless; the call records the event and the client drops
/// its tokens.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Signed out", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, client))]
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
    client: ClientInfo,
) -> Result<Json<MessageResponse>, AppError> {
    let user_id = auth_user.user_id()?;
    let response = AuthService::logout(&state.db, user_id, auth_user.tenant_id(), &client).await;
    Ok(Json(response))
}

/// The user behind the access token
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = AuthUserSummary),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<AuthUserSummary>, AppError> {
    let profile = AuthService::profile(&state.db, auth_user.user_id()?).await?;
    Ok(Json(profile))
}
