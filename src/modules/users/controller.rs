use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use campusflow_core::{AppError, Paginated};
use campusflow_models::{RoleInfo, UserId, UserWithRole};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::RequireUsersManage;
use crate::middleware::tenancy::TenantScope;
use crate::modules::users::model::{CreateUserDto, UpdateUserDto, UserFilterParams};
use crate::modules::users::service::UserService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Create a user in the caller's college
///
/// Students and teachers count against the plan limits of the college.
#[utoipa::path(
    post,
    path = "/api/college/users",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "User created", body = UserWithRole),
        (status = 400, description = "Invalid role, duplicate email or plan limit reached"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto), fields(user.role = %dto.role))]
pub async fn create_user(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateUserDto>,
) -> Result<(StatusCode, Json<UserWithRole>), AppError> {
    let user = UserService::create_user(&state.db, &state.email_config, tenant_id, dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/college/users",
    params(UserFilterParams),
    responses(
        (status = 200, description = "Users of the college", body = Paginated<UserWithRole>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_users(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<UserFilterParams>,
) -> Result<Json<Paginated<UserWithRole>>, AppError> {
    let users = UserService::list_users(&state.db, tenant_id, filters).await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/college/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserWithRole),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_user(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<UserWithRole>, AppError> {
    let user = UserService::get_user(&state.db, tenant_id, UserId::from(id)).await?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/college/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = UserWithRole),
        (status = 400, description = "Invalid role or plan limit reached"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_user(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateUserDto>,
) -> Result<Json<UserWithRole>, AppError> {
    let user = UserService::update_user(&state.db, tenant_id, UserId::from(id), dto).await?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/college/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Attempt to delete own account"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireUsersManage(auth_user): RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let caller = auth_user.user_id()?;
    UserService::delete_user(&state.db, tenant_id, UserId::from(id), caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Roles a college administrator may hand out
#[utoipa::path(
    get,
    path = "/api/college/roles",
    responses(
        (status = 200, description = "Assignable roles", body = Vec<RoleInfo>)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_assignable_roles(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
) -> Result<Json<Vec<RoleInfo>>, AppError> {
    let roles = UserService::list_assignable_roles(&state.db).await?;
    Ok(Json(roles))
}
