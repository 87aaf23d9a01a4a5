use axum::{
    Json,
    extract::{Path, State},
};
use campusflow_core::AppError;
use campusflow_models::{FeePayment, GradeReport, UserId};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::middleware::tenancy::TenantScope;
use crate::modules::parent_portal::model::Child;
use crate::modules::parent_portal::service::ParentPortalService;
use crate::modules::teaching::model::StudentAttendance;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/parent/children",
    responses((status = 200, description = "Linked students with relationship and permissions", body = Vec<Child>)),
    tag = "Parent Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn children(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<Vec<Child>>, AppError> {
    Ok(Json(
        ParentPortalService::children(&state.db, tenant_id, auth_user.user_id()?).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/parent/children/{student_id}/attendance",
    params(("student_id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Attendance records and summary", body = StudentAttendance),
        (status = 403, description = "No link, or attendance not shared")
    ),
    tag = "Parent Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn child_attendance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
    Path(student_id): Path<Uuid>,
) -> Result<Json<StudentAttendance>, AppError> {
    Ok(Json(
        ParentPortalService::attendance(
            &state.db,
            tenant_id,
            auth_user.user_id()?,
            UserId::from_uuid(student_id),
        )
        .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/parent/children/{student_id}/grades",
    params(("student_id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Published grades", body = Vec<GradeReport>),
        (status = 403, description = "No link, or grades not shared")
    ),
    tag = "Parent Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn child_grades(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Vec<GradeReport>>, AppError> {
    Ok(Json(
        ParentPortalService::grades(
            &state.db,
            tenant_id,
            auth_user.user_id()?,
            UserId::from_uuid(student_id),
        )
        .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/parent/children/{student_id}/fees",
    params(("student_id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Fees charged to the student", body = Vec<FeePayment>),
        (status = 403, description = "Student is not linked to the caller")
    ),
    tag = "Parent Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn child_fees(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Vec<FeePayment>>, AppError> {
    Ok(Json(
        ParentPortalService::fees(
            &state.db,
            tenant_id,
            auth_user.user_id()?,
            UserId::from_uuid(student_id),
        )
        .await?,
    ))
}
