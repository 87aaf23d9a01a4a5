use axum::{
    Json,
    extract::{Path, State},
};
use campusflow_core::AppError;
use campusflow_models::{FeePayment, GradeReport, Submission, TimetableSlot};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::middleware::tenancy::TenantScope;
use crate::modules::fees::FeeService;
use crate::modules::student_portal::model::StudentDashboard;
use crate::modules::student_portal::service::StudentPortalService;
use crate::modules::teaching::model::{StudentAssignment, StudentAttendance, SubmitAssignmentDto};
use crate::modules::teaching::{AssessmentService, AssignmentService, AttendanceService};
use crate::modules::timetable::TimetableService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/student/dashboard",
    responses((status = 200, description = "Enrollments, attendance and pending work", body = StudentDashboard)),
    tag = "Student Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn dashboard(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<StudentDashboard>, AppError> {
    Ok(Json(
        StudentPortalService::dashboard(&state.db, tenant_id, auth_user.user_id()?).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/student/attendance",
    responses((status = 200, description = "Records with a summary per subject", body = StudentAttendance)),
    tag = "Student Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn attendance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<StudentAttendance>, AppError> {
    Ok(Json(
        AttendanceService::for_student(&state.db, tenant_id, auth_user.user_id()?).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/student/assignments",
    responses((status = 200, description = "Published assignments with submission status", body = Vec<StudentAssignment>)),
    tag = "Student Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn assignments(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<Vec<StudentAssignment>>, AppError> {
    Ok(Json(
        AssignmentService::for_student(&state.db, tenant_id, auth_user.user_id()?).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/student/assignments/{id}/submit",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = SubmitAssignmentDto,
    responses(
        (status = 200, description = "Submission stored", body = Submission),
        (status = 400, description = "Assignment closed, late submissions not allowed, or already graded"),
        (status = 404, description = "Assignment not found")
    ),
    tag = "Student Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn submit_assignment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<SubmitAssignmentDto>,
) -> Result<Json<Submission>, AppError> {
    Ok(Json(
        AssignmentService::submit(&state.db, tenant_id, auth_user.user_id()?, id, dto).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/student/grades",
    responses((status = 200, description = "Published grades with percentage and letter", body = Vec<GradeReport>)),
    tag = "Student Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn grades(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<Vec<GradeReport>>, AppError> {
    Ok(Json(
        AssessmentService::published_for_student(&state.db, tenant_id, auth_user.user_id()?)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/student/timetable",
    responses((status = 200, description = "Weekly schedule of the student's sections", body = Vec<TimetableSlot>)),
    tag = "Student Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn timetable(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<Vec<TimetableSlot>>, AppError> {
    Ok(Json(
        TimetableService::for_student(&state.db, tenant_id, auth_user.user_id()?).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/student/fees",
    responses((status = 200, description = "Fees charged to the student", body = Vec<FeePayment>)),
    tag = "Student Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn fees(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<Vec<FeePayment>>, AppError> {
    Ok(Json(
        FeeService::for_student(&state.db, tenant_id, auth_user.user_id()?).await?,
    ))
}
