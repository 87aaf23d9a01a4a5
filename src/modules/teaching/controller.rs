use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use campusflow_core::{AppError, Paginated};
use campusflow_models::{
    Assessment, Assignment, AssignmentStatus, AttendanceRecord, GradeReport, Submission,
    TeachingClass, TimetableSlot,
};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::{AuthUser, RequireAssessmentsManage, RequireAttendanceManage};
use crate::middleware::tenancy::TenantScope;
use crate::modules::teaching::model::{
    AssessmentFilterParams, AssignmentFilterParams, AttendanceMarked, AttendanceQuery,
    CreateAssessmentDto, CreateAssignmentDto, GradeSubmissionDto, GradesSaved, MarkAttendanceDto,
    SaveGradesDto, UpdateAssignmentDto,
};
use crate::modules::teaching::service::{
    AssessmentService, AssignmentService, AttendanceService, ClassService,
};
use crate::modules::timetable::TimetableService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Subjects and sections the caller teaches
#[utoipa::path(
    get,
    path = "/api/teacher/classes",
    responses((status = 200, description = "Teaching assignments", body = Vec<TeachingClass>)),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn classes(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<Vec<TeachingClass>>, AppError> {
    Ok(Json(
        ClassService::classes_for_teacher(&state.db, tenant_id, auth_user.user_id()?).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/teacher/timetable",
    responses((status = 200, description = "Weekly schedule", body = Vec<TimetableSlot>)),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn timetable(
    State(state): State<AppState>,
    auth_user: AuthUser,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<Vec<TimetableSlot>>, AppError> {
    Ok(Json(
        TimetableService::for_teacher(&state.db, tenant_id, auth_user.user_id()?).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/teacher/attendance",
    request_body = MarkAttendanceDto,
    responses(
        (status = 200, description = "Attendance sheet saved", body = AttendanceMarked),
        (status = 400, description = "Student not enrolled in the section"),
        (status = 403, description = "Not assigned to this subject and section")
    ),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn mark_attendance(
    State(state): State<AppState>,
    RequireAttendanceManage(auth_user): RequireAttendanceManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<MarkAttendanceDto>,
) -> Result<Json<AttendanceMarked>, AppError> {
    Ok(Json(
        AttendanceService::mark_attendance(&state.db, tenant_id, auth_user.user_id()?, dto)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/teacher/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Attendance records of the class", body = Vec<AttendanceRecord>),
        (status = 403, description = "Not assigned to this subject and section")
    ),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_attendance(
    State(state): State<AppState>,
    RequireAttendanceManage(auth_user): RequireAttendanceManage,
    TenantScope(tenant_id): TenantScope,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    Ok(Json(
        AttendanceService::list_for_class(&state.db, tenant_id, auth_user.user_id()?, query)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/teacher/assignments",
    request_body = CreateAssignmentDto,
    responses(
        (status = 201, description = "Assignment created", body = Assignment),
        (status = 403, description = "Not assigned to this subject and section")
    ),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_assignment(
    State(state): State<AppState>,
    RequireAssessmentsManage(auth_user): RequireAssessmentsManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateAssignmentDto>,
) -> Result<(StatusCode, Json<Assignment>), AppError> {
    let assignment =
        AssignmentService::create_assignment(&state.db, tenant_id, auth_user.user_id()?, dto)
            .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    get,
    path = "/api/teacher/assignments",
    params(AssignmentFilterParams),
    responses((status = 200, description = "Assignments set by the caller", body = Paginated<Assignment>)),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_assignments(
    State(state): State<AppState>,
    RequireAssessmentsManage(auth_user): RequireAssessmentsManage,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<AssignmentFilterParams>,
) -> Result<Json<Paginated<Assignment>>, AppError> {
    Ok(Json(
        AssignmentService::list_assignments(&state.db, tenant_id, auth_user.user_id()?, filters)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/teacher/assignments/{id}",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment", body = Assignment),
        (status = 404, description = "Assignment not found")
    ),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_assignment(
    State(state): State<AppState>,
    RequireAssessmentsManage(auth_user): RequireAssessmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, AppError> {
    Ok(Json(
        AssignmentService::get_assignment(&state.db, tenant_id, auth_user.user_id()?, id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/teacher/assignments/{id}",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = UpdateAssignmentDto,
    responses(
        (status = 200, description = "Assignment updated", body = Assignment),
        (status = 404, description = "Assignment not found")
    ),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_assignment(
    State(state): State<AppState>,
    RequireAssessmentsManage(auth_user): RequireAssessmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateAssignmentDto>,
) -> Result<Json<Assignment>, AppError> {
    Ok(Json(
        AssignmentService::update_assignment(&state.db, tenant_id, auth_user.user_id()?, id, dto)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/teacher/assignments/{id}/publish",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment published", body = Assignment),
        (status = 400, description = "Assignment is closed")
    ),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn publish_assignment(
    State(state): State<AppState>,
    RequireAssessmentsManage(auth_user): RequireAssessmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, AppError> {
    Ok(Json(
        AssignmentService::transition(
            &state.db,
            tenant_id,
            auth_user.user_id()?,
            id,
            AssignmentStatus::Published,
        )
        .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/teacher/assignments/{id}/close",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment closed", body = Assignment),
        (status = 400, description = "Assignment already closed")
    ),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn close_assignment(
    State(state): State<AppState>,
    RequireAssessmentsManage(auth_user): RequireAssessmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, AppError> {
    Ok(Json(
        AssignmentService::transition(
            &state.db,
            tenant_id,
            auth_user.user_id()?,
            id,
            AssignmentStatus::Closed,
        )
        .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/teacher/assignments/{id}/submissions",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Submissions received", body = Vec<Submission>),
        (status = 404, description = "Assignment not found")
    ),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_submissions(
    State(state): State<AppState>,
    RequireAssessmentsManage(auth_user): RequireAssessmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Submission>>, AppError> {
    Ok(Json(
        AssignmentService::submissions(&state.db, tenant_id, auth_user.user_id()?, id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/teacher/submissions/{id}/grade",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = GradeSubmissionDto,
    responses(
        (status = 200, description = "Submission graded, late penalty applied", body = Submission),
        (status = 400, description = "Marks outside 0..=total_marks"),
        (status = 404, description = "Submission not found")
    ),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn grade_submission(
    State(state): State<AppState>,
    RequireAssessmentsManage(auth_user): RequireAssessmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<GradeSubmissionDto>,
) -> Result<Json<Submission>, AppError> {
    Ok(Json(
        AssignmentService::grade_submission(&state.db, tenant_id, auth_user.user_id()?, id, dto)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/teacher/assessments",
    request_body = CreateAssessmentDto,
    responses(
        (status = 201, description = "Assessment scheduled", body = Assessment),
        (status = 400, description = "Passing marks exceed total marks"),
        (status = 403, description = "Not assigned to this subject and section")
    ),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_assessment(
    State(state): State<AppState>,
    RequireAssessmentsManage(auth_user): RequireAssessmentsManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateAssessmentDto>,
) -> Result<(StatusCode, Json<Assessment>), AppError> {
    let assessment =
        AssessmentService::create_assessment(&state.db, tenant_id, auth_user.user_id()?, dto)
            .await?;
    Ok((StatusCode::CREATED, Json(assessment)))
}

#[utoipa::path(
    get,
    path = "/api/teacher/assessments",
    params(AssessmentFilterParams),
    responses((status = 200, description = "Assessments set by the caller", body = Vec<Assessment>)),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_assessments(
    State(state): State<AppState>,
    RequireAssessmentsManage(auth_user): RequireAssessmentsManage,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<AssessmentFilterParams>,
) -> Result<Json<Vec<Assessment>>, AppError> {
    Ok(Json(
        AssessmentService::list_assessments(&state.db, tenant_id, auth_user.user_id()?, filters)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/teacher/assessments/{id}/grades",
    params(("id" = Uuid, Path, description = "Assessment ID")),
    request_body = SaveGradesDto,
    responses(
        (status = 200, description = "Grades saved", body = GradesSaved),
        (status = 400, description = "Marks out of range or student not enrolled"),
        (status = 404, description = "Assessment not found")
    ),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn save_grades(
    State(state): State<AppState>,
    RequireAssessmentsManage(auth_user): RequireAssessmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<SaveGradesDto>,
) -> Result<Json<GradesSaved>, AppError> {
    Ok(Json(
        AssessmentService::save_grades(&state.db, tenant_id, auth_user.user_id()?, id, dto)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/teacher/assessments/{id}/grades",
    params(("id" = Uuid, Path, description = "Assessment ID")),
    responses(
        (status = 200, description = "Grades with percentage and letter", body = Vec<GradeReport>),
        (status = 404, description = "Assessment not found")
    ),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_grades(
    State(state): State<AppState>,
    RequireAssessmentsManage(auth_user): RequireAssessmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<GradeReport>>, AppError> {
    Ok(Json(
        AssessmentService::grades(&state.db, tenant_id, auth_user.user_id()?, id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/teacher/assessments/{id}/publish-grades",
    params(("id" = Uuid, Path, description = "Assessment ID")),
    responses(
        (status = 200, description = "Grades visible to students and parents", body = Assessment),
        (status = 404, description = "Assessment not found")
    ),
    tag = "Teacher Portal",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn publish_grades(
    State(state): State<AppState>,
    RequireAssessmentsManage(auth_user): RequireAssessmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<Assessment>, AppError> {
    Ok(Json(
        AssessmentService::publish_grades(&state.db, tenant_id, auth_user.user_id()?, id).await?,
    ))
}
