use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use campusflow_core::{AppError, Paginated};
use campusflow_models::{
    AcademicYear, Department, DepartmentWithCounts, EnrollmentDetail, ParentStudentLink, Section,
    Subject, TeacherAssignment,
};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::{RequireDepartmentsManage, RequireSubjectsManage, RequireUsersManage};
use crate::middleware::tenancy::TenantScope;
use crate::modules::academics::model::{
    CreateAcademicYearDto, CreateDepartmentDto, CreateEnrollmentDto, CreateParentLinkDto,
    CreateSectionDto, CreateSubjectDto, CreateTeacherAssignmentDto, DepartmentFilterParams,
    EnrollmentFilterParams, ParentLinkFilterParams, SectionFilterParams, SubjectFilterParams,
    TeacherAssignmentFilterParams, UpdateAcademicYearDto, UpdateDepartmentDto,
    UpdateEnrollmentDto, UpdateParentLinkDto, UpdateSectionDto, UpdateSubjectDto,
};
use crate::modules::academics::service::{
    AcademicYearService, DepartmentService, EnrollmentService, ParentLinkService, SectionService,
    SubjectService, TeacherAssignmentService,
};
use crate::state::AppState;
use crate::validator::ValidatedJson;

// ----- departments -----

/// Create a department
///
/// Counts against the plan's department allowance.
#[utoipa::path(
    post,
    path = "/api/college/departments",
    request_body = CreateDepartmentDto,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Duplicate code, invalid head or plan limit reached"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn create_department(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateDepartmentDto>,
) -> Result<(StatusCode, Json<Department>), AppError> {
    let department = DepartmentService::create_department(&state.db, tenant_id, dto).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

#[utoipa::path(
    get,
    path = "/api/college/departments",
    params(DepartmentFilterParams),
    responses(
        (status = 200, description = "Departments with subject and section counts", body = Paginated<DepartmentWithCounts>)
    ),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_departments(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<DepartmentFilterParams>,
) -> Result<Json<Paginated<DepartmentWithCounts>>, AppError> {
    Ok(Json(
        DepartmentService::list_departments(&state.db, tenant_id, filters).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/college/departments/{id}",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department", body = Department),
        (status = 404, description = "Department not found")
    ),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_department(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<Department>, AppError> {
    Ok(Json(
        DepartmentService::get_department(&state.db, tenant_id, id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/college/departments/{id}",
    params(("id" = Uuid, Path, description = "Department ID")),
    request_body = UpdateDepartmentDto,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 404, description = "Department not found")
    ),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_department(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateDepartmentDto>,
) -> Result<Json<Department>, AppError> {
    Ok(Json(
        DepartmentService::update_department(&state.db, tenant_id, id, dto).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/college/departments/{id}",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 204, description = "Department deleted"),
        (status = 404, description = "Department not found")
    ),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_department(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    DepartmentService::delete_department(&state.db, tenant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----- subjects -----

#[utoipa::path(
    post,
    path = "/api/college/subjects",
    request_body = CreateSubjectDto,
    responses(
        (status = 201, description = "Subject created", body = Subject),
        (status = 400, description = "Unknown department or duplicate code")
    ),
    tag = "Subjects",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn create_subject(
    State(state): State<AppState>,
    _auth: RequireSubjectsManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateSubjectDto>,
) -> Result<(StatusCode, Json<Subject>), AppError> {
    let subject = SubjectService::create_subject(&state.db, tenant_id, dto).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

#[utoipa::path(
    get,
    path = "/api/college/subjects",
    params(SubjectFilterParams),
    responses((status = 200, description = "Subjects", body = Paginated<Subject>)),
    tag = "Subjects",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_subjects(
    State(state): State<AppState>,
    _auth: RequireSubjectsManage,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<SubjectFilterParams>,
) -> Result<Json<Paginated<Subject>>, AppError> {
    Ok(Json(
        SubjectService::list_subjects(&state.db, tenant_id, filters).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/college/subjects/{id}",
    params(("id" = Uuid, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Subject", body = Subject),
        (status = 404, description = "Subject not found")
    ),
    tag = "Subjects",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_subject(
    State(state): State<AppState>,
    _auth: RequireSubjectsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<Subject>, AppError> {
    Ok(Json(SubjectService::get_subject(&state.db, tenant_id, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/college/subjects/{id}",
    params(("id" = Uuid, Path, description = "Subject ID")),
    request_body = UpdateSubjectDto,
    responses(
        (status = 200, description = "Subject updated", body = Subject),
        (status = 404, description = "Subject not found")
    ),
    tag = "Subjects",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_subject(
    State(state): State<AppState>,
    _auth: RequireSubjectsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateSubjectDto>,
) -> Result<Json<Subject>, AppError> {
    Ok(Json(
        SubjectService::update_subject(&state.db, tenant_id, id, dto).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/college/subjects/{id}",
    params(("id" = Uuid, Path, description = "Subject ID")),
    responses(
        (status = 204, description = "Subject deleted"),
        (status = 404, description = "Subject not found")
    ),
    tag = "Subjects",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_subject(
    State(state): State<AppState>,
    _auth: RequireSubjectsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    SubjectService::delete_subject(&state.db, tenant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----- academic years -----

#[utoipa::path(
    post,
    path = "/api/college/academic-years",
    request_body = CreateAcademicYearDto,
    responses(
        (status = 201, description = "Academic year created", body = AcademicYear),
        (status = 400, description = "Invalid range or duplicate name")
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn create_academic_year(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateAcademicYearDto>,
) -> Result<(StatusCode, Json<AcademicYear>), AppError> {
    let year = AcademicYearService::create_year(&state.db, tenant_id, dto).await?;
    Ok((StatusCode::CREATED, Json(year)))
}

#[utoipa::path(
    get,
    path = "/api/college/academic-years",
    responses((status = 200, description = "Academic years, newest first", body = Vec<AcademicYear>)),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_academic_years(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<Vec<AcademicYear>>, AppError> {
    Ok(Json(AcademicYearService::list_years(&state.db, tenant_id).await?))
}

/// The current academic year
///
/// Falls back to the active year spanning today and marks it current.
#[utoipa::path(
    get,
    path = "/api/college/academic-years/current",
    responses(
        (status = 200, description = "Current academic year", body = AcademicYear),
        (status = 404, description = "No current academic year")
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn current_academic_year(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<AcademicYear>, AppError> {
    Ok(Json(
        AcademicYearService::get_current_academic_year(&state.db, tenant_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/college/academic-years/{id}",
    params(("id" = Uuid, Path, description = "Academic year ID")),
    responses(
        (status = 200, description = "Academic year", body = AcademicYear),
        (status = 404, description = "Academic year not found")
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_academic_year(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<AcademicYear>, AppError> {
    Ok(Json(AcademicYearService::get_year(&state.db, tenant_id, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/college/academic-years/{id}",
    params(("id" = Uuid, Path, description = "Academic year ID")),
    request_body = UpdateAcademicYearDto,
    responses(
        (status = 200, description = "Academic year updated", body = AcademicYear),
        (status = 400, description = "Invalid range"),
        (status = 404, description = "Academic year not found")
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_academic_year(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateAcademicYearDto>,
) -> Result<Json<AcademicYear>, AppError> {
    Ok(Json(
        AcademicYearService::update_year(&state.db, tenant_id, id, dto).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/college/academic-years/{id}",
    params(("id" = Uuid, Path, description = "Academic year ID")),
    responses(
        (status = 204, description = "Academic year deleted"),
        (status = 404, description = "Academic year not found")
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_academic_year(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    AcademicYearService::delete_year(&state.db, tenant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/college/academic-years/{id}/set-current",
    params(("id" = Uuid, Path, description = "Academic year ID")),
    responses(
        (status = 200, description = "Academic year is now current", body = AcademicYear),
        (status = 404, description = "Academic year not found")
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn set_current_academic_year(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<AcademicYear>, AppError> {
    Ok(Json(
        AcademicYearService::set_current(&state.db, tenant_id, id).await?,
    ))
}

// ----- sections -----

#[utoipa::path(
    post,
    path = "/api/college/sections",
    request_body = CreateSectionDto,
    responses(
        (status = 201, description = "Section created", body = Section),
        (status = 400, description = "Unknown department or year, or duplicate code")
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn create_section(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateSectionDto>,
) -> Result<(StatusCode, Json<Section>), AppError> {
    let section = SectionService::create_section(&state.db, tenant_id, dto).await?;
    Ok((StatusCode::CREATED, Json(section)))
}

#[utoipa::path(
    get,
    path = "/api/college/sections",
    params(SectionFilterParams),
    responses((status = 200, description = "Sections", body = Paginated<Section>)),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_sections(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<SectionFilterParams>,
) -> Result<Json<Paginated<Section>>, AppError> {
    Ok(Json(
        SectionService::list_sections(&state.db, tenant_id, filters).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/college/sections/{id}",
    params(("id" = Uuid, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Section", body = Section),
        (status = 404, description = "Section not found")
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_section(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<Section>, AppError> {
    Ok(Json(SectionService::get_section(&state.db, tenant_id, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/college/sections/{id}",
    params(("id" = Uuid, Path, description = "Section ID")),
    request_body = UpdateSectionDto,
    responses(
        (status = 200, description = "Section updated", body = Section),
        (status = 400, description = "Capacity below enrolled count"),
        (status = 404, description = "Section not found")
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_section(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateSectionDto>,
) -> Result<Json<Section>, AppError> {
    Ok(Json(
        SectionService::update_section(&state.db, tenant_id, id, dto).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/college/sections/{id}",
    params(("id" = Uuid, Path, description = "Section ID")),
    responses(
        (status = 204, description = "Section deleted"),
        (status = 404, description = "Section not found")
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_section(
    State(state): State<AppState>,
    _auth: RequireDepartmentsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    SectionService::delete_section(&state.db, tenant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----- enrollments -----

/// Enroll a student in a section
#[utoipa::path(
    post,
    path = "/api/college/enrollments",
    request_body = CreateEnrollmentDto,
    responses(
        (status = 201, description = "Student enrolled", body = EnrollmentDetail),
        (status = 400, description = "Section is full, not a student, or already enrolled")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn create_enrollment(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateEnrollmentDto>,
) -> Result<(StatusCode, Json<EnrollmentDetail>), AppError> {
    let enrollment = EnrollmentService::create_enrollment(&state.db, tenant_id, dto).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/api/college/enrollments",
    params(EnrollmentFilterParams),
    responses((status = 200, description = "Enrollments", body = Paginated<EnrollmentDetail>)),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_enrollments(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<EnrollmentFilterParams>,
) -> Result<Json<Paginated<EnrollmentDetail>>, AppError> {
    Ok(Json(
        EnrollmentService::list_enrollments(&state.db, tenant_id, filters).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/college/enrollments/{id}",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Enrollment", body = EnrollmentDetail),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_enrollment(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<EnrollmentDetail>, AppError> {
    Ok(Json(
        EnrollmentService::get_enrollment(&state.db, tenant_id, id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/college/enrollments/{id}",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    request_body = UpdateEnrollmentDto,
    responses(
        (status = 200, description = "Enrollment updated", body = EnrollmentDetail),
        (status = 400, description = "Section is full"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_enrollment(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateEnrollmentDto>,
) -> Result<Json<EnrollmentDetail>, AppError> {
    Ok(Json(
        EnrollmentService::update_enrollment(&state.db, tenant_id, id, dto).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/college/enrollments/{id}",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 204, description = "Enrollment removed"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_enrollment(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    EnrollmentService::delete_enrollment(&state.db, tenant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----- teacher assignments -----

#[utoipa::path(
    post,
    path = "/api/college/teacher-assignments",
    request_body = CreateTeacherAssignmentDto,
    responses(
        (status = 201, description = "Teacher assigned", body = TeacherAssignment),
        (status = 400, description = "Not a teacher, unknown subject or section, or duplicate")
    ),
    tag = "Teacher Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn create_teacher_assignment(
    State(state): State<AppState>,
    _auth: RequireSubjectsManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateTeacherAssignmentDto>,
) -> Result<(StatusCode, Json<TeacherAssignment>), AppError> {
    let assignment = TeacherAssignmentService::create_assignment(&state.db, tenant_id, dto).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    get,
    path = "/api/college/teacher-assignments",
    params(TeacherAssignmentFilterParams),
    responses((status = 200, description = "Teacher assignments", body = Vec<TeacherAssignment>)),
    tag = "Teacher Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_teacher_assignments(
    State(state): State<AppState>,
    _auth: RequireSubjectsManage,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<TeacherAssignmentFilterParams>,
) -> Result<Json<Vec<TeacherAssignment>>, AppError> {
    Ok(Json(
        TeacherAssignmentService::list_assignments(&state.db, tenant_id, filters).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/college/teacher-assignments/{id}",
    params(("id" = Uuid, Path, description = "Teacher assignment ID")),
    responses(
        (status = 204, description = "Assignment removed"),
        (status = 404, description = "Teacher assignment not found")
    ),
    tag = "Teacher Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_teacher_assignment(
    State(state): State<AppState>,
    _auth: RequireSubjectsManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    TeacherAssignmentService::delete_assignment(&state.db, tenant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----- parent links -----

#[utoipa::path(
    post,
    path = "/api/college/parent-links",
    request_body = CreateParentLinkDto,
    responses(
        (status = 201, description = "Parent linked", body = ParentStudentLink),
        (status = 400, description = "Wrong roles or already linked")
    ),
    tag = "Parent Links",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn create_parent_link(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CreateParentLinkDto>,
) -> Result<(StatusCode, Json<ParentStudentLink>), AppError> {
    let link = ParentLinkService::create_link(&state.db, tenant_id, dto).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

#[utoipa::path(
    get,
    path = "/api/college/parent-links",
    params(ParentLinkFilterParams),
    responses((status = 200, description = "Parent links", body = Vec<ParentStudentLink>)),
    tag = "Parent Links",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_parent_links(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<ParentLinkFilterParams>,
) -> Result<Json<Vec<ParentStudentLink>>, AppError> {
    Ok(Json(
        ParentLinkService::list_links(&state.db, tenant_id, filters).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/college/parent-links/{id}",
    params(("id" = Uuid, Path, description = "Parent link ID")),
    request_body = UpdateParentLinkDto,
    responses(
        (status = 200, description = "Link updated", body = ParentStudentLink),
        (status = 404, description = "Parent link not found")
    ),
    tag = "Parent Links",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_parent_link(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateParentLinkDto>,
) -> Result<Json<ParentStudentLink>, AppError> {
    Ok(Json(
        ParentLinkService::update_link(&state.db, tenant_id, id, dto).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/college/parent-links/{id}",
    params(("id" = Uuid, Path, description = "Parent link ID")),
    responses(
        (status = 204, description = "Link removed"),
        (status = 404, description = "Parent link not found")
    ),
    tag = "Parent Links",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_parent_link(
    State(state): State<AppState>,
    _auth: RequireUsersManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ParentLinkService::delete_link(&state.db, tenant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
