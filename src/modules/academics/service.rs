//! College structure services.
//!
//! Every query is pinned to the caller's tenant; ids from another college
//! behave exactly like ids that do not exist.

use anyhow::anyhow;
use campusflow_core::{AppError, Paginated};
use campusflow_models::{
    AcademicYear, Department, DepartmentWithCounts, Enrollment, EnrollmentDetail,
    EnrollmentStatus, LimitKind, ParentStudentLink, Relationship, RoleName, Section, Subject,
    SubjectType, TeacherAssignment, TenantId, UserId,
};
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::modules::academics::model::{
    CreateAcademicYearDto, CreateDepartmentDto, CreateEnrollmentDto, CreateParentLinkDto,
    CreateSectionDto, CreateSubjectDto, CreateTeacherAssignmentDto, DepartmentFilterParams,
    EnrollmentFilterParams, ParentLinkFilterParams, SectionFilterParams, SubjectFilterParams,
    TeacherAssignmentFilterParams, UpdateAcademicYearDto, UpdateDepartmentDto,
    UpdateEnrollmentDto, UpdateParentLinkDto, UpdateSectionDto, UpdateSubjectDto,
    check_year_range, seat_delta,
};
use crate::modules::users::UserService;
use crate::utils::db::{ensure_in_tenant, unique_violation};
use crate::utils::limits::{decrement_tenant_usage, reserve_usage};

const HOD_ROLES: [RoleName; 2] = [RoleName::DepartmentAdmin, RoleName::Teacher];
const SECTION_FULL: &str = "Section is full";

pub struct DepartmentService;

impl DepartmentService {
    async fn check_hod(
        db: &PgPool,
        tenant_id: TenantId,
        hod_id: Option<UserId>,
    ) -> Result<(), AppError> {
        if let Some(hod) = hod_id {
            UserService::find_member(
                db,
                tenant_id,
                hod,
                &HOD_ROLES,
                "Head of department must be a teacher or department admin of this college",
            )
            .await?;
        }
        Ok(())
    }

    /// Creates the department and takes one slot of the plan's department
    /// allowance in the same transaction.
    #[instrument(skip(db, dto), fields(db.table = "departments", db.operation = "INSERT"))]
    pub async fn create_department(
        db: &PgPool,
        tenant_id: TenantId,
        dto: CreateDepartmentDto,
    ) -> Result<Department, AppError> {
        Self::check_hod(db, tenant_id, dto.hod_id).await?;

        let mut tx = db.begin().await?;
        reserve_usage(&mut tx, tenant_id, LimitKind::Departments, 1).await?;

        let department = sqlx::query_as::<_, Department>(
            r#"INSERT INTO departments
                   (tenant_id, name, code, description, hod_id, email, phone,
                    office_location, established_year)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(&dto.name)
        .bind(dto.code.trim().to_uppercase())
        .bind(&dto.description)
        .bind(dto.hod_id)
        .bind(&dto.email)
        .bind(&dto.phone)
        .bind(&dto.office_location)
        .bind(dto.established_year)
        .fetch_one(&mut *tx)
        .await
        .map_err(unique_violation("A department with this code already exists"))?;

        tx.commit().await?;
        info!(department.id = %department.id, department.code = %department.code, "Department created");
        Ok(department)
    }

    #[instrument(skip(db), fields(db.table = "departments", db.operation = "SELECT"))]
    pub async fn list_departments(
        db: &PgPool,
        tenant_id: TenantId,
        filters: DepartmentFilterParams,
    ) -> Result<Paginated<DepartmentWithCounts>, AppError> {
        const WHERE: &str = r#"
            WHERE d.tenant_id = $1
              AND ($2::text IS NULL OR d.name ILIKE '%' || $2 || '%' OR d.code ILIKE '%' || $2 || '%')
              AND ($3::boolean IS NULL OR d.is_active = $3)"#;

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM departments d{WHERE}"))
                .bind(tenant_id)
                .bind(&filters.search)
                .bind(filters.is_active)
                .fetch_one(db)
                .await?;

        let departments = sqlx::query_as::<_, DepartmentWithCounts>(&format!(
            r#"SELECT d.*,
                      (SELECT COUNT(*) FROM subjects s WHERE s.department_id = d.id) AS subject_count,
                      (SELECT COUNT(*) FROM sections sc WHERE sc.department_id = d.id) AS section_count
               FROM departments d{WHERE}
               ORDER BY d.name{}"#,
            filters.pagination.sql_suffix()
        ))
        .bind(tenant_id)
        .bind(&filters.search)
        .bind(filters.is_active)
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(departments, total, &filters.pagination))
    }

    #[instrument(skip(db), fields(db.table = "departments", db.operation = "SELECT"))]
    pub async fn get_department(
        db: &PgPool,
        tenant_id: TenantId,
        id: Uuid,
    ) -> Result<Department, AppError> {
        sqlx::query_as::<_, Department>(
            "SELECT * FROM departments WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Department not found")))
    }

    #[instrument(skip(db, dto), fields(db.table = "departments", db.operation = "UPDATE"))]
    pub async fn update_department(
        db: &PgPool,
        tenant_id: TenantId,
        id: Uuid,
        dto: UpdateDepartmentDto,
    ) -> Result<Department, AppError> {
        Self::check_hod(db, tenant_id, dto.hod_id).await?;

        sqlx::query_as::<_, Department>(
            r#"UPDATE departments SET
                   name = COALESCE($3, name),
                   code = COALESCE($4, code),
                   description = COALESCE($5, description),
                   hod_id = COALESCE($6, hod_id),
                   email = COALESCE($7, email),
                   phone = COALESCE($8, phone),
                   office_location = COALESCE($9, office_location),
                   established_year = COALESCE($10, established_year),
                   is_active = COALESCE($11, is_active),
                   updated_at = NOW()
               WHERE id = $1 AND tenant_id = $2
               RETURNING *"#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(&dto.name)
        .bind(dto.code.map(|c| c.trim().to_uppercase()))
        .bind(&dto.description)
        .bind(dto.hod_id)
        .bind(&dto.email)
        .bind(&dto.phone)
        .bind(&dto.office_location)
        .bind(dto.established_year)
        .bind(dto.is_active)
        .fetch_optional(db)
        .await
        .map_err(unique_violation("A department with this code already exists"))?
        .ok_or_else(|| AppError::not_found(anyhow!("Department not found")))
    }

    /// Deletes the department with its subjects and sections, and frees the
    /// department slot.
    #[instrument(skip(db), fields(db.table = "departments", db.operation = "DELETE"))]
    pub async fn delete_department(
        db: &PgPool,
        tenant_id: TenantId,
        id: Uuid,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;
        let result = sqlx::query("DELETE FROM departments WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Department not found")));
        }
        decrement_tenant_usage(&mut tx, tenant_id, LimitKind::Departments, 1).await?;
        tx.commit().await?;
        Ok(())
    }

    /// The department led by `hod_id`, if any.
    pub async fn find_by_hod(
        db: &PgPool,
        tenant_id: TenantId,
        hod_id: UserId,
    ) -> Result<Option<Department>, AppError> {
        let department = sqlx::query_as::<_, Department>(
            r#"SELECT * FROM departments
               WHERE tenant_id = $1 AND hod_id = $2
               ORDER BY created_at
               LIMIT 1"#,
        )
        .bind(tenant_id)
        .bind(hod_id)
        .fetch_optional(db)
        .await?;
        Ok(department)
    }
}

pub struct SubjectService;

impl SubjectService {
    #[instrument(skip(db, dto), fields(db.table = "subjects", db.operation = "INSERT"))]
    pub async fn create_subject(
        db: &PgPool,
        tenant_id: TenantId,
        dto: CreateSubjectDto,
    ) -> Result<Subject, AppError> {
        ensure_in_tenant(db, "departments", dto.department_id, tenant_id, "Department not found").await?;

        let subject = sqlx::query_as::<_, Subject>(
            r#"INSERT INTO subjects
                   (tenant_id, department_id, name, code, description, credits,
                    hours_per_week, subject_type, semester, year)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(dto.department_id)
        .bind(&dto.name)
        .bind(dto.code.trim().to_uppercase())
        .bind(&dto.description)
        .bind(dto.credits.unwrap_or(3))
        .bind(dto.hours_per_week.unwrap_or(3))
        .bind(dto.subject_type.unwrap_or(SubjectType::Theory))
        .bind(dto.semester)
        .bind(dto.year)
        .fetch_one(db)
        .await
        .map_err(unique_violation(
            "A subject with this code already exists in the department",
        ))?;

        Ok(subject)
    }

    #[instrument(skip(db), fields(db.table = "subjects", db.operation = "SELECT"))]
    pub async fn list_subjects(
        db: &PgPool,
        tenant_id: TenantId,
        filters: SubjectFilterParams,
    ) -> Result<Paginated<Subject>, AppError> {
        const WHERE: &str = r#"
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR department_id = $2)
              AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%' OR code ILIKE '%' || $3 || '%')"#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM subjects{WHERE}"))
            .bind(tenant_id)
            .bind(filters.department_id)
            .bind(&filters.search)
            .fetch_one(db)
            .await?;

        let subjects = sqlx::query_as::<_, Subject>(&format!(
            "SELECT * FROM subjects{WHERE} ORDER BY code{}",
            filters.pagination.sql_suffix()
        ))
        .bind(tenant_id)
        .bind(filters.department_id)
        .bind(&filters.search)
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(subjects, total, &filters.pagination))
    }

    pub async fn list_for_department(
        db: &PgPool,
        tenant_id: TenantId,
        department_id: Uuid,
    ) -> Result<Vec<Subject>, AppError> {
        let subjects = sqlx::query_as::<_, Subject>(
            "SELECT * FROM subjects WHERE tenant_id = $1 AND department_id = $2 ORDER BY code",
        )
        .bind(tenant_id)
        .bind(department_id)
        .fetch_all(db)
        .await?;
        Ok(subjects)
    }

    #[instrument(skip(db), fields(db.table = "subjects", db.operation = "SELECT"))]
    pub async fn get_subject(db: &PgPool, tenant_id: TenantId, id: Uuid) -> Result<Subject, AppError> {
        sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Subject not found")))
    }

    #[instrument(skip(db, dto), fields(db.table = "subjects", db.operation = "UPDATE"))]
    pub async fn update_subject(
        db: &PgPool,
        tenant_id: TenantId,
        id: Uuid,
        dto: UpdateSubjectDto,
    ) -> Result<Subject, AppError> {
        sqlx::query_as::<_, Subject>(
            r#"UPDATE subjects SET
                   name = COALESCE($3, name),
                   code = COALESCE($4, code),
                   description = COALESCE($5, description),
                   credits = COALESCE($6, credits),
                   hours_per_week = COALESCE($7, hours_per_week),
                   subject_type = COALESCE($8, subject_type),
                   semester = COALESCE($9, semester),
                   year = COALESCE($10, year),
                   is_active = COALESCE($11, is_active),
                   updated_at = NOW()
               WHERE id = $1 AND tenant_id = $2
               RETURNING *"#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(&dto.name)
        .bind(dto.code.map(|c| c.trim().to_uppercase()))
        .bind(&dto.description)
        .bind(dto.credits)
        .bind(dto.hours_per_week)
        .bind(dto.subject_type)
        .bind(dto.semester)
        .bind(dto.year)
        .bind(dto.is_active)
        .fetch_optional(db)
        .await
        .map_err(unique_violation(
            "A subject with this code already exists in the department",
        ))?
        .ok_or_else(|| AppError::not_found(anyhow!("Subject not found")))
    }

    #[instrument(skip(db), fields(db.table = "subjects", db.operation = "DELETE"))]
    pub async fn delete_subject(db: &PgPool, tenant_id: TenantId, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Subject not found")));
        }
        Ok(())
    }
}

pub struct AcademicYearService;

impl AcademicYearService {
    async fn clear_current(conn: &mut PgConnection, tenant_id: TenantId) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE academic_years SET is_current = FALSE, updated_at = NOW() \
             WHERE tenant_id = $1 AND is_current",
        )
        .bind(tenant_id)
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument(skip(db, dto), fields(db.table = "academic_years", db.operation = "INSERT"))]
    pub async fn create_year(
        db: &PgPool,
        tenant_id: TenantId,
        dto: CreateAcademicYearDto,
    ) -> Result<AcademicYear, AppError> {
        check_year_range(dto.start_date, dto.end_date)
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let mut tx = db.begin().await?;
        if dto.is_current {
            Self::clear_current(&mut tx, tenant_id).await?;
        }

        let year = sqlx::query_as::<_, AcademicYear>(
            r#"INSERT INTO academic_years (tenant_id, name, start_date, end_date, is_current)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(&dto.name)
        .bind(dto.start_date)
        .bind(dto.end_date)
        .bind(dto.is_current)
        .fetch_one(&mut *tx)
        .await
        .map_err(unique_violation("An academic year with this name already exists"))?;

        tx.commit().await?;
        Ok(year)
    }

    #[instrument(skip(db), fields(db.table = "academic_years", db.operation = "SELECT"))]
    pub async fn list_years(db: &PgPool, tenant_id: TenantId) -> Result<Vec<AcademicYear>, AppError> {
        let years = sqlx::query_as::<_, AcademicYear>(
            "SELECT * FROM academic_years WHERE tenant_id = $1 ORDER BY start_date DESC",
        )
        .bind(tenant_id)
        .fetch_all(db)
        .await?;
        Ok(years)
    }

    pub async fn get_year(db: &PgPool, tenant_id: TenantId, id: Uuid) -> Result<AcademicYear, AppError> {
        sqlx::query_as::<_, AcademicYear>(
            "SELECT * FROM academic_years WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Academic year not found")))
    }

    #[instrument(skip(db, dto), fields(db.table = "academic_years", db.operation = "UPDATE"))]
    pub async fn update_year(
        db: &PgPool,
        tenant_id: TenantId,
        id: Uuid,
        dto: UpdateAcademicYearDto,
    ) -> Result<AcademicYear, AppError> {
        let existing = Self::get_year(db, tenant_id, id).await?;
        let start = dto.start_date.unwrap_or(existing.start_date);
        let end = dto.end_date.unwrap_or(existing.end_date);
        check_year_range(start, end).map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let year = sqlx::query_as::<_, AcademicYear>(
            r#"UPDATE academic_years SET
                   name = COALESCE($3, name),
                   start_date = $4,
                   end_date = $5,
                   is_active = COALESCE($6, is_active),
                   updated_at = NOW()
               WHERE id = $1 AND tenant_id = $2
               RETURNING *"#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(&dto.name)
        .bind(start)
        .bind(end)
        .bind(dto.is_active)
        .fetch_one(db)
        .await
        .map_err(unique_violation("An academic year with this name already exists"))?;

        Ok(year)
    }

    #[instrument(skip(db), fields(db.table = "academic_years", db.operation = "DELETE"))]
    pub async fn delete_year(db: &PgPool, tenant_id: TenantId, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM academic_years WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Academic year not found")));
        }
        Ok(())
    }

    /// Flags `id` as the current year and clears the flag everywhere else.
    #[instrument(skip(db), fields(db.table = "academic_years", db.operation = "UPDATE"))]
    pub async fn set_current(
        db: &PgPool,
        tenant_id: TenantId,
        id: Uuid,
    ) -> Result<AcademicYear, AppError> {
        let mut tx = db.begin().await?;
        Self::clear_current(&mut tx, tenant_id).await?;

        let year = sqlx::query_as::<_, AcademicYear>(
            r#"UPDATE academic_years SET is_current = TRUE, updated_at = NOW()
               WHERE id = $1 AND tenant_id = $2
               RETURNING *"#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Academic year not found")))?;

        tx.commit().await?;
        info!(academic_year.id = %year.id, academic_year.name = %year.name, "Current academic year changed");
        Ok(year)
    }

    /// The year flagged current. Failing that, the active year spanning
    /// today is promoted to current.
    #[instrument(skip(db), fields(db.table = "academic_years", db.operation = "SELECT"))]
    pub async fn get_current_academic_year(
        db: &PgPool,
        tenant_id: TenantId,
    ) -> Result<AcademicYear, AppError> {
        let flagged = sqlx::query_as::<_, AcademicYear>(
            "SELECT * FROM academic_years WHERE tenant_id = $1 AND is_current LIMIT 1",
        )
        .bind(tenant_id)
        .fetch_optional(db)
        .await?;
        if let Some(year) = flagged {
            return Ok(year);
        }

        let today = Utc::now().date_naive();
        let spanning = sqlx::query_as::<_, AcademicYear>(
            r#"SELECT * FROM academic_years
               WHERE tenant_id = $1 AND is_active AND start_date <= $2 AND end_date >= $2
               ORDER BY start_date DESC
               LIMIT 1"#,
        )
        .bind(tenant_id)
        .bind(today)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("No current academic year")))?;

        Self::set_current(db, tenant_id, spanning.id).await
    }
}

pub struct SectionService;

impl SectionService {
    #[instrument(skip(db, dto), fields(db.table = "sections", db.operation = "INSERT"))]
    pub async fn create_section(
        db: &PgPool,
        tenant_id: TenantId,
        dto: CreateSectionDto,
    ) -> Result<Section, AppError> {
        ensure_in_tenant(db, "departments", dto.department_id, tenant_id, "Department not found").await?;
        ensure_in_tenant(db, "academic_years", dto.academic_year_id, tenant_id, "Academic year not found").await?;
        if let Some(rep) = dto.class_representative_id {
            UserService::find_member(
                db,
                tenant_id,
                rep,
                &[RoleName::Student],
                "Class representative must be a student of this college",
            )
            .await?;
        }

        let section = sqlx::query_as::<_, Section>(
            r#"INSERT INTO sections
                   (tenant_id, department_id, academic_year_id, name, code, semester, year,
                    max_students, class_representative_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(dto.department_id)
        .bind(dto.academic_year_id)
        .bind(&dto.name)
        .bind(dto.code.trim().to_uppercase())
        .bind(dto.semester)
        .bind(dto.year)
        .bind(dto.max_students.unwrap_or(60))
        .bind(dto.class_representative_id)
        .fetch_one(db)
        .await
        .map_err(unique_violation(
            "A section with this code already exists for the department and year",
        ))?;

        Ok(section)
    }

    #[instrument(skip(db), fields(db.table = "sections", db.operation = "SELECT"))]
    pub async fn list_sections(
        db: &PgPool,
        tenant_id: TenantId,
        filters: SectionFilterParams,
    ) -> Result<Paginated<Section>, AppError> {
        const WHERE: &str = r#"
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR department_id = $2)
              AND ($3::uuid IS NULL OR academic_year_id = $3)"#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM sections{WHERE}"))
            .bind(tenant_id)
            .bind(filters.department_id)
            .bind(filters.academic_year_id)
            .fetch_one(db)
            .await?;

        let sections = sqlx::query_as::<_, Section>(&format!(
            "SELECT * FROM sections{WHERE} ORDER BY code{}",
            filters.pagination.sql_suffix()
        ))
        .bind(tenant_id)
        .bind(filters.department_id)
        .bind(filters.academic_year_id)
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(sections, total, &filters.pagination))
    }

    pub async fn get_section(db: &PgPool, tenant_id: TenantId, id: Uuid) -> Result<Section, AppError> {
        sqlx::query_as::<_, Section>("SELECT * FROM sections WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Section not found")))
    }

    async fn lock_section(
        conn: &mut PgConnection,
        tenant_id: TenantId,
        id: Uuid,
    ) -> Result<Section, AppError> {
        sqlx::query_as::<_, Section>(
            "SELECT * FROM sections WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::bad_request(anyhow!("Section not found")))
    }

    async fn adjust_count(conn: &mut PgConnection, id: Uuid, delta: i32) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE sections SET current_student_count = GREATEST(current_student_count + $2, 0), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument(skip(db, dto), fields(db.table = "sections", db.operation = "UPDATE"))]
    pub async fn update_section(
        db: &PgPool,
        tenant_id: TenantId,
        id: Uuid,
        dto: UpdateSectionDto,
    ) -> Result<Section, AppError> {
        if let Some(rep) = dto.class_representative_id {
            UserService::find_member(
                db,
                tenant_id,
                rep,
                &[RoleName::Student],
                "Class representative must be a student of this college",
            )
            .await?;
        }
        let existing = Self::get_section(db, tenant_id, id).await?;
        if let Some(max) = dto.max_students
            && max < existing.current_student_count
        {
            return Err(AppError::bad_request(anyhow!(
                "Capacity cannot be lower than the number of enrolled students"
            )));
        }

        sqlx::query_as::<_, Section>(
            r#"UPDATE sections SET
                   name = COALESCE($3, name),
                   code = COALESCE($4, code),
                   semester = COALESCE($5, semester),
                   year = COALESCE($6, year),
                   max_students = COALESCE($7, max_students),
                   class_representative_id = COALESCE($8, class_representative_id),
                   is_active = COALESCE($9, is_active),
                   updated_at = NOW()
               WHERE id = $1 AND tenant_id = $2
               RETURNING *"#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(&dto.name)
        .bind(dto.code.map(|c| c.trim().to_uppercase()))
        .bind(dto.semester)
        .bind(dto.year)
        .bind(dto.max_students)
        .bind(dto.class_representative_id)
        .bind(dto.is_active)
        .fetch_one(db)
        .await
        .map_err(unique_violation(
            "A section with this code already exists for the department and year",
        ))
    }

    #[instrument(skip(db), fields(db.table = "sections", db.operation = "DELETE"))]
    pub async fn delete_section(db: &PgPool, tenant_id: TenantId, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM sections WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Section not found")));
        }
        Ok(())
    }

    pub async fn list_for_department(
        db: &PgPool,
        tenant_id: TenantId,
        department_id: Uuid,
    ) -> Result<Vec<Section>, AppError> {
        let sections = sqlx::query_as::<_, Section>(
            "SELECT * FROM sections WHERE tenant_id = $1 AND department_id = $2 ORDER BY code",
        )
        .bind(tenant_id)
        .bind(department_id)
        .fetch_all(db)
        .await?;
        Ok(sections)
    }
}

pub struct EnrollmentService;

impl EnrollmentService {
    fn detail_query() -> &'static str {
        r#"SELECT e.*, s.name AS section_name,
                  u.first_name AS student_first_name, u.last_name AS student_last_name
           FROM student_enrollments e
           JOIN sections s ON s.id = e.section_id
           JOIN users u ON u.id = e.student_id"#
    }

    /// Enrolls a student, holding the section row locked while the seat is
    /// checked and taken.
    #[instrument(skip(db, dto), fields(db.table = "student_enrollments", db.operation = "INSERT"))]
    pub async fn create_enrollment(
        db: &PgPool,
        tenant_id: TenantId,
        dto: CreateEnrollmentDto,
    ) -> Result<EnrollmentDetail, AppError> {
        UserService::find_member(
            db,
            tenant_id,
            dto.student_id,
            &[RoleName::Student],
            "Enrolled user must be a student of this college",
        )
        .await?;

        let mut tx = db.begin().await?;
        let section = SectionService::lock_section(&mut tx, tenant_id, dto.section_id).await?;
        if section.is_full() {
            return Err(AppError::bad_request(anyhow!(SECTION_FULL)));
        }
        let academic_year_id = dto.academic_year_id.unwrap_or(section.academic_year_id);

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO student_enrollments
                   (tenant_id, student_id, section_id, academic_year_id, roll_number, enrollment_date)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id"#,
        )
        .bind(tenant_id)
        .bind(dto.student_id)
        .bind(section.id)
        .bind(academic_year_id)
        .bind(&dto.roll_number)
        .bind(dto.enrollment_date.unwrap_or_else(|| Utc::now().date_naive()))
        .fetch_one(&mut *tx)
        .await
        .map_err(unique_violation(
            "Student is already enrolled in this section for the year",
        ))?;

        SectionService::adjust_count(&mut tx, section.id, 1).await?;
        tx.commit().await?;

        Self::get_enrollment(db, tenant_id, id).await
    }

    #[instrument(skip(db), fields(db.table = "student_enrollments", db.operation = "SELECT"))]
    pub async fn list_enrollments(
        db: &PgPool,
        tenant_id: TenantId,
        filters: EnrollmentFilterParams,
    ) -> Result<Paginated<EnrollmentDetail>, AppError> {
        const WHERE: &str = r#"
            WHERE e.tenant_id = $1
              AND ($2::uuid IS NULL OR e.section_id = $2)
              AND ($3::uuid IS NULL OR e.student_id = $3)
              AND ($4::text IS NULL OR e.status = $4)"#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM student_enrollments e{WHERE}"
        ))
        .bind(tenant_id)
        .bind(filters.section_id)
        .bind(filters.student_id)
        .bind(filters.status)
        .fetch_one(db)
        .await?;

        let enrollments = sqlx::query_as::<_, EnrollmentDetail>(&format!(
            "{}{WHERE} ORDER BY s.name, e.roll_number NULLS LAST, u.last_name{}",
            Self::detail_query(),
            filters.pagination.sql_suffix()
        ))
        .bind(tenant_id)
        .bind(filters.section_id)
        .bind(filters.student_id)
        .bind(filters.status)
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(enrollments, total, &filters.pagination))
    }

    pub async fn get_enrollment(
        db: &PgPool,
        tenant_id: TenantId,
        id: Uuid,
    ) -> Result<EnrollmentDetail, AppError> {
        sqlx::query_as::<_, EnrollmentDetail>(&format!(
            "{} WHERE e.id = $1 AND e.tenant_id = $2",
            Self::detail_query()
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Enrollment not found")))
    }

    /// Active enrollments of a student, newest first.
    pub async fn active_for_student(
        db: &PgPool,
        tenant_id: TenantId,
        student_id: UserId,
    ) -> Result<Vec<EnrollmentDetail>, AppError> {
        let enrollments = sqlx::query_as::<_, EnrollmentDetail>(&format!(
            "{} WHERE e.tenant_id = $1 AND e.student_id = $2 AND e.status = $3 \
             ORDER BY e.enrollment_date DESC",
            Self::detail_query()
        ))
        .bind(tenant_id)
        .bind(student_id)
        .bind(EnrollmentStatus::Active)
        .fetch_all(db)
        .await?;
        Ok(enrollments)
    }

    /// Updates roll number or status. Leaving or re-entering `active` frees
    /// or takes a seat.
    #[instrument(skip(db, dto), fields(db.table = "student_enrollments", db.operation = "UPDATE"))]
    pub async fn update_enrollment(
        db: &PgPool,
        tenant_id: TenantId,
        id: Uuid,
        dto: UpdateEnrollmentDto,
    ) -> Result<EnrollmentDetail, AppError> {
        let mut tx = db.begin().await?;
        let existing = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM student_enrollments WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Enrollment not found")))?;

        let new_status = dto.status.unwrap_or(existing.status);
        let delta = seat_delta(existing.status, new_status);
        if delta > 0 {
            let section = SectionService::lock_section(&mut tx, tenant_id, existing.section_id).await?;
            if section.is_full() {
                return Err(AppError::bad_request(anyhow!(SECTION_FULL)));
            }
        }

        sqlx::query(
            r#"UPDATE student_enrollments SET
                   roll_number = COALESCE($2, roll_number),
                   status = $3,
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(&dto.roll_number)
        .bind(new_status)
        .execute(&mut *tx)
        .await?;

        if delta != 0 {
            SectionService::adjust_count(&mut tx, existing.section_id, delta).await?;
        }
        tx.commit().await?;

        Self::get_enrollment(db, tenant_id, id).await
    }

    #[instrument(skip(db), fields(db.table = "student_enrollments", db.operation = "DELETE"))]
    pub async fn delete_enrollment(db: &PgPool, tenant_id: TenantId, id: Uuid) -> Result<(), AppError> {
        let mut tx = db.begin().await?;
        let removed = sqlx::query_as::<_, Enrollment>(
            "DELETE FROM student_enrollments WHERE id = $1 AND tenant_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Enrollment not found")))?;

        if removed.status == EnrollmentStatus::Active {
            SectionService::adjust_count(&mut tx, removed.section_id, -1).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Whether `student_id` holds an active enrollment in `section_id`.
    pub async fn is_enrolled(
        db: &PgPool,
        tenant_id: TenantId,
        student_id: UserId,
        section_id: Uuid,
    ) -> Result<bool, AppError> {
        let enrolled = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                   SELECT 1 FROM student_enrollments
                   WHERE tenant_id = $1 AND student_id = $2 AND section_id = $3 AND status = $4
               )"#,
        )
        .bind(tenant_id)
        .bind(student_id)
        .bind(section_id)
        .bind(EnrollmentStatus::Active)
        .fetch_one(db)
        .await?;
        Ok(enrolled)
    }
}

pub struct TeacherAssignmentService;

impl TeacherAssignmentService {
    #[instrument(skip(db, dto), fields(db.table = "teacher_assignments", db.operation = "INSERT"))]
    pub async fn create_assignment(
        db: &PgPool,
        tenant_id: TenantId,
        dto: CreateTeacherAssignmentDto,
    ) -> Result<TeacherAssignment, AppError> {
        UserService::find_member(
            db,
            tenant_id,
            dto.teacher_id,
            &HOD_ROLES,
            "Assigned user must be a teacher of this college",
        )
        .await?;
        ensure_in_tenant(db, "subjects", dto.subject_id, tenant_id, "Subject not found").await?;
        let section = SectionService::get_section(db, tenant_id, dto.section_id)
            .await
            .map_err(|_| AppError::bad_request(anyhow!("Section not found")))?;
        let academic_year_id = dto.academic_year_id.unwrap_or(section.academic_year_id);

        let assignment = sqlx::query_as::<_, TeacherAssignment>(
            r#"INSERT INTO teacher_assignments
                   (tenant_id, teacher_id, subject_id, section_id, academic_year_id, is_primary)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(dto.teacher_id)
        .bind(dto.subject_id)
        .bind(section.id)
        .bind(academic_year_id)
        .bind(dto.is_primary)
        .fetch_one(db)
        .await
        .map_err(unique_violation(
            "Teacher is already assigned to this subject and section",
        ))?;

        Ok(assignment)
    }

    #[instrument(skip(db), fields(db.table = "teacher_assignments", db.operation = "SELECT"))]
    pub async fn list_assignments(
        db: &PgPool,
        tenant_id: TenantId,
        filters: TeacherAssignmentFilterParams,
    ) -> Result<Vec<TeacherAssignment>, AppError> {
        let assignments = sqlx::query_as::<_, TeacherAssignment>(
            r#"SELECT * FROM teacher_assignments
               WHERE tenant_id = $1
                 AND ($2::uuid IS NULL OR teacher_id = $2)
                 AND ($3::uuid IS NULL OR section_id = $3)
                 AND ($4::uuid IS NULL OR subject_id = $4)
               ORDER BY created_at"#,
        )
        .bind(tenant_id)
        .bind(filters.teacher_id)
        .bind(filters.section_id)
        .bind(filters.subject_id)
        .fetch_all(db)
        .await?;
        Ok(assignments)
    }

    #[instrument(skip(db), fields(db.table = "teacher_assignments", db.operation = "DELETE"))]
    pub async fn delete_assignment(db: &PgPool, tenant_id: TenantId, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM teacher_assignments WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Teacher assignment not found")));
        }
        Ok(())
    }

    /// Whether the teacher teaches `subject_id` to `section_id`.
    pub async fn teaches(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        subject_id: Uuid,
        section_id: Uuid,
    ) -> Result<bool, AppError> {
        let teaches = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                   SELECT 1 FROM teacher_assignments
                   WHERE tenant_id = $1 AND teacher_id = $2 AND subject_id = $3 AND section_id = $4
               )"#,
        )
        .bind(tenant_id)
        .bind(teacher_id)
        .bind(subject_id)
        .bind(section_id)
        .fetch_one(db)
        .await?;
        Ok(teaches)
    }
}

pub struct ParentLinkService;

impl ParentLinkService {
    #[instrument(skip(db, dto), fields(db.table = "parent_student_links", db.operation = "INSERT"))]
    pub async fn create_link(
        db: &PgPool,
        tenant_id: TenantId,
        dto: CreateParentLinkDto,
    ) -> Result<ParentStudentLink, AppError> {
        UserService::find_member(
            db,
            tenant_id,
            dto.parent_id,
            &[RoleName::Parent],
            "Linked parent must hold the parent role in this college",
        )
        .await?;
        UserService::find_member(
            db,
            tenant_id,
            dto.student_id,
            &[RoleName::Student],
            "Linked student must be a student of this college",
        )
        .await?;

        let link = sqlx::query_as::<_, ParentStudentLink>(
            r#"INSERT INTO parent_student_links
                   (tenant_id, parent_id, student_id, relationship, is_primary_contact,
                    can_view_grades, can_view_attendance, can_view_behavior)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(dto.parent_id)
        .bind(dto.student_id)
        .bind(dto.relationship.unwrap_or(Relationship::Guardian))
        .bind(dto.is_primary_contact)
        .bind(dto.can_view_grades.unwrap_or(true))
        .bind(dto.can_view_attendance.unwrap_or(true))
        .bind(dto.can_view_behavior.unwrap_or(true))
        .fetch_one(db)
        .await
        .map_err(unique_violation("Parent is already linked to this student"))?;

        Ok(link)
    }

    #[instrument(skip(db), fields(db.table = "parent_student_links", db.operation = "SELECT"))]
    pub async fn list_links(
        db: &PgPool,
        tenant_id: TenantId,
        filters: ParentLinkFilterParams,
    ) -> Result<Vec<ParentStudentLink>, AppError> {
        let links = sqlx::query_as::<_, ParentStudentLink>(
            r#"SELECT * FROM parent_student_links
               WHERE tenant_id = $1
                 AND ($2::uuid IS NULL OR parent_id = $2)
                 AND ($3::uuid IS NULL OR student_id = $3)
               ORDER BY created_at"#,
        )
        .bind(tenant_id)
        .bind(filters.parent_id)
        .bind(filters.student_id)
        .fetch_all(db)
        .await?;
        Ok(links)
    }

    #[instrument(skip(db, dto), fields(db.table = "parent_student_links", db.operation = "UPDATE"))]
    pub async fn update_link(
        db: &PgPool,
        tenant_id: TenantId,
        id: Uuid,
        dto: UpdateParentLinkDto,
    ) -> Result<ParentStudentLink, AppError> {
        sqlx::query_as::<_, ParentStudentLink>(
            r#"UPDATE parent_student_links SET
                   relationship = COALESCE($3, relationship),
                   is_primary_contact = COALESCE($4, is_primary_contact),
                   can_view_grades = COALESCE($5, can_view_grades),
                   can_view_attendance = COALESCE($6, can_view_attendance),
                   can_view_behavior = COALESCE($7, can_view_behavior),
                   updated_at = NOW()
               WHERE id = $1 AND tenant_id = $2
               RETURNING *"#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(dto.relationship)
        .bind(dto.is_primary_contact)
        .bind(dto.can_view_grades)
        .bind(dto.can_view_attendance)
        .bind(dto.can_view_behavior)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Parent link not found")))
    }

    #[instrument(skip(db), fields(db.table = "parent_student_links", db.operation = "DELETE"))]
    pub async fn delete_link(db: &PgPool, tenant_id: TenantId, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM parent_student_links WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Parent link not found")));
        }
        Ok(())
    }
}
