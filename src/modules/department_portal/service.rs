use campusflow_core::AppError;
use campusflow_models::{Department, EnrollmentStatus, TenantId, UserId, UserRef};
use sqlx::PgPool;
use tracing::instrument;

use crate::modules::academics::DepartmentService;
use crate::modules::department_portal::model::DepartmentOverview;

pub struct DepartmentPortalService;

impl DepartmentPortalService {
    /// The department the caller heads; 403 when there is none.
    pub async fn own_department(
        db: &PgPool,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Department, AppError> {
        DepartmentService::find_by_hod(db, tenant_id, user_id)
            .await?
            .ok_or_else(|| AppError::forbidden("No department assigned".to_string()))
    }

    #[instrument(skip(db, department), fields(department.id = %department.id))]
    pub async fn overview(db: &PgPool, department: Department) -> Result<DepartmentOverview, AppError> {
        let (subject_count, section_count, teacher_count, student_count) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                r#"SELECT
                       (SELECT COUNT(*) FROM subjects WHERE department_id = $1),
                       (SELECT COUNT(*) FROM sections WHERE department_id = $1),
                       (SELECT COUNT(DISTINCT ta.teacher_id)
                          FROM teacher_assignments ta
                          JOIN subjects s ON s.id = ta.subject_id
                          WHERE s.department_id = $1),
                       (SELECT COUNT(*)
                          FROM student_enrollments e
                          JOIN sections sec ON sec.id = e.section_id
                          WHERE sec.department_id = $1 AND e.status = $2)"#,
            )
            .bind(department.id)
            .bind(EnrollmentStatus::Active)
            .fetch_one(db)
            .await?;

        Ok(DepartmentOverview {
            department,
            subject_count,
            section_count,
            teacher_count,
            student_count,
        })
    }

    #[instrument(skip(db, department), fields(department.id = %department.id))]
    pub async fn teachers(db: &PgPool, department: &Department) -> Result<Vec<UserRef>, AppError> {
        let teachers = sqlx::query_as::<_, UserRef>(
            r#"SELECT DISTINCT u.id, u.first_name, u.last_name, u.email
               FROM teacher_assignments ta
               JOIN subjects s ON s.id = ta.subject_id
               JOIN users u ON u.id = ta.teacher_id
               WHERE s.department_id = $1 AND ta.tenant_id = $2
               ORDER BY u.last_name, u.first_name"#,
        )
        .bind(department.id)
        .bind(department.tenant_id)
        .fetch_all(db)
        .await?;

        Ok(teachers)
    }
}
