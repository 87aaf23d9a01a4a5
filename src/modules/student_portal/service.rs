use campusflow_core::AppError;
use campusflow_models::{TenantId, UserId, classroom::attendance_percentage};
use sqlx::PgPool;
use tracing::instrument;

use crate::modules::academics::EnrollmentService;
use crate::modules::student_portal::model::StudentDashboard;
use crate::modules::teaching::{AssignmentService, AttendanceService};

pub struct StudentPortalService;

impl StudentPortalService {
    #[instrument(skip(db))]
    pub async fn dashboard(
        db: &PgPool,
        tenant_id: TenantId,
        student_id: UserId,
    ) -> Result<StudentDashboard, AppError> {
        let enrollments = EnrollmentService::active_for_student(db, tenant_id, student_id).await?;

        let summary = AttendanceService::summary_for_student(db, tenant_id, student_id).await?;
        let (attended, total) = summary
            .iter()
            .fold((0, 0), |(a, t), s| (a + s.present + s.late, t + s.total));

        let pending_assignments = AssignmentService::for_student(db, tenant_id, student_id)
            .await?
            .into_iter()
            .filter(|a| a.submission_status.is_none())
            .collect();

        let published_grades = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM grades g
               JOIN assessments a ON a.id = g.assessment_id
               WHERE g.tenant_id = $1 AND g.student_id = $2 AND a.is_published"#,
        )
        .bind(tenant_id)
        .bind(student_id)
        .fetch_one(db)
        .await?;

        Ok(StudentDashboard {
            enrollments,
            attendance_percentage: attendance_percentage(attended, total),
            pending_assignments,
            published_grades,
        })
    }
}
