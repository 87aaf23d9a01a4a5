//! Read-only views of a parent's linked children.
//!
//! Every per-child read first resolves the parent-student link; a missing
//! link or a cleared permission flag is a 403.

use campusflow_core::AppError;
use campusflow_models::{
    FeePayment, GradeReport, ParentStudentLink, TenantId, UserId,
};
use sqlx::PgPool;
use tracing::{instrument, warn};

use crate::modules::fees::FeeService;
use crate::modules::parent_portal::model::{Child, ChildView};
use crate::modules::teaching::model::StudentAttendance;
use crate::modules::teaching::{AssessmentService, AttendanceService};

pub struct ParentPortalService;

impl ParentPortalService {
    #[instrument(skip(db), fields(db.table = "parent_student_links", db.operation = "SELECT"))]
    pub async fn children(
        db: &PgPool,
        tenant_id: TenantId,
        parent_id: UserId,
    ) -> Result<Vec<Child>, AppError> {
        let children = sqlx::query_as::<_, Child>(
            r#"SELECT l.*, u.first_name, u.last_name, u.email
               FROM parent_student_links l
               JOIN users u ON u.id = l.student_id
               WHERE l.tenant_id = $1 AND l.parent_id = $2
               ORDER BY l.is_primary_contact DESC, u.first_name"#,
        )
        .bind(tenant_id)
        .bind(parent_id)
        .fetch_all(db)
        .await?;

        Ok(children)
    }

    #[instrument(skip(db), fields(db.table = "parent_student_links", db.operation = "SELECT"))]
    async fn authorize(
        db: &PgPool,
        tenant_id: TenantId,
        parent_id: UserId,
        student_id: UserId,
        view: ChildView,
    ) -> Result<(), AppError> {
        let link = sqlx::query_as::<_, ParentStudentLink>(
            r#"SELECT * FROM parent_student_links
               WHERE tenant_id = $1 AND parent_id = $2 AND student_id = $3"#,
        )
        .bind(tenant_id)
        .bind(parent_id)
        .bind(student_id)
        .fetch_optional(db)
        .await?;

        match link {
            Some(link) if view.allowed_by(&link) => Ok(()),
            _ => {
                warn!(%parent_id, %student_id, ?view, "Parent view denied");
                Err(AppError::forbidden(view.denial().to_string()))
            }
        }
    }

    pub async fn attendance(
        db: &PgPool,
        tenant_id: TenantId,
        parent_id: UserId,
        student_id: UserId,
    ) -> Result<StudentAttendance, AppError> {
        Self::authorize(db, tenant_id, parent_id, student_id, ChildView::Attendance).await?;
        AttendanceService::for_student(db, tenant_id, student_id).await
    }

    pub async fn grades(
        db: &PgPool,
        tenant_id: TenantId,
        parent_id: UserId,
        student_id: UserId,
    ) -> Result<Vec<GradeReport>, AppError> {
        Self::authorize(db, tenant_id, parent_id, student_id, ChildView::Grades).await?;
        AssessmentService::published_for_student(db, tenant_id, student_id).await
    }

    pub async fn fees(
        db: &PgPool,
        tenant_id: TenantId,
        parent_id: UserId,
        student_id: UserId,
    ) -> Result<Vec<FeePayment>, AppError> {
        Self::authorize(db, tenant_id, parent_id, student_id, ChildView::Fees).await?;
        FeeService::for_student(db, tenant_id, student_id).await
    }
}
