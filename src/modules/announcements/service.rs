//! College announcements.
//!
//! Every operation takes an optional department scope. The college portal
//! passes `None` and sees everything; the department portal passes the
//! HOD's department and is confined to it.

use anyhow::anyhow;
use campusflow_core::{AppError, Paginated};
use campusflow_models::{
    Announcement, AnnouncementAudience, EnrollmentStatus, Priority, RoleName, TenantId, UserId,
};
use chrono::Utc;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::modules::announcements::model::{
    AnnouncementFilterParams, CreateAnnouncementDto, UpdateAnnouncementDto, check_expiry,
};
use crate::utils::db::ensure_in_tenant;

const VISIBLE_LIMIT: i64 = 100;

pub struct AnnouncementService;

impl AnnouncementService {
    /// A section must exist in the tenant and, under a department scope,
    /// belong to that department.
    async fn check_section(
        db: &PgPool,
        tenant_id: TenantId,
        department: Option<Uuid>,
        section_id: Uuid,
    ) -> Result<(), AppError> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            "SELECT department_id FROM sections WHERE id = $1 AND tenant_id = $2",
        )
        .bind(section_id)
        .bind(tenant_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::bad_request(anyhow!("Section not found")))?;

        match department {
            Some(dept) if dept != owner => Err(AppError::bad_request(anyhow!(
                "Section belongs to another department"
            ))),
            _ => Ok(()),
        }
    }

    #[instrument(skip(db, dto), fields(db.table = "announcements", db.operation = "INSERT"))]
    pub async fn create_announcement(
        db: &PgPool,
        tenant_id: TenantId,
        department: Option<Uuid>,
        posted_by: UserId,
        dto: CreateAnnouncementDto,
    ) -> Result<Announcement, AppError> {
        check_expiry(dto.expires_at, Utc::now()).map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let department_id = department.or(dto.department_id);
        if department.is_none()
            && let Some(dept) = department_id
        {
            ensure_in_tenant(db, "departments", dept, tenant_id, "Department not found").await?;
        }
        if let Some(section_id) = dto.section_id {
            Self::check_section(db, tenant_id, department, section_id).await?;
        }

        let announcement = sqlx::query_as::<_, Announcement>(
            r#"INSERT INTO announcements
                   (tenant_id, title, content, target_audience, department_id, section_id,
                    priority, expires_at, posted_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(&dto.title)
        .bind(&dto.content)
        .bind(dto.target_audience.unwrap_or(AnnouncementAudience::All))
        .bind(department_id)
        .bind(dto.section_id)
        .bind(dto.priority.unwrap_or(Priority::Medium))
        .bind(dto.expires_at)
        .bind(posted_by)
        .fetch_one(db)
        .await?;

        Ok(announcement)
    }

    #[instrument(skip(db), fields(db.table = "announcements", db.operation = "SELECT"))]
    pub async fn list_announcements(
        db: &PgPool,
        tenant_id: TenantId,
        department: Option<Uuid>,
        filters: AnnouncementFilterParams,
    ) -> Result<Paginated<Announcement>, AppError> {
        const WHERE: &str = r#"
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR department_id = $2)
              AND ($3::text IS NULL OR target_audience = $3)
              AND ($4::text IS NULL OR priority = $4)
              AND ($5 OR expires_at IS NULL OR expires_at > NOW())
        "#;
        let department_id = department.or(filters.department_id);

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM announcements {WHERE}"))
            .bind(tenant_id)
            .bind(department_id)
            .bind(filters.target_audience)
            .bind(filters.priority)
            .bind(filters.include_expired)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Announcement>(&format!(
            "SELECT * FROM announcements {WHERE} ORDER BY created_at DESC {}",
            filters.pagination.sql_suffix()
        ))
        .bind(tenant_id)
        .bind(department_id)
        .bind(filters.target_audience)
        .bind(filters.priority)
        .bind(filters.include_expired)
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(data, total, &filters.pagination))
    }

    #[instrument(skip(db), fields(db.table = "announcements", db.operation = "SELECT"))]
    pub async fn get_announcement(
        db: &PgPool,
        tenant_id: TenantId,
        department: Option<Uuid>,
        id: Uuid,
    ) -> Result<Announcement, AppError> {
        sqlx::query_as::<_, Announcement>(
            r#"SELECT * FROM announcements
               WHERE id = $1 AND tenant_id = $2 AND ($3::uuid IS NULL OR department_id = $3)"#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(department)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Announcement not found")))
    }

    #[instrument(skip(db, dto), fields(db.table = "announcements", db.operation = "UPDATE"))]
    pub async fn update_announcement(
        db: &PgPool,
        tenant_id: TenantId,
        department: Option<Uuid>,
        id: Uuid,
        dto: UpdateAnnouncementDto,
    ) -> Result<Announcement, AppError> {
        Self::get_announcement(db, tenant_id, department, id).await?;
        check_expiry(dto.expires_at, Utc::now()).map_err(|e| AppError::bad_request(anyhow!(e)))?;
        if let Some(section_id) = dto.section_id {
            Self::check_section(db, tenant_id, department, section_id).await?;
        }

        let announcement = sqlx::query_as::<_, Announcement>(
            r#"UPDATE announcements SET
                   title = COALESCE($3, title),
                   content = COALESCE($4, content),
                   target_audience = COALESCE($5, target_audience),
                   section_id = COALESCE($6, section_id),
                   priority = COALESCE($7, priority),
                   expires_at = COALESCE($8, expires_at),
                   updated_at = NOW()
               WHERE id = $1 AND tenant_id = $2
               RETURNING *"#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(&dto.title)
        .bind(&dto.content)
        .bind(dto.target_audience)
        .bind(dto.section_id)
        .bind(dto.priority)
        .bind(dto.expires_at)
        .fetch_one(db)
        .await?;

        Ok(announcement)
    }

    #[instrument(skip(db), fields(db.table = "announcements", db.operation = "DELETE"))]
    pub async fn delete_announcement(
        db: &PgPool,
        tenant_id: TenantId,
        department: Option<Uuid>,
        id: Uuid,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"DELETE FROM announcements
               WHERE id = $1 AND tenant_id = $2 AND ($3::uuid IS NULL OR department_id = $3)"#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(department)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Announcement not found")));
        }
        Ok(())
    }

    /// Live announcements addressed to `role`.
    ///
    /// Students only see section-targeted posts for sections they are
    /// actively enrolled in.
    #[instrument(skip(db), fields(db.table = "announcements", db.operation = "SELECT"))]
    pub async fn visible_for(
        db: &PgPool,
        tenant_id: TenantId,
        role: RoleName,
        user_id: UserId,
    ) -> Result<Vec<Announcement>, AppError> {
        let audiences = AnnouncementAudience::visible_to(role);
        let student = (role == RoleName::Student).then_some(user_id);

        let mut announcements = sqlx::query_as::<_, Announcement>(
            r#"SELECT * FROM announcements a
               WHERE a.tenant_id = $1
                 AND ($2::text[] IS NULL OR a.target_audience = ANY($2))
                 AND ($3::uuid IS NULL OR a.section_id IS NULL OR a.section_id IN (
                        SELECT section_id FROM student_enrollments
                        WHERE tenant_id = $1 AND student_id = $3 AND status = $4))
               ORDER BY a.created_at DESC
               LIMIT $5"#,
        )
        .bind(tenant_id)
        .bind(audiences)
        .bind(student)
        .bind(EnrollmentStatus::Active)
        .bind(VISIBLE_LIMIT)
        .fetch_all(db)
        .await?;

        let now = Utc::now();
        announcements.retain(|a| a.is_active(now));
        Ok(announcements)
    }
}
