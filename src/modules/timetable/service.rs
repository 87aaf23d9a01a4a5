use anyhow::anyhow;
use campusflow_core::AppError;
use campusflow_models::{
    DayOfWeek, EnrollmentStatus, RoleName, TenantId, TimetableEntry, TimetableSlot, UserId,
};
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::modules::timetable::model::{
    CreateTimetableEntryDto, TimetableFilterParams, UpdateTimetableEntryDto, check_slot,
};
use crate::modules::users::UserService;
use crate::utils::db::{ensure_in_tenant, unique_violation};

const SLOT_TAKEN: &str = "Timetable slot already taken";
const TEACHER_BUSY: &str = "Teacher is already booked for this day and period";
const TEACHING_ROLES: [RoleName; 2] = [RoleName::Teacher, RoleName::DepartmentAdmin];

/// Slot rows with display names, ordered Monday first.
const SLOT_SELECT: &str = r#"
    SELECT t.id, t.day_of_week, t.period_number, t.start_time, t.end_time,
           t.section_id, s.name AS section_name,
           t.subject_id, sub.name AS subject_name,
           t.teacher_id, u.first_name || ' ' || u.last_name AS teacher_name,
           t.room_number
    FROM timetable_entries t
    JOIN sections s ON s.id = t.section_id
    JOIN subjects sub ON sub.id = t.subject_id
    JOIN users u ON u.id = t.teacher_id
"#;
const SLOT_ORDER: &str = r#"
    ORDER BY array_position(
        ARRAY['monday','tuesday','wednesday','thursday','friday','saturday','sunday'],
        t.day_of_week), t.period_number
"#;

pub struct TimetableService;

impl TimetableService {
    async fn check_teacher_free(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        day: DayOfWeek,
        period: i32,
        except: Option<Uuid>,
    ) -> Result<(), AppError> {
        let busy = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                   SELECT 1 FROM timetable_entries
                   WHERE tenant_id = $1 AND teacher_id = $2
                     AND day_of_week = $3 AND period_number = $4
                     AND ($5::uuid IS NULL OR id <> $5))"#,
        )
        .bind(tenant_id)
        .bind(teacher_id)
        .bind(day)
        .bind(period)
        .bind(except)
        .fetch_one(db)
        .await?;

        if busy {
            return Err(AppError::bad_request(anyhow!(TEACHER_BUSY)));
        }
        Ok(())
    }

    #[instrument(skip(db, dto), fields(db.table = "timetable_entries", db.operation = "INSERT"))]
    pub async fn create_entry(
        db: &PgPool,
        tenant_id: TenantId,
        dto: CreateTimetableEntryDto,
    ) -> Result<TimetableEntry, AppError> {
        check_slot(dto.period_number, dto.start_time, dto.end_time)
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let section_year = sqlx::query_scalar::<_, Uuid>(
            "SELECT academic_year_id FROM sections WHERE id = $1 AND tenant_id = $2",
        )
        .bind(dto.section_id)
        .bind(tenant_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::bad_request(anyhow!("Section not found")))?;
        let academic_year_id = dto.academic_year_id.unwrap_or(section_year);
        ensure_in_tenant(db, "academic_years", academic_year_id, tenant_id, "Academic year not found").await?;
        ensure_in_tenant(db, "subjects", dto.subject_id, tenant_id, "Subject not found").await?;
        UserService::find_member(db, tenant_id, dto.teacher_id, &TEACHING_ROLES, "Teacher not found").await?;
        Self::check_teacher_free(db, tenant_id, dto.teacher_id, dto.day_of_week, dto.period_number, None).await?;

        let entry = sqlx::query_as::<_, TimetableEntry>(
            r#"INSERT INTO timetable_entries
                   (tenant_id, section_id, academic_year_id, day_of_week, period_number,
                    start_time, end_time, subject_id, teacher_id, room_number)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(dto.section_id)
        .bind(academic_year_id)
        .bind(dto.day_of_week)
        .bind(dto.period_number)
        .bind(dto.start_time)
        .bind(dto.end_time)
        .bind(dto.subject_id)
        .bind(dto.teacher_id)
        .bind(&dto.room_number)
        .fetch_one(db)
        .await
        .map_err(unique_violation(SLOT_TAKEN))?;

        info!(entry.id = %entry.id, day = %entry.day_of_week, period = entry.period_number, "Timetable slot created");
        Ok(entry)
    }

    #[instrument(skip(db), fields(db.table = "timetable_entries", db.operation = "SELECT"))]
    pub async fn list_entries(
        db: &PgPool,
        tenant_id: TenantId,
        filters: TimetableFilterParams,
    ) -> Result<Vec<TimetableSlot>, AppError> {
        let slots = sqlx::query_as::<_, TimetableSlot>(&format!(
            r#"{SLOT_SELECT}
               WHERE t.tenant_id = $1
                 AND ($2::uuid IS NULL OR t.section_id = $2)
                 AND ($3::uuid IS NULL OR t.teacher_id = $3)
                 AND ($4::text IS NULL OR t.day_of_week = $4)
               {SLOT_ORDER}"#
        ))
        .bind(tenant_id)
        .bind(filters.section_id)
        .bind(filters.teacher_id)
        .bind(filters.day_of_week)
        .fetch_all(db)
        .await?;

        Ok(slots)
    }

    #[instrument(skip(db), fields(db.table = "timetable_entries", db.operation = "SELECT"))]
    pub async fn get_entry(db: &PgPool, tenant_id: TenantId, id: Uuid) -> Result<TimetableEntry, AppError> {
        sqlx::query_as::<_, TimetableEntry>(
            "SELECT * FROM timetable_entries WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Timetable entry not found")))
    }

    /// Re-checks the merged slot the same way creation does.
    #[instrument(skip(db, dto), fields(db.table = "timetable_entries", db.operation = "UPDATE"))]
    pub async fn update_entry(
        db: &PgPool,
        tenant_id: TenantId,
        id: Uuid,
        dto: UpdateTimetableEntryDto,
    ) -> Result<TimetableEntry, AppError> {
        let current = Self::get_entry(db, tenant_id, id).await?;

        let day = dto.day_of_week.unwrap_or(current.day_of_week);
        let period = dto.period_number.unwrap_or(current.period_number);
        let start = dto.start_time.unwrap_or(current.start_time);
        let end = dto.end_time.unwrap_or(current.end_time);
        let teacher_id = dto.teacher_id.unwrap_or(current.teacher_id);
        check_slot(period, start, end).map_err(|e| AppError::bad_request(anyhow!(e)))?;

        if let Some(subject_id) = dto.subject_id {
            ensure_in_tenant(db, "subjects", subject_id, tenant_id, "Subject not found").await?;
        }
        if dto.teacher_id.is_some() {
            UserService::find_member(db, tenant_id, teacher_id, &TEACHING_ROLES, "Teacher not found").await?;
        }
        Self::check_teacher_free(db, tenant_id, teacher_id, day, period, Some(id)).await?;

        let entry = sqlx::query_as::<_, TimetableEntry>(
            r#"UPDATE timetable_entries SET
                   day_of_week = $3,
                   period_number = $4,
                   start_time = $5,
                   end_time = $6,
                   subject_id = COALESCE($7, subject_id),
                   teacher_id = $8,
                   room_number = COALESCE($9, room_number),
                   updated_at = NOW()
               WHERE id = $1 AND tenant_id = $2
               RETURNING *"#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(day)
        .bind(period)
        .bind(start)
        .bind(end)
        .bind(dto.subject_id)
        .bind(teacher_id)
        .bind(&dto.room_number)
        .fetch_one(db)
        .await
        .map_err(unique_violation(SLOT_TAKEN))?;

        Ok(entry)
    }

    #[instrument(skip(db), fields(db.table = "timetable_entries", db.operation = "DELETE"))]
    pub async fn delete_entry(db: &PgPool, tenant_id: TenantId, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM timetable_entries WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Timetable entry not found")));
        }
        Ok(())
    }

    /// Weekly schedule of one teacher.
    #[instrument(skip(db), fields(db.table = "timetable_entries", db.operation = "SELECT"))]
    pub async fn for_teacher(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
    ) -> Result<Vec<TimetableSlot>, AppError> {
        Self::list_entries(
            db,
            tenant_id,
            TimetableFilterParams {
                teacher_id: Some(teacher_id.into_inner()),
                ..Default::default()
            },
        )
        .await
    }

    /// Weekly schedule across the sections a student is actively enrolled in.
    #[instrument(skip(db), fields(db.table = "timetable_entries", db.operation = "SELECT"))]
    pub async fn for_student(
        db: &PgPool,
        tenant_id: TenantId,
        student_id: UserId,
    ) -> Result<Vec<TimetableSlot>, AppError> {
        let slots = sqlx::query_as::<_, TimetableSlot>(&format!(
            r#"{SLOT_SELECT}
               WHERE t.tenant_id = $1
                 AND t.section_id IN (
                     SELECT section_id FROM student_enrollments
                     WHERE tenant_id = $1 AND student_id = $2 AND status = $3)
               {SLOT_ORDER}"#
        ))
        .bind(tenant_id)
        .bind(student_id)
        .bind(EnrollmentStatus::Active)
        .fetch_all(db)
        .await?;

        Ok(slots)
    }
}
