//! Classroom work: attendance sheets, assignments with submissions, and
//! assessments with grades.
//!
//! Teacher-facing writes require a matching teacher assignment for the
//! subject and section. Student-facing reads live here as well so the
//! student and parent portals share one implementation.

use std::collections::HashSet;

use anyhow::anyhow;
use campusflow_core::{AppError, Paginated};
use campusflow_models::{
    Assessment, Assignment, AssignmentStatus, AttendanceRecord, AttendanceSummary,
    EnrollmentStatus, Grade, GradeReport, Submission, SubmissionStatus, TeachingClass, TenantId,
    UserId, apply_late_penalty,
};
use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::modules::academics::TeacherAssignmentService;
use crate::modules::teaching::model::{
    AssessmentFilterParams, AssignmentFilterParams, AttendanceMarked, AttendanceQuery,
    CreateAssessmentDto, CreateAssignmentDto, GradeSubmissionDto, GradesSaved, MarkAttendanceDto,
    SaveGradesDto, StudentAssignment, StudentAttendance, SubmitAssignmentDto,
    UpdateAssignmentDto, check_marks, check_transition,
};

const NOT_ASSIGNED: &str = "You are not assigned to this subject and section";

const GRADE_REPORT_SELECT: &str = r#"
    SELECT g.id AS grade_id, g.assessment_id, a.title AS assessment_title, a.assessment_type,
           a.subject_id, sub.name AS subject_name,
           g.student_id, u.first_name || ' ' || u.last_name AS student_name,
           g.marks_obtained, a.total_marks, a.passing_marks, g.remarks
    FROM grades g
    JOIN assessments a ON a.id = g.assessment_id
    JOIN subjects sub ON sub.id = a.subject_id
    JOIN users u ON u.id = g.student_id
"#;

async fn ensure_teaches(
    db: &PgPool,
    tenant_id: TenantId,
    teacher_id: UserId,
    subject_id: Uuid,
    section_id: Uuid,
) -> Result<(), AppError> {
    if TeacherAssignmentService::teaches(db, tenant_id, teacher_id, subject_id, section_id).await? {
        Ok(())
    } else {
        Err(AppError::forbidden(NOT_ASSIGNED.to_string()))
    }
}

/// Fails unless every student holds an active enrollment in the section.
async fn ensure_enrolled(
    db: &PgPool,
    tenant_id: TenantId,
    section_id: Uuid,
    students: &[UserId],
) -> Result<(), AppError> {
    let enrolled: HashSet<UserId> = sqlx::query_scalar::<_, UserId>(
        r#"SELECT student_id FROM student_enrollments
           WHERE tenant_id = $1 AND section_id = $2 AND status = $3 AND student_id = ANY($4)"#,
    )
    .bind(tenant_id)
    .bind(section_id)
    .bind(EnrollmentStatus::Active)
    .bind(students)
    .fetch_all(db)
    .await?
    .into_iter()
    .collect();

    match students.iter().find(|s| !enrolled.contains(*s)) {
        Some(missing) => Err(AppError::bad_request(anyhow!(
            "Student {missing} is not enrolled in this section"
        ))),
        None => Ok(()),
    }
}

pub struct ClassService;

impl ClassService {
    #[instrument(skip(db), fields(db.table = "teacher_assignments", db.operation = "SELECT"))]
    pub async fn classes_for_teacher(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
    ) -> Result<Vec<TeachingClass>, AppError> {
        let classes = sqlx::query_as::<_, TeachingClass>(
            r#"SELECT ta.id AS assignment_id, ta.subject_id, sub.name AS subject_name,
                      sub.code AS subject_code, ta.section_id, s.name AS section_name,
                      ta.academic_year_id, ta.is_primary
               FROM teacher_assignments ta
               JOIN subjects sub ON sub.id = ta.subject_id
               JOIN sections s ON s.id = ta.section_id
               WHERE ta.tenant_id = $1 AND ta.teacher_id = $2
               ORDER BY sub.code, s.name"#,
        )
        .bind(tenant_id)
        .bind(teacher_id)
        .fetch_all(db)
        .await?;

        Ok(classes)
    }
}

pub struct AttendanceService;

impl AttendanceService {
    /// Upserts one sheet; a second sheet for the same day overwrites statuses.
    #[instrument(skip(db, dto), fields(db.table = "attendance", db.operation = "UPSERT"))]
    pub async fn mark_attendance(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        dto: MarkAttendanceDto,
    ) -> Result<AttendanceMarked, AppError> {
        ensure_teaches(db, tenant_id, teacher_id, dto.subject_id, dto.section_id).await?;
        let students: Vec<UserId> = dto.entries.iter().map(|e| e.student_id).collect();
        ensure_enrolled(db, tenant_id, dto.section_id, &students).await?;

        let date = dto.date.unwrap_or_else(|| Utc::now().date_naive());
        let mut tx = db.begin().await?;
        for entry in &dto.entries {
            sqlx::query(
                r#"INSERT INTO attendance
                       (tenant_id, student_id, subject_id, section_id, date, status, notes, marked_by)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                   ON CONFLICT (tenant_id, student_id, subject_id, date) DO UPDATE SET
                       status = EXCLUDED.status,
                       notes = EXCLUDED.notes,
                       section_id = EXCLUDED.section_id,
                       marked_by = EXCLUDED.marked_by,
                       updated_at = NOW()"#,
            )
            .bind(tenant_id)
            .bind(entry.student_id)
            .bind(dto.subject_id)
            .bind(dto.section_id)
            .bind(date)
            .bind(entry.status)
            .bind(&entry.notes)
            .bind(teacher_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        let marked = AttendanceMarked::tally(date, dto.entries.iter().map(|e| &e.status));
        info!(section.id = %dto.section_id, subject.id = %dto.subject_id, %date, marked = marked.marked, "Attendance marked");
        Ok(marked)
    }

    #[instrument(skip(db), fields(db.table = "attendance", db.operation = "SELECT"))]
    pub async fn list_for_class(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        query: AttendanceQuery,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        ensure_teaches(db, tenant_id, teacher_id, query.subject_id, query.section_id).await?;

        let records = sqlx::query_as::<_, AttendanceRecord>(
            r#"SELECT * FROM attendance
               WHERE tenant_id = $1 AND section_id = $2 AND subject_id = $3
                 AND ($4::date IS NULL OR date = $4)
               ORDER BY date DESC, student_id"#,
        )
        .bind(tenant_id)
        .bind(query.section_id)
        .bind(query.subject_id)
        .bind(query.date)
        .fetch_all(db)
        .await?;

        Ok(records)
    }

    /// Per-subject tallies for one student; late counts as attended.
    #[instrument(skip(db), fields(db.table = "attendance", db.operation = "SELECT"))]
    pub async fn summary_for_student(
        db: &PgPool,
        tenant_id: TenantId,
        student_id: UserId,
    ) -> Result<Vec<AttendanceSummary>, AppError> {
        let rows = sqlx::query_as::<_, AttendanceSummary>(
            r#"SELECT a.subject_id, sub.name AS subject_name,
                      COUNT(*) AS total,
                      COUNT(*) FILTER (WHERE a.status = 'present') AS present,
                      COUNT(*) FILTER (WHERE a.status = 'absent') AS absent,
                      COUNT(*) FILTER (WHERE a.status = 'late') AS late,
                      COUNT(*) FILTER (WHERE a.status = 'excused') AS excused
               FROM attendance a
               JOIN subjects sub ON sub.id = a.subject_id
               WHERE a.tenant_id = $1 AND a.student_id = $2
               GROUP BY a.subject_id, sub.name
               ORDER BY sub.name"#,
        )
        .bind(tenant_id)
        .bind(student_id)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(AttendanceSummary::with_percentage).collect())
    }

    #[instrument(skip(db), fields(db.table = "attendance", db.operation = "SELECT"))]
    pub async fn for_student(
        db: &PgPool,
        tenant_id: TenantId,
        student_id: UserId,
    ) -> Result<StudentAttendance, AppError> {
        let summary = Self::summary_for_student(db, tenant_id, student_id).await?;
        let records = sqlx::query_as::<_, AttendanceRecord>(
            "SELECT * FROM attendance WHERE tenant_id = $1 AND student_id = $2 ORDER BY date DESC",
        )
        .bind(tenant_id)
        .bind(student_id)
        .fetch_all(db)
        .await?;

        Ok(StudentAttendance { summary, records })
    }
}

pub struct AssignmentService;

impl AssignmentService {
    #[instrument(skip(db, dto), fields(db.table = "assignments", db.operation = "INSERT"))]
    pub async fn create_assignment(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        dto: CreateAssignmentDto,
    ) -> Result<Assignment, AppError> {
        ensure_teaches(db, tenant_id, teacher_id, dto.subject_id, dto.section_id).await?;

        let assignment = sqlx::query_as::<_, Assignment>(
            r#"INSERT INTO assignments
                   (tenant_id, teacher_id, subject_id, section_id, title, description, due_date,
                    total_marks, allow_late_submission, late_submission_penalty, status)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(teacher_id)
        .bind(dto.subject_id)
        .bind(dto.section_id)
        .bind(&dto.title)
        .bind(dto.description.as_deref().unwrap_or_default())
        .bind(dto.due_date)
        .bind(dto.total_marks.unwrap_or(100))
        .bind(dto.allow_late_submission)
        .bind(dto.late_submission_penalty.unwrap_or(0))
        .bind(dto.status.unwrap_or(AssignmentStatus::Draft))
        .fetch_one(db)
        .await?;

        info!(assignment.id = %assignment.id, status = %assignment.status, "Assignment created");
        Ok(assignment)
    }

    #[instrument(skip(db), fields(db.table = "assignments", db.operation = "SELECT"))]
    pub async fn list_assignments(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        filters: AssignmentFilterParams,
    ) -> Result<Paginated<Assignment>, AppError> {
        const WHERE: &str = r#"
            WHERE tenant_id = $1 AND teacher_id = $2
              AND ($3::uuid IS NULL OR section_id = $3)
              AND ($4::uuid IS NULL OR subject_id = $4)
              AND ($5::text IS NULL OR status = $5)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM assignments {WHERE}"))
            .bind(tenant_id)
            .bind(teacher_id)
            .bind(filters.section_id)
            .bind(filters.subject_id)
            .bind(filters.status)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Assignment>(&format!(
            "SELECT * FROM assignments {WHERE} ORDER BY due_date DESC {}",
            filters.pagination.sql_suffix()
        ))
        .bind(tenant_id)
        .bind(teacher_id)
        .bind(filters.section_id)
        .bind(filters.subject_id)
        .bind(filters.status)
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(data, total, &filters.pagination))
    }

    /// One of the teacher's own assignments.
    pub async fn get_assignment(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        id: Uuid,
    ) -> Result<Assignment, AppError> {
        sqlx::query_as::<_, Assignment>(
            "SELECT * FROM assignments WHERE id = $1 AND tenant_id = $2 AND teacher_id = $3",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(teacher_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Assignment not found")))
    }

    #[instrument(skip(db, dto), fields(db.table = "assignments", db.operation = "UPDATE"))]
    pub async fn update_assignment(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        id: Uuid,
        dto: UpdateAssignmentDto,
    ) -> Result<Assignment, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"UPDATE assignments SET
                   title = COALESCE($4, title),
                   description = COALESCE($5, description),
                   due_date = COALESCE($6, due_date),
                   total_marks = COALESCE($7, total_marks),
                   allow_late_submission = COALESCE($8, allow_late_submission),
                   late_submission_penalty = COALESCE($9, late_submission_penalty),
                   updated_at = NOW()
               WHERE id = $1 AND tenant_id = $2 AND teacher_id = $3
               RETURNING *"#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(teacher_id)
        .bind(&dto.title)
        .bind(&dto.description)
        .bind(dto.due_date)
        .bind(dto.total_marks)
        .bind(dto.allow_late_submission)
        .bind(dto.late_submission_penalty)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Assignment not found")))?;

        Ok(assignment)
    }

    /// Publishes a draft or closes a published assignment.
    #[instrument(skip(db), fields(db.table = "assignments", db.operation = "UPDATE"))]
    pub async fn transition(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        id: Uuid,
        to: AssignmentStatus,
    ) -> Result<Assignment, AppError> {
        let current = Self::get_assignment(db, tenant_id, teacher_id, id).await?;
        check_transition(current.status, to).map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let assignment = sqlx::query_as::<_, Assignment>(
            "UPDATE assignments SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(to)
        .fetch_one(db)
        .await?;

        info!(assignment.id = %id, status = %to, "Assignment status changed");
        Ok(assignment)
    }

    #[instrument(skip(db), fields(db.table = "assignment_submissions", db.operation = "SELECT"))]
    pub async fn submissions(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        assignment_id: Uuid,
    ) -> Result<Vec<Submission>, AppError> {
        Self::get_assignment(db, tenant_id, teacher_id, assignment_id).await?;
        let submissions = sqlx::query_as::<_, Submission>(
            "SELECT * FROM assignment_submissions WHERE assignment_id = $1 ORDER BY submitted_at",
        )
        .bind(assignment_id)
        .fetch_all(db)
        .await?;

        Ok(submissions)
    }

    /// Grades a submission; late work loses the assignment's penalty.
    #[instrument(skip(db, dto), fields(db.table = "assignment_submissions", db.operation = "UPDATE"))]
    pub async fn grade_submission(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        submission_id: Uuid,
        dto: GradeSubmissionDto,
    ) -> Result<Submission, AppError> {
        let submission = sqlx::query_as::<_, Submission>(
            "SELECT * FROM assignment_submissions WHERE id = $1 AND tenant_id = $2",
        )
        .bind(submission_id)
        .bind(tenant_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Submission not found")))?;
        let assignment =
            Self::get_assignment(db, tenant_id, teacher_id, submission.assignment_id).await?;

        if !(0..=assignment.total_marks).contains(&dto.marks_obtained) {
            return Err(AppError::bad_request(anyhow!(
                "Marks must be between 0 and {}",
                assignment.total_marks
            )));
        }
        let marks = if submission.is_late {
            apply_late_penalty(dto.marks_obtained, assignment.late_submission_penalty)
        } else {
            dto.marks_obtained
        };

        let graded = sqlx::query_as::<_, Submission>(
            r#"UPDATE assignment_submissions SET
                   marks_obtained = $2,
                   feedback = $3,
                   status = $4,
                   graded_by = $5,
                   graded_date = NOW(),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(submission_id)
        .bind(marks)
        .bind(&dto.feedback)
        .bind(SubmissionStatus::Graded)
        .bind(teacher_id)
        .fetch_one(db)
        .await?;

        info!(submission.id = %submission_id, marks, late = graded.is_late, "Submission graded");
        Ok(graded)
    }

    /// Published assignments across the student's active sections.
    #[instrument(skip(db), fields(db.table = "assignments", db.operation = "SELECT"))]
    pub async fn for_student(
        db: &PgPool,
        tenant_id: TenantId,
        student_id: UserId,
    ) -> Result<Vec<StudentAssignment>, AppError> {
        let assignments = sqlx::query_as::<_, StudentAssignment>(
            r#"SELECT a.*, s.status AS submission_status, s.submitted_at, s.marks_obtained
               FROM assignments a
               LEFT JOIN assignment_submissions s
                      ON s.assignment_id = a.id AND s.student_id = $2
               WHERE a.tenant_id = $1 AND a.status = $3
                 AND a.section_id IN (
                     SELECT section_id FROM student_enrollments
                     WHERE tenant_id = $1 AND student_id = $2 AND status = $4)
               ORDER BY a.due_date"#,
        )
        .bind(tenant_id)
        .bind(student_id)
        .bind(AssignmentStatus::Published)
        .bind(EnrollmentStatus::Active)
        .fetch_all(db)
        .await?;

        Ok(assignments)
    }

    #[instrument(skip(db, dto), fields(db.table = "assignment_submissions", db.operation = "UPSERT"))]
    pub async fn submit(
        db: &PgPool,
        tenant_id: TenantId,
        student_id: UserId,
        assignment_id: Uuid,
        dto: SubmitAssignmentDto,
    ) -> Result<Submission, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"SELECT a.* FROM assignments a
               WHERE a.id = $1 AND a.tenant_id = $2 AND a.status <> $4
                 AND EXISTS (
                     SELECT 1 FROM student_enrollments e
                     WHERE e.section_id = a.section_id AND e.student_id = $3 AND e.status = $5)"#,
        )
        .bind(assignment_id)
        .bind(tenant_id)
        .bind(student_id)
        .bind(AssignmentStatus::Draft)
        .bind(EnrollmentStatus::Active)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Assignment not found")))?;

        if assignment.status == AssignmentStatus::Closed {
            return Err(AppError::bad_request(anyhow!("Assignment is closed")));
        }
        let is_late = assignment.is_past_due(Utc::now());
        if is_late && !assignment.allow_late_submission {
            return Err(AppError::bad_request(anyhow!("Late submissions are not allowed")));
        }

        let existing = sqlx::query_as::<_, Submission>(
            "SELECT * FROM assignment_submissions WHERE assignment_id = $1 AND student_id = $2",
        )
        .bind(assignment_id)
        .bind(student_id)
        .fetch_optional(db)
        .await?;
        if let Some(previous) = &existing
            && !previous.can_resubmit()
        {
            return Err(AppError::bad_request(anyhow!(
                "Submission has already been graded"
            )));
        }

        let submission = sqlx::query_as::<_, Submission>(
            r#"INSERT INTO assignment_submissions
                   (tenant_id, assignment_id, student_id, content, is_late, status)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (assignment_id, student_id) DO UPDATE SET
                   content = EXCLUDED.content,
                   is_late = EXCLUDED.is_late,
                   status = EXCLUDED.status,
                   submitted_at = NOW(),
                   updated_at = NOW()
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(assignment_id)
        .bind(student_id)
        .bind(&dto.content)
        .bind(is_late)
        .bind(SubmissionStatus::Submitted)
        .fetch_one(db)
        .await?;

        info!(assignment.id = %assignment_id, is_late, resubmission = existing.is_some(), "Assignment submitted");
        Ok(submission)
    }
}

pub struct AssessmentService;

impl AssessmentService {
    #[instrument(skip(db, dto), fields(db.table = "assessments", db.operation = "INSERT"))]
    pub async fn create_assessment(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        dto: CreateAssessmentDto,
    ) -> Result<Assessment, AppError> {
        if dto.passing_marks > dto.total_marks {
            return Err(AppError::bad_request(anyhow!(
                "Passing marks cannot exceed total marks"
            )));
        }
        ensure_teaches(db, tenant_id, teacher_id, dto.subject_id, dto.section_id).await?;

        let assessment = sqlx::query_as::<_, Assessment>(
            r#"INSERT INTO assessments
                   (tenant_id, teacher_id, subject_id, section_id, title, assessment_type,
                    scheduled_date, duration_minutes, total_marks, passing_marks)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(teacher_id)
        .bind(dto.subject_id)
        .bind(dto.section_id)
        .bind(&dto.title)
        .bind(dto.assessment_type)
        .bind(dto.scheduled_date)
        .bind(dto.duration_minutes)
        .bind(dto.total_marks)
        .bind(dto.passing_marks)
        .fetch_one(db)
        .await?;

        Ok(assessment)
    }

    #[instrument(skip(db), fields(db.table = "assessments", db.operation = "SELECT"))]
    pub async fn list_assessments(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        filters: AssessmentFilterParams,
    ) -> Result<Vec<Assessment>, AppError> {
        let assessments = sqlx::query_as::<_, Assessment>(
            r#"SELECT * FROM assessments
               WHERE tenant_id = $1 AND teacher_id = $2
                 AND ($3::uuid IS NULL OR section_id = $3)
                 AND ($4::uuid IS NULL OR subject_id = $4)
               ORDER BY scheduled_date DESC"#,
        )
        .bind(tenant_id)
        .bind(teacher_id)
        .bind(filters.section_id)
        .bind(filters.subject_id)
        .fetch_all(db)
        .await?;

        Ok(assessments)
    }

    async fn own_assessment(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        id: Uuid,
    ) -> Result<Assessment, AppError> {
        sqlx::query_as::<_, Assessment>(
            "SELECT * FROM assessments WHERE id = $1 AND tenant_id = $2 AND teacher_id = $3",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(teacher_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Assessment not found")))
    }

    /// Bulk upsert of marks for students of the assessment's section.
    #[instrument(skip(db, dto), fields(db.table = "grades", db.operation = "UPSERT"))]
    pub async fn save_grades(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        assessment_id: Uuid,
        dto: SaveGradesDto,
    ) -> Result<GradesSaved, AppError> {
        let assessment = Self::own_assessment(db, tenant_id, teacher_id, assessment_id).await?;
        for entry in &dto.grades {
            check_marks(entry.marks_obtained, assessment.total_marks)
                .map_err(|e| AppError::bad_request(anyhow!(e)))?;
        }
        let students: Vec<UserId> = dto.grades.iter().map(|g| g.student_id).collect();
        ensure_enrolled(db, tenant_id, assessment.section_id, &students).await?;

        let mut tx = db.begin().await?;
        for entry in &dto.grades {
            sqlx::query_as::<_, Grade>(
                r#"INSERT INTO grades
                       (tenant_id, assessment_id, student_id, marks_obtained, remarks, graded_by)
                   VALUES ($1, $2, $3, $4, $5, $6)
                   ON CONFLICT (assessment_id, student_id) DO UPDATE SET
                       marks_obtained = EXCLUDED.marks_obtained,
                       remarks = EXCLUDED.remarks,
                       graded_by = EXCLUDED.graded_by,
                       updated_at = NOW()
                   RETURNING *"#,
            )
            .bind(tenant_id)
            .bind(assessment_id)
            .bind(entry.student_id)
            .bind(entry.marks_obtained)
            .bind(&entry.remarks)
            .bind(teacher_id)
            .fetch_one(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(assessment.id = %assessment_id, saved = dto.grades.len(), "Grades saved");
        Ok(GradesSaved {
            saved: dto.grades.len(),
        })
    }

    #[instrument(skip(db), fields(db.table = "grades", db.operation = "SELECT"))]
    pub async fn grades(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        assessment_id: Uuid,
    ) -> Result<Vec<GradeReport>, AppError> {
        Self::own_assessment(db, tenant_id, teacher_id, assessment_id).await?;
        let reports = sqlx::query_as::<_, GradeReport>(&format!(
            "{GRADE_REPORT_SELECT} WHERE g.assessment_id = $1 ORDER BY u.last_name, u.first_name"
        ))
        .bind(assessment_id)
        .fetch_all(db)
        .await?;

        Ok(reports.into_iter().map(GradeReport::computed).collect())
    }

    #[instrument(skip(db), fields(db.table = "assessments", db.operation = "UPDATE"))]
    pub async fn publish_grades(
        db: &PgPool,
        tenant_id: TenantId,
        teacher_id: UserId,
        assessment_id: Uuid,
    ) -> Result<Assessment, AppError> {
        let assessment = sqlx::query_as::<_, Assessment>(
            r#"UPDATE assessments SET is_published = TRUE, updated_at = NOW()
               WHERE id = $1 AND tenant_id = $2 AND teacher_id = $3
               RETURNING *"#,
        )
        .bind(assessment_id)
        .bind(tenant_id)
        .bind(teacher_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Assessment not found")))?;

        info!(assessment.id = %assessment_id, "Grades published");
        Ok(assessment)
    }

    /// Grades a student may see: only those of published assessments.
    #[instrument(skip(db), fields(db.table = "grades", db.operation = "SELECT"))]
    pub async fn published_for_student(
        db: &PgPool,
        tenant_id: TenantId,
        student_id: UserId,
    ) -> Result<Vec<GradeReport>, AppError> {
        let reports = sqlx::query_as::<_, GradeReport>(&format!(
            r#"{GRADE_REPORT_SELECT}
               WHERE g.tenant_id = $1 AND g.student_id = $2 AND a.is_published
               ORDER BY a.scheduled_date DESC"#
        ))
        .bind(tenant_id)
        .bind(student_id)
        .fetch_all(db)
        .await?;

        Ok(reports.into_iter().map(GradeReport::computed).collect())
    }
}
