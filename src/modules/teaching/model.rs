use campusflow_core::{
    PaginationParams,
    serde::deserialize_optional_uuid,
};
use campusflow_models::{
    Assignment, AssessmentType, AssignmentStatus, AttendanceRecord, AttendanceStatus,
    AttendanceSummary, SubmissionStatus, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct AttendanceEntryDto {
    pub student_id: UserId,
    pub status: AttendanceStatus,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MarkAttendanceDto {
    pub section_id: Uuid,
    pub subject_id: Uuid,
    /// Defaults to today
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1), nested)]
    pub entries: Vec<AttendanceEntryDto>,
}

/// Tallies of one attendance sheet.
#[derive(Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct AttendanceMarked {
    pub date: Option<NaiveDate>,
    pub marked: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
}

impl AttendanceMarked {
    pub fn tally<'a>(date: NaiveDate, statuses: impl IntoIterator<Item = &'a AttendanceStatus>) -> Self {
        statuses.into_iter().fold(
            Self {
                date: Some(date),
                ..Self::default()
            },
            |mut acc, status| {
                acc.marked += 1;
                match status {
                    AttendanceStatus::Present => acc.present += 1,
                    AttendanceStatus::Absent => acc.absent += 1,
                    AttendanceStatus::Late => acc.late += 1,
                    AttendanceStatus::Excused => acc.excused += 1,
                }
                acc
            },
        )
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AttendanceQuery {
    pub section_id: Uuid,
    pub subject_id: Uuid,
    pub date: Option<NaiveDate>,
}

/// A student's attendance history with per-subject tallies.
#[derive(Debug, Serialize, ToSchema)]
pub struct StudentAttendance {
    pub summary: Vec<AttendanceSummary>,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAssignmentDto {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub subject_id: Uuid,
    pub section_id: Uuid,
    pub due_date: DateTime<Utc>,
    #[validate(range(min = 1, max = 1000))]
    pub total_marks: Option<i32>,
    #[serde(default)]
    pub allow_late_submission: bool,
    /// Percent deducted from late work
    #[validate(range(min = 0, max = 100))]
    pub late_submission_penalty: Option<i32>,
    /// Defaults to `draft`
    pub status: Option<AssignmentStatus>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAssignmentDto {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 1000))]
    pub total_marks: Option<i32>,
    pub allow_late_submission: Option<bool>,
    #[validate(range(min = 0, max = 100))]
    pub late_submission_penalty: Option<i32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AssignmentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub section_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub subject_id: Option<Uuid>,
    pub status: Option<AssignmentStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// Assignments move draft, then published, then closed.
pub fn check_transition(from: AssignmentStatus, to: AssignmentStatus) -> Result<(), &'static str> {
    match (from, to) {
        (AssignmentStatus::Draft, AssignmentStatus::Published) => Ok(()),
        (AssignmentStatus::Published, AssignmentStatus::Closed) => Ok(()),
        (_, AssignmentStatus::Published) => Err("Only draft assignments can be published"),
        (_, AssignmentStatus::Closed) => Err("Only published assignments can be closed"),
        (_, AssignmentStatus::Draft) => Err("Assignments cannot return to draft"),
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitAssignmentDto {
    #[validate(length(min = 1))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GradeSubmissionDto {
    #[validate(range(min = 0))]
    pub marks_obtained: i32,
    pub feedback: Option<String>,
}

/// A published assignment as a student sees it.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct StudentAssignment {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub assignment: Assignment,
    pub submission_status: Option<SubmissionStatus>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub marks_obtained: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAssessmentDto {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub assessment_type: AssessmentType,
    pub subject_id: Uuid,
    pub section_id: Uuid,
    pub scheduled_date: NaiveDate,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<i32>,
    #[validate(range(min = 1, max = 1000))]
    pub total_marks: i32,
    #[validate(range(min = 0, max = 1000))]
    pub passing_marks: i32,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AssessmentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub section_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub subject_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct GradeEntryDto {
    pub student_id: UserId,
    #[schema(value_type = f64, example = 42.5)]
    pub marks_obtained: Decimal,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SaveGradesDto {
    #[validate(length(min = 1), nested)]
    pub grades: Vec<GradeEntryDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GradesSaved {
    pub saved: usize,
}

/// `marks` has to lie within `0..=total`.
pub fn check_marks(marks: Decimal, total: i32) -> Result<(), String> {
    if marks < Decimal::ZERO || marks > Decimal::from(total) {
        return Err(format!("Marks must be between 0 and {total}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tally_counts_each_status() {
        let day = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let marked = AttendanceMarked::tally(
            day,
            &[
                AttendanceStatus::Present,
                AttendanceStatus::Present,
                AttendanceStatus::Late,
                AttendanceStatus::Absent,
            ],
        );
        assert_eq!(marked.marked, 4);
        assert_eq!(marked.present, 2);
        assert_eq!(marked.late, 1);
        assert_eq!(marked.absent, 1);
        assert_eq!(marked.excused, 0);
        assert_eq!(marked.date, Some(day));
    }

    #[test]
    fn assignment_lifecycle_only_moves_forward() {
        use AssignmentStatus::*;
        assert!(check_transition(Draft, Published).is_ok());
        assert!(check_transition(Published, Closed).is_ok());
        assert_eq!(
            check_transition(Closed, Published),
            Err("Only draft assignments can be published")
        );
        assert_eq!(
            check_transition(Draft, Closed),
            Err("Only published assignments can be closed")
        );
        assert!(check_transition(Published, Draft).is_err());
    }

    #[test]
    fn marks_are_bounded_by_total() {
        assert!(check_marks(dec!(0), 50).is_ok());
        assert!(check_marks(dec!(50), 50).is_ok());
        assert_eq!(
            check_marks(dec!(50.5), 50),
            Err("Marks must be between 0 and 50".to_string())
        );
        assert!(check_marks(dec!(-1), 50).is_err());
    }

    #[test]
    fn empty_attendance_sheet_is_invalid() {
        let dto = MarkAttendanceDto {
            section_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            date: None,
            entries: vec![],
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn penalty_above_hundred_is_invalid() {
        let dto: CreateAssignmentDto = serde_json::from_value(serde_json::json!({
            "title": "Lab report",
            "subject_id": Uuid::new_v4(),
            "section_id": Uuid::new_v4(),
            "due_date": "2025-10-01T17:00:00Z",
            "late_submission_penalty": 120
        }))
        .unwrap();
        assert!(!dto.allow_late_submission);
        assert!(dto.validate().is_err());
    }
}
