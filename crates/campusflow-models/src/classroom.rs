//! Attendance, assignments, assessments and the grading arithmetic they share.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::enums::{AssessmentType, AssignmentStatus, AttendanceStatus, SubmissionStatus};
use crate::ids::{TenantId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub student_id: UserId,
    pub subject_id: Uuid,
    pub section_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub marked_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-subject attendance tallies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceSummary {
    pub subject_id: Uuid,
    pub subject_name: String,
    pub total: i64,
    pub present: i64,
    pub absent: i64,
    pub late: i64,
    pub excused: i64,
    #[sqlx(skip)]
    pub percentage: f64,
}

impl AttendanceSummary {
    /// Fills in `percentage`; late counts as attended.
    pub fn with_percentage(mut self) -> Self {
        self.percentage = attendance_percentage(self.present + self.late, self.total);
        self
    }
}

/// `attended / total * 100` rounded to two decimals, 0 when nothing was recorded.
pub fn attendance_percentage(attended: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let pct = attended as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Assignment {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub teacher_id: UserId,
    pub subject_id: Uuid,
    pub section_id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub total_marks: i32,
    pub allow_late_submission: bool,
    /// Percentage deducted from late submissions
    pub late_submission_penalty: i32,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        now > self.due_date
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Submission {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub assignment_id: Uuid,
    pub student_id: UserId,
    pub content: String,
    pub submitted_at: DateTime<Utc>,
    pub is_late: bool,
    pub status: SubmissionStatus,
    pub marks_obtained: Option<i32>,
    pub feedback: Option<String>,
    pub graded_by: Option<UserId>,
    pub graded_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn can_resubmit(&self) -> bool {
        matches!(
            self.status,
            SubmissionStatus::Submitted | SubmissionStatus::Resubmit
        )
    }
}

/// Deducts `penalty` percent from `marks`, rounding the result down.
pub fn apply_late_penalty(marks: i32, penalty: i32) -> i32 {
    let penalty = penalty.clamp(0, 100);
    let kept = i64::from(marks) * i64::from(100 - penalty);
    (kept.div_euclid(100)).max(0) as i32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Assessment {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub teacher_id: UserId,
    pub subject_id: Uuid,
    pub section_id: Uuid,
    pub title: String,
    pub assessment_type: AssessmentType,
    pub scheduled_date: NaiveDate,
    pub duration_minutes: Option<i32>,
    pub total_marks: i32,
    pub passing_marks: i32,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Grade {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub assessment_id: Uuid,
    pub student_id: UserId,
    pub marks_obtained: Decimal,
    pub remarks: Option<String>,
    pub graded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A grade joined with its assessment, plus the computed percentage and letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct GradeReport {
    pub grade_id: Uuid,
    pub assessment_id: Uuid,
    pub assessment_title: String,
    pub assessment_type: AssessmentType,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub student_id: UserId,
    pub student_name: String,
    pub marks_obtained: Decimal,
    pub total_marks: i32,
    pub passing_marks: i32,
    pub remarks: Option<String>,
    #[sqlx(skip)]
    pub percentage: Decimal,
    #[sqlx(skip)]
    pub letter: String,
    #[sqlx(skip)]
    pub passed: bool,
}

impl GradeReport {
    pub fn computed(mut self) -> Self {
        self.percentage = grade_percentage(self.marks_obtained, self.total_marks);
        self.letter = letter_grade(self.percentage).to_string();
        self.passed = self.marks_obtained >= Decimal::from(self.passing_marks);
        self
    }
}

/// `marks / total * 100`, rounded half away from zero to two places.
pub fn grade_percentage(marks: Decimal, total: i32) -> Decimal {
    if total <= 0 {
        return Decimal::ZERO;
    }
    (marks / Decimal::from(total) * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn letter_grade(percentage: Decimal) -> &'static str {
    const BANDS: [(i64, &str); 5] = [(90, "A+"), (80, "A"), (70, "B"), (60, "C"), (50, "D")];
    BANDS
        .iter()
        .find(|(floor, _)| percentage >= Decimal::from(*floor))
        .map_or("F", |(_, letter)| letter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn letters_follow_bands() {
        assert_eq!(letter_grade(dec!(95)), "A+");
        assert_eq!(letter_grade(dec!(90)), "A+");
        assert_eq!(letter_grade(dec!(89.99)), "A");
        assert_eq!(letter_grade(dec!(70)), "B");
        assert_eq!(letter_grade(dec!(60.5)), "C");
        assert_eq!(letter_grade(dec!(50)), "D");
        assert_eq!(letter_grade(dec!(49.99)), "F");
    }

    #[test]
    fn percentage_rounds_to_two_places() {
        assert_eq!(grade_percentage(dec!(2), 3), dec!(66.67));
        assert_eq!(grade_percentage(dec!(45), 50), dec!(90));
        assert_eq!(grade_percentage(dec!(10), 0), Decimal::ZERO);
    }

    #[test]
    fn late_penalty_rounds_down_and_never_goes_negative() {
        assert_eq!(apply_late_penalty(85, 10), 76);
        assert_eq!(apply_late_penalty(100, 0), 100);
        assert_eq!(apply_late_penalty(50, 100), 0);
        assert_eq!(apply_late_penalty(7, 33), 4);
        assert_eq!(apply_late_penalty(40, 150), 0);
    }

    #[test]
    fn attendance_counts_late_as_attended() {
        let summary = AttendanceSummary {
            subject_id: Uuid::new_v4(),
            subject_name: "Physics".into(),
            total: 3,
            present: 1,
            absent: 1,
            late: 1,
            excused: 0,
            percentage: 0.0,
        }
        .with_percentage();
        assert_eq!(summary.percentage, 66.67);
        assert_eq!(attendance_percentage(0, 0), 0.0);
    }

    #[test]
    fn report_marks_pass_and_letter() {
        let report = GradeReport {
            grade_id: Uuid::new_v4(),
            assessment_id: Uuid::new_v4(),
            assessment_title: "Midterm".into(),
            assessment_type: AssessmentType::Midterm,
            subject_id: Uuid::new_v4(),
            subject_name: "Chemistry".into(),
            student_id: UserId::new(),
            student_name: "Sam Lee".into(),
            marks_obtained: dec!(36),
            total_marks: 50,
            passing_marks: 20,
            remarks: None,
            percentage: Decimal::ZERO,
            letter: String::new(),
            passed: false,
        }
        .computed();
        assert_eq!(report.percentage, dec!(72));
        assert_eq!(report.letter, "B");
        assert!(report.passed);
    }
}
