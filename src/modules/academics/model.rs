use campusflow_core::{
    PaginationParams,
    serde::{deserialize_optional_bool, deserialize_optional_uuid},
};
use campusflow_models::{EnrollmentStatus, Relationship, SubjectType, UserId};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDepartmentDto {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Computer Science")]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    #[schema(example = "CSE")]
    pub code: String,
    pub description: Option<String>,
    /// Head of department: a teacher or department admin of the college
    pub hod_id: Option<UserId>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub office_location: Option<String>,
    #[validate(range(min = 1800, max = 2100))]
    pub established_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDepartmentDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    pub description: Option<String>,
    pub hod_id: Option<UserId>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub office_location: Option<String>,
    #[validate(range(min = 1800, max = 2100))]
    pub established_year: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DepartmentFilterParams {
    /// Matches name or code
    pub search: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSubjectDto {
    pub department_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    #[schema(example = "CS201")]
    pub code: String,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 20))]
    pub credits: Option<i32>,
    #[validate(range(min = 1, max = 40))]
    pub hours_per_week: Option<i32>,
    pub subject_type: Option<SubjectType>,
    #[validate(range(min = 1, max = 12))]
    pub semester: Option<i32>,
    #[validate(range(min = 1, max = 6))]
    pub year: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSubjectDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 20))]
    pub credits: Option<i32>,
    #[validate(range(min = 1, max = 40))]
    pub hours_per_week: Option<i32>,
    pub subject_type: Option<SubjectType>,
    #[validate(range(min = 1, max = 12))]
    pub semester: Option<i32>,
    #[validate(range(min = 1, max = 6))]
    pub year: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SubjectFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub department_id: Option<Uuid>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAcademicYearDto {
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "2025-26")]
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAcademicYearDto {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

/// `start` must fall strictly before `end`.
pub fn check_year_range(start: NaiveDate, end: NaiveDate) -> Result<(), &'static str> {
    if start < end {
        Ok(())
    } else {
        Err("Start date must be before end date")
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSectionDto {
    pub department_id: Uuid,
    pub academic_year_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    #[schema(example = "CSE-2A")]
    pub code: String,
    #[validate(range(min = 1, max = 12))]
    pub semester: Option<i32>,
    #[validate(range(min = 1, max = 6))]
    pub year: Option<i32>,
    #[validate(range(min = 1, max = 500))]
    pub max_students: Option<i32>,
    pub class_representative_id: Option<UserId>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSectionDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[validate(range(min = 1, max = 12))]
    pub semester: Option<i32>,
    #[validate(range(min = 1, max = 6))]
    pub year: Option<i32>,
    #[validate(range(min = 1, max = 500))]
    pub max_students: Option<i32>,
    pub class_representative_id: Option<UserId>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SectionFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub department_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub academic_year_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEnrollmentDto {
    pub student_id: UserId,
    pub section_id: Uuid,
    /// Defaults to the section's academic year
    pub academic_year_id: Option<Uuid>,
    #[validate(length(max = 30))]
    pub roll_number: Option<String>,
    /// Defaults to today
    pub enrollment_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEnrollmentDto {
    #[validate(length(max = 30))]
    pub roll_number: Option<String>,
    pub status: Option<EnrollmentStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct EnrollmentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub section_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    pub status: Option<EnrollmentStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTeacherAssignmentDto {
    pub teacher_id: UserId,
    pub subject_id: Uuid,
    pub section_id: Uuid,
    /// Defaults to the section's academic year
    pub academic_year_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_primary: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TeacherAssignmentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub teacher_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub section_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub subject_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateParentLinkDto {
    pub parent_id: UserId,
    pub student_id: UserId,
    pub relationship: Option<Relationship>,
    #[serde(default)]
    pub is_primary_contact: bool,
    pub can_view_grades: Option<bool>,
    pub can_view_attendance: Option<bool>,
    pub can_view_behavior: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateParentLinkDto {
    pub relationship: Option<Relationship>,
    pub is_primary_contact: Option<bool>,
    pub can_view_grades: Option<bool>,
    pub can_view_attendance: Option<bool>,
    pub can_view_behavior: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ParentLinkFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub parent_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
}

/// How an enrollment status change moves the section head count.
pub fn seat_delta(old: EnrollmentStatus, new: EnrollmentStatus) -> i32 {
    match (old == EnrollmentStatus::Active, new == EnrollmentStatus::Active) {
        (true, false) => -1,
        (false, true) => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_range_must_be_increasing() {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 5, 31).unwrap();
        assert!(check_year_range(start, end).is_ok());
        assert_eq!(
            check_year_range(end, start),
            Err("Start date must be before end date")
        );
        assert!(check_year_range(start, start).is_err());
    }

    #[test]
    fn only_transitions_across_active_move_seats() {
        use EnrollmentStatus::*;
        assert_eq!(seat_delta(Active, Dropped), -1);
        assert_eq!(seat_delta(Inactive, Active), 1);
        assert_eq!(seat_delta(Active, Active), 0);
        assert_eq!(seat_delta(Graduated, Dropped), 0);
    }

    #[test]
    fn teacher_assignment_is_primary_by_default() {
        let dto: CreateTeacherAssignmentDto = serde_json::from_value(serde_json::json!({
            "teacher_id": uuid::Uuid::new_v4(),
            "subject_id": uuid::Uuid::new_v4(),
            "section_id": uuid::Uuid::new_v4(),
        }))
        .unwrap();
        assert!(dto.is_primary);
        assert!(dto.academic_year_id.is_none());
    }

    #[test]
    fn out_of_range_credits_fail_validation() {
        let dto = CreateSubjectDto {
            department_id: Uuid::new_v4(),
            name: "Algorithms".into(),
            code: "CS301".into(),
            description: None,
            credits: Some(40),
            hours_per_week: None,
            subject_type: None,
            semester: None,
            year: None,
        };
        assert!(dto.validate().is_err());
    }
}
