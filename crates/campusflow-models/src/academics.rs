//! College structure: departments, subjects, academic years, sections,
//! enrollments, teaching assignments and parent links.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::enums::{EnrollmentStatus, Relationship, SubjectType};
use crate::ids::{TenantId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Department {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    /// Head of department
    pub hod_id: Option<UserId>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub office_location: Option<String>,
    pub established_year: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DepartmentWithCounts {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub department: Department,
    pub subject_count: i64,
    pub section_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Subject {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub department_id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub credits: i32,
    pub hours_per_week: i32,
    pub subject_type: SubjectType,
    pub semester: Option<i32>,
    pub year: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AcademicYear {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AcademicYear {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Section {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub department_id: Uuid,
    pub academic_year_id: Uuid,
    pub name: String,
    pub code: String,
    pub semester: Option<i32>,
    pub year: Option<i32>,
    pub max_students: i32,
    pub current_student_count: i32,
    pub class_representative_id: Option<UserId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Section {
    pub fn is_full(&self) -> bool {
        self.current_student_count >= self.max_students
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrollment {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub student_id: UserId,
    pub section_id: Uuid,
    pub academic_year_id: Uuid,
    pub roll_number: Option<String>,
    pub enrollment_date: NaiveDate,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Enrollment joined with section and student names for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EnrollmentDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub section_name: String,
    pub student_first_name: String,
    pub student_last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TeacherAssignment {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub teacher_id: UserId,
    pub subject_id: Uuid,
    pub section_id: Uuid,
    pub academic_year_id: Uuid,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A teacher's class: assignment plus subject and section names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TeachingClass {
    pub assignment_id: Uuid,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub subject_code: String,
    pub section_id: Uuid,
    pub section_name: String,
    pub academic_year_id: Uuid,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ParentStudentLink {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub parent_id: UserId,
    pub student_id: UserId,
    pub relationship: Relationship,
    pub is_primary_contact: bool,
    pub can_view_grades: bool,
    pub can_view_attendance: bool,
    pub can_view_behavior: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn academic_year_range_is_inclusive() {
        let now = Utc::now();
        let year = AcademicYear {
            id: Uuid::new_v4(),
            tenant_id: TenantId::new(),
            name: "2024-25".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
            is_current: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert!(year.contains(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        assert!(year.contains(NaiveDate::from_ymd_opt(2025, 5, 31).unwrap()));
        assert!(!year.contains(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()));
    }
}
