use campusflow_models::Department;
use serde::Serialize;
use utoipa::ToSchema;

/// Head counts shown on the HOD dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct DepartmentOverview {
    pub department: Department,
    pub subject_count: i64,
    pub section_count: i64,
    /// Distinct teachers assigned to the department's subjects
    pub teacher_count: i64,
    /// Active enrollments across the department's sections
    pub student_count: i64,
}
