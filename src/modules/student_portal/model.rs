use campusflow_models::EnrollmentDetail;
use serde::Serialize;
use utoipa::ToSchema;

use crate::modules::teaching::model::StudentAssignment;

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentDashboard {
    pub enrollments: Vec<EnrollmentDetail>,
    /// Present plus late over all marked days, 0 when nothing is marked
    pub attendance_percentage: f64,
    /// Published assignments the student has not submitted yet
    pub pending_assignments: Vec<StudentAssignment>,
    pub published_grades: i64,
}
