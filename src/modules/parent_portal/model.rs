use campusflow_models::ParentStudentLink;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// A linked student with the permissions the link grants.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Child {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub link: ParentStudentLink,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// What a parent wants to look at for a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildView {
    Attendance,
    Grades,
    Fees,
}

impl ChildView {
    /// Fees are visible through any link; the others need their flag.
    pub fn allowed_by(self, link: &ParentStudentLink) -> bool {
        match self {
            Self::Attendance => link.can_view_attendance,
            Self::Grades => link.can_view_grades,
            Self::Fees => true,
        }
    }

    pub fn denial(self) -> &'static str {
        match self {
            Self::Attendance => "You are not allowed to view this student's attendance",
            Self::Grades => "You are not allowed to view this student's grades",
            Self::Fees => "You are not allowed to view this student's fees",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusflow_models::{Relationship, TenantId, UserId};
    use chrono::Utc;
    use uuid::Uuid;

    fn link(grades: bool, attendance: bool) -> ParentStudentLink {
        ParentStudentLink {
            id: Uuid::new_v4(),
            tenant_id: TenantId::new(),
            parent_id: UserId::new(),
            student_id: UserId::new(),
            relationship: Relationship::Guardian,
            is_primary_contact: false,
            can_view_grades: grades,
            can_view_attendance: attendance,
            can_view_behavior: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn flags_gate_grades_and_attendance() {
        let restricted = link(false, true);
        assert!(ChildView::Attendance.allowed_by(&restricted));
        assert!(!ChildView::Grades.allowed_by(&restricted));
        assert!(ChildView::Fees.allowed_by(&restricted));

        let no_attendance = link(true, false);
        assert!(!ChildView::Attendance.allowed_by(&no_attendance));
        assert!(ChildView::Grades.allowed_by(&no_attendance));
    }
}
