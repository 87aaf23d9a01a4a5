//! Permission strings carried in access tokens.
//!
//! Each string mirrors one capability flag on a role row. The
//! `super_admin` role implicitly holds all of them.

pub const TENANTS_MANAGE: &str = "tenants:manage";
pub const USERS_MANAGE: &str = "users:manage";
pub const DEPARTMENTS_MANAGE: &str = "departments:manage";
pub const SUBJECTS_MANAGE: &str = "subjects:manage";
pub const ATTENDANCE_MANAGE: &str = "attendance:manage";
pub const ASSESSMENTS_MANAGE: &str = "assessments:manage";
pub const REPORTS_VIEW: &str = "reports:view";
pub const BILLING_MANAGE: &str = "billing:manage";

pub const ALL: [&str; 8] = [
    TENANTS_MANAGE,
    USERS_MANAGE,
    DEPARTMENTS_MANAGE,
    SUBJECTS_MANAGE,
    ATTENDANCE_MANAGE,
    ASSESSMENTS_MANAGE,
    REPORTS_VIEW,
    BILLING_MANAGE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_strings_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for p in ALL {
            assert!(seen.insert(p), "duplicate permission {p}");
            assert!(p.contains(':'));
        }
    }
}
