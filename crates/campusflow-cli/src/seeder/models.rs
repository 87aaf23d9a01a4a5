//! Seed shapes and sizing.

use campusflow_models::{RoleId, TenantId};

/// Every seeded tenant's slug starts with this, which is how `clear-seed`
/// finds them again.
pub const SEED_SLUG_PREFIX: &str = "seed-";

/// Shared password of every seeded account.
pub const SEED_PASSWORD: &str = "password123";

pub struct TenantSeed {
    pub name: String,
    pub slug: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

pub struct UserSeed {
    pub tenant_id: TenantId,
    pub role_id: RoleId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Clone, Debug)]
pub struct SeedConfig {
    pub tenants: usize,
    pub students_per_tenant: usize,
    pub teachers_per_tenant: usize,
    pub departments_per_tenant: usize,
    pub sections_per_department: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            tenants: 3,
            students_per_tenant: 60,
            teachers_per_tenant: 8,
            departments_per_tenant: 3,
            sections_per_department: 2,
        }
    }
}

impl SeedConfig {
    pub fn new(tenants: usize) -> Self {
        Self {
            tenants,
            ..Default::default()
        }
    }

    pub fn with_students(mut self, students: usize) -> Self {
        self.students_per_tenant = students;
        self
    }

    pub fn with_teachers(mut self, teachers: usize) -> Self {
        self.teachers_per_tenant = teachers;
        self
    }

    pub fn with_departments(mut self, departments: usize, sections_each: usize) -> Self {
        self.departments_per_tenant = departments.max(1);
        self.sections_per_department = sections_each.max(1);
        self
    }

    pub fn sections_per_tenant(&self) -> usize {
        self.departments_per_tenant * self.sections_per_department
    }

    /// College admin and HOD plus teachers plus students.
    pub fn users_per_tenant(&self) -> usize {
        2 + self.teachers_per_tenant + self.students_per_tenant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizing_counts_the_admins() {
        let config = SeedConfig::new(2).with_students(10).with_teachers(3);
        assert_eq!(config.users_per_tenant(), 15);
        assert_eq!(config.with_departments(0, 0).sections_per_tenant(), 1);
    }
}
