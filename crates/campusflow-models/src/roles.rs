//! Role catalogue, capability flags and portal prefixes.
//!
//! Roles are fixed rows seeded by migration. A user holds at most one role,
//! and the role decides both the permission strings embedded in the access
//! token and the `/api/<portal>/` prefixes the user may call.

use campusflow_core::permissions;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

pub use crate::enums::RoleName;
use crate::ids::RoleId;
use crate::tenants::LimitKind;

/// Seeded role identities.
pub mod system_roles {
    use super::{RoleId, RoleName};

    pub const SUPER_ADMIN: RoleId = RoleId::from_u128(1);
    pub const TENANT_ADMIN: RoleId = RoleId::from_u128(2);
    pub const DEPARTMENT_ADMIN: RoleId = RoleId::from_u128(3);
    pub const TEACHER: RoleId = RoleId::from_u128(4);
    pub const STUDENT: RoleId = RoleId::from_u128(5);
    pub const PARENT: RoleId = RoleId::from_u128(6);

    pub const fn id_for(role: RoleName) -> RoleId {
        match role {
            RoleName::SuperAdmin => SUPER_ADMIN,
            RoleName::TenantAdmin => TENANT_ADMIN,
            RoleName::DepartmentAdmin => DEPARTMENT_ADMIN,
            RoleName::Teacher => TEACHER,
            RoleName::Student => STUDENT,
            RoleName::Parent => PARENT,
        }
    }
}

/// Self-service routes every authenticated role may use.
pub const ACCOUNT_PREFIX: &str = "/api/account/";

impl RoleName {
    /// Portal prefixes the role may call, in addition to [`ACCOUNT_PREFIX`].
    ///
    /// Super admins bypass the prefix check entirely; their list only
    /// documents their home portals.
    pub const fn portal_prefixes(&self) -> &'static [&'static str] {
        match self {
            Self::SuperAdmin => &["/api/company/", "/api/admin/"],
            Self::TenantAdmin => &[
                "/api/admin/",
                "/api/college/",
                "/api/billing/",
                "/api/subscription/",
            ],
            Self::DepartmentAdmin => &["/api/dept/"],
            Self::Teacher => &["/api/teacher/"],
            Self::Student => &["/api/student/"],
            Self::Parent => &["/api/parent/"],
        }
    }

    /// Whether `path` falls inside one of this role's portals.
    ///
    /// Prefixes are matched with and without their trailing slash so that
    /// `/api/subscription` is covered by `/api/subscription/`.
    pub fn can_access(&self, path: &str) -> bool {
        if matches!(self, Self::SuperAdmin) {
            return true;
        }
        std::iter::once(ACCOUNT_PREFIX)
            .chain(self.portal_prefixes().iter().copied())
            .any(|prefix| path.starts_with(prefix) || path == prefix.trim_end_matches('/'))
    }

    /// Roles a tenant admin may hand out.
    pub const fn is_assignable(&self) -> bool {
        !matches!(self, Self::SuperAdmin)
    }

    /// Usage counter a user with this role consumes.
    pub const fn limit_kind(&self) -> Option<LimitKind> {
        match self {
            Self::Student => Some(LimitKind::Students),
            Self::Teacher => Some(LimitKind::Teachers),
            _ => None,
        }
    }

    /// Roles allowed to lead a department or teach a subject.
    pub const fn can_teach(&self) -> bool {
        matches!(self, Self::Teacher | Self::DepartmentAdmin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
    pub display_name: String,
    pub description: String,
    /// 1 (platform) through 5 (self only)
    pub scope_level: i32,
    pub can_manage_tenants: bool,
    pub can_manage_users: bool,
    pub can_manage_departments: bool,
    pub can_manage_subjects: bool,
    pub can_manage_attendance: bool,
    pub can_manage_assessments: bool,
    pub can_view_reports: bool,
    pub can_manage_billing: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Role {
    /// Permission strings granted by the capability flags.
    pub fn permissions(&self) -> Vec<String> {
        [
            (self.can_manage_tenants, permissions::TENANTS_MANAGE),
            (self.can_manage_users, permissions::USERS_MANAGE),
            (self.can_manage_departments, permissions::DEPARTMENTS_MANAGE),
            (self.can_manage_subjects, permissions::SUBJECTS_MANAGE),
            (self.can_manage_attendance, permissions::ATTENDANCE_MANAGE),
            (self.can_manage_assessments, permissions::ASSESSMENTS_MANAGE),
            (self.can_view_reports, permissions::REPORTS_VIEW),
            (self.can_manage_billing, permissions::BILLING_MANAGE),
        ]
        .into_iter()
        .filter_map(|(granted, name)| granted.then(|| name.to_string()))
        .collect()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.name == RoleName::SuperAdmin || self.permissions().iter().any(|p| p == permission)
    }
}

/// Compact role view embedded in user payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RoleInfo {
    pub id: RoleId,
    pub name: RoleName,
    pub display_name: String,
}
