//! User accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::enums::RoleName;
use crate::ids::{RoleId, TenantId, UserId};
use crate::value_types::Email;

/// Column list matching [`User`] for queries aliasing `users` as `u`.
pub const USER_COLUMNS: &str = "u.id, u.tenant_id, u.role_id, u.email, u.first_name, \
     u.last_name, u.phone, u.language_preference, u.is_active, u.last_login, \
     u.created_at, u.updated_at";

/// A user of any role. Super admins have no tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: UserId,
    pub tenant_id: Option<TenantId>,
    pub role_id: Option<RoleId>,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub language_preference: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// [`User`] joined with the name of its role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserWithRole {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: User,
    pub role: Option<RoleName>,
}

/// Row used only by the login and password flows.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: UserId,
    pub tenant_id: Option<TenantId>,
    pub email: Email,
    pub password: String,
    pub is_active: bool,
    pub role: Option<RoleName>,
}

/// Small user reference used inside other payloads (teachers, HODs, parents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserRef {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
}
