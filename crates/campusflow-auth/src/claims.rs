//! Claims embedded in access and refresh tokens.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Role name that bypasses portal and permission checks.
pub const SUPER_ADMIN_ROLE: &str = "super_admin";

/// Access token claims.
///
/// Carries everything the access middleware needs so that portal checks do
/// not hit the database: the user's tenant, role name and the permissions
/// derived from the role's capability flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub email: String,
    /// Tenant the user belongs to (None for platform administrators)
    pub tenant_id: Option<Uuid>,
    /// Role name, e.g. `teacher`. None when no role is assigned.
    pub role: Option<String>,
    pub permissions: Vec<String>,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn is_super_admin(&self) -> bool {
        self.role.as_deref() == Some(SUPER_ADMIN_ROLE)
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role.as_deref()
    }
}

/// Refresh token claims. `jti` makes every issued token distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
    /// Always `refresh`, so an access token cannot be replayed here
    pub token_type: String,
}
