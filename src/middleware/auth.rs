use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use campusflow_auth::verify_token;
use campusflow_config::JwtConfig;
use campusflow_core::{AppError, permissions};
use campusflow_models::{Claims, RoleName, TenantId, UserId};

use crate::state::AppState;

/// The caller behind a valid access token.
///
/// The portal middleware stores it in the request extensions once the token
/// has been verified; handlers outside that layer fall back to reading the
/// `Authorization` header themselves.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Super admins hold every permission; everyone else holds what their
    /// role's capability flags granted when the token was issued.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_super_admin() || self.0.permissions.iter().any(|p| p == permission)
    }

    pub fn has_any_permission(&self, permissions: &[&str]) -> bool {
        permissions.iter().any(|p| self.has_permission(p))
    }

    pub fn is_super_admin(&self) -> bool {
        self.0.is_super_admin()
    }

    /// `None` when the token carries no role or an unknown one.
    pub fn role(&self) -> Option<RoleName> {
        self.0.role_name().and_then(|r| r.parse().ok())
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.0.tenant_id.map(TenantId::from)
    }

    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.0
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid user ID in token".to_string()))
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }
}

/// Bearer token from the `Authorization` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verifies the bearer token in `headers`.
///
/// `Ok(None)` when no token was sent, an error when one was sent but does
/// not verify.
pub fn authenticate(
    headers: &HeaderMap,
    jwt_config: &JwtConfig,
) -> Result<Option<AuthUser>, AppError> {
    bearer_token(headers)
        .map(|token| verify_token(token, jwt_config).map(AuthUser))
        .transpose()
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        authenticate(&parts.headers, &state.jwt_config)?
            .ok_or_else(|| AppError::unauthorized("Authentication required".to_string()))
    }
}

/// Declares an extractor that only succeeds for callers holding `$permission`.
#[macro_export]
macro_rules! require_permission {
    ($name:ident, $permission:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthUser);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = campusflow_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user = <$crate::middleware::auth::AuthUser as axum::extract::FromRequestParts<
                    $crate::state::AppState,
                >>::from_request_parts(parts, state)
                .await?;

                if !auth_user.has_permission($permission) {
                    return Err(campusflow_core::AppError::forbidden(format!(
                        "Access denied. Missing required permission: {}",
                        $permission
                    )));
                }

                Ok($name(auth_user))
            }
        }
    };
}

require_permission!(RequireTenantsManage, permissions::TENANTS_MANAGE);
require_permission!(RequireUsersManage, permissions::USERS_MANAGE);
require_permission!(RequireDepartmentsManage, permissions::DEPARTMENTS_MANAGE);
require_permission!(RequireSubjectsManage, permissions::SUBJECTS_MANAGE);
require_permission!(RequireAttendanceManage, permissions::ATTENDANCE_MANAGE);
require_permission!(RequireAssessmentsManage, permissions::ASSESSMENTS_MANAGE);
require_permission!(RequireReportsView, permissions::REPORTS_VIEW);
require_permission!(RequireBillingManage, permissions::BILLING_MANAGE);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use uuid::Uuid;

    fn claims(role: Option<&str>, permissions: Vec<String>) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            email: "hod@riverdale.edu".to_string(),
            tenant_id: Some(Uuid::new_v4()),
            role: role.map(str::to_string),
            permissions,
            exp: 9_999_999_999,
            iat: 1_700_000_000,
        }
    }

    #[test]
    fn permissions_come_from_the_token() {
        let user = AuthUser(claims(
            Some("teacher"),
            vec!["attendance:manage".into(), "reports:view".into()],
        ));
        assert!(user.has_permission("attendance:manage"));
        assert!(!user.has_permission("billing:manage"));
        assert!(user.has_any_permission(&["billing:manage", "reports:view"]));
        assert_eq!(user.role(), Some(RoleName::Teacher));
    }

    #[test]
    fn super_admin_holds_every_permission() {
        let user = AuthUser(claims(Some("super_admin"), vec![]));
        assert!(user.is_super_admin());
        assert!(user.has_permission("tenants:manage"));
    }

    #[test]
    fn unknown_role_reads_as_none() {
        assert_eq!(AuthUser(claims(Some("janitor"), vec![])).role(), None);
        assert_eq!(AuthUser(claims(None, vec![])).role(), None);
    }

    #[test]
    fn parses_ids_from_claims() {
        let id = Uuid::new_v4();
        let mut c = claims(None, vec![]);
        c.sub = id.to_string();
        let user = AuthUser(c);
        assert_eq!(user.user_id().unwrap(), id);

        let mut c = claims(None, vec![]);
        c.sub = "nope".into();
        assert!(AuthUser(c).user_id().is_err());
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));
    }

    #[test]
    fn malformed_token_is_rejected() {
        let config = JwtConfig {
            secret: "test-secret".into(),
            access_token_expiry: 3600,
            refresh_token_expiry: 7200,
        };
        let mut headers = HeaderMap::new();
        assert!(authenticate(&headers, &config).unwrap().is_none());

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer not.a.jwt"),
        );
        let err = authenticate(&headers, &config).unwrap_err();
        assert_eq!(err.message(), "Invalid or expired token");
    }
}
