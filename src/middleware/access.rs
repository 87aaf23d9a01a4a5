//! Role based portal access.
//!
//! Every `/api` path belongs to a portal (`/api/college/`, `/api/teacher/`,
//! ...). A caller may only reach the portals of their role, plus
//! `/api/account/`. Super admins reach everything. When the request was
//! resolved to a tenant, tenant users must belong to it.

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use campusflow_core::AppError;
use tracing::warn;

use crate::metrics::track_access_denied;
use crate::middleware::auth::authenticate;
use crate::middleware::tenancy::CurrentTenant;
use crate::state::AppState;

pub const USER_ROLE_HEADER: &str = "x-user-role";

/// API paths reachable without a token.
pub fn is_public_path(path: &str) -> bool {
    path == "/"
        || path.starts_with("/api/auth/")
        || path == "/api/pricing"
        || path.starts_with("/api/pricing/")
}

fn deny(reason: &'static str, error: AppError) -> Response {
    track_access_denied(reason);
    error.into_response()
}

pub async fn enforce_portal_access(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if !path.starts_with("/api/") || is_public_path(&path) {
        return next.run(request).await;
    }

    let user = match authenticate(request.headers(), &state.jwt_config) {
        Ok(Some(user)) => user,
        Ok(None) => {
            return deny(
                "UNAUTHENTICATED",
                AppError::unauthorized("Authentication required".to_string()),
            );
        }
        Err(e) => return deny("INVALID_TOKEN", e),
    };

    if !user.is_super_admin() {
        let Some(role) = user.role() else {
            return deny(
                "NO_ROLE",
                AppError::forbidden("Access denied: No role assigned".to_string()),
            );
        };

        if !role.can_access(&path) {
            warn!(user.email = %user.email(), role = %role, path = %path, "Portal access denied");
            return deny(
                "INSUFFICIENT_PERMISSIONS",
                AppError::forbidden("Access denied".to_string())
                    .with_code("INSUFFICIENT_PERMISSIONS"),
            );
        }

        if let Some(CurrentTenant(tenant)) = request.extensions().get::<CurrentTenant>()
            && user.tenant_id() != Some(tenant.id)
        {
            warn!(user.email = %user.email(), tenant_id = %tenant.id, "Cross-tenant request refused");
            return deny(
                "TENANT_MISMATCH",
                AppError::forbidden("Access denied: Tenant mismatch".to_string())
                    .with_code("TENANT_MISMATCH"),
            );
        }
    }

    let role_header = user
        .0
        .role
        .as_deref()
        .and_then(|role| HeaderValue::from_str(role).ok());
    request.extensions_mut().insert(user);

    let mut response = next.run(request).await;
    if let Some(value) = role_header {
        response.headers_mut().insert(USER_ROLE_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_public_only_as_exact_match() {
        assert!(is_public_path("/"));
        assert!(!is_public_path("/api/college/users"));
    }

    #[test]
    fn auth_and_pricing_are_public() {
        assert!(is_public_path("/api/auth/login"));
        assert!(is_public_path("/api/pricing"));
        assert!(is_public_path("/api/pricing/standard"));
        assert!(!is_public_path("/api/pricingx"));
        assert!(!is_public_path("/api/account/profile"));
    }
}
