//! Automatic audit trail for writes.
//!
//! Every POST, PUT, PATCH or DELETE made by an authenticated caller is
//! recorded once the handler has produced its response. Recording never
//! changes the response: a failed insert is only logged.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{HeaderMap, Method, header, request::Parts},
    middleware::Next,
    response::Response,
};
use campusflow_models::{AuditStatus, NewAuditLog};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::middleware::tenancy::CurrentTenant;
use crate::modules::audit::AuditService;
use crate::state::AppState;

/// Audit action for a write method, `None` for reads.
pub fn action_for(method: &Method) -> Option<&'static str> {
    match *method {
        Method::POST => Some("create"),
        Method::PUT | Method::PATCH => Some("update"),
        Method::DELETE => Some("delete"),
        _ => None,
    }
}

/// Segment after `/api/<portal>/`, or the portal itself.
pub fn resource_type(path: &str) -> String {
    let mut segments = path
        .trim_start_matches("/api/")
        .split('/')
        .filter(|s| !s.is_empty());
    let portal = segments.next().unwrap_or("api");
    segments.next().unwrap_or(portal).to_string()
}

/// First UUID in the path, if any.
pub fn resource_id(path: &str) -> Option<String> {
    path.split('/')
        .find(|segment| Uuid::parse_str(segment).is_ok())
        .map(str::to_string)
}

/// First `X-Forwarded-For` entry, else the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn peer_addr(extensions: &axum::http::Extensions) -> Option<SocketAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Caller address and agent, for handlers that record explicit events.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Audit entry for `action` carrying this client's address and agent.
    pub fn event(&self, action: &str, resource_type: &str) -> NewAuditLog {
        NewAuditLog {
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
            ..NewAuditLog::event(action, resource_type)
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            ip_address: client_ip(&parts.headers, peer_addr(&parts.extensions)),
            user_agent: user_agent(&parts.headers),
        })
    }
}

/// Appends an audit row, logging instead of failing.
pub async fn create_audit_log(db: &PgPool, entry: NewAuditLog) {
    let action = entry.action.clone();
    if let Err(e) = AuditService::record(db, entry).await {
        warn!(error = %e.message(), audit.action = %action, "Failed to write audit log");
    }
}

pub async fn audit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(action) = action_for(request.method()) else {
        return next.run(request).await;
    };
    let Some(user) = request.extensions().get::<AuthUser>().cloned() else {
        return next.run(request).await;
    };

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let ip_address = client_ip(request.headers(), peer_addr(request.extensions()));
    let user_agent = user_agent(request.headers());
    let tenant_id = user.tenant_id().or_else(|| {
        request
            .extensions()
            .get::<CurrentTenant>()
            .map(|current| current.0.id)
    });

    let response = next.run(request).await;

    let status = if response.status().as_u16() < 400 {
        AuditStatus::Success
    } else {
        AuditStatus::Failure
    };
    let entry = NewAuditLog {
        user_id: user.user_id().ok(),
        tenant_id,
        resource_type: resource_type(&path),
        resource_id: resource_id(&path),
        description: format!("{method} {path}"),
        ip_address,
        user_agent,
        status: Some(status),
        ..NewAuditLog::event(action, "")
    };
    create_audit_log(&state.db, entry).await;

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn writes_map_to_actions() {
        assert_eq!(action_for(&Method::POST), Some("create"));
        assert_eq!(action_for(&Method::PUT), Some("update"));
        assert_eq!(action_for(&Method::PATCH), Some("update"));
        assert_eq!(action_for(&Method::DELETE), Some("delete"));
        assert_eq!(action_for(&Method::GET), None);
    }

    #[test]
    fn resource_type_follows_the_portal() {
        assert_eq!(resource_type("/api/college/users"), "users");
        assert_eq!(
            resource_type("/api/college/departments/5b6f7f7e-4a36-4d0b-9f0c-0a7f3c1d2e11"),
            "departments"
        );
        assert_eq!(resource_type("/api/subscription"), "subscription");
    }

    #[test]
    fn resource_id_is_the_first_uuid() {
        let id = "5b6f7f7e-4a36-4d0b-9f0c-0a7f3c1d2e11";
        assert_eq!(
            resource_id(&format!("/api/teacher/assignments/{id}/publish")).as_deref(),
            Some(id)
        );
        assert_eq!(resource_id("/api/college/users"), None);
    }

    #[test]
    fn forwarded_for_wins_over_peer() {
        let peer: SocketAddr = "10.1.1.1:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("10.1.1.1"));

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("203.0.113.7"));
    }
}
