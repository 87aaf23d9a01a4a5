//! Tenant resolution and subscription gating.
//!
//! Every request is matched to at most one college, trying in order:
//!
//! 1. the `X-Tenant-ID` header
//! 2. the subdomain of `Host` (`riverdale.campusflow.app`), unless reserved
//! 3. a verified, active custom domain equal to `Host`
//! 4. the `tenant_id` claim of a valid bearer token
//!
//! Resolution never fails a request: lookup errors and unknown values fall
//! through to the next source, and no match means "no tenant". A resolved
//! tenant whose subscription lapsed is refused on `/api` routes, except the
//! billing, subscription, auth and pricing routes it needs to recover.

use std::future::Future;
use std::time::Duration;

use anyhow::anyhow;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use campusflow_cache::keys;
use campusflow_config::TenancyConfig;
use campusflow_core::AppError;
use campusflow_models::{Tenant, TenantId};
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::metrics::track_access_denied;
use crate::middleware::auth::{AuthUser, authenticate};
use crate::state::AppState;

pub const TENANT_ID_HEADER: &str = "x-tenant-id";
pub const TENANT_NAME_HEADER: &str = "x-tenant-name";

/// Paths a lapsed tenant may still call.
const GATE_EXEMPT_PREFIXES: [&str; 4] = [
    "/api/billing/",
    "/api/subscription",
    "/api/auth/",
    "/api/pricing",
];

/// The college a request was resolved to.
#[derive(Debug, Clone)]
pub struct CurrentTenant(pub Tenant);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantSource {
    Header,
    Subdomain,
    CustomDomain,
    Token,
}

impl TenantSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Subdomain => "subdomain",
            Self::CustomDomain => "custom_domain",
            Self::Token => "token",
        }
    }
}

/// `Host` without its port, lowercased.
pub fn request_host(headers: &HeaderMap) -> Option<String> {
    let host = headers.get(header::HOST)?.to_str().ok()?;
    let host = host.split(':').next()?.trim().to_ascii_lowercase();
    (!host.is_empty()).then_some(host)
}

/// First label of a host with more than two labels, unless it is reserved.
pub fn subdomain_of<'a>(host: &'a str, config: &TenancyConfig) -> Option<&'a str> {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return None;
    }
    let label = labels[0];
    (!label.is_empty() && !config.is_reserved(label)).then_some(label)
}

pub fn is_gate_exempt(path: &str) -> bool {
    GATE_EXEMPT_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

async fn cached_lookup<F, Fut>(state: &AppState, key: String, load: F) -> Option<Tenant>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<Tenant>, sqlx::Error>>,
{
    let result = match state.cache() {
        Some(cache) => {
            let ttl = Duration::from_secs(state.tenancy_config.cache_ttl_seconds);
            cache.get_or_load(&key, ttl, load).await
        }
        None => load().await,
    };

    result.unwrap_or_else(|e| {
        warn!(error = %e, cache.key = %key, "Tenant lookup failed");
        None
    })
}

async fn tenant_by_id(state: &AppState, id: Uuid) -> Option<Tenant> {
    cached_lookup(state, keys::tenants::by_id(id), || async {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db)
            .await
    })
    .await
}

async fn tenant_by_subdomain(state: &AppState, subdomain: &str) -> Option<Tenant> {
    cached_lookup(state, keys::tenants::by_subdomain(subdomain), || async {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE LOWER(subdomain) = LOWER($1)")
            .bind(subdomain)
            .fetch_optional(&state.db)
            .await
    })
    .await
}

async fn tenant_by_domain(state: &AppState, host: &str) -> Option<Tenant> {
    cached_lookup(state, keys::tenants::by_host(host), || async {
        sqlx::query_as::<_, Tenant>(
            r#"
            SELECT t.* FROM tenants t
            JOIN tenant_domains d ON d.tenant_id = t.id
            WHERE LOWER(d.domain) = LOWER($1) AND d.is_verified AND d.is_active
            "#,
        )
        .bind(host)
        .fetch_optional(&state.db)
        .await
    })
    .await
}

/// Finds the tenant a request belongs to, if any.
pub async fn resolve_tenant(
    state: &AppState,
    headers: &HeaderMap,
) -> Option<(Tenant, TenantSource)> {
    let header_id = headers
        .get(TENANT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok());
    if let Some(id) = header_id
        && let Some(tenant) = tenant_by_id(state, id).await
    {
        return Some((tenant, TenantSource::Header));
    }

    if let Some(host) = request_host(headers) {
        if let Some(sub) = subdomain_of(&host, &state.tenancy_config)
            && let Some(tenant) = tenant_by_subdomain(state, sub).await
        {
            return Some((tenant, TenantSource::Subdomain));
        }
        if let Some(tenant) = tenant_by_domain(state, &host).await {
            return Some((tenant, TenantSource::CustomDomain));
        }
    }

    let token_tenant = authenticate(headers, &state.jwt_config)
        .ok()
        .flatten()
        .and_then(|user| user.0.tenant_id);
    if let Some(id) = token_tenant
        && let Some(tenant) = tenant_by_id(state, id).await
    {
        return Some((tenant, TenantSource::Token));
    }

    None
}

/// Resolves the tenant, enforces the subscription gate and tags the
/// response with the tenant's id and name.
pub async fn tenant_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some((tenant, source)) = resolve_tenant(&state, request.headers()).await else {
        return next.run(request).await;
    };
    debug!(tenant_id = %tenant.id, source = source.as_str(), "Tenant resolved");

    let path = request.uri().path();
    if path.starts_with("/api/")
        && !is_gate_exempt(path)
        && tenant.is_gated(Utc::now().date_naive())
    {
        track_access_denied("SUBSCRIPTION_INACTIVE");
        let mut response = AppError::forbidden("Subscription expired or inactive".to_string())
            .with_code("SUBSCRIPTION_INACTIVE")
            .into_response();
        tag_response(&mut response, &tenant);
        return response;
    }

    request.extensions_mut().insert(CurrentTenant(tenant.clone()));
    let mut response = next.run(request).await;
    tag_response(&mut response, &tenant);
    response
}

fn tag_response(response: &mut Response, tenant: &Tenant) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&tenant.id.to_string()) {
        headers.insert(TENANT_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&tenant.name) {
        headers.insert(TENANT_NAME_HEADER, value);
    }
}

/// Tenant a tenant-scoped handler operates on.
///
/// Tenant users are pinned to their own college. Super admins act on the
/// college named by `X-Tenant-ID` (or otherwise resolved for the request).
#[derive(Debug, Clone, Copy)]
pub struct TenantScope(pub TenantId);

impl FromRequestParts<AppState> for TenantScope {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if let Some(tenant_id) = user.tenant_id() {
            return Ok(TenantScope(tenant_id));
        }
        if !user.is_super_admin() {
            return Err(AppError::forbidden("Access denied: No tenant assigned".to_string()));
        }
        parts
            .extensions
            .get::<CurrentTenant>()
            .map(|current| TenantScope(current.0.id))
            .ok_or_else(|| {
                AppError::bad_request(anyhow!(
                    "X-Tenant-ID header is required for platform administrators"
                ))
            })
    }
}
