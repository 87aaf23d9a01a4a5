//! Per-IP token buckets for `/api` traffic.
//!
//! Every `/api` route draws from the general bucket and `/api/auth/*`
//! additionally draws from its own stricter one. Both are tower_governor
//! layers keyed by [`ClientIpKeyExtractor`]: the peer address, or the
//! forwarded client address when the peer is a configured proxy.

use std::net::IpAddr;
use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    Router,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use campusflow_config::RateLimitConfig;
use campusflow_core::AppError;
use governor::middleware::NoOpMiddleware;
use tower_governor::{
    GovernorError, GovernorLayer,
    governor::GovernorConfig,
    key_extractor::{KeyExtractor, PeerIpKeyExtractor, SmartIpKeyExtractor},
};
use tracing::warn;

use crate::state::AppState;

/// Keys requests by peer IP. Forwarding headers are only read when the
/// peer itself is a trusted proxy, so clients cannot pick their own bucket.
#[derive(Debug, Clone)]
pub struct ClientIpKeyExtractor {
    trusted_proxies: Arc<[IpAddr]>,
}

impl ClientIpKeyExtractor {
    pub fn new(trusted_proxies: &[IpAddr]) -> Self {
        Self {
            trusted_proxies: trusted_proxies.into(),
        }
    }
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let peer = PeerIpKeyExtractor.extract(req)?;
        if self.trusted_proxies.contains(&peer) {
            SmartIpKeyExtractor.extract(req)
        } else {
            Ok(peer)
        }
    }
}

pub type ClientGovernorConfig = GovernorConfig<ClientIpKeyExtractor, NoOpMiddleware>;

pub struct RateLimiters {
    pub general: Arc<ClientGovernorConfig>,
    pub auth: Arc<ClientGovernorConfig>,
}

impl RateLimiters {
    /// `None` when rate limiting is switched off.
    pub fn new(config: &RateLimitConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let key_extractor = ClientIpKeyExtractor::new(&config.trusted_proxies);
        Some(Self {
            general: Arc::new(config.general_governor_config(key_extractor.clone())?),
            auth: Arc::new(config.auth_governor_config(key_extractor)?),
        })
    }

    /// Drops buckets that have refilled completely.
    pub fn retain_recent(&self) {
        self.general.limiter().retain_recent();
        self.auth.limiter().retain_recent();
    }
}

/// Renders governor rejections as the API's JSON errors.
pub fn rate_limit_error(error: GovernorError) -> Response {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            warn!(retry_after_secs = wait_time, "Rate limit exceeded");
            let mut response =
                AppError::new(StatusCode::TOO_MANY_REQUESTS, anyhow!("Too many requests"))
                    .into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
        }
        GovernorError::UnableToExtractKey => {
            AppError::internal_error("Unable to identify client".to_string()).into_response()
        }
        GovernorError::Other { code, msg, .. } => AppError::new(
            code,
            anyhow!(msg.unwrap_or_else(|| "Request rejected".to_string())),
        )
        .into_response(),
    }
}

type ClientGovernorLayer = GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware, axum::body::Body>;

fn layer(config: &Arc<ClientGovernorConfig>) -> ClientGovernorLayer {
    GovernorLayer::new(Arc::clone(config)).error_handler(rate_limit_error)
}

/// Applies the general bucket to `router`, when limiting is on.
pub fn with_general_limit(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    match &state.rate_limiters {
        Some(limiters) => router.layer(layer(&limiters.general)),
        None => router,
    }
}

/// Applies the auth bucket to `router`, when limiting is on.
pub fn with_auth_limit(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    match &state.rate_limiters {
        Some(limiters) => router.layer(layer(&limiters.auth)),
        None => router,
    }
}
