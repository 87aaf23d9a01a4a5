//! HTTP cache headers: `Cache-Control` and body-hash `ETag`s.

use axum::{
    body::Body,
    extract::Request,
    http::{
        HeaderValue, Method, StatusCode,
        header::{CACHE_CONTROL, ETAG, IF_NONE_MATCH},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use sha2::{Digest, Sha256};
use tower_http::set_header::SetResponseHeaderLayer;

/// `Cache-Control` directives for a group of routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheControl {
    /// Shared caches may store the response for `max_age` seconds.
    Public { max_age: u64 },
    /// Only the browser may store it.
    Private { max_age: u64 },
    NoStore,
}

impl CacheControl {
    pub fn header_value(&self) -> HeaderValue {
        match self {
            Self::Public { max_age } => HeaderValue::from_str(&format!("public, max-age={max_age}")),
            Self::Private { max_age } => {
                HeaderValue::from_str(&format!("private, max-age={max_age}"))
            }
            Self::NoStore => Ok(HeaderValue::from_static("no-store")),
        }
        .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
    }
}

/// Sets `Cache-Control` on responses that do not already carry one.
pub fn cache_control(directive: CacheControl) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(CACHE_CONTROL, directive.header_value())
}

fn body_etag(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    format!("\"{}\"", hex::encode(&digest[..16]))
}

fn strip_weak(tag: &str) -> &str {
    tag.trim().trim_start_matches("W/")
}

fn if_none_match_hits(header: &str, etag: &str) -> bool {
    header.trim() == "*" || header.split(',').any(|tag| strip_weak(tag) == strip_weak(etag))
}

/// Answers `304 Not Modified` to conditional GETs whose `If-None-Match`
/// matches the hash of the response body.
///
/// The body is buffered, so keep this to small read-only responses.
pub async fn etag_middleware(request: Request, next: Next) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }
    let if_none_match = request
        .headers()
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let response = next.run(request).await;
    if !response.status().is_success() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    let etag = body_etag(&bytes);
    if let Ok(value) = HeaderValue::from_str(&etag) {
        parts.headers.insert(ETAG, value);
    }

    if if_none_match.is_some_and(|header| if_none_match_hits(&header, &etag)) {
        let mut not_modified = StatusCode::NOT_MODIFIED.into_response();
        for name in [ETAG, CACHE_CONTROL] {
            if let Some(value) = parts.headers.get(&name) {
                not_modified.headers_mut().insert(name, value.clone());
            }
        }
        return not_modified;
    }

    Response::from_parts(parts, Body::from(bytes))
}
