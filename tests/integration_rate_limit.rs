mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use campusflow::campusflow_config::RateLimitConfig;
use campusflow::middleware::rate_limit::RateLimiters;
use campusflow::router::init_router;
use campusflow::state::AppState;
use serde_json::{Value, json};
use sqlx::PgPool;

const PROXY: &str = "10.0.0.5";

fn strict_app(pool: PgPool) -> axum::Router {
    let config = RateLimitConfig {
        enabled: true,
        general_per_second: 60,
        general_burst_size: 3,
        auth_per_second: 60,
        auth_burst_size: 1,
        trusted_proxies: vec![PROXY.parse().unwrap()],
    };
    let mut state = AppState::new(pool, None);
    state.rate_limiters = RateLimiters::new(&config).map(Arc::new);
    state.rate_limit_config = config;
    init_router(state)
}

fn login_body() -> Value {
    json!({ "email": "nobody@test.edu", "password": "password123" })
}

fn forwarded_for(ip: &str) -> [(&'static str, String); 1] {
    [("x-forwarded-for", ip.to_string())]
}

async fn login_from(app: &axum::Router, peer: &str, forwarded: Option<&str>) -> (StatusCode, Value) {
    let headers: Vec<(&str, String)> = forwarded.map(forwarded_for).into_iter().flatten().collect();
    let (status, _, json) = common::send_from_peer(
        app.clone(),
        peer,
        Method::POST,
        "/api/auth/login",
        None,
        Some(login_body()),
        &headers,
    )
    .await;
    (status, json)
}

#[sqlx::test(migrations = "./migrations")]
async fn test_auth_rate_limit_exceeded(pool: PgPool) {
    let app = strict_app(pool);

    let (status, _) = login_from(&app, "192.168.1.100", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, headers, json) = common::send_from_peer(
        app,
        "192.168.1.100",
        Method::POST,
        "/api/auth/login",
        None,
        Some(login_body()),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"], "Too many requests");
    assert!(headers.contains_key("retry-after"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_rate_limit_is_per_client(pool: PgPool) {
    let app = strict_app(pool);

    for peer in ["10.0.0.1", "10.0.0.2"] {
        let (status, _) = login_from(&app, peer, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_forwarding_headers_do_not_reset_the_bucket(pool: PgPool) {
    let app = strict_app(pool);

    let (status, _) = login_from(&app, "203.0.113.7", Some("1.2.3.4")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Same connection, new claimed client: still the same bucket.
    let (status, _) = login_from(&app, "203.0.113.7", Some("5.6.7.8")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_trusted_proxy_is_keyed_by_forwarded_client(pool: PgPool) {
    let app = strict_app(pool);

    for client in ["1.2.3.4", "5.6.7.8"] {
        let (status, _) = login_from(&app, PROXY, Some(client)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = login_from(&app, PROXY, Some("1.2.3.4")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_general_bucket_covers_other_routes(pool: PgPool) {
    let app = strict_app(pool);

    for _ in 0..3 {
        let (status, _, _) = common::send_from_peer(
            app.clone(),
            "10.0.0.9",
            Method::GET,
            "/api/pricing",
            None,
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _, json) = common::send_from_peer(
        app,
        "10.0.0.9",
        Method::GET,
        "/api/pricing",
        None,
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"], "Too many requests");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_health_is_never_limited(pool: PgPool) {
    let app = strict_app(pool);

    for _ in 0..5 {
        let (status, _, json) = common::send_from_peer(
            app.clone(),
            "10.0.0.9",
            Method::GET,
            "/liveness",
            None,
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "alive");
    }
}
