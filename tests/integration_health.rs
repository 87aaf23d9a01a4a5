mod common;

use axum::http::{Method, StatusCode};
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_health_reports_database(pool: PgPool) {
    let app = common::test_app(pool);

    let (status, json) = common::send(app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["checks"]["database"]["status"], "healthy");
    assert!(json["checks"].get("cache").is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_readiness_and_liveness(pool: PgPool) {
    let app = common::test_app(pool);

    let (status, _) = common::send(app.clone(), Method::GET, "/readiness", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = common::send(app, Method::GET, "/liveness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "alive");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_root_is_public(pool: PgPool) {
    let app = common::test_app(pool);

    let (status, json) = common::send(app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["name"].is_string());
    assert!(json["version"].is_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_openapi_document_is_served(pool: PgPool) {
    let app = common::test_app(pool);

    let (status, json) =
        common::send(app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/subscription/checkout"].is_object());
}
