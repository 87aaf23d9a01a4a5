mod common;

use axum::http::{Method, StatusCode};
use campusflow::campusflow_models::system_roles;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_portal_requires_token(pool: PgPool) {
    let app = common::test_app(pool);

    let (status, json) = common::send(app, Method::GET, "/api/college/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Authentication required");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_invalid_token_is_rejected(pool: PgPool) {
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app,
        Method::GET,
        "/api/teacher/classes",
        Some("not-a-jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_cannot_reach_college_portal(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let student = common::create_user(&pool, Some(tenant), system_roles::STUDENT).await;
    let token = common::token_for(&pool, &student).await;
    let app = common::test_app(pool);

    let (status, json) =
        common::send(app, Method::GET, "/api/college/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "INSUFFICIENT_PERMISSIONS");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_cannot_reach_billing(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let teacher = common::create_user(&pool, Some(tenant), system_roles::TEACHER).await;
    let token = common::token_for(&pool, &teacher).await;
    let app = common::test_app(pool);

    let (status, _) =
        common::send(app, Method::GET, "/api/subscription", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_tenant_admin_response_carries_role_and_tenant_headers(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, headers, json) = common::send_with_headers(
        app,
        Method::GET,
        "/api/college/users",
        Some(&token),
        None,
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-user-role"], "tenant_admin");
    assert_eq!(headers["x-tenant-id"], tenant.to_string().as_str());
    assert!(headers.contains_key("x-tenant-name"));
    assert_eq!(json["meta"]["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cross_tenant_header_is_refused(pool: PgPool) {
    let home = common::create_tenant(&pool, "Riverdale College").await;
    let other = common::create_tenant(&pool, "Sunnydale College").await;
    let admin = common::create_user(&pool, Some(home), system_roles::TENANT_ADMIN).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, _, json) = common::send_with_headers(
        app,
        Method::GET,
        "/api/college/users",
        Some(&token),
        None,
        &[("x-tenant-id", other.to_string())],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "TENANT_MISMATCH");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_super_admin_acts_on_tenant_from_header(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    common::create_user(&pool, Some(tenant), system_roles::TEACHER).await;
    common::create_user(&pool, Some(tenant), system_roles::STUDENT).await;
    let admin = common::create_super_admin(&pool).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, _) =
        common::send(app.clone(), Method::GET, "/api/college/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, json) = common::send_with_headers(
        app,
        Method::GET,
        "/api/college/users",
        Some(&token),
        None,
        &[("x-tenant-id", tenant.to_string())],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["meta"]["total"], 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_lapsed_subscription_is_gated(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let token = common::token_for(&pool, &admin).await;
    common::expire_tenant(&pool, tenant).await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app.clone(),
        Method::GET,
        "/api/college/users",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "SUBSCRIPTION_INACTIVE");

    let (status, _) =
        common::send(app, Method::GET, "/api/subscription", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_pricing_is_public_and_cacheable(pool: PgPool) {
    let app = common::test_app(pool);

    let (status, headers, json) =
        common::send_with_headers(app, Method::GET, "/api/pricing", None, None, &[]).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.contains_key("etag"));
    assert!(
        headers["cache-control"]
            .to_str()
            .unwrap()
            .contains("max-age=300")
    );
    let plans = json.as_array().unwrap();
    assert_eq!(plans.len(), 5);
    assert_eq!(plans[0]["slug"], "free-trial");
}
