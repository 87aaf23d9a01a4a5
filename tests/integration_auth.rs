mod common;

use axum::http::{Method, StatusCode};
use campusflow::campusflow_models::system_roles;
use serde_json::json;
use sqlx::PgPool;

fn signup_body(college: &str, email: &str) -> serde_json::Value {
    json!({
        "college_name": college,
        "first_name": "Ada",
        "last_name": "Admin",
        "email": email,
        "password": "securepass123"
    })
}

#[sqlx::test(migrations = "./migrations")]
async fn test_signup_creates_trial_college(pool: PgPool) {
    let app = common::test_app(pool.clone());

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(signup_body("Hillcrest Institute", "ada@hillcrest.edu")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(json["access_token"].is_string());
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["user"]["role"], "tenant_admin");
    assert_eq!(json["user"]["tenant"]["subscription_status"], "trial");
    assert_eq!(json["user"]["tenant"]["subdomain"], "hillcrest-institute");

    let (plan_slug, status): (String, String) = sqlx::query_as(
        r#"SELECT p.slug, s.status FROM tenant_subscriptions s
           JOIN subscription_plans p ON p.id = s.plan_id
           JOIN users u ON u.tenant_id = s.tenant_id
           WHERE u.email = $1"#,
    )
    .bind("ada@hillcrest.edu")
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(plan_slug, "free-trial");
    assert_eq!(status, "trial");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_signup_rejects_duplicate_college(pool: PgPool) {
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app.clone(),
        Method::POST,
        "/api/auth/signup",
        None,
        Some(signup_body("Hillcrest Institute", "first@hillcrest.edu")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(signup_body("Hillcrest Institute", "second@hillcrest.edu")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("already"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_signup_short_password_is_rejected(pool: PgPool) {
    let app = common::test_app(pool);
    let mut body = signup_body("Lakeside College", "ada@lakeside.edu");
    body["password"] = json!("short");

    let (status, _) = common::send(app, Method::POST, "/api/auth/signup", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_success(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let user = common::create_user(&pool, Some(tenant), system_roles::TEACHER).await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": user.password })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["user"]["role"], "teacher");
    assert_eq!(json["user"]["tenant"]["id"], tenant.to_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_wrong_password(pool: PgPool) {
    let user = common::create_super_admin(&pool).await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": "wrongpassword" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].is_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_inactive_user(pool: PgPool) {
    let user = common::create_super_admin(&pool).await;
    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": user.password })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refresh_issues_new_tokens(pool: PgPool) {
    let user = common::create_super_admin(&pool).await;
    let app = common::test_app(pool);

    let (_, login) = common::send(
        app.clone(),
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": user.password })),
    )
    .await;

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": login["refresh_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["access_token"].is_string());
    assert_eq!(json["user"]["role"], "super_admin");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_me_requires_token(pool: PgPool) {
    let user = common::create_super_admin(&pool).await;
    let token = common::token_for(&pool, &user).await;
    let app = common::test_app(pool);

    let (status, _) = common::send(app.clone(), Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = common::send(app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["email"], user.email);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_forgot_password_answers_the_same_for_unknown_email(pool: PgPool) {
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/auth/forgot-password",
        None,
        Some(json!({ "email": "ghost@nowhere.edu" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].is_string());
}
