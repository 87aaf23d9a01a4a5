mod common;

use axum::http::{Method, StatusCode};
use campusflow::campusflow_models::{TenantId, system_roles};
use serde_json::json;
use sqlx::PgPool;

async fn current_students(pool: &PgPool, tenant_id: TenantId) -> i32 {
    sqlx::query_scalar("SELECT current_students FROM tenants WHERE id = $1")
        .bind(tenant_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn new_user(email: &str, role: &str) -> serde_json::Value {
    json!({
        "email": email,
        "password": "password123",
        "first_name": "Jane",
        "last_name": "Doe",
        "role": role
    })
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_student_counts_against_plan(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool.clone());

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/college/users",
        Some(&token),
        Some(new_user("jane.doe@riverdale.edu", "student")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["email"], "jane.doe@riverdale.edu");
    assert_eq!(json["role"], "student");
    assert_eq!(json["tenant_id"], tenant.to_string());
    assert!(json.get("password").is_none());
    assert_eq!(current_students(&pool, tenant).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_user_over_plan_limit_fails(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    sqlx::query("UPDATE tenants SET max_students = 1, current_students = 1 WHERE id = $1")
        .bind(tenant)
        .execute(&pool)
        .await
        .unwrap();
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool.clone());

    let (status, _) = common::send(
        app,
        Method::POST,
        "/api/college/users",
        Some(&token),
        Some(new_user("overflow@riverdale.edu", "student")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(current_students(&pool, tenant).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_user_cannot_grant_super_admin(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app,
        Method::POST,
        "/api/college/users",
        Some(&token),
        Some(new_user("root@riverdale.edu", "super_admin")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_user_duplicate_email(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/college/users",
        Some(&token),
        Some(new_user(&admin.email, "teacher")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "A user with this email already exists");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_users_filters_by_role(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    common::create_user(&pool, Some(tenant), system_roles::TEACHER).await;
    common::create_user(&pool, Some(tenant), system_roles::STUDENT).await;
    common::create_user(&pool, Some(tenant), system_roles::STUDENT).await;
    let other = common::create_tenant(&pool, "Sunnydale College").await;
    common::create_user(&pool, Some(other), system_roles::STUDENT).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app,
        Method::GET,
        "/api/college/users?role=student",
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["meta"]["total"], 2);
    for user in json["data"].as_array().unwrap() {
        assert_eq!(user["role"], "student");
        assert_eq!(user["tenant_id"], tenant.to_string());
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_user_of_other_tenant_is_not_found(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let other = common::create_tenant(&pool, "Sunnydale College").await;
    let stranger = common::create_user(&pool, Some(other), system_roles::TEACHER).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app,
        Method::GET,
        &format!("/api/college/users/{}", stranger.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_student_releases_capacity(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool.clone());

    let (_, created) = common::send(
        app.clone(),
        Method::POST,
        "/api/college/users",
        Some(&token),
        Some(new_user("leaving@riverdale.edu", "student")),
    )
    .await;
    assert_eq!(current_students(&pool, tenant).await, 1);

    let (status, _) = common::send(
        app,
        Method::DELETE,
        &format!("/api/college/users/{}", created["id"].as_str().unwrap()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(current_students(&pool, tenant).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_deletes_release_capacity_once(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool.clone());

    for email in ["staying@riverdale.edu", "leaving@riverdale.edu"] {
        let (status, _) = common::send(
            app.clone(),
            Method::POST,
            "/api/college/users",
            Some(&token),
            Some(new_user(email, "student")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    assert_eq!(current_students(&pool, tenant).await, 2);

    let leaving: uuid::Uuid =
        sqlx::query_scalar("SELECT id FROM users WHERE email = 'leaving@riverdale.edu'")
            .fetch_one(&pool)
            .await
            .unwrap();
    let uri = format!("/api/college/users/{leaving}");

    let ((first, _), (second, _)) = tokio::join!(
        common::send(app.clone(), Method::DELETE, &uri, Some(&token), None),
        common::send(app.clone(), Method::DELETE, &uri, Some(&token), None),
    );

    let mut statuses = [first, second];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::NO_CONTENT, StatusCode::NOT_FOUND]);
    assert_eq!(current_students(&pool, tenant).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_role_changes_move_the_counter_once(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool.clone());

    let (_, created) = common::send(
        app.clone(),
        Method::POST,
        "/api/college/users",
        Some(&token),
        Some(new_user("switching@riverdale.edu", "student")),
    )
    .await;
    let uri = format!("/api/college/users/{}", created["id"].as_str().unwrap());
    let body = json!({ "role": "teacher" });

    let ((first, _), (second, _)) = tokio::join!(
        common::send(app.clone(), Method::PUT, &uri, Some(&token), Some(body.clone())),
        common::send(app.clone(), Method::PUT, &uri, Some(&token), Some(body.clone())),
    );
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);

    let (students, teachers): (i32, i32) =
        sqlx::query_as("SELECT current_students, current_teachers FROM tenants WHERE id = $1")
            .bind(tenant)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(students, 0);
    assert_eq!(teachers, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_cannot_delete_self(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app,
        Method::DELETE,
        &format!("/api/college/users/{}", admin.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_assignable_roles_exclude_super_admin(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, json) =
        common::send(app, Method::GET, "/api/college/roles", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"teacher"));
    assert!(!names.contains(&"super_admin"));
}
