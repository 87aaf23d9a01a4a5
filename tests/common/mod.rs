#![allow(dead_code)]

use std::net::SocketAddr;

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, StatusCode, header},
};
use campusflow::campusflow_config::JwtConfig;
use campusflow::campusflow_core::hash_password;
use campusflow::campusflow_models::{RoleId, TenantId, UserId, system_roles};
use campusflow::modules::auth::AuthService;
use campusflow::router::init_router;
use campusflow::state::AppState;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "testpass123";
pub const TRIAL_PLAN_ID: Uuid = Uuid::from_u128(0x0101);
pub const DEFAULT_PEER: &str = "127.0.0.1";

pub struct TestUser {
    pub id: UserId,
    pub email: String,
    pub password: String,
    pub tenant_id: Option<TenantId>,
}

/// Router over `pool` with rate limiting off; limits have their own suite.
pub fn test_app(pool: PgPool) -> Router {
    let mut state = AppState::new(pool, None);
    state.rate_limiters = None;
    init_router(state)
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..8])
}

/// College on the free trial, with its trial subscription row.
pub async fn create_tenant(pool: &PgPool, name: &str) -> TenantId {
    let slug = unique(&name.to_lowercase().replace(' ', "-"));
    let trial_end = Utc::now() + Duration::days(14);

    let tenant_id = sqlx::query_scalar::<_, TenantId>(
        r#"INSERT INTO tenants
               (name, slug, subdomain, email, subscription_status, subscription_plan,
                subscription_start_date, trial_end_date)
           VALUES ($1, $2, $2, $3, 'trial', 'free-trial', CURRENT_DATE, $4)
           RETURNING id"#,
    )
    .bind(format!("{name} {slug}"))
    .bind(&slug)
    .bind(format!("office@{slug}.edu"))
    .bind(trial_end.date_naive())
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query(
        r#"INSERT INTO tenant_subscriptions (tenant_id, plan_id, status, trial_end_date)
           VALUES ($1, $2, 'trial', $3)"#,
    )
    .bind(tenant_id)
    .bind(TRIAL_PLAN_ID)
    .bind(trial_end)
    .execute(pool)
    .await
    .unwrap();

    tenant_id
}

/// Lapses a tenant's subscription so the gate refuses it.
pub async fn expire_tenant(pool: &PgPool, tenant_id: TenantId) {
    sqlx::query(
        r#"UPDATE tenants SET subscription_status = 'expired', is_active = FALSE,
               trial_end_date = CURRENT_DATE - 1
           WHERE id = $1"#,
    )
    .bind(tenant_id)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn create_user(pool: &PgPool, tenant_id: Option<TenantId>, role_id: RoleId) -> TestUser {
    let email = format!("{}@test.edu", unique("user"));
    let hashed = hash_password(TEST_PASSWORD).unwrap();

    let id = sqlx::query_scalar::<_, UserId>(
        r#"INSERT INTO users (tenant_id, role_id, email, password, first_name, last_name)
           VALUES ($1, $2, $3, $4, 'Test', 'User')
           RETURNING id"#,
    )
    .bind(tenant_id)
    .bind(role_id)
    .bind(&email)
    .bind(&hashed)
    .fetch_one(pool)
    .await
    .unwrap();

    TestUser {
        id,
        email,
        password: TEST_PASSWORD.to_string(),
        tenant_id,
    }
}

pub async fn create_super_admin(pool: &PgPool) -> TestUser {
    create_user(pool, None, system_roles::SUPER_ADMIN).await
}

pub async fn token_for(pool: &PgPool, user: &TestUser) -> String {
    AuthService::issue_tokens(pool, &JwtConfig::from_env(), user.id)
        .await
        .unwrap()
        .access_token
}

pub async fn send_with_headers(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
    headers: &[(&str, String)],
) -> (StatusCode, axum::http::HeaderMap, Value) {
    send_from_peer(app, DEFAULT_PEER, method, uri, token, body, headers).await
}

/// Sends a request as if it arrived over a connection from `peer`.
pub async fn send_from_peer(
    app: Router,
    peer: &str,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
    headers: &[(&str, String)],
) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    let mut request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let addr: SocketAddr = format!("{peer}:40000").parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let response_headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, response_headers, json)
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, _, json) = send_with_headers(app, method, uri, token, body, &[]).await;
    (status, json)
}

pub async fn create_department(pool: &PgPool, tenant_id: TenantId, code: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO departments (tenant_id, name, code)
           VALUES ($1, $2, $3) RETURNING id"#,
    )
    .bind(tenant_id)
    .bind(format!("Department {code}"))
    .bind(code)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_academic_year(pool: &PgPool, tenant_id: TenantId) -> Uuid {
    let today = Utc::now().date_naive();
    sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO academic_years (tenant_id, name, start_date, end_date, is_current)
           VALUES ($1, $2, $3, $4, TRUE) RETURNING id"#,
    )
    .bind(tenant_id)
    .bind(unique("year"))
    .bind(today - Duration::days(90))
    .bind(today + Duration::days(270))
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_section(
    pool: &PgPool,
    tenant_id: TenantId,
    department_id: Uuid,
    academic_year_id: Uuid,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO sections (tenant_id, department_id, academic_year_id, name, code)
           VALUES ($1, $2, $3, 'Section A', $4) RETURNING id"#,
    )
    .bind(tenant_id)
    .bind(department_id)
    .bind(academic_year_id)
    .bind(unique("SEC"))
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_subject(pool: &PgPool, tenant_id: TenantId, department_id: Uuid) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO subjects (tenant_id, department_id, name, code)
           VALUES ($1, $2, 'Data Structures', $3) RETURNING id"#,
    )
    .bind(tenant_id)
    .bind(department_id)
    .bind(unique("CS"))
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn enroll(
    pool: &PgPool,
    tenant_id: TenantId,
    student_id: UserId,
    section_id: Uuid,
    academic_year_id: Uuid,
) {
    sqlx::query(
        r#"INSERT INTO student_enrollments (tenant_id, student_id, section_id, academic_year_id)
           VALUES ($1, $2, $3, $4)"#,
    )
    .bind(tenant_id)
    .bind(student_id)
    .bind(section_id)
    .bind(academic_year_id)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn assign_teacher(
    pool: &PgPool,
    tenant_id: TenantId,
    teacher_id: UserId,
    subject_id: Uuid,
    section_id: Uuid,
    academic_year_id: Uuid,
) {
    sqlx::query(
        r#"INSERT INTO teacher_assignments
               (tenant_id, teacher_id, subject_id, section_id, academic_year_id)
           VALUES ($1, $2, $3, $4, $5)"#,
    )
    .bind(tenant_id)
    .bind(teacher_id)
    .bind(subject_id)
    .bind(section_id)
    .bind(academic_year_id)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn link_parent(
    pool: &PgPool,
    tenant_id: TenantId,
    parent_id: UserId,
    student_id: UserId,
    can_view_grades: bool,
) {
    sqlx::query(
        r#"INSERT INTO parent_student_links
               (tenant_id, parent_id, student_id, can_view_grades)
           VALUES ($1, $2, $3, $4)"#,
    )
    .bind(tenant_id)
    .bind(parent_id)
    .bind(student_id)
    .bind(can_view_grades)
    .execute(pool)
    .await
    .unwrap();
}

/// A college with a department, current year, one section and one subject.
pub struct Campus {
    pub tenant_id: TenantId,
    pub department_id: Uuid,
    pub academic_year_id: Uuid,
    pub section_id: Uuid,
    pub subject_id: Uuid,
}

pub async fn create_campus(pool: &PgPool) -> Campus {
    let tenant_id = create_tenant(pool, "Riverdale College").await;
    let department_id = create_department(pool, tenant_id, "CSE").await;
    let academic_year_id = create_academic_year(pool, tenant_id).await;
    let section_id = create_section(pool, tenant_id, department_id, academic_year_id).await;
    let subject_id = create_subject(pool, tenant_id, department_id).await;

    Campus {
        tenant_id,
        department_id,
        academic_year_id,
        section_id,
        subject_id,
    }
}
