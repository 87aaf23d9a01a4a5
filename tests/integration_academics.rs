mod common;

use axum::http::{Method, StatusCode};
use campusflow::campusflow_models::system_roles;
use serde_json::json;
use sqlx::PgPool;

async fn admin_token(pool: &PgPool, tenant: campusflow::campusflow_models::TenantId) -> String {
    let admin = common::create_user(pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    common::token_for(pool, &admin).await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_department_takes_a_slot(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let token = admin_token(&pool, tenant).await;
    let app = common::test_app(pool.clone());

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        "/api/college/departments",
        Some(&token),
        Some(json!({ "name": "Computer Science", "code": "CSE" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["code"], "CSE");
    assert_eq!(json["tenant_id"], tenant.to_string());

    let used: i32 = sqlx::query_scalar("SELECT current_departments FROM tenants WHERE id = $1")
        .bind(tenant)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(used, 1);

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/college/departments",
        Some(&token),
        Some(json!({ "name": "Computing Again", "code": "CSE" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "A department with this code already exists");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_department_limit_is_enforced(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    sqlx::query("UPDATE tenants SET max_departments = 0 WHERE id = $1")
        .bind(tenant)
        .execute(&pool)
        .await
        .unwrap();
    let token = admin_token(&pool, tenant).await;
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app,
        Method::POST,
        "/api/college/departments",
        Some(&token),
        Some(json!({ "name": "Physics", "code": "PHY" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_department_codes_are_scoped_per_tenant(pool: PgPool) {
    let first = common::create_tenant(&pool, "Riverdale College").await;
    let second = common::create_tenant(&pool, "Sunnydale College").await;
    common::create_department(&pool, first, "CSE").await;
    let token = admin_token(&pool, second).await;
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app.clone(),
        Method::POST,
        "/api/college/departments",
        Some(&token),
        Some(json!({ "name": "Computer Science", "code": "CSE" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = common::send(
        app,
        Method::GET,
        "/api/college/departments",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["meta"]["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_academic_year_must_end_after_it_starts(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let token = admin_token(&pool, tenant).await;
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app,
        Method::POST,
        "/api/college/academic-years",
        Some(&token),
        Some(json!({
            "name": "2025-26",
            "start_date": "2026-05-31",
            "end_date": "2025-06-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_one_current_academic_year(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let token = admin_token(&pool, tenant).await;
    let app = common::test_app(pool.clone());

    for name in ["2024-25", "2025-26"] {
        let (status, _) = common::send(
            app.clone(),
            Method::POST,
            "/api/college/academic-years",
            Some(&token),
            Some(json!({
                "name": name,
                "start_date": format!("{}-06-01", &name[..4]),
                "end_date": format!("20{}-05-31", &name[5..]),
                "is_current": true
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, json) = common::send(
        app,
        Method::GET,
        "/api/college/academic-years/current",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "2025-26");

    let current: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM academic_years WHERE tenant_id = $1 AND is_current",
    )
    .bind(tenant)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(current, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_set_current_moves_the_flag(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let token = admin_token(&pool, tenant).await;
    let app = common::test_app(pool.clone());

    let mut ids = Vec::new();
    for (name, current) in [("2024-25", true), ("2025-26", false)] {
        let (status, json) = common::send(
            app.clone(),
            Method::POST,
            "/api/college/academic-years",
            Some(&token),
            Some(json!({
                "name": name,
                "start_date": format!("{}-06-01", &name[..4]),
                "end_date": format!("20{}-05-31", &name[5..]),
                "is_current": current
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(json["id"].as_str().unwrap().to_string());
    }

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/college/academic-years/{}/set-current", ids[1]),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_current"], true);

    let (status, json) = common::send(
        app.clone(),
        Method::GET,
        &format!("/api/college/academic-years/{}", ids[0]),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_current"], false);

    let (_, json) = common::send(
        app.clone(),
        Method::GET,
        "/api/college/academic-years/current",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(json["name"], "2025-26");

    // Another college's year cannot be made current here.
    let other = common::create_tenant(&pool, "Sunnydale College").await;
    let foreign = common::create_academic_year(&pool, other).await;
    let (status, _) = common::send(
        app,
        Method::POST,
        &format!("/api/college/academic-years/{foreign}/set-current"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let current: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM academic_years WHERE tenant_id = $1 AND is_current",
    )
    .bind(tenant)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(current, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_enrollment_fills_section_seats(pool: PgPool) {
    let campus = common::create_campus(&pool).await;
    sqlx::query("UPDATE sections SET max_students = 1 WHERE id = $1")
        .bind(campus.section_id)
        .execute(&pool)
        .await
        .unwrap();
    let first = common::create_user(&pool, Some(campus.tenant_id), system_roles::STUDENT).await;
    let second = common::create_user(&pool, Some(campus.tenant_id), system_roles::STUDENT).await;
    let token = admin_token(&pool, campus.tenant_id).await;
    let app = common::test_app(pool.clone());

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        "/api/college/enrollments",
        Some(&token),
        Some(json!({ "student_id": first.id, "section_id": campus.section_id, "roll_number": "01" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["academic_year_id"], campus.academic_year_id.to_string());
    assert_eq!(json["status"], "active");

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/college/enrollments",
        Some(&token),
        Some(json!({ "student_id": second.id, "section_id": campus.section_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Section is full");

    let seats: i32 =
        sqlx::query_scalar("SELECT current_student_count FROM sections WHERE id = $1")
            .bind(campus.section_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(seats, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_students_can_be_enrolled(pool: PgPool) {
    let campus = common::create_campus(&pool).await;
    let teacher = common::create_user(&pool, Some(campus.tenant_id), system_roles::TEACHER).await;
    let token = admin_token(&pool, campus.tenant_id).await;
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app,
        Method::POST,
        "/api/college/enrollments",
        Some(&token),
        Some(json!({ "student_id": teacher.id, "section_id": campus.section_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_link_is_unique(pool: PgPool) {
    let campus = common::create_campus(&pool).await;
    let parent = common::create_user(&pool, Some(campus.tenant_id), system_roles::PARENT).await;
    let student = common::create_user(&pool, Some(campus.tenant_id), system_roles::STUDENT).await;
    let token = admin_token(&pool, campus.tenant_id).await;
    let app = common::test_app(pool);
    let body = json!({ "parent_id": parent.id, "student_id": student.id, "relationship": "mother" });

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        "/api/college/parent-links",
        Some(&token),
        Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["relationship"], "mother");

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/college/parent-links",
        Some(&token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Parent is already linked to this student");
}
