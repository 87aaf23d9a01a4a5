mod common;

use axum::http::{Method, StatusCode};
use campusflow::campusflow_models::system_roles;
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_fee_is_created_with_receipt(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let student = common::create_user(&pool, Some(tenant), system_roles::STUDENT).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/college/fees",
        Some(&token),
        Some(json!({
            "student_id": student.id,
            "fee_type": "tuition",
            "amount": "1500.00",
            "due_date": "2030-01-31"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "pending");
    assert!(json["receipt_number"].as_str().unwrap().starts_with("RCP"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_fee_requires_a_student_of_the_college(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let teacher = common::create_user(&pool, Some(tenant), system_roles::TEACHER).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app.clone(),
        Method::POST,
        "/api/college/fees",
        Some(&token),
        Some(json!({
            "student_id": teacher.id,
            "fee_type": "exam",
            "amount": "200.00",
            "due_date": "2030-01-31"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::send(
        app,
        Method::POST,
        "/api/college/fees",
        Some(&token),
        Some(json!({
            "student_id": teacher.id,
            "fee_type": "exam",
            "amount": "-5",
            "due_date": "2030-01-31"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_paid_fee_cannot_be_paid_again(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let student = common::create_user(&pool, Some(tenant), system_roles::STUDENT).await;
    let token = common::token_for(&pool, &admin).await;
    let student_token = common::token_for(&pool, &student).await;
    let app = common::test_app(pool);

    let (_, fee) = common::send(
        app.clone(),
        Method::POST,
        "/api/college/fees",
        Some(&token),
        Some(json!({
            "student_id": student.id,
            "fee_type": "library",
            "amount": "75.50",
            "due_date": "2030-01-31"
        })),
    )
    .await;
    let pay_uri = format!("/api/college/fees/{}/pay", fee["id"].as_str().unwrap());

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        &pay_uri,
        Some(&token),
        Some(json!({ "payment_method": "upi", "transaction_id": "UPI-778899" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "paid");
    assert!(json["payment_date"].is_string());

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        &pay_uri,
        Some(&token),
        Some(json!({ "payment_method": "cash" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Fee is already paid");

    let (status, json) =
        common::send(app, Method::GET, "/api/student/fees", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["status"], "paid");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_mark_overdue_only_touches_past_due_fees(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let student = common::create_user(&pool, Some(tenant), system_roles::STUDENT).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);
    let today = Utc::now().date_naive();

    for due in [today - Duration::days(10), today + Duration::days(10)] {
        let (status, _) = common::send(
            app.clone(),
            Method::POST,
            "/api/college/fees",
            Some(&token),
            Some(json!({
                "student_id": student.id,
                "fee_type": "hostel",
                "amount": "900.00",
                "due_date": due
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        "/api/college/fees/mark-overdue",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["marked"], 1);

    let (status, json) = common::send(
        app,
        Method::GET,
        "/api/college/fees?status=overdue",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["meta"]["total"], 1);
}
