mod common;

use axum::http::{Method, StatusCode};
use campusflow::campusflow_models::system_roles;
use serde_json::{Value, json};
use sqlx::PgPool;

fn messages(ticket: &Value) -> Vec<&str> {
    ticket["comments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["message"].as_str().unwrap())
        .collect()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_internal_notes_are_hidden_from_the_college(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let college_admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let college_token = common::token_for(&pool, &college_admin).await;
    let platform = common::create_super_admin(&pool).await;
    let platform_token = common::token_for(&pool, &platform).await;
    let app = common::test_app(pool);

    let (status, ticket) = common::send(
        app.clone(),
        Method::POST,
        "/api/college/support-tickets",
        Some(&college_token),
        Some(json!({
            "subject": "Invoices missing",
            "description": "Last month's invoice never arrived",
            "priority": "high"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ticket["status"], "open");
    assert!(ticket["ticket_number"].as_str().unwrap().starts_with("TKT-"));
    let id = ticket["id"].as_str().unwrap().to_string();

    let (status, note) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/company/support-tickets/{id}/comments"),
        Some(&platform_token),
        Some(json!({ "message": "Check the mailer logs", "is_internal": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["is_internal"], true);

    common::send(
        app.clone(),
        Method::POST,
        &format!("/api/company/support-tickets/{id}/comments"),
        Some(&platform_token),
        Some(json!({ "message": "We are looking into it" })),
    )
    .await;

    // Colleges cannot mark their own comments internal.
    let (status, reply) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/college/support-tickets/{id}/comments"),
        Some(&college_token),
        Some(json!({ "message": "Thanks", "is_internal": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["is_internal"], false);

    let (status, seen_by_college) = common::send(
        app.clone(),
        Method::GET,
        &format!("/api/college/support-tickets/{id}"),
        Some(&college_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages(&seen_by_college), ["We are looking into it", "Thanks"]);

    let (status, seen_by_staff) = common::send(
        app,
        Method::GET,
        &format!("/api/company/support-tickets/{id}"),
        Some(&platform_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        messages(&seen_by_staff),
        ["Check the mailer logs", "We are looking into it", "Thanks"]
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_tickets_stay_within_their_college(pool: PgPool) {
    let home = common::create_tenant(&pool, "Riverdale College").await;
    let other = common::create_tenant(&pool, "Sunnydale College").await;
    let home_admin = common::create_user(&pool, Some(home), system_roles::TENANT_ADMIN).await;
    let other_admin = common::create_user(&pool, Some(other), system_roles::TENANT_ADMIN).await;
    let home_token = common::token_for(&pool, &home_admin).await;
    let other_token = common::token_for(&pool, &other_admin).await;
    let app = common::test_app(pool);

    let (_, ticket) = common::send(
        app.clone(),
        Method::POST,
        "/api/college/support-tickets",
        Some(&home_token),
        Some(json!({ "subject": "Login issue", "description": "Students cannot log in" })),
    )
    .await;
    let uri = format!("/api/college/support-tickets/{}", ticket["id"].as_str().unwrap());

    let (status, _) = common::send(app.clone(), Method::GET, &uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = common::send(
        app,
        Method::GET,
        "/api/college/support-tickets",
        Some(&other_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["meta"]["total"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_resolving_a_ticket_stamps_it(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let college_admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let college_token = common::token_for(&pool, &college_admin).await;
    let platform = common::create_super_admin(&pool).await;
    let platform_token = common::token_for(&pool, &platform).await;
    let app = common::test_app(pool);

    let (_, ticket) = common::send(
        app.clone(),
        Method::POST,
        "/api/college/support-tickets",
        Some(&college_token),
        Some(json!({ "subject": "Export", "description": "Need a CSV export" })),
    )
    .await;
    let uri = format!("/api/company/support-tickets/{}", ticket["id"].as_str().unwrap());

    let (status, json) = common::send(
        app.clone(),
        Method::PUT,
        &uri,
        Some(&platform_token),
        Some(json!({ "assigned_to": college_admin.id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Tickets can only be assigned to platform administrators");

    let (status, json) = common::send(
        app,
        Method::PUT,
        &uri,
        Some(&platform_token),
        Some(json!({ "status": "resolved", "assigned_to": platform.id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "resolved");
    assert_eq!(json["assigned_to"], platform.id.to_string());
    assert!(json["resolved_at"].is_string());
}
