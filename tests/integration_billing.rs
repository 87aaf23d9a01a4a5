mod common;

use axum::{
    Router,
    http::{Method, StatusCode},
};
use campusflow::campusflow_models::{TenantId, system_roles};
use serde_json::{Value, json};
use sqlx::PgPool;

struct College {
    tenant: TenantId,
    token: String,
}

async fn college(pool: &PgPool) -> College {
    let tenant = common::create_tenant(pool, "Riverdale College").await;
    let admin = common::create_user(pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let token = common::token_for(pool, &admin).await;
    College { tenant, token }
}

async fn checkout(app: &Router, token: &str, body: Value) -> (StatusCode, Value) {
    common::send(
        app.clone(),
        Method::POST,
        "/api/subscription/checkout",
        Some(token),
        Some(body),
    )
    .await
}

async fn super_admin_token(pool: &PgPool) -> String {
    let admin = common::create_super_admin(pool).await;
    common::token_for(pool, &admin).await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_first_checkout_starts_a_trial_and_applies_the_plan(pool: PgPool) {
    let college = college(&pool).await;
    let app = common::test_app(pool.clone());

    let (status, json) = checkout(&app, &college.token, json!({ "plan_slug": "standard" })).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["subscription"]["status"], "trial");
    assert_eq!(json["amount"], "99.99");
    assert_eq!(json["payment"]["status"], "succeeded");
    assert!(
        json["payment"]["transaction_id"]
            .as_str()
            .unwrap()
            .starts_with("TXN-")
    );
    assert_eq!(json["invoice"]["status"], "paid");

    let (plan, max_students): (Option<String>, i32) = sqlx::query_as(
        "SELECT subscription_plan, max_students FROM tenants WHERE id = $1",
    )
    .bind(college.tenant)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(plan.as_deref(), Some("standard"));
    assert_eq!(max_students, 500);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_returning_customer_skips_the_trial(pool: PgPool) {
    let college = college(&pool).await;
    let app = common::test_app(pool);

    checkout(&app, &college.token, json!({ "plan_slug": "standard" })).await;
    let (status, json) = checkout(&app, &college.token, json!({ "plan_slug": "basic" })).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["subscription"]["status"], "active");
    assert!(json["subscription"]["trial_end_date"].is_null());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_checkout_unknown_plan(pool: PgPool) {
    let college = college(&pool).await;
    let app = common::test_app(pool);

    let (status, _) = checkout(&app, &college.token, json!({ "plan_slug": "platinum" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_coupon_discounts_checkout_once_per_tenant(pool: PgPool) {
    let college = college(&pool).await;
    let platform = super_admin_token(&pool).await;
    let app = common::test_app(pool.clone());

    let (status, coupon) = common::send(
        app.clone(),
        Method::POST,
        "/api/company/coupons",
        Some(&platform),
        Some(json!({
            "code": "welcome20",
            "name": "Welcome offer",
            "discount_type": "fixed",
            "discount_value": "20.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(coupon["code"], "WELCOME20");

    let (status, quote) = common::send(
        app.clone(),
        Method::POST,
        "/api/billing/coupons/validate",
        Some(&college.token),
        Some(json!({ "code": "welcome20", "plan_slug": "standard" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["final_amount"], "79.99");

    let (status, json) = checkout(
        &app,
        &college.token,
        json!({ "plan_slug": "standard", "coupon_code": "WELCOME20" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["amount"], "79.99");
    assert_eq!(json["discount"], "20.00");

    let times_used: i32 = sqlx::query_scalar("SELECT times_used FROM coupons WHERE code = 'WELCOME20'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(times_used, 1);

    let (status, _) = checkout(
        &app,
        &college.token,
        json!({ "plan_slug": "premium", "coupon_code": "WELCOME20" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_checkouts_respect_coupon_limit(pool: PgPool) {
    let first = college(&pool).await;
    let second = college(&pool).await;
    let platform = super_admin_token(&pool).await;
    let app = common::test_app(pool.clone());

    let (status, _) = common::send(
        app.clone(),
        Method::POST,
        "/api/company/coupons",
        Some(&platform),
        Some(json!({
            "code": "LASTSEAT",
            "name": "Last seat",
            "discount_type": "fixed",
            "discount_value": "10.00",
            "max_uses": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let body = json!({ "plan_slug": "standard", "coupon_code": "LASTSEAT" });
    let ((a, _), (b, _)) = tokio::join!(
        checkout(&app, &first.token, body.clone()),
        checkout(&app, &second.token, body.clone()),
    );

    let mut statuses = [a, b];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    let times_used: i32 =
        sqlx::query_scalar("SELECT times_used FROM coupons WHERE code = 'LASTSEAT'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(times_used, 1);

    let usages: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM coupon_usages u JOIN coupons c ON c.id = u.coupon_id WHERE c.code = 'LASTSEAT'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(usages, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_upgrade_during_trial(pool: PgPool) {
    let college = college(&pool).await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/subscription/change-plan",
        Some(&college.token),
        Some(json!({ "plan_slug": "standard" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["plan"]["slug"], "standard");
    assert_eq!(json["is_trial"], true);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_change_to_current_plan_is_rejected(pool: PgPool) {
    let college = college(&pool).await;
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app,
        Method::POST,
        "/api/subscription/change-plan",
        Some(&college.token),
        Some(json!({ "plan_slug": "free-trial" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_downgrade_must_fit_current_usage(pool: PgPool) {
    let college = college(&pool).await;
    let app = common::test_app(pool.clone());

    checkout(&app, &college.token, json!({ "plan_slug": "standard" })).await;
    let (_, json) = checkout(&app, &college.token, json!({ "plan_slug": "premium" })).await;
    assert_eq!(json["subscription"]["status"], "active");

    sqlx::query("UPDATE tenants SET current_students = 150 WHERE id = $1")
        .bind(college.tenant)
        .execute(&pool)
        .await
        .unwrap();

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        "/api/subscription/change-plan",
        Some(&college.token),
        Some(json!({ "plan_slug": "basic" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "PLAN_LIMITS_EXCEEDED");

    sqlx::query("UPDATE tenants SET current_students = 50, current_storage_gb = 12.5 WHERE id = $1")
        .bind(college.tenant)
        .execute(&pool)
        .await
        .unwrap();

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        "/api/subscription/change-plan",
        Some(&college.token),
        Some(json!({ "plan_slug": "basic" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "PLAN_LIMITS_EXCEEDED");

    sqlx::query("UPDATE tenants SET current_storage_gb = 9.5 WHERE id = $1")
        .bind(college.tenant)
        .execute(&pool)
        .await
        .unwrap();

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/subscription/change-plan",
        Some(&college.token),
        Some(json!({ "plan_slug": "basic" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["plan"]["slug"], "basic");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cancel_at_period_end_keeps_access(pool: PgPool) {
    let college = college(&pool).await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        "/api/subscription/cancel",
        Some(&college.token),
        Some(json!({ "reason": "Budget", "feedback": "Too expensive" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "trial");
    assert_eq!(json["cancel_at_period_end"], true);
    assert_eq!(json["cancellation_reason"], "Budget - Too expensive");

    let (status, _) = common::send(
        app,
        Method::GET,
        "/api/college/users",
        Some(&college.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_immediate_cancel_gates_the_college_until_checkout(pool: PgPool) {
    let college = college(&pool).await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        "/api/subscription/cancel",
        Some(&college.token),
        Some(json!({ "cancel_immediately": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "cancelled");

    let (status, json) = common::send(
        app.clone(),
        Method::GET,
        "/api/college/users",
        Some(&college.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "SUBSCRIPTION_INACTIVE");

    let (status, _) = common::send(
        app.clone(),
        Method::POST,
        "/api/subscription/cancel",
        Some(&college.token),
        Some(json!({ "cancel_immediately": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = checkout(&app, &college.token, json!({ "plan_slug": "basic" })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) =
        common::send(app, Method::GET, "/api/college/users", Some(&college.token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refunds_cannot_exceed_the_payment(pool: PgPool) {
    let college = college(&pool).await;
    let platform = super_admin_token(&pool).await;
    let app = common::test_app(pool);

    let (_, json) = checkout(&app, &college.token, json!({ "plan_slug": "standard" })).await;
    let payment_id = json["payment"]["id"].as_str().unwrap().to_string();
    let refund_uri = format!("/api/company/payments/{payment_id}/refund");

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        &refund_uri,
        Some(&platform),
        Some(json!({ "amount": "50.00", "reason": "Goodwill" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "partially_refunded");

    let (status, _) = common::send(
        app.clone(),
        Method::POST,
        &refund_uri,
        Some(&platform),
        Some(json!({ "amount": "60.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = common::send(
        app,
        Method::POST,
        &refund_uri,
        Some(&platform),
        Some(json!({ "amount": "49.99" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "refunded");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_tenant_sees_only_its_own_invoices(pool: PgPool) {
    let first = college(&pool).await;
    let second = college(&pool).await;
    let app = common::test_app(pool);

    let (_, json) = checkout(&app, &first.token, json!({ "plan_slug": "standard" })).await;
    let invoice_id = json["invoice"]["id"].as_str().unwrap().to_string();

    let (status, json) = common::send(
        app.clone(),
        Method::GET,
        "/api/billing/invoices",
        Some(&first.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["meta"]["total"], 1);

    let (status, _) = common::send(
        app,
        Method::GET,
        &format!("/api/billing/invoices/{invoice_id}"),
        Some(&second.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_plan_in_use_cannot_be_deleted(pool: PgPool) {
    let platform = super_admin_token(&pool).await;
    common::create_tenant(&pool, "Riverdale College").await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app,
        Method::DELETE,
        &format!("/api/company/plans/{}", common::TRIAL_PLAN_ID),
        Some(&platform),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Plan is in use by subscriptions; deactivate it instead");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_new_plan_appears_in_pricing(pool: PgPool) {
    let platform = super_admin_token(&pool).await;
    let app = common::test_app(pool);

    let (status, plan) = common::send(
        app.clone(),
        Method::POST,
        "/api/company/plans",
        Some(&platform),
        Some(json!({
            "name": "Campus Plus",
            "plan_type": "standard",
            "price": "149.00",
            "billing_period": "annually",
            "max_students": 800,
            "max_teachers": 80,
            "max_departments": 12,
            "max_storage_gb": 80
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(plan["slug"], "campus-plus");

    let (status, json) = common::send(app, Method::GET, "/api/pricing/campus-plus", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Campus Plus");
}
