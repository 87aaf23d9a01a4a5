mod common;

use axum::http::{HeaderMap, Method, StatusCode};
use campusflow::campusflow_models::{TenantId, system_roles};
use serde_json::{Value, json};
use sqlx::PgPool;

async fn subdomain_of(pool: &PgPool, tenant: TenantId) -> String {
    sqlx::query_scalar("SELECT subdomain FROM tenants WHERE id = $1")
        .bind(tenant)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn get_with_host(
    app: &axum::Router,
    uri: &str,
    host: &str,
    token: Option<&str>,
) -> (StatusCode, HeaderMap, Value) {
    common::send_with_headers(
        app.clone(),
        Method::GET,
        uri,
        token,
        None,
        &[("host", host.to_string())],
    )
    .await
}

fn tagged_tenant(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-tenant-id").and_then(|v| v.to_str().ok())
}

#[sqlx::test(migrations = "./migrations")]
async fn test_subdomain_host_resolves_the_college(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    common::create_user(&pool, Some(tenant), system_roles::TEACHER).await;
    let sub = subdomain_of(&pool, tenant).await;
    let admin = common::create_super_admin(&pool).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);
    let host = format!("{sub}.campusflow.local:8080");

    let (status, headers, _) = get_with_host(&app, "/liveness", &host, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tagged_tenant(&headers), Some(tenant.to_string().as_str()));

    // A platform administrator needs no X-Tenant-ID on a college host.
    let (status, _, json) = get_with_host(&app, "/api/college/users", &host, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["meta"]["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reserved_subdomain_is_ignored(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    sqlx::query("UPDATE tenants SET subdomain = 'admin' WHERE id = $1")
        .bind(tenant)
        .execute(&pool)
        .await
        .unwrap();
    let app = common::test_app(pool);

    let (status, headers, _) = get_with_host(&app, "/liveness", "admin.campusflow.local", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tagged_tenant(&headers), None);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_custom_domain_resolves_only_once_verified(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_super_admin(&pool).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, domain) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/company/tenants/{tenant}/domains"),
        Some(&token),
        Some(json!({ "domain": "Portal.Riverdale.EDU", "is_primary": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(domain["domain"], "portal.riverdale.edu");
    assert_eq!(domain["is_verified"], false);

    let (_, headers, _) = get_with_host(&app, "/liveness", "portal.riverdale.edu", None).await;
    assert_eq!(tagged_tenant(&headers), None);

    let (status, verified) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/company/domains/{}/verify", domain["id"].as_str().unwrap()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["is_verified"], true);

    let (_, headers, _) = get_with_host(&app, "/liveness", "portal.riverdale.edu", None).await;
    assert_eq!(tagged_tenant(&headers), Some(tenant.to_string().as_str()));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_header_wins_over_host(pool: PgPool) {
    let named = common::create_tenant(&pool, "Riverdale College").await;
    let hosted = common::create_tenant(&pool, "Sunnydale College").await;
    let sub = subdomain_of(&pool, hosted).await;
    let app = common::test_app(pool);

    let (_, headers, _) = common::send_with_headers(
        app,
        Method::GET,
        "/liveness",
        None,
        None,
        &[
            ("host", format!("{sub}.campusflow.local")),
            ("x-tenant-id", named.to_string()),
        ],
    )
    .await;
    assert_eq!(tagged_tenant(&headers), Some(named.to_string().as_str()));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_college_user_on_another_college_host_is_refused(pool: PgPool) {
    let home = common::create_tenant(&pool, "Riverdale College").await;
    let other = common::create_tenant(&pool, "Sunnydale College").await;
    let sub = subdomain_of(&pool, other).await;
    let admin = common::create_user(&pool, Some(home), system_roles::TENANT_ADMIN).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, _, json) = get_with_host(
        &app,
        "/api/college/users",
        &format!("{sub}.campusflow.local"),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "TENANT_MISMATCH");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_company_manages_tenants(pool: PgPool) {
    let admin = common::create_super_admin(&pool).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, created) = common::send(
        app.clone(),
        Method::POST,
        "/api/company/tenants",
        Some(&token),
        Some(json!({
            "name": "Hillview Institute",
            "email": "office@hillview.edu",
            "subdomain": "Hillview"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["subdomain"], "hillview");
    assert_eq!(created["subscription_status"], "trial");
    assert_eq!(created["subscription_plan"], "free-trial");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, json) = common::send(
        app.clone(),
        Method::GET,
        "/api/company/tenants?search=hillview",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["meta"]["total"], 1);

    let (status, json) = common::send(
        app.clone(),
        Method::PUT,
        &format!("/api/company/tenants/{id}"),
        Some(&token),
        Some(json!({ "name": "Hillview Institute of Technology", "max_students": 75 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Hillview Institute of Technology");

    let (status, usage) = common::send(
        app.clone(),
        Method::GET,
        &format!("/api/company/tenants/{id}/usage"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(usage["students"]["max"], 75);

    let (status, _) = common::send(
        app.clone(),
        Method::DELETE,
        &format!("/api/company/tenants/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = common::send(
        app,
        Method::GET,
        &format!("/api/company/tenants/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reserved_subdomain_cannot_be_claimed(pool: PgPool) {
    let admin = common::create_super_admin(&pool).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app,
        Method::POST,
        "/api/company/tenants",
        Some(&token),
        Some(json!({
            "name": "World Wide College",
            "email": "office@www-college.edu",
            "subdomain": "www"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Subdomain 'www' is reserved");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_suspension_locks_the_college_out(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let college_admin = common::create_user(&pool, Some(tenant), system_roles::TENANT_ADMIN).await;
    let college_token = common::token_for(&pool, &college_admin).await;
    let platform = common::create_super_admin(&pool).await;
    let platform_token = common::token_for(&pool, &platform).await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/company/tenants/{tenant}/suspend"),
        Some(&platform_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_active"], false);
    assert_eq!(json["subscription_status"], "suspended");

    let (status, json) = common::send(
        app.clone(),
        Method::GET,
        "/api/college/users",
        Some(&college_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "SUBSCRIPTION_INACTIVE");

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/company/tenants/{tenant}/activate"),
        Some(&platform_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_active"], true);
    assert_eq!(json["subscription_status"], "active");

    let (status, _) = common::send(
        app,
        Method::GET,
        "/api/college/users",
        Some(&college_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_one_primary_domain(pool: PgPool) {
    let tenant = common::create_tenant(&pool, "Riverdale College").await;
    let admin = common::create_super_admin(&pool).await;
    let token = common::token_for(&pool, &admin).await;
    let app = common::test_app(pool);
    let uri = format!("/api/company/tenants/{tenant}/domains");

    for domain in ["riverdale.edu", "portal.riverdale.edu"] {
        let (status, _) = common::send(
            app.clone(),
            Method::POST,
            &uri,
            Some(&token),
            Some(json!({ "domain": domain, "is_primary": true })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        &uri,
        Some(&token),
        Some(json!({ "domain": "RIVERDALE.EDU." })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Domain is already registered");

    let (status, json) = common::send(app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let primaries: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .filter(|d| d["is_primary"] == true)
        .map(|d| d["domain"].as_str().unwrap())
        .collect();
    assert_eq!(primaries, ["portal.riverdale.edu"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_company_dashboard_counts_tenants_and_users(pool: PgPool) {
    let live = common::create_tenant(&pool, "Riverdale College").await;
    let lapsed = common::create_tenant(&pool, "Sunnydale College").await;
    common::expire_tenant(&pool, lapsed).await;
    let college_admin = common::create_user(&pool, Some(live), system_roles::TENANT_ADMIN).await;
    common::create_user(&pool, Some(live), system_roles::STUDENT).await;
    let platform = common::create_super_admin(&pool).await;
    let platform_token = common::token_for(&pool, &platform).await;
    let college_token = common::token_for(&pool, &college_admin).await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app.clone(),
        Method::GET,
        "/api/company/dashboard",
        Some(&platform_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tenants"]["total"], 2);
    assert_eq!(json["tenants"]["active"], 1);
    assert_eq!(json["tenants"]["trial"], 1);
    assert_eq!(json["tenants"]["paid"], 0);
    assert_eq!(json["users"]["total"], 3);
    assert!(json["revenue_this_month"].is_string());

    let (status, _) = common::send(
        app,
        Method::GET,
        "/api/company/dashboard",
        Some(&college_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
