use campusflow::campusflow_core::permissions;
use campusflow::campusflow_models::{Claims, RoleName};
use campusflow::middleware::access::is_public_path;
use campusflow::middleware::auth::AuthUser;
use uuid::Uuid;

fn create_test_auth_user(role: Option<&str>, permissions: &[&str]) -> AuthUser {
    AuthUser(Claims {
        sub: "00000000-0000-0000-0000-000000000000".to_string(),
        email: "test@riverdale.edu".to_string(),
        tenant_id: Some(Uuid::from_u128(42)),
        role: role.map(str::to_string),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        exp: 9999999999,
        iat: 1234567890,
    })
}

#[test]
fn test_role_parsed_from_claims() {
    let user = create_test_auth_user(Some("department_admin"), &[]);
    assert_eq!(user.role(), Some(RoleName::DepartmentAdmin));
    assert!(!user.is_super_admin());

    let user = create_test_auth_user(Some("janitor"), &[]);
    assert_eq!(user.role(), None);

    let user = create_test_auth_user(None, &[]);
    assert_eq!(user.role(), None);
}

#[test]
fn test_permission_checks() {
    let user = create_test_auth_user(
        Some("teacher"),
        &[permissions::ATTENDANCE_MANAGE, permissions::REPORTS_VIEW],
    );
    assert!(user.has_permission(permissions::ATTENDANCE_MANAGE));
    assert!(!user.has_permission(permissions::BILLING_MANAGE));
    assert!(user.has_any_permission(&[permissions::BILLING_MANAGE, permissions::REPORTS_VIEW]));
    assert!(!user.has_any_permission(&[]));
}

#[test]
fn test_super_admin_holds_every_permission() {
    let user = create_test_auth_user(Some("super_admin"), &[]);
    assert!(user.is_super_admin());
    for permission in permissions::ALL {
        assert!(user.has_permission(permission));
    }
}

#[test]
fn test_user_id_must_be_a_uuid() {
    let mut user = create_test_auth_user(Some("student"), &[]);
    assert!(user.user_id().is_ok());

    user.0.sub = "not-a-uuid".to_string();
    let err = user.user_id().unwrap_err();
    assert_eq!(err.status.as_u16(), 401);
}

#[test]
fn test_public_paths() {
    assert!(is_public_path("/"));
    assert!(is_public_path("/api/auth/login"));
    assert!(is_public_path("/api/pricing"));
    assert!(is_public_path("/api/pricing/standard"));
    assert!(!is_public_path("/api/pricingx"));
    assert!(!is_public_path("/api/college/departments"));
}

#[test]
fn test_every_role_reaches_its_account() {
    for role in [
        RoleName::TenantAdmin,
        RoleName::DepartmentAdmin,
        RoleName::Teacher,
        RoleName::Student,
        RoleName::Parent,
    ] {
        assert!(role.can_access("/api/account/profile"), "{role}");
        assert!(!role.can_access("/api/company/tenants"), "{role}");
    }
}

#[test]
fn test_tenant_admin_portals() {
    let role = RoleName::TenantAdmin;
    assert!(role.can_access("/api/college/departments"));
    assert!(role.can_access("/api/billing/invoices"));
    assert!(role.can_access("/api/subscription/checkout"));
    assert!(!role.can_access("/api/teacher/classes"));
    assert!(!role.can_access("/api/dept/teachers"));
}
