//! System roles, default plans and super admin accounts.
//!
//! Migrations already insert the same rows; these upserts restore them after
//! manual edits and keep the fixed ids stable.

use campusflow_models::{PlanId, PlanType, RoleId, RoleName, system_roles};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

use crate::CliResult;

/// Capability flags, in column order: tenants, users, departments, subjects,
/// attendance, assessments, reports, billing.
type Flags = [bool; 8];

pub struct RoleDef {
    pub name: RoleName,
    pub display_name: &'static str,
    pub description: &'static str,
    pub scope_level: i32,
    pub flags: Flags,
}

pub const ROLES: [RoleDef; 6] = [
    RoleDef {
        name: RoleName::SuperAdmin,
        display_name: "Super Administrator",
        description: "Full system access across every tenant and platform configuration",
        scope_level: 1,
        flags: [true; 8],
    },
    RoleDef {
        name: RoleName::TenantAdmin,
        display_name: "College Administrator",
        description: "Full access within their college",
        scope_level: 2,
        flags: [false, true, true, true, true, true, true, true],
    },
    RoleDef {
        name: RoleName::DepartmentAdmin,
        display_name: "Department Administrator (HOD)",
        description: "Manages a department with its teachers and students",
        scope_level: 3,
        flags: [false, true, false, true, true, true, true, false],
    },
    RoleDef {
        name: RoleName::Teacher,
        display_name: "Teacher",
        description: "Manages assigned classes, attendance and assessments",
        scope_level: 4,
        flags: [false, false, false, false, true, true, true, false],
    },
    RoleDef {
        name: RoleName::Student,
        display_name: "Student",
        description: "Views own attendance, grades and assignments",
        scope_level: 5,
        flags: [false, false, false, false, false, false, true, false],
    },
    RoleDef {
        name: RoleName::Parent,
        display_name: "Parent/Guardian",
        description: "Views linked children's attendance, grades and fees",
        scope_level: 5,
        flags: [false, false, false, false, false, false, true, false],
    },
];

/// Upserts the six roles; returns how many rows were written.
pub async fn init_roles(db: &PgPool) -> CliResult<usize> {
    let mut tx = db.begin().await?;
    for role in &ROLES {
        let [tenants, users, departments, subjects, attendance, assessments, reports, billing] =
            role.flags;
        sqlx::query(
            "INSERT INTO roles (id, name, display_name, description, scope_level,
                can_manage_tenants, can_manage_users, can_manage_departments, can_manage_subjects,
                can_manage_attendance, can_manage_assessments, can_view_reports, can_manage_billing)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             ON CONFLICT (name) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                description = EXCLUDED.description,
                scope_level = EXCLUDED.scope_level,
                can_manage_tenants = EXCLUDED.can_manage_tenants,
                can_manage_users = EXCLUDED.can_manage_users,
                can_manage_departments = EXCLUDED.can_manage_departments,
                can_manage_subjects = EXCLUDED.can_manage_subjects,
                can_manage_attendance = EXCLUDED.can_manage_attendance,
                can_manage_assessments = EXCLUDED.can_manage_assessments,
                can_view_reports = EXCLUDED.can_view_reports,
                can_manage_billing = EXCLUDED.can_manage_billing,
                updated_at = NOW()",
        )
        .bind(system_roles::id_for(role.name))
        .bind(role.name)
        .bind(role.display_name)
        .bind(role.description)
        .bind(role.scope_level)
        .bind(tenants)
        .bind(users)
        .bind(departments)
        .bind(subjects)
        .bind(attendance)
        .bind(assessments)
        .bind(reports)
        .bind(billing)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(ROLES.len())
}

pub struct PlanDef {
    pub id: u128,
    pub name: &'static str,
    pub slug: &'static str,
    pub plan_type: PlanType,
    pub description: &'static str,
    pub price: Decimal,
    /// students, teachers, departments, storage GB
    pub limits: [i32; 4],
    /// sms, email, api, custom domain, white label, analytics, advanced reports, parent portal
    pub features: [bool; 8],
    pub trial_days: i32,
    pub is_popular: bool,
    pub display_order: i32,
}

pub fn default_plans() -> [PlanDef; 5] {
    [
        PlanDef {
            id: 0x101,
            name: "Free Trial",
            slug: "free-trial",
            plan_type: PlanType::Free,
            description: "Try the platform free for 14 days with basic features",
            price: dec!(0.00),
            limits: [50, 5, 2, 5],
            features: [false, true, false, false, false, false, false, false],
            trial_days: 14,
            is_popular: false,
            display_order: 1,
        },
        PlanDef {
            id: 0x102,
            name: "Basic Plan",
            slug: "basic",
            plan_type: PlanType::Basic,
            description: "For small institutions getting started",
            price: dec!(49.99),
            limits: [100, 10, 3, 10],
            features: [false, true, false, false, false, true, false, true],
            trial_days: 14,
            is_popular: false,
            display_order: 2,
        },
        PlanDef {
            id: 0x103,
            name: "Standard Plan",
            slug: "standard",
            plan_type: PlanType::Standard,
            description: "For growing institutions",
            price: dec!(99.99),
            limits: [500, 50, 10, 50],
            features: [true, true, true, false, false, true, true, true],
            trial_days: 14,
            is_popular: true,
            display_order: 3,
        },
        PlanDef {
            id: 0x104,
            name: "Premium Plan",
            slug: "premium",
            plan_type: PlanType::Premium,
            description: "Advanced features for large institutions",
            price: dec!(199.99),
            limits: [2000, 200, 25, 200],
            features: [true; 8],
            trial_days: 14,
            is_popular: false,
            display_order: 4,
        },
        PlanDef {
            id: 0x105,
            name: "Enterprise Plan",
            slug: "enterprise",
            plan_type: PlanType::Enterprise,
            description: "Every feature with dedicated support",
            price: dec!(499.99),
            limits: [10000, 1000, 100, 1000],
            features: [true; 8],
            trial_days: 30,
            is_popular: false,
            display_order: 5,
        },
    ]
}

/// Upserts the five default plans by slug.
pub async fn init_plans(db: &PgPool) -> CliResult<usize> {
    let plans = default_plans();
    let mut tx = db.begin().await?;
    for plan in &plans {
        let [students, teachers, departments, storage] = plan.limits;
        let [sms, email, api, domain, white_label, analytics, reports, parents] = plan.features;
        sqlx::query(
            "INSERT INTO subscription_plans (id, name, slug, plan_type, description, price,
                billing_period, max_students, max_teachers, max_departments, max_storage_gb,
                enable_sms, enable_email, enable_api_access, enable_custom_domain,
                enable_white_label, enable_analytics, enable_advanced_reports,
                enable_parent_portal, trial_days, is_popular, display_order)
             VALUES ($1, $2, $3, $4, $5, $6, 'monthly', $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
             ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                plan_type = EXCLUDED.plan_type,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                max_students = EXCLUDED.max_students,
                max_teachers = EXCLUDED.max_teachers,
                max_departments = EXCLUDED.max_departments,
                max_storage_gb = EXCLUDED.max_storage_gb,
                enable_sms = EXCLUDED.enable_sms,
                enable_email = EXCLUDED.enable_email,
                enable_api_access = EXCLUDED.enable_api_access,
                enable_custom_domain = EXCLUDED.enable_custom_domain,
                enable_white_label = EXCLUDED.enable_white_label,
                enable_analytics = EXCLUDED.enable_analytics,
                enable_advanced_reports = EXCLUDED.enable_advanced_reports,
                enable_parent_portal = EXCLUDED.enable_parent_portal,
                trial_days = EXCLUDED.trial_days,
                is_popular = EXCLUDED.is_popular,
                display_order = EXCLUDED.display_order,
                updated_at = NOW()",
        )
        .bind(PlanId::from_u128(plan.id))
        .bind(plan.name)
        .bind(plan.slug)
        .bind(plan.plan_type)
        .bind(plan.description)
        .bind(plan.price)
        .bind(students)
        .bind(teachers)
        .bind(departments)
        .bind(storage)
        .bind(sms)
        .bind(email)
        .bind(api)
        .bind(domain)
        .bind(white_label)
        .bind(analytics)
        .bind(reports)
        .bind(parents)
        .bind(plan.trial_days)
        .bind(plan.is_popular)
        .bind(plan.display_order)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(plans.len())
}

/// Creates a platform-level user with the super admin role and no tenant.
pub async fn create_super_admin(
    db: &PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> CliResult<Uuid> {
    let email = campusflow_models::Email::new(email)?;
    let hashed = campusflow_core::hash_password(password)
        .map_err(|e| format!("Failed to hash password: {}", e.message()))?;

    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (first_name, last_name, email, password, tenant_id, role_id)
         VALUES ($1, $2, $3, $4, NULL, $5)
         ON CONFLICT (email) DO NOTHING
         RETURNING id",
    )
    .bind(first_name)
    .bind(last_name)
    .bind(&email)
    .bind(&hashed)
    .bind(system_roles::SUPER_ADMIN)
    .fetch_optional(db)
    .await?;

    id.ok_or_else(|| format!("A user with email {email} already exists").into())
}

/// Fixed role id for `name`, for callers that only have the text.
pub fn role_id(name: &str) -> Option<RoleId> {
    name.parse::<RoleName>().ok().map(system_roles::id_for)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_table_covers_every_role_once() {
        for name in RoleName::ALL {
            assert_eq!(ROLES.iter().filter(|r| r.name == *name).count(), 1);
        }
        assert_eq!(role_id("teacher"), Some(system_roles::TEACHER));
        assert_eq!(role_id("janitor"), None);
    }

    #[test]
    fn plans_are_ordered_and_priced() {
        let plans = default_plans();
        let slugs: Vec<_> = plans.iter().map(|p| p.slug).collect();
        assert_eq!(slugs, ["free-trial", "basic", "standard", "premium", "enterprise"]);
        assert!(plans.windows(2).all(|w| w[0].price < w[1].price));
        assert_eq!(plans.iter().filter(|p| p.is_popular).count(), 1);
        assert_eq!(plans[4].trial_days, 30);
    }
}
