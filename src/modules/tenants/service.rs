use std::collections::HashSet;

use anyhow::anyhow;
use campusflow_cache::{RedisCache, invalidate};
use campusflow_config::TenancyConfig;
use campusflow_core::{
    AppError, Paginated,
    codes::{slugify, slugify_unique},
};
use campusflow_models::{SubscriptionPlan, SubscriptionStatus, Tenant, TenantDomain, TenantId};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::metrics::{track_subscription_event, track_tenant_created};
use crate::modules::auth::model::TRIAL_PLAN_SLUG;
use crate::modules::tenants::model::{
    CompanyDashboard, CreateDomainDto, CreateTenantDto, TenantCounts, TenantFilterParams,
    TenantUsage, UpdateTenantDto, UserCounts,
};
use crate::utils::db::unique_violation;

pub struct TenantService;

impl TenantService {
    /// Slug for `name` not yet used by any tenant.
    pub async fn available_slug(db: &PgPool, name: &str) -> Result<String, AppError> {
        let base = slugify(name);
        let taken: HashSet<String> =
            sqlx::query_scalar::<_, String>("SELECT slug FROM tenants WHERE slug LIKE $1 || '%'")
                .bind(&base)
                .fetch_all(db)
                .await?
                .into_iter()
                .collect();

        Ok(slugify_unique(name, |candidate| taken.contains(candidate)))
    }

    /// Subdomain for a new tenant: the requested one, slugified, else the slug.
    pub fn pick_subdomain(
        requested: Option<&str>,
        slug: &str,
        tenancy: &TenancyConfig,
    ) -> Result<String, AppError> {
        let subdomain = requested.map(slugify).unwrap_or_else(|| slug.to_string());
        if subdomain.is_empty() {
            return Err(AppError::bad_request(anyhow!("Subdomain is invalid")));
        }
        if tenancy.is_reserved(&subdomain) {
            return Err(AppError::bad_request(anyhow!(
                "Subdomain '{subdomain}' is reserved"
            )));
        }
        Ok(subdomain)
    }

    /// Creates a tenant on `dto.plan` (default the free trial) together with
    /// its trial subscription.
    #[instrument(skip(db, tenancy, dto), fields(db.table = "tenants", db.operation = "INSERT", tenant.name = %dto.name))]
    pub async fn create_tenant(
        db: &PgPool,
        tenancy: &TenancyConfig,
        dto: CreateTenantDto,
    ) -> Result<Tenant, AppError> {
        let slug = Self::available_slug(db, &dto.name).await?;
        let subdomain = Self::pick_subdomain(dto.subdomain.as_deref(), &slug, tenancy)?;

        let plan_slug = dto.plan.as_deref().unwrap_or(TRIAL_PLAN_SLUG);
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans WHERE slug = $1 AND is_active = TRUE",
        )
        .bind(plan_slug)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::bad_request(anyhow!("Unknown plan '{plan_slug}'")))?;

        let now = Utc::now();
        let trial_end = now + Duration::days(i64::from(plan.trial_days));

        let mut tx = db.begin().await?;

        let tenant = sqlx::query_as::<_, Tenant>(
            r#"INSERT INTO tenants
                   (name, slug, subdomain, email, phone, website, city, state, country,
                    subscription_status, subscription_plan, subscription_start_date, trial_end_date,
                    max_students, max_teachers, max_departments, max_storage_gb)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'trial', $10, $11, $12, $13, $14, $15, $16)
               RETURNING *"#,
        )
        .bind(&dto.name)
        .bind(&slug)
        .bind(&subdomain)
        .bind(&dto.email)
        .bind(&dto.phone)
        .bind(&dto.website)
        .bind(&dto.city)
        .bind(&dto.state)
        .bind(&dto.country)
        .bind(&plan.slug)
        .bind(now.date_naive())
        .bind(trial_end.date_naive())
        .bind(plan.max_students)
        .bind(plan.max_teachers)
        .bind(plan.max_departments)
        .bind(plan.max_storage_gb)
        .fetch_one(&mut *tx)
        .await
        .map_err(unique_violation(
            "A college with this name or subdomain already exists",
        ))?;

        sqlx::query(
            r#"INSERT INTO tenant_subscriptions
                   (tenant_id, plan_id, status, start_date, trial_end_date, next_billing_date)
               VALUES ($1, $2, 'trial', $3, $4, $4)"#,
        )
        .bind(tenant.id)
        .bind(plan.id)
        .bind(now)
        .bind(trial_end)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(tenant.id = %tenant.id, tenant.slug = %tenant.slug, "Tenant created");
        track_tenant_created("company");
        track_subscription_event("trial_started", &plan.slug);

        Ok(tenant)
    }

    #[instrument(skip(db), fields(db.table = "tenants", db.operation = "SELECT"))]
    pub async fn list_tenants(
        db: &PgPool,
        filters: TenantFilterParams,
    ) -> Result<Paginated<Tenant>, AppError> {
        const WHERE: &str = r#"
            WHERE ($1::text IS NULL
                   OR name ILIKE '%' || $1 || '%'
                   OR slug ILIKE '%' || $1 || '%'
                   OR email ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR subscription_status = $2)
              AND ($3::boolean IS NULL OR is_active = $3)"#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM tenants{WHERE}"))
            .bind(&filters.search)
            .bind(filters.subscription_status)
            .bind(filters.is_active)
            .fetch_one(db)
            .await?;

        let tenants = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT * FROM tenants{WHERE} ORDER BY created_at DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(&filters.search)
        .bind(filters.subscription_status)
        .bind(filters.is_active)
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(tenants, total, &filters.pagination))
    }

    #[instrument(skip(db), fields(db.table = "tenants", db.operation = "SELECT"))]
    pub async fn get_tenant(db: &PgPool, tenant_id: TenantId) -> Result<Tenant, AppError> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Tenant not found")))
    }

    #[instrument(skip(db, cache, dto), fields(db.table = "tenants", db.operation = "UPDATE"))]
    pub async fn update_tenant(
        db: &PgPool,
        cache: Option<&RedisCache>,
        tenant_id: TenantId,
        dto: UpdateTenantDto,
    ) -> Result<Tenant, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"UPDATE tenants SET
                   name = COALESCE($2, name),
                   email = COALESCE($3, email),
                   phone = COALESCE($4, phone),
                   website = COALESCE($5, website),
                   address_line1 = COALESCE($6, address_line1),
                   address_line2 = COALESCE($7, address_line2),
                   city = COALESCE($8, city),
                   state = COALESCE($9, state),
                   country = COALESCE($10, country),
                   postal_code = COALESCE($11, postal_code),
                   primary_color = COALESCE($12, primary_color),
                   secondary_color = COALESCE($13, secondary_color),
                   timezone = COALESCE($14, timezone),
                   date_format = COALESCE($15, date_format),
                   currency = COALESCE($16, currency),
                   max_students = COALESCE($17, max_students),
                   max_teachers = COALESCE($18, max_teachers),
                   max_departments = COALESCE($19, max_departments),
                   max_storage_gb = COALESCE($20, max_storage_gb),
                   subscription_status = COALESCE($21, subscription_status),
                   subscription_end_date = COALESCE($22, subscription_end_date),
                   onboarding_completed = COALESCE($23, onboarding_completed),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(&dto.name)
        .bind(&dto.email)
        .bind(&dto.phone)
        .bind(&dto.website)
        .bind(&dto.address_line1)
        .bind(&dto.address_line2)
        .bind(&dto.city)
        .bind(&dto.state)
        .bind(&dto.country)
        .bind(&dto.postal_code)
        .bind(&dto.primary_color)
        .bind(&dto.secondary_color)
        .bind(&dto.timezone)
        .bind(&dto.date_format)
        .bind(&dto.currency)
        .bind(dto.max_students)
        .bind(dto.max_teachers)
        .bind(dto.max_departments)
        .bind(dto.max_storage_gb)
        .bind(dto.subscription_status)
        .bind(dto.subscription_end_date)
        .bind(dto.onboarding_completed)
        .fetch_optional(db)
        .await
        .map_err(unique_violation("A college with this name already exists"))?
        .ok_or_else(|| AppError::not_found(anyhow!("Tenant not found")))?;

        invalidate::tenant(cache, tenant_id.into_inner()).await;
        Ok(tenant)
    }

    #[instrument(skip(db, cache), fields(db.table = "tenants", db.operation = "DELETE"))]
    pub async fn delete_tenant(
        db: &PgPool,
        cache: Option<&RedisCache>,
        tenant_id: TenantId,
    ) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .execute(db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Tenant not found")));
        }

        invalidate::tenant(cache, tenant_id.into_inner()).await;
        Ok(())
    }

    /// Suspends or reactivates a tenant. Suspension also marks the
    /// subscription status, and reactivation lifts only that status.
    #[instrument(skip(db, cache), fields(db.table = "tenants", db.operation = "UPDATE"))]
    pub async fn set_active(
        db: &PgPool,
        cache: Option<&RedisCache>,
        tenant_id: TenantId,
        active: bool,
    ) -> Result<Tenant, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"UPDATE tenants SET
                   is_active = $2,
                   subscription_status = CASE
                       WHEN $2 = FALSE THEN $3
                       WHEN subscription_status = $3 THEN $4
                       ELSE subscription_status
                   END,
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(active)
        .bind(SubscriptionStatus::Suspended)
        .bind(SubscriptionStatus::Active)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Tenant not found")))?;

        info!(tenant.id = %tenant_id, tenant.active = active, "Tenant status changed");
        invalidate::tenant(cache, tenant_id.into_inner()).await;
        Ok(tenant)
    }

    pub async fn usage(db: &PgPool, tenant_id: TenantId) -> Result<TenantUsage, AppError> {
        let tenant = Self::get_tenant(db, tenant_id).await?;
        Ok(TenantUsage::from(&tenant))
    }

    #[instrument(skip(db), fields(db.table = "tenant_domains", db.operation = "SELECT"))]
    pub async fn list_domains(
        db: &PgPool,
        tenant_id: TenantId,
    ) -> Result<Vec<TenantDomain>, AppError> {
        Self::get_tenant(db, tenant_id).await?;
        let domains = sqlx::query_as::<_, TenantDomain>(
            "SELECT * FROM tenant_domains WHERE tenant_id = $1 ORDER BY is_primary DESC, domain",
        )
        .bind(tenant_id)
        .fetch_all(db)
        .await?;
        Ok(domains)
    }

    /// Registers a custom domain. A primary domain demotes the others.
    #[instrument(skip(db, cache, dto), fields(db.table = "tenant_domains", db.operation = "INSERT"))]
    pub async fn add_domain(
        db: &PgPool,
        cache: Option<&RedisCache>,
        tenant_id: TenantId,
        dto: CreateDomainDto,
    ) -> Result<TenantDomain, AppError> {
        Self::get_tenant(db, tenant_id).await?;
        let mut tx = db.begin().await?;

        if dto.is_primary {
            sqlx::query(
                "UPDATE tenant_domains SET is_primary = FALSE, updated_at = NOW() WHERE tenant_id = $1",
            )
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?;
        }

        let domain = sqlx::query_as::<_, TenantDomain>(
            r#"INSERT INTO tenant_domains (tenant_id, domain, is_primary)
               VALUES ($1, $2, $3)
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(dto.normalized_domain())
        .bind(dto.is_primary)
        .fetch_one(&mut *tx)
        .await
        .map_err(unique_violation("Domain is already registered"))?;

        tx.commit().await?;
        invalidate::tenant(cache, tenant_id.into_inner()).await;
        Ok(domain)
    }

    #[instrument(skip(db, cache), fields(db.table = "tenant_domains", db.operation = "UPDATE"))]
    pub async fn verify_domain(
        db: &PgPool,
        cache: Option<&RedisCache>,
        domain_id: Uuid,
    ) -> Result<TenantDomain, AppError> {
        let domain = sqlx::query_as::<_, TenantDomain>(
            "UPDATE tenant_domains SET is_verified = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(domain_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Domain not found")))?;

        invalidate::tenant(cache, domain.tenant_id.into_inner()).await;
        Ok(domain)
    }

    #[instrument(skip(db, cache), fields(db.table = "tenant_domains", db.operation = "DELETE"))]
    pub async fn delete_domain(
        db: &PgPool,
        cache: Option<&RedisCache>,
        domain_id: Uuid,
    ) -> Result<(), AppError> {
        let tenant_id = sqlx::query_scalar::<_, TenantId>(
            "DELETE FROM tenant_domains WHERE id = $1 RETURNING tenant_id",
        )
        .bind(domain_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Domain not found")))?;

        invalidate::tenant(cache, tenant_id.into_inner()).await;
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn dashboard(db: &PgPool) -> Result<CompanyDashboard, AppError> {
        let (total, active, trial, paid) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"SELECT COUNT(*),
                      COUNT(*) FILTER (WHERE is_active),
                      COUNT(*) FILTER (WHERE subscription_status = 'trial'),
                      COUNT(*) FILTER (WHERE subscription_status = 'active')
               FROM tenants"#,
        )
        .fetch_one(db)
        .await?;

        let (users_total, users_active) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM users",
        )
        .fetch_one(db)
        .await?;

        let revenue_this_month = sqlx::query_scalar::<_, Decimal>(
            r#"SELECT COALESCE(SUM(amount), 0) FROM payments
               WHERE status = 'succeeded'
                 AND payment_date >= date_trunc('month', NOW())"#,
        )
        .fetch_one(db)
        .await?;

        Ok(CompanyDashboard {
            tenants: TenantCounts {
                total,
                active,
                trial,
                paid,
            },
            users: UserCounts {
                total: users_total,
                active: users_active,
            },
            revenue_this_month,
        })
    }
}
