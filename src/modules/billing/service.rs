//! Plans, tenant subscriptions, payments, invoices and coupons.
//!
//! Every write that changes a subscription's status also writes the
//! tenant's `subscription_status` and `is_active` in the same transaction,
//! then drops the tenant from the resolution cache.

use anyhow::anyhow;
use campusflow_cache::{RedisCache, keys, keys::invalidate};
use campusflow_core::{AppError, Paginated, codes::slugify};
use campusflow_models::{
    BillingPeriod, Coupon, CouponRejection, Invoice, InvoiceLineItem, InvoiceStatus, Payment, PaymentMethod,
    PaymentStatus, PlanPricing, SubscriptionDetail, SubscriptionPlan, SubscriptionStatus,
    Tenant, TenantId, TenantSubscription,
    billing::{InvoiceTotals, invoice_number, round_money, transaction_id},
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::metrics::{track_payment, track_subscription_event};
use crate::modules::billing::model::{
    CancelSubscriptionDto, ChangePlanDto, CheckoutDto, CheckoutResult, CouponQuote,
    CreateCouponDto, CreatePlanDto, InvoiceFilterParams, PaymentFilterParams, RefundDto,
    SubscriptionAction, SubscriptionFilterParams, UpdateCouponDto, UpdatePlanDto,
    ValidateCouponDto, check_coupon_value, tenant_active_flag,
};
use crate::utils::db::{foreign_key_violation, unique_violation};
use crate::utils::limits::lock_tenant;

const DEFAULT_TRIAL_DAYS: i32 = 14;

fn coupon_error(rejection: CouponRejection) -> AppError {
    AppError::bad_request(anyhow!(rejection.to_string()))
}

/// Writes the tenant-side mirror of a subscription status.
async fn sync_tenant_status(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    status: SubscriptionStatus,
) -> Result<(), AppError> {
    sqlx::query(
        r#"UPDATE tenants SET
               subscription_status = $2,
               is_active = COALESCE($3, is_active),
               updated_at = NOW()
           WHERE id = $1"#,
    )
    .bind(tenant_id)
    .bind(status)
    .bind(tenant_active_flag(status))
    .execute(conn)
    .await?;
    Ok(())
}

/// Copies a plan's limits and dates onto the tenant row.
async fn apply_plan_to_tenant(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    plan: &SubscriptionPlan,
    subscription: &TenantSubscription,
) -> Result<(), AppError> {
    sqlx::query(
        r#"UPDATE tenants SET
               subscription_plan = $2,
               max_students = $3,
               max_teachers = $4,
               max_departments = $5,
               max_storage_gb = $6,
               subscription_start_date = $7,
               subscription_end_date = $8,
               trial_end_date = $9,
               updated_at = NOW()
           WHERE id = $1"#,
    )
    .bind(tenant_id)
    .bind(&plan.slug)
    .bind(plan.max_students)
    .bind(plan.max_teachers)
    .bind(plan.max_departments)
    .bind(plan.max_storage_gb)
    .bind(subscription.start_date.date_naive())
    .bind(subscription.end_date.map(|d| d.date_naive()))
    .bind(subscription.trial_end_date.map(|d| d.date_naive()))
    .execute(&mut *conn)
    .await?;

    sync_tenant_status(conn, tenant_id, subscription.status).await
}

pub struct PlanService;

impl PlanService {
    /// Active plans ordered for the pricing page. Cached when Redis is
    /// available.
    #[instrument(skip(db, cache))]
    pub async fn pricing(
        db: &PgPool,
        cache: Option<&RedisCache>,
    ) -> Result<Vec<PlanPricing>, AppError> {
        let load = || async {
            sqlx::query_as::<_, SubscriptionPlan>(
                "SELECT * FROM subscription_plans WHERE is_active = TRUE ORDER BY display_order, price",
            )
            .fetch_all(db)
            .await
            .map(|plans| Some(plans.into_iter().map(PlanPricing::from).collect::<Vec<_>>()))
        };

        let plans = match cache {
            Some(cache) => {
                cache
                    .get_or_load(&keys::plans::active_list(), cache.default_ttl(), load)
                    .await?
            }
            None => load().await?,
        };

        Ok(plans.unwrap_or_default())
    }

    #[instrument(skip(db, cache))]
    pub async fn pricing_for(
        db: &PgPool,
        cache: Option<&RedisCache>,
        slug: &str,
    ) -> Result<PlanPricing, AppError> {
        let load = || async {
            sqlx::query_as::<_, SubscriptionPlan>(
                "SELECT * FROM subscription_plans WHERE slug = $1 AND is_active = TRUE",
            )
            .bind(slug)
            .fetch_optional(db)
            .await
            .map(|plan| plan.map(PlanPricing::from))
        };

        let plan = match cache {
            Some(cache) => {
                cache
                    .get_or_load(&keys::plans::by_slug(slug), cache.default_ttl(), load)
                    .await?
            }
            None => load().await?,
        };

        plan.ok_or_else(|| AppError::not_found(anyhow!("Plan not found")))
    }

    pub async fn active_by_slug(
        conn: &mut PgConnection,
        slug: &str,
    ) -> Result<SubscriptionPlan, AppError> {
        sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans WHERE slug = $1 AND is_active = TRUE",
        )
        .bind(slug)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Plan not found")))
    }

    #[instrument(skip(db), fields(db.table = "subscription_plans", db.operation = "SELECT"))]
    pub async fn list_plans(db: &PgPool) -> Result<Vec<SubscriptionPlan>, AppError> {
        let plans = sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans ORDER BY display_order, price",
        )
        .fetch_all(db)
        .await?;
        Ok(plans)
    }

    #[instrument(skip(db), fields(db.table = "subscription_plans", db.operation = "SELECT"))]
    pub async fn get_plan(db: &PgPool, id: Uuid) -> Result<SubscriptionPlan, AppError> {
        sqlx::query_as::<_, SubscriptionPlan>("SELECT * FROM subscription_plans WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Plan not found")))
    }

    #[instrument(skip(db, cache, dto), fields(db.table = "subscription_plans", db.operation = "INSERT"))]
    pub async fn create_plan(
        db: &PgPool,
        cache: Option<&RedisCache>,
        dto: CreatePlanDto,
    ) -> Result<SubscriptionPlan, AppError> {
        let slug = dto.slug.as_deref().map(slugify).unwrap_or_else(|| slugify(&dto.name));
        if slug.is_empty() {
            return Err(AppError::bad_request(anyhow!("Plan slug cannot be empty")));
        }

        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            r#"INSERT INTO subscription_plans
                   (name, slug, plan_type, description, price, billing_period,
                    max_students, max_teachers, max_departments, max_storage_gb,
                    enable_sms, enable_email, enable_api_access, enable_custom_domain,
                    enable_white_label, enable_analytics, enable_advanced_reports,
                    enable_parent_portal, trial_days, is_popular, display_order)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                       $15, $16, $17, $18, $19, $20, $21)
               RETURNING *"#,
        )
        .bind(&dto.name)
        .bind(&slug)
        .bind(dto.plan_type)
        .bind(&dto.description)
        .bind(round_money(dto.price))
        .bind(dto.billing_period.unwrap_or(BillingPeriod::Monthly))
        .bind(dto.max_students)
        .bind(dto.max_teachers)
        .bind(dto.max_departments)
        .bind(dto.max_storage_gb)
        .bind(dto.enable_sms)
        .bind(dto.enable_email)
        .bind(dto.enable_api_access)
        .bind(dto.enable_custom_domain)
        .bind(dto.enable_white_label)
        .bind(dto.enable_analytics)
        .bind(dto.enable_advanced_reports)
        .bind(dto.enable_parent_portal)
        .bind(dto.trial_days.unwrap_or(DEFAULT_TRIAL_DAYS))
        .bind(dto.is_popular)
        .bind(dto.display_order)
        .fetch_one(db)
        .await
        .map_err(unique_violation("A plan with this name or slug already exists"))?;

        info!(plan.slug = %plan.slug, "Plan created");
        invalidate::plans(cache).await;
        Ok(plan)
    }

    #[instrument(skip(db, cache, dto), fields(db.table = "subscription_plans", db.operation = "UPDATE"))]
    pub async fn update_plan(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: Uuid,
        dto: UpdatePlanDto,
    ) -> Result<SubscriptionPlan, AppError> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            r#"UPDATE subscription_plans SET
                   name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   price = COALESCE($4, price),
                   billing_period = COALESCE($5, billing_period),
                   max_students = COALESCE($6, max_students),
                   max_teachers = COALESCE($7, max_teachers),
                   max_departments = COALESCE($8, max_departments),
                   max_storage_gb = COALESCE($9, max_storage_gb),
                   enable_sms = COALESCE($10, enable_sms),
                   enable_email = COALESCE($11, enable_email),
                   enable_api_access = COALESCE($12, enable_api_access),
                   enable_custom_domain = COALESCE($13, enable_custom_domain),
                   enable_white_label = COALESCE($14, enable_white_label),
                   enable_analytics = COALESCE($15, enable_analytics),
                   enable_advanced_reports = COALESCE($16, enable_advanced_reports),
                   enable_parent_portal = COALESCE($17, enable_parent_portal),
                   trial_days = COALESCE($18, trial_days),
                   is_popular = COALESCE($19, is_popular),
                   is_active = COALESCE($20, is_active),
                   display_order = COALESCE($21, display_order),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(dto.price.map(round_money))
        .bind(dto.billing_period)
        .bind(dto.max_students)
        .bind(dto.max_teachers)
        .bind(dto.max_departments)
        .bind(dto.max_storage_gb)
        .bind(dto.enable_sms)
        .bind(dto.enable_email)
        .bind(dto.enable_api_access)
        .bind(dto.enable_custom_domain)
        .bind(dto.enable_white_label)
        .bind(dto.enable_analytics)
        .bind(dto.enable_advanced_reports)
        .bind(dto.enable_parent_portal)
        .bind(dto.trial_days)
        .bind(dto.is_popular)
        .bind(dto.is_active)
        .bind(dto.display_order)
        .fetch_optional(db)
        .await
        .map_err(unique_violation("A plan with this name already exists"))?
        .ok_or_else(|| AppError::not_found(anyhow!("Plan not found")))?;

        invalidate::plans(cache).await;
        Ok(plan)
    }

    /// Plans still referenced by a subscription cannot be deleted; deactivate
    /// them instead.
    #[instrument(skip(db, cache), fields(db.table = "subscription_plans", db.operation = "DELETE"))]
    pub async fn delete_plan(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: Uuid,
    ) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM subscription_plans WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(foreign_key_violation(
                "Plan is in use by subscriptions; deactivate it instead",
            ))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Plan not found")));
        }

        invalidate::plans(cache).await;
        Ok(())
    }
}

pub struct SubscriptionService;

impl SubscriptionService {
    async fn current_row(
        conn: &mut PgConnection,
        tenant_id: TenantId,
    ) -> Result<Option<TenantSubscription>, AppError> {
        let subscription = sqlx::query_as::<_, TenantSubscription>(
            "SELECT * FROM tenant_subscriptions WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(conn)
        .await?;
        Ok(subscription)
    }

    async fn plan_of(
        conn: &mut PgConnection,
        subscription: &TenantSubscription,
    ) -> Result<SubscriptionPlan, AppError> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans WHERE id = $1",
        )
        .bind(subscription.plan_id)
        .fetch_one(conn)
        .await?;
        Ok(plan)
    }

    fn detail(
        subscription: TenantSubscription,
        plan: SubscriptionPlan,
        now: DateTime<Utc>,
    ) -> SubscriptionDetail {
        SubscriptionDetail {
            days_until_expiry: subscription.days_until_expiry(now),
            is_trial: subscription.is_trial(now),
            subscription,
            plan,
        }
    }

    #[instrument(skip(db), fields(db.table = "tenant_subscriptions", db.operation = "SELECT"))]
    pub async fn current(db: &PgPool, tenant_id: TenantId) -> Result<SubscriptionDetail, AppError> {
        let mut conn = db.acquire().await?;
        let subscription = Self::current_row(&mut conn, tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("No subscription found")))?;
        let plan = Self::plan_of(&mut conn, &subscription).await?;
        Ok(Self::detail(subscription, plan, Utc::now()))
    }

    /// Subscribes the tenant to a plan in one transaction: coupon, trial or
    /// paid period, payment with its invoice, coupon usage, and the tenant's
    /// limits and status.
    #[instrument(skip(db, cache, dto), fields(db.table = "tenant_subscriptions", db.operation = "UPSERT", plan = %dto.plan_slug))]
    pub async fn checkout(
        db: &PgPool,
        cache: Option<&RedisCache>,
        tenant_id: TenantId,
        dto: CheckoutDto,
    ) -> Result<CheckoutResult, AppError> {
        let now = Utc::now();
        let mut tx = db.begin().await?;

        let tenant = lock_tenant(&mut tx, tenant_id).await?;
        let plan = PlanService::active_by_slug(&mut tx, &dto.plan_slug).await?;

        let coupon = match dto.coupon_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Some(
                CouponService::redeemable(&mut tx, tenant_id, code, &plan, now, true).await?,
            ),
            None => None,
        };
        let discount = coupon.as_ref().map_or(Decimal::ZERO, |(_, d)| *d);
        let amount = round_money((plan.price - discount).max(Decimal::ZERO));

        let had_paid = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM payments WHERE tenant_id = $1 AND status = ANY($2))",
        )
        .bind(tenant_id)
        .bind(vec![
            PaymentStatus::Succeeded.as_str(),
            PaymentStatus::Refunded.as_str(),
            PaymentStatus::PartiallyRefunded.as_str(),
        ])
        .fetch_one(&mut *tx)
        .await?;

        let (status, trial_end, end_date) = if plan.trial_days > 0 && !had_paid {
            let trial_end = now + Duration::days(i64::from(plan.trial_days));
            (SubscriptionStatus::Trial, Some(trial_end), trial_end)
        } else {
            (SubscriptionStatus::Active, None, plan.period_end(now))
        };

        let subscription = sqlx::query_as::<_, TenantSubscription>(
            r#"INSERT INTO tenant_subscriptions
                   (tenant_id, plan_id, status, start_date, end_date, trial_end_date,
                    next_billing_date)
               VALUES ($1, $2, $3, $4, $5, $6, $5)
               ON CONFLICT (tenant_id) DO UPDATE SET
                   plan_id = EXCLUDED.plan_id,
                   status = EXCLUDED.status,
                   start_date = EXCLUDED.start_date,
                   end_date = EXCLUDED.end_date,
                   trial_end_date = EXCLUDED.trial_end_date,
                   next_billing_date = EXCLUDED.next_billing_date,
                   cancelled_at = NULL,
                   auto_renew = TRUE,
                   cancel_at_period_end = FALSE,
                   cancellation_reason = NULL,
                   updated_at = NOW()
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(plan.id)
        .bind(status)
        .bind(now)
        .bind(end_date)
        .bind(trial_end)
        .fetch_one(&mut *tx)
        .await?;

        let (payment, invoice) = if amount > Decimal::ZERO {
            let payment = PaymentService::record_succeeded(
                &mut tx,
                tenant_id,
                &subscription,
                amount,
                dto.payment_method.unwrap_or(PaymentMethod::Card),
                dto.provider_payment_id.as_deref(),
                format!("Subscription - {}", plan.name),
                now,
            )
            .await?;
            let invoice = InvoiceService::for_payment(
                &mut tx,
                &tenant,
                &plan,
                &payment,
                discount,
                now,
            )
            .await?;
            (Some(payment), Some(invoice))
        } else {
            (None, None)
        };

        if let Some((coupon, discount)) = &coupon {
            CouponService::record_usage(&mut tx, coupon, tenant_id, &subscription, *discount)
                .await?;
        }

        apply_plan_to_tenant(&mut tx, tenant_id, &plan, &subscription).await?;
        tx.commit().await?;

        info!(
            tenant.id = %tenant_id,
            plan = %plan.slug,
            status = %subscription.status,
            amount = %amount,
            "Checkout completed"
        );
        track_subscription_event("checkout", &plan.slug);
        if let Some(payment) = &payment {
            track_payment(payment.status.as_str(), payment.amount.to_f64().unwrap_or_default());
        }
        invalidate::tenant(cache, tenant_id.into_inner()).await;

        Ok(CheckoutResult {
            subscription,
            amount,
            discount,
            payment,
            invoice,
        })
    }

    /// Moves the subscription to another plan. A cheaper monthly price is a
    /// downgrade and must still fit the tenant's current usage.
    #[instrument(skip(db, cache, dto), fields(db.table = "tenant_subscriptions", db.operation = "UPDATE", plan = %dto.plan_slug))]
    pub async fn change_plan(
        db: &PgPool,
        cache: Option<&RedisCache>,
        tenant_id: TenantId,
        dto: ChangePlanDto,
    ) -> Result<SubscriptionDetail, AppError> {
        let mut tx = db.begin().await?;

        let tenant = lock_tenant(&mut tx, tenant_id).await?;
        let current = Self::current_row(&mut tx, tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("No subscription found")))?;
        let current_plan = Self::plan_of(&mut tx, &current).await?;
        let target = PlanService::active_by_slug(&mut tx, &dto.plan_slug).await?;

        if target.id == current_plan.id {
            return Err(AppError::bad_request(anyhow!("Already subscribed to this plan")));
        }

        let downgrade = target.monthly_price() < current_plan.monthly_price();
        if downgrade {
            if !current.can_downgrade() {
                return Err(AppError::bad_request(anyhow!(
                    "Only active subscriptions can be downgraded"
                )));
            }
            if !target.fits_usage(
                tenant.current_students,
                tenant.current_teachers,
                tenant.current_departments,
                tenant.current_storage_gb,
            ) {
                return Err(AppError::bad_request(anyhow!(
                    "Current usage exceeds the limits of the selected plan"
                ))
                .with_code("PLAN_LIMITS_EXCEEDED"));
            }
        } else if !current.can_upgrade() {
            return Err(AppError::bad_request(anyhow!(
                "Subscription cannot be upgraded in its current status"
            )));
        }

        let subscription = sqlx::query_as::<_, TenantSubscription>(
            r#"UPDATE tenant_subscriptions SET plan_id = $2, updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(current.id)
        .bind(target.id)
        .fetch_one(&mut *tx)
        .await?;

        apply_plan_to_tenant(&mut tx, tenant_id, &target, &subscription).await?;
        tx.commit().await?;

        let event = if downgrade { "downgrade" } else { "upgrade" };
        info!(tenant.id = %tenant_id, from = %current_plan.slug, to = %target.slug, event, "Plan changed");
        track_subscription_event(event, &target.slug);
        invalidate::tenant(cache, tenant_id.into_inner()).await;

        Ok(Self::detail(subscription, target, Utc::now()))
    }

    #[instrument(skip(db, cache, dto), fields(db.table = "tenant_subscriptions", db.operation = "UPDATE"))]
    pub async fn cancel(
        db: &PgPool,
        cache: Option<&RedisCache>,
        tenant_id: TenantId,
        dto: CancelSubscriptionDto,
    ) -> Result<TenantSubscription, AppError> {
        let mut tx = db.begin().await?;

        let current = Self::current_row(&mut tx, tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("No subscription found")))?;
        if !current.is_active() {
            return Err(AppError::bad_request(anyhow!(
                "Subscription is not active"
            )));
        }

        let reason = dto.cancellation_reason();
        let subscription = if dto.cancel_immediately {
            let cancelled = sqlx::query_as::<_, TenantSubscription>(
                r#"UPDATE tenant_subscriptions SET
                       status = $2, cancelled_at = NOW(), auto_renew = FALSE,
                       cancellation_reason = $3, updated_at = NOW()
                   WHERE id = $1
                   RETURNING *"#,
            )
            .bind(current.id)
            .bind(SubscriptionStatus::Cancelled)
            .bind(&reason)
            .fetch_one(&mut *tx)
            .await?;
            sync_tenant_status(&mut tx, tenant_id, cancelled.status).await?;
            cancelled
        } else {
            sqlx::query_as::<_, TenantSubscription>(
                r#"UPDATE tenant_subscriptions SET
                       cancel_at_period_end = TRUE, auto_renew = FALSE,
                       cancellation_reason = $2, updated_at = NOW()
                   WHERE id = $1
                   RETURNING *"#,
            )
            .bind(current.id)
            .bind(&reason)
            .fetch_one(&mut *tx)
            .await?
        };

        let plan = Self::plan_of(&mut tx, &subscription).await?;
        tx.commit().await?;

        let event = if dto.cancel_immediately { "cancelled" } else { "cancel_scheduled" };
        info!(tenant.id = %tenant_id, event, "Subscription cancellation");
        track_subscription_event(event, &plan.slug);
        invalidate::tenant(cache, tenant_id.into_inner()).await;

        Ok(subscription)
    }

    #[instrument(skip(db), fields(db.table = "tenant_subscriptions", db.operation = "SELECT"))]
    pub async fn list_subscriptions(
        db: &PgPool,
        filters: SubscriptionFilterParams,
    ) -> Result<Paginated<TenantSubscription>, AppError> {
        const WHERE: &str = "WHERE ($1::text IS NULL OR status = $1)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM tenant_subscriptions {WHERE}"
        ))
        .bind(filters.status)
        .fetch_one(db)
        .await?;

        let data = sqlx::query_as::<_, TenantSubscription>(&format!(
            "SELECT * FROM tenant_subscriptions {WHERE} ORDER BY created_at DESC {}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.status)
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(data, total, &filters.pagination))
    }

    /// Platform-side suspend, reactivate or expire.
    #[instrument(skip(db, cache), fields(db.table = "tenant_subscriptions", db.operation = "UPDATE"))]
    pub async fn set_status(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: Uuid,
        action: SubscriptionAction,
    ) -> Result<TenantSubscription, AppError> {
        let status = action.target();
        let mut tx = db.begin().await?;

        let subscription = sqlx::query_as::<_, TenantSubscription>(
            r#"UPDATE tenant_subscriptions SET status = $2, updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Subscription not found")))?;

        sync_tenant_status(&mut tx, subscription.tenant_id, status).await?;
        tx.commit().await?;

        warn!(
            tenant.id = %subscription.tenant_id,
            status = %status,
            "Subscription status changed by platform"
        );
        invalidate::tenant(cache, subscription.tenant_id.into_inner()).await;
        Ok(subscription)
    }
}

pub struct PaymentService;

impl PaymentService {
    #[allow(clippy::too_many_arguments)]
    async fn record_succeeded(
        conn: &mut PgConnection,
        tenant_id: TenantId,
        subscription: &TenantSubscription,
        amount: Decimal,
        method: PaymentMethod,
        provider_payment_id: Option<&str>,
        description: String,
        now: DateTime<Utc>,
    ) -> Result<Payment, AppError> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"INSERT INTO payments
                   (tenant_id, subscription_id, amount, status, payment_method,
                    provider_payment_id, transaction_id, payment_date, description)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING *"#,
        )
        .bind(tenant_id)
        .bind(subscription.id)
        .bind(amount)
        .bind(PaymentStatus::Succeeded)
        .bind(method)
        .bind(provider_payment_id)
        .bind(transaction_id(now, provider_payment_id))
        .bind(now)
        .bind(description)
        .fetch_one(conn)
        .await
        .map_err(unique_violation("This payment has already been recorded"))?;

        Ok(payment)
    }

    #[instrument(skip(db), fields(db.table = "payments", db.operation = "SELECT"))]
    pub async fn list_for_tenant(
        db: &PgPool,
        tenant_id: TenantId,
        filters: PaymentFilterParams,
    ) -> Result<Paginated<Payment>, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payments WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Payment>(&format!(
            "SELECT * FROM payments WHERE tenant_id = $1 ORDER BY created_at DESC {}",
            filters.pagination.sql_suffix()
        ))
        .bind(tenant_id)
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(data, total, &filters.pagination))
    }

    /// Refunds part or all of what is left on a payment.
    #[instrument(skip(db, dto), fields(db.table = "payments", db.operation = "UPDATE"))]
    pub async fn refund(db: &PgPool, id: Uuid, dto: RefundDto) -> Result<Payment, AppError> {
        let mut tx = db.begin().await?;

        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Payment not found")))?;

        if !payment.can_refund() {
            return Err(AppError::bad_request(anyhow!("Payment cannot be refunded")));
        }
        let amount = round_money(dto.amount);
        if amount > payment.refundable_amount() {
            return Err(AppError::bad_request(anyhow!(
                "Refund amount exceeds the refundable balance of {}",
                payment.refundable_amount()
            )));
        }

        let refunded = sqlx::query_as::<_, Payment>(
            r#"UPDATE payments SET
                   status = $2,
                   refund_amount = refund_amount + $3,
                   refund_date = NOW(),
                   refund_reason = $4,
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(payment.status_after_refund(amount))
        .bind(amount)
        .bind(&dto.reason)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(payment.id = %id, amount = %amount, status = %refunded.status, "Payment refunded");
        track_payment(refunded.status.as_str(), amount.to_f64().unwrap_or_default());
        Ok(refunded)
    }
}

pub struct InvoiceService;

impl InvoiceService {
    /// Paid invoice for a succeeded subscription payment.
    async fn for_payment(
        conn: &mut PgConnection,
        tenant: &Tenant,
        plan: &SubscriptionPlan,
        payment: &Payment,
        discount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Invoice, AppError> {
        let subtotal = plan.price;
        let tax_rate = Decimal::ZERO;
        let totals = InvoiceTotals::compute(subtotal, tax_rate, discount);
        let line_items = vec![InvoiceLineItem {
            description: format!("Subscription - {}", plan.name),
            quantity: 1,
            unit_price: plan.price,
            amount: plan.price,
        }];
        let address = [
            tenant.address_line1.as_deref(),
            tenant.address_line2.as_deref(),
            tenant.city.as_deref(),
            tenant.state.as_deref(),
            tenant.postal_code.as_deref(),
            tenant.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ");

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"INSERT INTO invoices
                   (tenant_id, subscription_id, payment_id, invoice_number, status,
                    subtotal, tax_rate, tax_amount, discount_amount, total, currency,
                    issue_date, due_date, paid_date, billing_name, billing_email,
                    billing_address, line_items)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12, $13, $14, $15,
                       $16, $17)
               RETURNING *"#,
        )
        .bind(tenant.id)
        .bind(payment.subscription_id)
        .bind(payment.id)
        .bind(invoice_number(now))
        .bind(InvoiceStatus::Paid)
        .bind(subtotal)
        .bind(tax_rate)
        .bind(totals.tax_amount)
        .bind(discount)
        .bind(totals.total)
        .bind(&payment.currency)
        .bind(now.date_naive())
        .bind(now)
        .bind(&tenant.name)
        .bind(&tenant.email)
        .bind(address)
        .bind(sqlx::types::Json(line_items))
        .fetch_one(conn)
        .await?;

        Ok(invoice)
    }

    #[instrument(skip(db), fields(db.table = "invoices", db.operation = "UPDATE"))]
    async fn mark_overdue(db: &PgPool) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"UPDATE invoices SET status = $1, updated_at = NOW()
               WHERE status = $2 AND due_date < CURRENT_DATE"#,
        )
        .bind(InvoiceStatus::Overdue)
        .bind(InvoiceStatus::Pending)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list(
        db: &PgPool,
        tenant_id: Option<Uuid>,
        filters: &InvoiceFilterParams,
    ) -> Result<Paginated<Invoice>, AppError> {
        const WHERE: &str = r#"
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
              AND ($2::text IS NULL OR status = $2)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM invoices {WHERE}"))
            .bind(tenant_id)
            .bind(filters.status)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT * FROM invoices {WHERE} ORDER BY issue_date DESC, created_at DESC {}",
            filters.pagination.sql_suffix()
        ))
        .bind(tenant_id)
        .bind(filters.status)
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(data, total, &filters.pagination))
    }

    #[instrument(skip(db), fields(db.table = "invoices", db.operation = "SELECT"))]
    pub async fn list_for_tenant(
        db: &PgPool,
        tenant_id: TenantId,
        filters: InvoiceFilterParams,
    ) -> Result<Paginated<Invoice>, AppError> {
        Self::list(db, Some(tenant_id.into_inner()), &filters).await
    }

    #[instrument(skip(db), fields(db.table = "invoices", db.operation = "SELECT"))]
    pub async fn get_for_tenant(
        db: &PgPool,
        tenant_id: TenantId,
        id: Uuid,
    ) -> Result<Invoice, AppError> {
        sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Invoice not found")))
    }

    /// Every tenant's invoices; pending ones past due are flipped to overdue
    /// first.
    #[instrument(skip(db), fields(db.table = "invoices", db.operation = "SELECT"))]
    pub async fn list_all(
        db: &PgPool,
        filters: InvoiceFilterParams,
    ) -> Result<Paginated<Invoice>, AppError> {
        let marked = Self::mark_overdue(db).await?;
        if marked > 0 {
            info!(count = marked, "Invoices marked overdue");
        }
        Self::list(db, filters.tenant_id, &filters).await
    }
}

pub struct CouponService;

impl CouponService {
    /// Finds a coupon by code and checks it against the plan and the
    /// tenant's past use, returning the discount it gives.
    ///
    /// With `for_update` the coupon row stays locked until the caller's
    /// transaction ends, so concurrent checkouts see each other's usage.
    async fn redeemable(
        conn: &mut PgConnection,
        tenant_id: TenantId,
        code: &str,
        plan: &SubscriptionPlan,
        now: DateTime<Utc>,
        for_update: bool,
    ) -> Result<(Coupon, Decimal), AppError> {
        let sql = if for_update {
            "SELECT * FROM coupons WHERE code = $1 FOR UPDATE"
        } else {
            "SELECT * FROM coupons WHERE code = $1"
        };
        let coupon = sqlx::query_as::<_, Coupon>(sql)
            .bind(code.trim().to_uppercase())
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| coupon_error(CouponRejection::Unknown))?;

        let discount = coupon.check(now, plan.id, plan.price).map_err(coupon_error)?;

        let used = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM coupon_usages WHERE coupon_id = $1 AND tenant_id = $2",
        )
        .bind(coupon.id)
        .bind(tenant_id)
        .fetch_one(conn)
        .await?;
        if used >= i64::from(coupon.max_uses_per_tenant) {
            return Err(coupon_error(CouponRejection::TenantLimitReached));
        }

        Ok((coupon, discount))
    }

    async fn record_usage(
        conn: &mut PgConnection,
        coupon: &Coupon,
        tenant_id: TenantId,
        subscription: &TenantSubscription,
        discount: Decimal,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO coupon_usages (coupon_id, tenant_id, subscription_id, discount_amount)
               VALUES ($1, $2, $3, $4)"#,
        )
        .bind(coupon.id)
        .bind(tenant_id)
        .bind(subscription.id)
        .bind(discount)
        .execute(&mut *conn)
        .await?;

        let claimed = sqlx::query(
            r#"UPDATE coupons SET times_used = times_used + 1, updated_at = NOW()
               WHERE id = $1 AND (max_uses IS NULL OR times_used < max_uses)"#,
        )
        .bind(coupon.id)
        .execute(conn)
        .await?;
        if claimed.rows_affected() == 0 {
            return Err(coupon_error(CouponRejection::Expired));
        }
        Ok(())
    }

    #[instrument(skip(db, dto), fields(db.table = "coupons", db.operation = "SELECT"))]
    pub async fn quote(
        db: &PgPool,
        tenant_id: TenantId,
        dto: ValidateCouponDto,
    ) -> Result<CouponQuote, AppError> {
        let mut conn = db.acquire().await?;
        let plan = PlanService::active_by_slug(&mut conn, &dto.plan_slug).await?;
        let (coupon, discount) =
            Self::redeemable(&mut conn, tenant_id, &dto.code, &plan, Utc::now(), false).await?;

        Ok(CouponQuote {
            code: coupon.code,
            original_amount: plan.price,
            discount,
            final_amount: round_money((plan.price - discount).max(Decimal::ZERO)),
        })
    }

    #[instrument(skip(db, dto), fields(db.table = "coupons", db.operation = "INSERT"))]
    pub async fn create_coupon(db: &PgPool, dto: CreateCouponDto) -> Result<Coupon, AppError> {
        check_coupon_value(dto.discount_type, dto.discount_value)
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;
        let valid_from = dto.valid_from.unwrap_or_else(Utc::now);
        if dto.valid_until.is_some_and(|until| until <= valid_from) {
            return Err(AppError::bad_request(anyhow!(
                "valid_until must be after valid_from"
            )));
        }

        let coupon = sqlx::query_as::<_, Coupon>(
            r#"INSERT INTO coupons
                   (code, name, description, discount_type, discount_value, valid_from,
                    valid_until, max_uses, max_uses_per_tenant, min_purchase_amount,
                    applicable_plan_ids)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               RETURNING *"#,
        )
        .bind(dto.code.trim().to_uppercase())
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(dto.discount_type)
        .bind(dto.discount_value)
        .bind(valid_from)
        .bind(dto.valid_until)
        .bind(dto.max_uses)
        .bind(dto.max_uses_per_tenant.unwrap_or(1))
        .bind(dto.min_purchase_amount.unwrap_or(Decimal::ZERO))
        .bind(&dto.applicable_plan_ids)
        .fetch_one(db)
        .await
        .map_err(unique_violation("A coupon with this code already exists"))?;

        info!(coupon.code = %coupon.code, "Coupon created");
        Ok(coupon)
    }

    #[instrument(skip(db), fields(db.table = "coupons", db.operation = "SELECT"))]
    pub async fn list_coupons(db: &PgPool) -> Result<Vec<Coupon>, AppError> {
        let coupons = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons ORDER BY created_at DESC")
            .fetch_all(db)
            .await?;
        Ok(coupons)
    }

    #[instrument(skip(db), fields(db.table = "coupons", db.operation = "SELECT"))]
    pub async fn get_coupon(db: &PgPool, id: Uuid) -> Result<Coupon, AppError> {
        sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Coupon not found")))
    }

    #[instrument(skip(db, dto), fields(db.table = "coupons", db.operation = "UPDATE"))]
    pub async fn update_coupon(
        db: &PgPool,
        id: Uuid,
        dto: UpdateCouponDto,
    ) -> Result<Coupon, AppError> {
        let existing = Self::get_coupon(db, id).await?;
        if let Some(value) = dto.discount_value {
            check_coupon_value(existing.discount_type, value)
                .map_err(|e| AppError::bad_request(anyhow!(e)))?;
        }

        let coupon = sqlx::query_as::<_, Coupon>(
            r#"UPDATE coupons SET
                   name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   discount_value = COALESCE($4, discount_value),
                   valid_until = COALESCE($5, valid_until),
                   max_uses = COALESCE($6, max_uses),
                   max_uses_per_tenant = COALESCE($7, max_uses_per_tenant),
                   min_purchase_amount = COALESCE($8, min_purchase_amount),
                   applicable_plan_ids = COALESCE($9, applicable_plan_ids),
                   is_active = COALESCE($10, is_active),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(dto.discount_value)
        .bind(dto.valid_until)
        .bind(dto.max_uses)
        .bind(dto.max_uses_per_tenant)
        .bind(dto.min_purchase_amount)
        .bind(&dto.applicable_plan_ids)
        .bind(dto.is_active)
        .fetch_one(db)
        .await?;

        Ok(coupon)
    }

    #[instrument(skip(db), fields(db.table = "coupons", db.operation = "DELETE"))]
    pub async fn delete_coupon(db: &PgPool, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Coupon not found")));
        }
        Ok(())
    }
}
