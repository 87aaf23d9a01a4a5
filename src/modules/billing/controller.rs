use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use campusflow_core::{AppError, Paginated};
use campusflow_models::{
    Coupon, Invoice, NewAuditLog, Payment, PlanPricing, SubscriptionDetail, SubscriptionPlan,
    TenantSubscription,
};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::audit::{ClientInfo, create_audit_log};
use crate::middleware::auth::{RequireBillingManage, RequireTenantsManage};
use crate::middleware::tenancy::TenantScope;
use crate::modules::billing::model::{
    CancelSubscriptionDto, ChangePlanDto, CheckoutDto, CheckoutResult, CouponQuote,
    CreateCouponDto, CreatePlanDto, InvoiceFilterParams, PaymentFilterParams, RefundDto,
    SubscriptionFilterParams, SubscriptionStatusDto, UpdateCouponDto, UpdatePlanDto,
    ValidateCouponDto,
};
use crate::modules::billing::service::{
    CouponService, InvoiceService, PaymentService, PlanService, SubscriptionService,
};
use crate::state::AppState;
use crate::validator::ValidatedJson;

// Public pricing

#[utoipa::path(
    get,
    path = "/api/pricing",
    responses((status = 200, description = "Active plans in display order", body = Vec<PlanPricing>)),
    tag = "Pricing"
)]
#[instrument(skip(state))]
pub async fn list_pricing(
    State(state): State<AppState>,
) -> Result<Json<Vec<PlanPricing>>, AppError> {
    Ok(Json(PlanService::pricing(&state.db, state.cache()).await?))
}

#[utoipa::path(
    get,
    path = "/api/pricing/{slug}",
    params(("slug" = String, Path, description = "Plan slug")),
    responses(
        (status = 200, description = "Plan pricing", body = PlanPricing),
        (status = 404, description = "Plan not found")
    ),
    tag = "Pricing"
)]
#[instrument(skip(state))]
pub async fn get_pricing(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PlanPricing>, AppError> {
    Ok(Json(PlanService::pricing_for(&state.db, state.cache(), &slug).await?))
}

// Tenant subscription

#[utoipa::path(
    get,
    path = "/api/subscription",
    responses(
        (status = 200, description = "Current subscription", body = SubscriptionDetail),
        (status = 404, description = "No subscription found")
    ),
    tag = "Subscription",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_subscription(
    State(state): State<AppState>,
    _auth: RequireBillingManage,
    TenantScope(tenant_id): TenantScope,
) -> Result<Json<SubscriptionDetail>, AppError> {
    Ok(Json(SubscriptionService::current(&state.db, tenant_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/subscription/checkout",
    request_body = CheckoutDto,
    responses(
        (status = 201, description = "Subscription started", body = CheckoutResult),
        (status = 400, description = "Coupon rejected"),
        (status = 404, description = "Plan not found"),
        (status = 409, description = "Payment already recorded")
    ),
    tag = "Subscription",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn checkout(
    State(state): State<AppState>,
    _auth: RequireBillingManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<CheckoutDto>,
) -> Result<(StatusCode, Json<CheckoutResult>), AppError> {
    let result = SubscriptionService::checkout(&state.db, state.cache(), tenant_id, dto).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(
    post,
    path = "/api/subscription/change-plan",
    request_body = ChangePlanDto,
    responses(
        (status = 200, description = "Plan changed", body = SubscriptionDetail),
        (status = 400, description = "Same plan, wrong status, or usage above the new limits"),
        (status = 404, description = "Plan or subscription not found")
    ),
    tag = "Subscription",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn change_plan(
    State(state): State<AppState>,
    _auth: RequireBillingManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<ChangePlanDto>,
) -> Result<Json<SubscriptionDetail>, AppError> {
    Ok(Json(
        SubscriptionService::change_plan(&state.db, state.cache(), tenant_id, dto).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/subscription/cancel",
    request_body = CancelSubscriptionDto,
    responses(
        (status = 200, description = "Subscription cancelled or set to end with the period", body = TenantSubscription),
        (status = 400, description = "Subscription is not active")
    ),
    tag = "Subscription",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, client, dto))]
pub async fn cancel_subscription(
    State(state): State<AppState>,
    RequireBillingManage(auth_user): RequireBillingManage,
    TenantScope(tenant_id): TenantScope,
    client: ClientInfo,
    ValidatedJson(dto): ValidatedJson<CancelSubscriptionDto>,
) -> Result<Json<TenantSubscription>, AppError> {
    let description = if dto.cancel_immediately {
        "Subscription cancelled immediately"
    } else {
        "Subscription set to cancel at period end"
    };
    let subscription =
        SubscriptionService::cancel(&state.db, state.cache(), tenant_id, dto).await?;

    create_audit_log(
        &state.db,
        NewAuditLog {
            user_id: auth_user.user_id().ok(),
            tenant_id: Some(tenant_id),
            resource_id: Some(subscription.id.to_string()),
            description: description.to_string(),
            ..client.event("subscription_cancelled", "subscription")
        },
    )
    .await;

    Ok(Json(subscription))
}

// Tenant billing history

#[utoipa::path(
    get,
    path = "/api/billing/payments",
    params(PaymentFilterParams),
    responses((status = 200, description = "Payments", body = Paginated<Payment>)),
    tag = "Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_payments(
    State(state): State<AppState>,
    _auth: RequireBillingManage,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<PaymentFilterParams>,
) -> Result<Json<Paginated<Payment>>, AppError> {
    Ok(Json(PaymentService::list_for_tenant(&state.db, tenant_id, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/billing/invoices",
    params(InvoiceFilterParams),
    responses((status = 200, description = "Invoices", body = Paginated<Invoice>)),
    tag = "Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_invoices(
    State(state): State<AppState>,
    _auth: RequireBillingManage,
    TenantScope(tenant_id): TenantScope,
    Query(filters): Query<InvoiceFilterParams>,
) -> Result<Json<Paginated<Invoice>>, AppError> {
    Ok(Json(InvoiceService::list_for_tenant(&state.db, tenant_id, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/billing/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice", body = Invoice),
        (status = 404, description = "Invoice not found")
    ),
    tag = "Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_invoice(
    State(state): State<AppState>,
    _auth: RequireBillingManage,
    TenantScope(tenant_id): TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(InvoiceService::get_for_tenant(&state.db, tenant_id, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/billing/coupons/validate",
    request_body = ValidateCouponDto,
    responses(
        (status = 200, description = "Discount the coupon would give", body = CouponQuote),
        (status = 400, description = "Coupon rejected")
    ),
    tag = "Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn validate_coupon(
    State(state): State<AppState>,
    _auth: RequireBillingManage,
    TenantScope(tenant_id): TenantScope,
    ValidatedJson(dto): ValidatedJson<ValidateCouponDto>,
) -> Result<Json<CouponQuote>, AppError> {
    Ok(Json(CouponService::quote(&state.db, tenant_id, dto).await?))
}

// Company: plans

#[utoipa::path(
    get,
    path = "/api/company/plans",
    responses((status = 200, description = "Every plan, active or not", body = Vec<SubscriptionPlan>)),
    tag = "Company Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_plans(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
) -> Result<Json<Vec<SubscriptionPlan>>, AppError> {
    Ok(Json(PlanService::list_plans(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/api/company/plans",
    request_body = CreatePlanDto,
    responses(
        (status = 201, description = "Plan created", body = SubscriptionPlan),
        (status = 409, description = "Name or slug taken")
    ),
    tag = "Company Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn create_plan(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    ValidatedJson(dto): ValidatedJson<CreatePlanDto>,
) -> Result<(StatusCode, Json<SubscriptionPlan>), AppError> {
    let plan = PlanService::create_plan(&state.db, state.cache(), dto).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

#[utoipa::path(
    get,
    path = "/api/company/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Plan", body = SubscriptionPlan),
        (status = 404, description = "Plan not found")
    ),
    tag = "Company Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_plan(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<Json<SubscriptionPlan>, AppError> {
    Ok(Json(PlanService::get_plan(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/company/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan ID")),
    request_body = UpdatePlanDto,
    responses(
        (status = 200, description = "Plan updated", body = SubscriptionPlan),
        (status = 404, description = "Plan not found")
    ),
    tag = "Company Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_plan(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdatePlanDto>,
) -> Result<Json<SubscriptionPlan>, AppError> {
    Ok(Json(PlanService::update_plan(&state.db, state.cache(), id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/company/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan ID")),
    responses(
        (status = 204, description = "Plan deleted"),
        (status = 404, description = "Plan not found"),
        (status = 409, description = "Plan in use")
    ),
    tag = "Company Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_plan(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    PlanService::delete_plan(&state.db, state.cache(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Company: coupons

#[utoipa::path(
    get,
    path = "/api/company/coupons",
    responses((status = 200, description = "Coupons", body = Vec<Coupon>)),
    tag = "Company Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_coupons(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
) -> Result<Json<Vec<Coupon>>, AppError> {
    Ok(Json(CouponService::list_coupons(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/api/company/coupons",
    request_body = CreateCouponDto,
    responses(
        (status = 201, description = "Coupon created", body = Coupon),
        (status = 400, description = "Percentage above 100 or bad validity window"),
        (status = 409, description = "Code taken")
    ),
    tag = "Company Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn create_coupon(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    ValidatedJson(dto): ValidatedJson<CreateCouponDto>,
) -> Result<(StatusCode, Json<Coupon>), AppError> {
    let coupon = CouponService::create_coupon(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

#[utoipa::path(
    get,
    path = "/api/company/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon ID")),
    responses(
        (status = 200, description = "Coupon", body = Coupon),
        (status = 404, description = "Coupon not found")
    ),
    tag = "Company Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_coupon(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<Json<Coupon>, AppError> {
    Ok(Json(CouponService::get_coupon(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/company/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon ID")),
    request_body = UpdateCouponDto,
    responses(
        (status = 200, description = "Coupon updated", body = Coupon),
        (status = 404, description = "Coupon not found")
    ),
    tag = "Company Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn update_coupon(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateCouponDto>,
) -> Result<Json<Coupon>, AppError> {
    Ok(Json(CouponService::update_coupon(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/company/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon ID")),
    responses(
        (status = 204, description = "Coupon deleted"),
        (status = 404, description = "Coupon not found")
    ),
    tag = "Company Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_coupon(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    CouponService::delete_coupon(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Company: subscriptions, payments, invoices

#[utoipa::path(
    get,
    path = "/api/company/subscriptions",
    params(SubscriptionFilterParams),
    responses((status = 200, description = "Subscriptions across tenants", body = Paginated<TenantSubscription>)),
    tag = "Company Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Query(filters): Query<SubscriptionFilterParams>,
) -> Result<Json<Paginated<TenantSubscription>>, AppError> {
    Ok(Json(SubscriptionService::list_subscriptions(&state.db, filters).await?))
}

#[utoipa::path(
    post,
    path = "/api/company/subscriptions/{id}/status",
    params(("id" = Uuid, Path, description = "Subscription ID")),
    request_body = SubscriptionStatusDto,
    responses(
        (status = 200, description = "Status changed and tenant synced", body = TenantSubscription),
        (status = 404, description = "Subscription not found")
    ),
    tag = "Company Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn set_subscription_status(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<SubscriptionStatusDto>,
) -> Result<Json<TenantSubscription>, AppError> {
    Ok(Json(
        SubscriptionService::set_status(&state.db, state.cache(), id, dto.action).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/company/payments/{id}/refund",
    params(("id" = Uuid, Path, description = "Payment ID")),
    request_body = RefundDto,
    responses(
        (status = 200, description = "Payment refunded", body = Payment),
        (status = 400, description = "Not refundable or amount too large"),
        (status = 404, description = "Payment not found")
    ),
    tag = "Company Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth, dto))]
pub async fn refund_payment(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<RefundDto>,
) -> Result<Json<Payment>, AppError> {
    Ok(Json(PaymentService::refund(&state.db, id, dto).await?))
}

#[utoipa::path(
    get,
    path = "/api/company/invoices",
    params(InvoiceFilterParams),
    responses((status = 200, description = "Invoices across tenants", body = Paginated<Invoice>)),
    tag = "Company Billing",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_all_invoices(
    State(state): State<AppState>,
    _auth: RequireTenantsManage,
    Query(filters): Query<InvoiceFilterParams>,
) -> Result<Json<Paginated<Invoice>>, AppError> {
    Ok(Json(InvoiceService::list_all(&state.db, filters).await?))
}
