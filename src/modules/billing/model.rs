use campusflow_core::{PaginationParams, serde::deserialize_optional_uuid};
use campusflow_models::{
    BillingPeriod, DiscountType, Invoice, InvoiceStatus, Payment, PaymentMethod, PlanId, PlanType,
    SubscriptionStatus, TenantSubscription,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        Err(ValidationError::new("must_not_be_negative"))
    } else {
        Ok(())
    }
}

fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_positive() && !value.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_positive"))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePlanDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Derived from the name when omitted
    #[validate(length(min = 1, max = 100))]
    pub slug: Option<String>,
    pub plan_type: PlanType,
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = "non_negative"))]
    pub price: Decimal,
    pub billing_period: Option<BillingPeriod>,
    #[validate(range(min = 1))]
    pub max_students: i32,
    #[validate(range(min = 1))]
    pub max_teachers: i32,
    #[validate(range(min = 1))]
    pub max_departments: i32,
    #[validate(range(min = 1))]
    pub max_storage_gb: i32,
    #[serde(default)]
    pub enable_sms: bool,
    #[serde(default)]
    pub enable_email: bool,
    #[serde(default)]
    pub enable_api_access: bool,
    #[serde(default)]
    pub enable_custom_domain: bool,
    #[serde(default)]
    pub enable_white_label: bool,
    #[serde(default)]
    pub enable_analytics: bool,
    #[serde(default)]
    pub enable_advanced_reports: bool,
    #[serde(default)]
    pub enable_parent_portal: bool,
    /// Defaults to 14
    #[validate(range(min = 0, max = 365))]
    pub trial_days: Option<i32>,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePlanDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "non_negative"))]
    pub price: Option<Decimal>,
    pub billing_period: Option<BillingPeriod>,
    #[validate(range(min = 1))]
    pub max_students: Option<i32>,
    #[validate(range(min = 1))]
    pub max_teachers: Option<i32>,
    #[validate(range(min = 1))]
    pub max_departments: Option<i32>,
    #[validate(range(min = 1))]
    pub max_storage_gb: Option<i32>,
    pub enable_sms: Option<bool>,
    pub enable_email: Option<bool>,
    pub enable_api_access: Option<bool>,
    pub enable_custom_domain: Option<bool>,
    pub enable_white_label: Option<bool>,
    pub enable_analytics: Option<bool>,
    pub enable_advanced_reports: Option<bool>,
    pub enable_parent_portal: Option<bool>,
    #[validate(range(min = 0, max = 365))]
    pub trial_days: Option<i32>,
    pub is_popular: Option<bool>,
    pub is_active: Option<bool>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutDto {
    #[validate(length(min = 1))]
    #[schema(example = "standard")]
    pub plan_slug: String,
    pub coupon_code: Option<String>,
    /// Reference returned by the payment provider after the client confirmed payment
    pub provider_payment_id: Option<String>,
    /// Defaults to `card`
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResult {
    pub subscription: TenantSubscription,
    pub amount: Decimal,
    pub discount: Decimal,
    pub payment: Option<Payment>,
    pub invoice: Option<Invoice>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePlanDto {
    #[validate(length(min = 1))]
    pub plan_slug: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CancelSubscriptionDto {
    #[serde(default)]
    pub cancel_immediately: bool,
    #[validate(length(max = 200))]
    pub reason: Option<String>,
    #[validate(length(max = 2000))]
    pub feedback: Option<String>,
}

impl CancelSubscriptionDto {
    /// `"<reason> - <feedback>"`, or whichever part was given.
    pub fn cancellation_reason(&self) -> Option<String> {
        let reason = self.reason.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let feedback = self.feedback.as_deref().map(str::trim).filter(|s| !s.is_empty());
        match (reason, feedback) {
            (Some(r), Some(f)) => Some(format!("{r} - {f}")),
            (Some(r), None) => Some(r.to_string()),
            (None, Some(f)) => Some(f.to_string()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ValidateCouponDto {
    #[validate(length(min = 1))]
    pub code: String,
    #[validate(length(min = 1))]
    pub plan_slug: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponQuote {
    pub code: String,
    pub original_amount: Decimal,
    pub discount: Decimal,
    pub final_amount: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCouponDto {
    #[validate(length(min = 3, max = 50))]
    pub code: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    #[validate(custom(function = "positive"))]
    pub discount_value: Decimal,
    /// Defaults to now
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub max_uses: Option<i32>,
    /// Defaults to 1
    #[validate(range(min = 1))]
    pub max_uses_per_tenant: Option<i32>,
    #[validate(custom(function = "non_negative"))]
    pub min_purchase_amount: Option<Decimal>,
    #[serde(default)]
    pub applicable_plan_ids: Vec<PlanId>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCouponDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "positive"))]
    pub discount_value: Option<Decimal>,
    pub valid_until: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub max_uses: Option<i32>,
    #[validate(range(min = 1))]
    pub max_uses_per_tenant: Option<i32>,
    #[validate(custom(function = "non_negative"))]
    pub min_purchase_amount: Option<Decimal>,
    pub applicable_plan_ids: Option<Vec<PlanId>>,
    pub is_active: Option<bool>,
}

/// Percentage coupons cannot take more than the whole price.
pub fn check_coupon_value(kind: DiscountType, value: Decimal) -> Result<(), &'static str> {
    if kind == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
        Err("Percentage discount cannot exceed 100")
    } else {
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SubscriptionFilterParams {
    pub status: Option<SubscriptionStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// Platform-side status changes of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionAction {
    Suspend,
    Reactivate,
    Expire,
}

impl SubscriptionAction {
    pub const fn target(self) -> SubscriptionStatus {
        match self {
            Self::Suspend => SubscriptionStatus::Suspended,
            Self::Reactivate => SubscriptionStatus::Active,
            Self::Expire => SubscriptionStatus::Expired,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubscriptionStatusDto {
    pub action: SubscriptionAction,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefundDto {
    #[validate(custom(function = "positive"))]
    pub amount: Decimal,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct InvoiceFilterParams {
    pub status: Option<InvoiceStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub tenant_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PaymentFilterParams {
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// Whether the tenant's portals stay open under `status`. `past_due`
/// leaves the current flag alone.
pub const fn tenant_active_flag(status: SubscriptionStatus) -> Option<bool> {
    match status {
        SubscriptionStatus::Trial | SubscriptionStatus::Active => Some(true),
        SubscriptionStatus::Cancelled
        | SubscriptionStatus::Expired
        | SubscriptionStatus::Suspended => Some(false),
        SubscriptionStatus::PastDue => None,
    }
}
