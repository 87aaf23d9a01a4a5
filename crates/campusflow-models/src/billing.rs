//! Subscription plans, tenant subscriptions, payments, invoices and coupons.
//!
//! Money is [`Decimal`] throughout and rounded to cents with
//! [`round_money`]. Reference numbers:
//!
//! - transactions: `TXN-YYYYMMDD-XXXXXXXX`
//! - invoices: `INV-YYYYMM-XXXXXXXX` (hex)

use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::enums::{
    BillingPeriod, DiscountType, InvoiceStatus, PaymentMethod, PaymentStatus, PlanType,
    SubscriptionStatus,
};
use crate::ids::{PlanId, SubscriptionId, TenantId};

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SubscriptionPlan {
    pub id: PlanId,
    pub name: String,
    pub slug: String,
    pub plan_type: PlanType,
    pub description: String,
    pub price: Decimal,
    pub billing_period: BillingPeriod,
    pub max_students: i32,
    pub max_teachers: i32,
    pub max_departments: i32,
    pub max_storage_gb: i32,
    pub enable_sms: bool,
    pub enable_email: bool,
    pub enable_api_access: bool,
    pub enable_custom_domain: bool,
    pub enable_white_label: bool,
    pub enable_analytics: bool,
    pub enable_advanced_reports: bool,
    pub enable_parent_portal: bool,
    pub trial_days: i32,
    pub is_popular: bool,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionPlan {
    /// Price normalised to one month.
    pub fn monthly_price(&self) -> Decimal {
        round_money(self.price / Decimal::from(self.billing_period.months()))
    }

    /// Advertised saving against monthly billing.
    pub const fn discount_percentage(&self) -> u32 {
        match self.billing_period {
            BillingPeriod::Monthly => 0,
            BillingPeriod::Quarterly => 10,
            BillingPeriod::Annually => 20,
        }
    }

    /// End of one paid period starting at `from`.
    pub fn period_end(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        from.checked_add_months(Months::new(self.billing_period.months()))
            .unwrap_or(from)
    }

    /// Whether this plan's limits fit the given usage.
    pub fn fits_usage(&self, students: i32, teachers: i32, departments: i32, storage_gb: f64) -> bool {
        students <= self.max_students
            && teachers <= self.max_teachers
            && departments <= self.max_departments
            && storage_gb <= f64::from(self.max_storage_gb)
    }
}

/// Public pricing card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlanPricing {
    #[serde(flatten)]
    pub plan: SubscriptionPlan,
    pub monthly_price: Decimal,
    pub discount_percentage: u32,
}

impl From<SubscriptionPlan> for PlanPricing {
    fn from(plan: SubscriptionPlan) -> Self {
        Self {
            monthly_price: plan.monthly_price(),
            discount_percentage: plan.discount_percentage(),
            plan,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TenantSubscription {
    pub id: SubscriptionId,
    pub tenant_id: TenantId,
    pub plan_id: PlanId,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub trial_end_date: Option<DateTime<Utc>>,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    pub cancel_at_period_end: bool,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantSubscription {
    pub fn is_active(&self) -> bool {
        self.status.is_live()
    }

    pub fn is_trial(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Trial && self.trial_end_date.is_some_and(|end| end > now)
    }

    /// Whole days left, floored at zero.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.end_date.map(|end| (end - now).num_days().max(0))
    }

    pub fn can_upgrade(&self) -> bool {
        self.status.is_live()
    }

    pub fn can_downgrade(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }
}

/// Subscription joined with its plan, as shown to tenant admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionDetail {
    pub subscription: TenantSubscription,
    pub plan: SubscriptionPlan,
    pub days_until_expiry: Option<i64>,
    pub is_trial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub subscription_id: Option<SubscriptionId>,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub provider_payment_id: Option<String>,
    pub transaction_id: String,
    pub payment_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub failure_reason: Option<String>,
    pub refund_amount: Decimal,
    pub refund_date: Option<DateTime<Utc>>,
    pub refund_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn is_successful(&self) -> bool {
        self.status == PaymentStatus::Succeeded
    }

    pub fn refundable_amount(&self) -> Decimal {
        (self.amount - self.refund_amount).max(Decimal::ZERO)
    }

    pub fn can_refund(&self) -> bool {
        matches!(
            self.status,
            PaymentStatus::Succeeded | PaymentStatus::PartiallyRefunded
        ) && self.refund_amount < self.amount
    }

    /// Status after refunding `amount` more.
    pub fn status_after_refund(&self, amount: Decimal) -> PaymentStatus {
        if self.refund_amount + amount >= self.amount {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        }
    }
}

/// `TXN-YYYYMMDD-` followed by the first eight characters of the provider
/// reference, or eight random characters when there is none.
pub fn transaction_id(now: DateTime<Utc>, provider_payment_id: Option<&str>) -> String {
    let suffix = provider_payment_id
        .map(|id| id.trim().chars().take(8).collect::<String>().to_uppercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| campusflow_core::codes::generate_unique_code("", 8));
    format!("TXN-{}-{suffix}", now.format("%Y%m%d"))
}

/// `INV-YYYYMM-` followed by eight uppercase hex digits.
pub fn invoice_number(now: DateTime<Utc>) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("INV-{}-{}", now.format("%Y%m"), hex[..8].to_uppercase())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InvoiceLineItem {
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Invoice {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub subscription_id: Option<SubscriptionId>,
    pub payment_id: Option<Uuid>,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub paid_date: Option<DateTime<Utc>>,
    pub billing_name: String,
    pub billing_email: String,
    pub billing_address: String,
    #[schema(value_type = Vec<InvoiceLineItem>)]
    pub line_items: sqlx::types::Json<Vec<InvoiceLineItem>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == InvoiceStatus::Pending && self.due_date < today
    }
}

/// Tax and total derived from a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    pub fn compute(subtotal: Decimal, tax_rate: Decimal, discount: Decimal) -> Self {
        let tax_amount = round_money(subtotal * tax_rate / Decimal::ONE_HUNDRED);
        let total = (subtotal + tax_amount - discount).max(Decimal::ZERO);
        Self { tax_amount, total }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Coupon {
    pub id: Uuid,
    /// Stored uppercase
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub max_uses_per_tenant: i32,
    pub min_purchase_amount: Decimal,
    /// Empty means every plan
    pub applicable_plan_ids: Vec<PlanId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.valid_from <= now
            && self.valid_until.is_none_or(|until| now <= until)
            && self.max_uses.is_none_or(|max| self.times_used < max)
    }

    pub fn applies_to(&self, plan: PlanId) -> bool {
        self.applicable_plan_ids.is_empty() || self.applicable_plan_ids.contains(&plan)
    }

    pub fn calculate_discount(&self, amount: Decimal) -> Decimal {
        match self.discount_type {
            DiscountType::Percentage => {
                round_money(amount * self.discount_value / Decimal::ONE_HUNDRED)
            }
            DiscountType::Fixed => self.discount_value.min(amount),
        }
    }

    /// Checks everything except the per-tenant usage count, which needs the
    /// database.
    pub fn check(
        &self,
        now: DateTime<Utc>,
        plan: PlanId,
        amount: Decimal,
    ) -> Result<Decimal, CouponRejection> {
        if !self.is_valid(now) {
            return Err(CouponRejection::Expired);
        }
        if !self.applies_to(plan) {
            return Err(CouponRejection::NotApplicable);
        }
        if amount < self.min_purchase_amount {
            return Err(CouponRejection::BelowMinimum(self.min_purchase_amount));
        }
        Ok(self.calculate_discount(amount))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponRejection {
    #[error("Invalid coupon code")]
    Unknown,
    #[error("Coupon is expired or no longer valid")]
    Expired,
    #[error("Coupon is not applicable to this plan")]
    NotApplicable,
    #[error("Minimum purchase amount of {0} required for this coupon")]
    BelowMinimum(Decimal),
    #[error("Coupon usage limit reached for this account")]
    TenantLimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CouponUsage {
    pub id: Uuid,
    pub coupon_id: Uuid,
    pub tenant_id: TenantId,
    pub subscription_id: Option<SubscriptionId>,
    pub discount_amount: Decimal,
    pub used_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn plan(price: Decimal, period: BillingPeriod) -> SubscriptionPlan {
        let now = Utc::now();
        SubscriptionPlan {
            id: PlanId::new(),
            name: "Standard Plan".into(),
            slug: "standard".into(),
            plan_type: PlanType::Standard,
            description: String::new(),
            price,
            billing_period: period,
            max_students: 500,
            max_teachers: 50,
            max_departments: 10,
            max_storage_gb: 50,
            enable_sms: true,
            enable_email: true,
            enable_api_access: true,
            enable_custom_domain: false,
            enable_white_label: false,
            enable_analytics: true,
            enable_advanced_reports: true,
            enable_parent_portal: true,
            trial_days: 14,
            is_popular: true,
            is_active: true,
            display_order: 3,
            created_at: now,
            updated_at: now,
        }
    }

    fn coupon(kind: DiscountType, value: Decimal) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4(),
            code: "WELCOME".into(),
            name: "Welcome".into(),
            description: None,
            discount_type: kind,
            discount_value: value,
            valid_from: now - Duration::days(1),
            valid_until: Some(now + Duration::days(1)),
            max_uses: Some(10),
            times_used: 0,
            max_uses_per_tenant: 1,
            min_purchase_amount: Decimal::ZERO,
            applicable_plan_ids: vec![],
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn monthly_price_and_discount_follow_period() {
        let monthly = plan(dec!(99.99), BillingPeriod::Monthly);
        assert_eq!(monthly.monthly_price(), dec!(99.99));
        assert_eq!(monthly.discount_percentage(), 0);

        let quarterly = plan(dec!(270), BillingPeriod::Quarterly);
        assert_eq!(quarterly.monthly_price(), dec!(90));
        assert_eq!(quarterly.discount_percentage(), 10);

        let annual = plan(dec!(1000), BillingPeriod::Annually);
        assert_eq!(annual.monthly_price(), dec!(83.33));
        assert_eq!(annual.discount_percentage(), 20);
    }

    #[test]
    fn period_end_adds_calendar_months() {
        let p = plan(dec!(10), BillingPeriod::Quarterly);
        let start = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(
            p.period_end(start),
            Utc.with_ymd_and_hms(2025, 4, 30, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn fits_usage_checks_every_limit() {
        let p = plan(dec!(10), BillingPeriod::Monthly);
        assert!(p.fits_usage(500, 50, 10, 50.0));
        assert!(!p.fits_usage(501, 50, 10, 50.0));
        assert!(!p.fits_usage(500, 50, 11, 0.0));
        assert!(!p.fits_usage(10, 5, 1, 50.5));
    }

    #[test]
    fn invoice_totals_never_go_negative() {
        let t = InvoiceTotals::compute(dec!(100), dec!(18), dec!(10));
        assert_eq!(t.tax_amount, dec!(18));
        assert_eq!(t.total, dec!(108));

        let t = InvoiceTotals::compute(dec!(33.33), dec!(7.5), Decimal::ZERO);
        assert_eq!(t.tax_amount, dec!(2.50));

        let t = InvoiceTotals::compute(dec!(10), Decimal::ZERO, dec!(25));
        assert_eq!(t.total, Decimal::ZERO);
    }

    #[test]
    fn coupon_discounts() {
        let pct = coupon(DiscountType::Percentage, dec!(15));
        assert_eq!(pct.calculate_discount(dec!(99.99)), dec!(15.00));

        let fixed = coupon(DiscountType::Fixed, dec!(60));
        assert_eq!(fixed.calculate_discount(dec!(49.99)), dec!(49.99));
        assert_eq!(fixed.calculate_discount(dec!(100)), dec!(60));
    }

    #[test]
    fn coupon_validity_windows_and_usage() {
        let now = Utc::now();
        let mut c = coupon(DiscountType::Fixed, dec!(5));
        assert!(c.is_valid(now));

        c.times_used = 10;
        assert!(!c.is_valid(now));

        c.times_used = 0;
        c.valid_until = Some(now - Duration::seconds(1));
        assert!(!c.is_valid(now));

        c.valid_until = None;
        c.is_active = false;
        assert!(!c.is_valid(now));
    }

    #[test]
    fn coupon_check_reports_the_reason() {
        let now = Utc::now();
        let target = PlanId::new();
        let mut c = coupon(DiscountType::Percentage, dec!(10));
        c.applicable_plan_ids = vec![target];
        c.min_purchase_amount = dec!(50);

        assert_eq!(
            c.check(now, PlanId::new(), dec!(100)),
            Err(CouponRejection::NotApplicable)
        );
        assert_eq!(
            c.check(now, target, dec!(20)),
            Err(CouponRejection::BelowMinimum(dec!(50)))
        );
        assert_eq!(c.check(now, target, dec!(100)), Ok(dec!(10)));
    }

    #[test]
    fn refunds_track_remaining_amount() {
        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            tenant_id: TenantId::new(),
            subscription_id: None,
            amount: dec!(100),
            currency: "USD".into(),
            status: PaymentStatus::Succeeded,
            payment_method: PaymentMethod::Card,
            provider_payment_id: None,
            transaction_id: "TXN-20250101-ABCDEFGH".into(),
            payment_date: Some(now),
            description: None,
            failure_reason: None,
            refund_amount: dec!(40),
            refund_date: None,
            refund_reason: None,
            created_at: now,
            updated_at: now,
        };
        assert!(payment.can_refund());
        assert_eq!(payment.refundable_amount(), dec!(60));
        assert_eq!(payment.status_after_refund(dec!(60)), PaymentStatus::Refunded);
        assert_eq!(
            payment.status_after_refund(dec!(10)),
            PaymentStatus::PartiallyRefunded
        );
    }

    #[test]
    fn subscription_state_helpers() {
        let now = Utc::now();
        let mut sub = TenantSubscription {
            id: SubscriptionId::new(),
            tenant_id: TenantId::new(),
            plan_id: PlanId::new(),
            status: SubscriptionStatus::Trial,
            start_date: now,
            end_date: Some(now - Duration::days(3)),
            trial_end_date: Some(now + Duration::days(3)),
            next_billing_date: None,
            cancelled_at: None,
            auto_renew: true,
            cancel_at_period_end: false,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };
        assert!(sub.is_trial(now));
        assert!(sub.can_upgrade());
        assert!(!sub.can_downgrade());
        assert_eq!(sub.days_until_expiry(now), Some(0));

        sub.status = SubscriptionStatus::Active;
        sub.end_date = Some(now + Duration::days(30) + Duration::hours(1));
        assert!(!sub.is_trial(now));
        assert!(sub.can_downgrade());
        assert_eq!(sub.days_until_expiry(now), Some(30));
    }

    #[test]
    fn reference_numbers_have_fixed_shape() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(
            transaction_id(now, Some("pi_3abcDEF123456")),
            "TXN-20250309-PI_3ABCD"
        );
        let random = transaction_id(now, None);
        assert!(random.starts_with("TXN-20250309-"));
        assert_eq!(random.len(), "TXN-20250309-".len() + 8);

        let inv = invoice_number(now);
        assert!(inv.starts_with("INV-202503-"));
        let tail = &inv["INV-202503-".len()..];
        assert_eq!(tail.len(), 8);
        assert!(tail.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
