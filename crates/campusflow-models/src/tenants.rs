//! Tenants (colleges), their custom domains and plan limits.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::enums::SubscriptionStatus;
use crate::ids::TenantId;

/// A college account and the unit of data isolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub slug: String,
    pub subdomain: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
    pub subscription_status: SubscriptionStatus,
    /// Slug of the current plan
    pub subscription_plan: Option<String>,
    pub subscription_start_date: Option<NaiveDate>,
    pub subscription_end_date: Option<NaiveDate>,
    pub trial_end_date: Option<NaiveDate>,
    pub timezone: String,
    pub date_format: String,
    pub currency: String,
    pub academic_year_start_month: i32,
    pub academic_year_end_month: i32,
    pub max_students: i32,
    pub max_teachers: i32,
    pub max_departments: i32,
    pub max_storage_gb: i32,
    pub current_students: i32,
    pub current_teachers: i32,
    pub current_departments: i32,
    pub current_storage_gb: f64,
    pub onboarding_completed: bool,
    pub external_customer_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Trial or active, not past the subscription end date, and for trials
    /// not past the trial end date either.
    pub fn is_subscription_active(&self, today: NaiveDate) -> bool {
        if !self.subscription_status.is_live() {
            return false;
        }
        if self.subscription_status == SubscriptionStatus::Trial
            && self.trial_end_date.is_some_and(|end| end < today)
        {
            return false;
        }
        self.subscription_end_date.is_none_or(|end| end >= today)
    }

    /// Whether tenant-scoped API calls should be refused.
    pub fn is_gated(&self, today: NaiveDate) -> bool {
        !self.is_active || !self.is_subscription_active(today)
    }

    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.subscription_end_date
            .map(|end| (end - today).num_days())
    }

    fn usage(&self, kind: LimitKind) -> (f64, i32) {
        match kind {
            LimitKind::Students => (f64::from(self.current_students), self.max_students),
            LimitKind::Teachers => (f64::from(self.current_teachers), self.max_teachers),
            LimitKind::Departments => (f64::from(self.current_departments), self.max_departments),
            LimitKind::Storage => (self.current_storage_gb, self.max_storage_gb),
        }
    }

    /// Fails when adding `count` would push usage past the plan maximum.
    pub fn check_limit(&self, kind: LimitKind, count: f64) -> Result<(), LimitExceeded> {
        let (current, max) = self.usage(kind);
        if current + count > f64::from(max) {
            return Err(LimitExceeded { kind, max });
        }
        Ok(())
    }
}

/// Usage counters tracked on the tenant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    Students,
    Teachers,
    Departments,
    Storage,
}

impl LimitKind {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Students => "Students",
            Self::Teachers => "Teachers",
            Self::Departments => "Departments",
            Self::Storage => "Storage",
        }
    }

    /// Column holding the running count.
    pub const fn counter_column(&self) -> &'static str {
        match self {
            Self::Students => "current_students",
            Self::Teachers => "current_teachers",
            Self::Departments => "current_departments",
            Self::Storage => "current_storage_gb",
        }
    }

    const fn unit_suffix(&self) -> &'static str {
        match self {
            Self::Storage => " GB",
            _ => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} limit exceeded. Maximum: {max}{}", .kind.label(), .kind.unit_suffix())]
pub struct LimitExceeded {
    pub kind: LimitKind,
    pub max: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TenantDomain {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub domain: String,
    pub is_primary: bool,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal tenant view embedded in login and profile payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TenantSummary {
    pub id: TenantId,
    pub name: String,
    pub slug: String,
    pub subdomain: Option<String>,
    pub subscription_status: SubscriptionStatus,
}

impl From<&Tenant> for TenantSummary {
    fn from(t: &Tenant) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            slug: t.slug.clone(),
            subdomain: t.subdomain.clone(),
            subscription_status: t.subscription_status,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn tenant() -> Tenant {
        let now = Utc::now();
        Tenant {
            id: TenantId::new(),
            name: "Riverdale College".into(),
            slug: "riverdale-college".into(),
            subdomain: Some("riverdale".into()),
            email: "office@riverdale.edu".into(),
            phone: None,
            website: None,
            address_line1: None,
            address_line2: None,
            city: None,
            state: None,
            country: None,
            postal_code: None,
            primary_color: "#007bff".into(),
            secondary_color: "#6c757d".into(),
            subscription_status: SubscriptionStatus::Active,
            subscription_plan: Some("basic".into()),
            subscription_start_date: None,
            subscription_end_date: None,
            trial_end_date: None,
            timezone: "Asia/Kolkata".into(),
            date_format: "DD/MM/YYYY".into(),
            currency: "INR".into(),
            academic_year_start_month: 6,
            academic_year_end_month: 5,
            max_students: 10,
            max_teachers: 2,
            max_departments: 1,
            max_storage_gb: 5,
            current_students: 9,
            current_teachers: 2,
            current_departments: 0,
            current_storage_gb: 4.5,
            onboarding_completed: false,
            external_customer_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn active_without_end_date_is_live() {
        assert!(tenant().is_subscription_active(day(2025, 1, 1)));
    }

    #[test]
    fn end_date_is_inclusive() {
        let mut t = tenant();
        t.subscription_end_date = Some(day(2025, 3, 31));
        assert!(t.is_subscription_active(day(2025, 3, 31)));
        assert!(!t.is_subscription_active(day(2025, 4, 1)));
        assert_eq!(t.days_until_expiry(day(2025, 3, 21)), Some(10));
    }

    #[test]
    fn lapsed_trial_is_inactive() {
        let mut t = tenant();
        t.subscription_status = SubscriptionStatus::Trial;
        t.trial_end_date = Some(day(2025, 1, 14));
        assert!(t.is_subscription_active(day(2025, 1, 14)));
        assert!(!t.is_subscription_active(day(2025, 1, 15)));
    }

    #[test]
    fn suspended_or_deactivated_tenants_are_gated() {
        let mut t = tenant();
        t.subscription_status = SubscriptionStatus::Suspended;
        assert!(t.is_gated(day(2025, 1, 1)));

        let mut t = tenant();
        t.is_active = false;
        assert!(t.is_gated(day(2025, 1, 1)));
    }

    #[test]
    fn limits_report_kind_and_maximum() {
        let t = tenant();
        assert!(t.check_limit(LimitKind::Students, 1.0).is_ok());
        let err = t.check_limit(LimitKind::Students, 2.0).unwrap_err();
        assert_eq!(err.to_string(), "Students limit exceeded. Maximum: 10");

        let err = t.check_limit(LimitKind::Teachers, 1.0).unwrap_err();
        assert_eq!(err.to_string(), "Teachers limit exceeded. Maximum: 2");

        let err = t.check_limit(LimitKind::Storage, 1.0).unwrap_err();
        assert_eq!(err.to_string(), "Storage limit exceeded. Maximum: 5 GB");
    }
}
