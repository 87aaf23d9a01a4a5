use campusflow_core::{PaginationParams, codes::format_file_size, serde::deserialize_optional_bool};
use campusflow_models::{Email, SubscriptionStatus, Tenant, TenantId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTenantDto {
    #[validate(length(min = 2, max = 200))]
    pub name: String,
    /// Defaults to the slug
    #[validate(length(min = 2, max = 63))]
    pub subdomain: Option<String>,
    pub email: Email,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub website: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    /// Plan slug whose limits apply; defaults to `free-trial`
    pub plan: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTenantDto {
    #[validate(length(min = 2, max = 200))]
    pub name: Option<String>,
    pub email: Option<Email>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    #[validate(length(equal = 7))]
    pub primary_color: Option<String>,
    #[validate(length(equal = 7))]
    pub secondary_color: Option<String>,
    pub timezone: Option<String>,
    pub date_format: Option<String>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(range(min = 0))]
    pub max_students: Option<i32>,
    #[validate(range(min = 0))]
    pub max_teachers: Option<i32>,
    #[validate(range(min = 0))]
    pub max_departments: Option<i32>,
    #[validate(range(min = 0))]
    pub max_storage_gb: Option<i32>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub subscription_end_date: Option<NaiveDate>,
    pub onboarding_completed: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TenantFilterParams {
    /// Matches name, slug or email
    pub search: Option<String>,
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDomainDto {
    #[validate(length(min = 4, max = 253))]
    #[schema(example = "portal.riverdale.edu")]
    pub domain: String,
    #[serde(default)]
    pub is_primary: bool,
}

impl CreateDomainDto {
    /// Lowercased, without a trailing dot.
    pub fn normalized_domain(&self) -> String {
        self.domain.trim().trim_end_matches('.').to_ascii_lowercase()
    }
}

/// One counted resource against its plan maximum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UsageLine {
    pub current: f64,
    pub max: i32,
    pub percentage: f64,
}

impl UsageLine {
    fn new(current: f64, max: i32) -> Self {
        let percentage = if max > 0 {
            (current / f64::from(max) * 10000.0).round() / 100.0
        } else {
            0.0
        };
        Self {
            current,
            max,
            percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TenantUsage {
    pub tenant_id: TenantId,
    pub students: UsageLine,
    pub teachers: UsageLine,
    pub departments: UsageLine,
    pub storage: UsageLine,
    /// Storage in use, e.g. `1.50 GB`
    pub storage_used: String,
    pub storage_limit: String,
}

impl From<&Tenant> for TenantUsage {
    fn from(t: &Tenant) -> Self {
        Self {
            tenant_id: t.id,
            students: UsageLine::new(f64::from(t.current_students), t.max_students),
            teachers: UsageLine::new(f64::from(t.current_teachers), t.max_teachers),
            departments: UsageLine::new(f64::from(t.current_departments), t.max_departments),
            storage: UsageLine::new(t.current_storage_gb, t.max_storage_gb),
            storage_used: format_file_size(t.current_storage_gb * BYTES_PER_GB),
            storage_limit: format_file_size(f64::from(t.max_storage_gb) * BYTES_PER_GB),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TenantCounts {
    pub total: i64,
    pub active: i64,
    pub trial: i64,
    pub paid: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserCounts {
    pub total: i64,
    pub active: i64,
}

/// Platform overview for the company portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompanyDashboard {
    pub tenants: TenantCounts,
    pub users: UserCounts,
    /// Succeeded payments since the start of the month
    pub revenue_this_month: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_percentages_round_to_two_places() {
        let line = UsageLine::new(1.0, 3);
        assert_eq!(line.percentage, 33.33);
        assert_eq!(UsageLine::new(5.0, 0).percentage, 0.0);
    }

    #[test]
    fn domains_are_normalized() {
        let dto = CreateDomainDto {
            domain: " Portal.Riverdale.EDU. ".into(),
            is_primary: false,
        };
        assert_eq!(dto.normalized_domain(), "portal.riverdale.edu");
    }
}
