use campusflow_core::{PaginationParams, serde::deserialize_optional_uuid};
use campusflow_models::{
    GlobalAnnouncementType, Priority, SettingDataType, TenantId, TicketCategory, TicketStatus,
    UserId,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTicketDto {
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub category: Option<TicketCategory>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTicketDto {
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    /// Platform administrator handling the ticket
    pub assigned_to: Option<UserId>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCommentDto {
    #[validate(length(min = 1))]
    pub message: String,
    /// Staff-only note; ignored when posted by a college
    #[serde(default)]
    pub is_internal: bool,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TicketFilterParams {
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    /// Company portal only
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub tenant_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSettingDto {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "support_email")]
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub data_type: Option<SettingDataType>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSettingDto {
    pub value: Option<String>,
    pub description: Option<String>,
    pub data_type: Option<SettingDataType>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGlobalAnnouncementDto {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub message: String,
    pub announcement_type: Option<GlobalAnnouncementType>,
    /// Defaults to now
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub show_on_login: Option<bool>,
    pub target_all_tenants: Option<bool>,
    pub target_tenant_ids: Option<Vec<TenantId>>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateGlobalAnnouncementDto {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub message: Option<String>,
    pub announcement_type: Option<GlobalAnnouncementType>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub show_on_login: Option<bool>,
    pub target_all_tenants: Option<bool>,
    pub target_tenant_ids: Option<Vec<TenantId>>,
}

/// `end` must fall after `start` when both are known.
pub fn check_window(
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> Result<(), &'static str> {
    match end {
        Some(end) if end <= start => Err("End date must be after start date"),
        _ => Ok(()),
    }
}
