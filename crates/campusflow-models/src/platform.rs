//! Platform operator data: support desk, settings and global announcements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::enums::{GlobalAnnouncementType, Priority, SettingDataType, TicketCategory, TicketStatus};
use crate::ids::{TenantId, UserId};

pub const TICKET_PREFIX: &str = "TKT-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SupportTicket {
    pub id: Uuid,
    pub ticket_number: String,
    pub tenant_id: TenantId,
    pub created_by: Option<UserId>,
    pub assigned_to: Option<UserId>,
    pub subject: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: Priority,
    pub status: TicketStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupportTicket {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TicketComment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Option<UserId>,
    pub message: String,
    /// Staff-only note, hidden from the college
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TicketWithComments {
    #[serde(flatten)]
    pub ticket: SupportTicket,
    pub comments: Vec<TicketComment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SystemSetting {
    pub id: Uuid,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub data_type: SettingDataType,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SystemSetting {
    /// The stored text converted according to `data_type`.
    ///
    /// Values that fail to parse as their declared type fall back to the
    /// raw string.
    pub fn typed_value(&self) -> serde_json::Value {
        use serde_json::Value;

        let raw = self.value.trim();
        match self.data_type {
            SettingDataType::Integer => raw
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(self.value.clone())),
            SettingDataType::Boolean => {
                Value::Bool(matches!(raw.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            }
            SettingDataType::Json => serde_json::from_str(raw)
                .unwrap_or_else(|_| Value::String(self.value.clone())),
            SettingDataType::Text => Value::String(self.value.clone()),
        }
    }
}

/// Setting as returned to clients, with the parsed value alongside.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SettingView {
    #[serde(flatten)]
    pub setting: SystemSetting,
    pub typed_value: serde_json::Value,
}

impl From<SystemSetting> for SettingView {
    fn from(setting: SystemSetting) -> Self {
        Self {
            typed_value: setting.typed_value(),
            setting,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct GlobalAnnouncement {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub announcement_type: GlobalAnnouncementType,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub show_on_login: bool,
    pub target_all_tenants: bool,
    pub target_tenant_ids: Vec<TenantId>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GlobalAnnouncement {
    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && self.end_date.is_none_or(|end| now <= end)
    }

    pub fn targets(&self, tenant: Option<TenantId>) -> bool {
        self.target_all_tenants || tenant.is_some_and(|t| self.target_tenant_ids.contains(&t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn setting(data_type: SettingDataType, value: &str) -> SystemSetting {
        let now = Utc::now();
        SystemSetting {
            id: Uuid::new_v4(),
            key: "k".into(),
            value: value.into(),
            description: None,
            data_type,
            is_public: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn typed_values() {
        assert_eq!(setting(SettingDataType::Integer, "42").typed_value(), 42);
        assert_eq!(
            setting(SettingDataType::Integer, "4x").typed_value(),
            serde_json::json!("4x")
        );
        assert_eq!(setting(SettingDataType::Boolean, "YES").typed_value(), true);
        assert_eq!(setting(SettingDataType::Boolean, "1").typed_value(), true);
        assert_eq!(setting(SettingDataType::Boolean, "off").typed_value(), false);
        assert_eq!(
            setting(SettingDataType::Json, r#"{"a":[1,2]}"#).typed_value(),
            serde_json::json!({"a": [1, 2]})
        );
        assert_eq!(
            setting(SettingDataType::Text, "hello").typed_value(),
            serde_json::json!("hello")
        );
    }

    #[test]
    fn announcement_visibility_window() {
        let now = Utc::now();
        let tenant = TenantId::new();
        let mut a = GlobalAnnouncement {
            id: Uuid::new_v4(),
            title: "Maintenance".into(),
            message: "Sunday 02:00 UTC".into(),
            announcement_type: GlobalAnnouncementType::Maintenance,
            start_date: now - Duration::hours(1),
            end_date: Some(now + Duration::hours(1)),
            is_active: true,
            show_on_login: true,
            target_all_tenants: false,
            target_tenant_ids: vec![tenant],
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        assert!(a.is_visible(now));
        assert!(a.targets(Some(tenant)));
        assert!(!a.targets(Some(TenantId::new())));
        assert!(!a.targets(None));

        a.start_date = now + Duration::minutes(5);
        assert!(!a.is_visible(now));

        a.start_date = now - Duration::hours(2);
        a.end_date = Some(now - Duration::seconds(1));
        assert!(!a.is_visible(now));
    }
}
