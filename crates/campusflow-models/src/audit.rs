//! Audit trail rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::enums::AuditStatus;
use crate::ids::{TenantId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<UserId>,
    pub tenant_id: Option<TenantId>,
    /// `create`, `update`, `delete`, `login`, `logout`, `password_reset`, ...
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub description: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub changes: Option<serde_json::Value>,
    pub status: AuditStatus,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to append one audit row.
#[derive(Debug, Clone, Default)]
pub struct NewAuditLog {
    pub user_id: Option<UserId>,
    pub tenant_id: Option<TenantId>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub description: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub changes: Option<serde_json::Value>,
    pub status: Option<AuditStatus>,
}

impl NewAuditLog {
    pub fn event(action: &str, resource_type: &str) -> Self {
        Self {
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            ..Self::default()
        }
    }
}
