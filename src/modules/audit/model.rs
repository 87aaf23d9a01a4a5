use campusflow_core::PaginationParams;
use campusflow_core::serde::deserialize_optional_uuid;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct AuditLogFilterParams {
    /// `create`, `update`, `delete`, `login`, ...
    pub action: Option<String>,
    pub resource_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub user_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}
