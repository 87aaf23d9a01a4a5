use campusflow_core::{PaginationParams, serde::deserialize_optional_uuid};
use campusflow_models::{AnnouncementAudience, Priority};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAnnouncementDto {
    #[validate(length(min = 1, max = 200))]
    #[schema(example = "Mid-term timetable released")]
    pub title: String,
    #[validate(length(min = 1))]
    pub content: String,
    /// Defaults to `all`
    pub target_audience: Option<AnnouncementAudience>,
    /// Ignored on the department portal, which always posts to its own department
    pub department_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub priority: Option<Priority>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAnnouncementDto {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub content: Option<String>,
    pub target_audience: Option<AnnouncementAudience>,
    pub section_id: Option<Uuid>,
    pub priority: Option<Priority>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AnnouncementFilterParams {
    pub target_audience: Option<AnnouncementAudience>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub department_id: Option<Uuid>,
    /// Include announcements past their expiry
    #[serde(default)]
    pub include_expired: bool,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// An expiry, when given, has to lie in the future.
pub fn check_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<(), &'static str> {
    match expires_at {
        Some(at) if at <= now => Err("Expiry must be in the future"),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_in_the_past_is_rejected() {
        let now = Utc::now();
        assert!(check_expiry(None, now).is_ok());
        assert!(check_expiry(Some(now + Duration::days(3)), now).is_ok());
        assert_eq!(
            check_expiry(Some(now - Duration::minutes(1)), now),
            Err("Expiry must be in the future")
        );
    }

    #[test]
    fn audience_is_optional_on_create() {
        let dto: CreateAnnouncementDto = serde_json::from_value(serde_json::json!({
            "title": "Library closed",
            "content": "Closed for stocktaking on Friday",
            "priority": "high"
        }))
        .unwrap();
        assert_eq!(dto.target_audience, None);
        assert_eq!(dto.priority, Some(Priority::High));
    }

    #[test]
    fn blank_title_fails_validation() {
        let dto = CreateAnnouncementDto {
            title: String::new(),
            content: "x".into(),
            target_audience: None,
            department_id: None,
            section_id: None,
            priority: None,
            expires_at: None,
        };
        assert!(dto.validate().is_err());
    }
}
