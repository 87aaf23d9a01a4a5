//! Tenant announcements and who gets to see them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::enums::{AnnouncementAudience, Priority, RoleName};
use crate::ids::{TenantId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Announcement {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub title: String,
    pub content: String,
    pub target_audience: AnnouncementAudience,
    pub department_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub priority: Priority,
    pub expires_at: Option<DateTime<Utc>>,
    pub posted_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Announcement {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires| now < expires)
    }
}

impl AnnouncementAudience {
    /// Audiences a role reads. `None` means every audience.
    pub fn visible_to(role: RoleName) -> Option<&'static [AnnouncementAudience]> {
        match role {
            RoleName::SuperAdmin | RoleName::TenantAdmin => None,
            RoleName::Student => Some(&[Self::All, Self::Students]),
            RoleName::Teacher | RoleName::DepartmentAdmin => Some(&[Self::All, Self::Teachers]),
            RoleName::Parent => Some(&[Self::All, Self::Parents]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_is_exclusive() {
        let now = Utc::now();
        let mut a = Announcement {
            id: Uuid::new_v4(),
            tenant_id: TenantId::new(),
            title: "Exams".into(),
            content: "Timetable posted".into(),
            target_audience: AnnouncementAudience::All,
            department_id: None,
            section_id: None,
            priority: Priority::Medium,
            expires_at: None,
            posted_by: None,
            created_at: now,
            updated_at: now,
        };
        assert!(a.is_active(now));
        a.expires_at = Some(now + Duration::hours(1));
        assert!(a.is_active(now));
        a.expires_at = Some(now);
        assert!(!a.is_active(now));
    }

    #[test]
    fn audiences_per_role() {
        assert_eq!(AnnouncementAudience::visible_to(RoleName::TenantAdmin), None);
        let teacher = AnnouncementAudience::visible_to(RoleName::DepartmentAdmin).unwrap();
        assert!(teacher.contains(&AnnouncementAudience::Teachers));
        assert!(!teacher.contains(&AnnouncementAudience::Students));
        let parent = AnnouncementAudience::visible_to(RoleName::Parent).unwrap();
        assert_eq!(parent, &[AnnouncementAudience::All, AnnouncementAudience::Parents]);
    }
}
