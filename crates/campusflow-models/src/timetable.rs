use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::enums::DayOfWeek;
use crate::ids::{TenantId, UserId};

pub const MAX_PERIOD: i32 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TimetableEntry {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub section_id: Uuid,
    pub academic_year_id: Uuid,
    pub day_of_week: DayOfWeek,
    pub period_number: i32,
    #[schema(value_type = String, format = "time", example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, format = "time", example = "09:50:00")]
    pub end_time: NaiveTime,
    pub subject_id: Uuid,
    pub teacher_id: UserId,
    pub room_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Timetable slot with display names, as shown in the teacher and student portals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TimetableSlot {
    pub id: Uuid,
    pub day_of_week: DayOfWeek,
    pub period_number: i32,
    #[schema(value_type = String, format = "time")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, format = "time")]
    pub end_time: NaiveTime,
    pub section_id: Uuid,
    pub section_name: String,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub teacher_id: UserId,
    pub teacher_name: String,
    pub room_number: Option<String>,
}
