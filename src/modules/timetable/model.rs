use campusflow_core::serde::deserialize_optional_uuid;
use campusflow_models::{DayOfWeek, UserId, timetable::MAX_PERIOD};
use chrono::NaiveTime;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTimetableEntryDto {
    pub section_id: Uuid,
    /// Defaults to the section's academic year
    pub academic_year_id: Option<Uuid>,
    pub day_of_week: DayOfWeek,
    #[validate(range(min = 1, max = 12))]
    pub period_number: i32,
    #[schema(value_type = String, format = "time", example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, format = "time", example = "09:50:00")]
    pub end_time: NaiveTime,
    pub subject_id: Uuid,
    pub teacher_id: UserId,
    #[validate(length(max = 20))]
    pub room_number: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTimetableEntryDto {
    pub day_of_week: Option<DayOfWeek>,
    #[validate(range(min = 1, max = 12))]
    pub period_number: Option<i32>,
    #[schema(value_type = Option<String>, format = "time")]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>, format = "time")]
    pub end_time: Option<NaiveTime>,
    pub subject_id: Option<Uuid>,
    pub teacher_id: Option<UserId>,
    #[validate(length(max = 20))]
    pub room_number: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TimetableFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub section_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub teacher_id: Option<Uuid>,
    pub day_of_week: Option<DayOfWeek>,
}

/// Period within the school day and a non-empty time range.
pub fn check_slot(period: i32, start: NaiveTime, end: NaiveTime) -> Result<(), &'static str> {
    if !(1..=MAX_PERIOD).contains(&period) {
        return Err("Period number must be between 1 and 12");
    }
    if start >= end {
        return Err("Start time must be before end time");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn slot_bounds() {
        assert!(check_slot(1, t(9, 0), t(9, 50)).is_ok());
        assert!(check_slot(12, t(16, 0), t(16, 45)).is_ok());
        assert_eq!(
            check_slot(0, t(9, 0), t(9, 50)),
            Err("Period number must be between 1 and 12")
        );
        assert!(check_slot(13, t(9, 0), t(9, 50)).is_err());
        assert_eq!(
            check_slot(3, t(11, 0), t(11, 0)),
            Err("Start time must be before end time")
        );
    }

    #[test]
    fn parses_times_and_lowercase_days() {
        let dto: CreateTimetableEntryDto = serde_json::from_value(serde_json::json!({
            "section_id": Uuid::new_v4(),
            "day_of_week": "wednesday",
            "period_number": 4,
            "start_time": "11:10:00",
            "end_time": "12:00:00",
            "subject_id": Uuid::new_v4(),
            "teacher_id": Uuid::new_v4(),
        }))
        .unwrap();
        assert_eq!(dto.day_of_week, DayOfWeek::Wednesday);
        assert_eq!(dto.start_time, t(11, 10));
        assert!(dto.validate().is_ok());
    }
}
