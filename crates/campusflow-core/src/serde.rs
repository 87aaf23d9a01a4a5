//! Lenient deserializers for query strings.
//!
//! Browsers and HTML forms send empty strings for unset filters, and
//! `#[serde(flatten)]` hands every value over as a string. These helpers
//! treat `""` as `None` and parse the rest.

use serde::{Deserialize, Deserializer};
use uuid::Uuid;

fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.trim().is_empty()))
}

pub fn deserialize_optional_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_string(deserializer)?
        .map(|s| Uuid::parse_str(&s).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_string(deserializer)?
        .map(|s| s.parse::<i64>().map_err(serde::de::Error::custom))
        .transpose()
}

pub fn deserialize_optional_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_string(deserializer)?
        .map(|s| match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "invalid boolean value: {other}"
            ))),
        })
        .transpose()
}

pub fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<chrono::NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_string(deserializer)?
        .map(|s| {
            chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(serde::de::Error::custom)
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Filters {
        #[serde(default, deserialize_with = "deserialize_optional_uuid")]
        id: Option<Uuid>,
        #[serde(default, deserialize_with = "deserialize_optional_bool")]
        active: Option<bool>,
        #[serde(default, deserialize_with = "deserialize_optional_date")]
        on: Option<chrono::NaiveDate>,
    }

    #[test]
    fn empty_strings_are_none() {
        let f: Filters = serde_json::from_str(r#"{"id":"","active":"","on":""}"#).unwrap();
        assert!(f.id.is_none());
        assert!(f.active.is_none());
        assert!(f.on.is_none());
    }

    #[test]
    fn values_parse() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"id":"{id}","active":"Yes","on":"2024-06-01"}}"#);
        let f: Filters = serde_json::from_str(&json).unwrap();
        assert_eq!(f.id, Some(id));
        assert_eq!(f.active, Some(true));
        assert_eq!(
            f.on,
            chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
        );
    }

    #[test]
    fn bad_boolean_is_rejected() {
        let res: Result<Filters, _> = serde_json::from_str(r#"{"active":"maybe"}"#);
        assert!(res.is_err());
    }
}
