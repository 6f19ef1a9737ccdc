use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use super::{Code, TimeOfDay};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// `YYYY-MM-DD` (de)serialization for [`time::Date`] fields.
pub(crate) mod iso_date {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::Date;

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = date.format(DATE_FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Date::parse(&raw, DATE_FORMAT).map_err(de::Error::custom)
    }
}

/// Parses an entry date, accepting either `YYYY-MM-DD` or a full datetime
/// string whose first ten characters are the date.
pub fn parse_entry_date(raw: &str) -> Result<Date, time::error::Parse> {
    let date_part = raw.get(..10).unwrap_or(raw);
    Date::parse(date_part, DATE_FORMAT)
}

/// Formats a date as `YYYY-MM-DD`.
pub fn format_entry_date(date: Date) -> Result<String, time::error::Format> {
    date.format(DATE_FORMAT)
}

/// A stored work-time entry, owned by a single user.
///
/// `start` and `end` span a half-open interval on `date`; entries for the
/// same user and day never overlap.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: i32,
    pub user_id: i32,
    #[serde(with = "iso_date")]
    pub date: Date,
    #[sqlx(try_from = "String")]
    pub code: Code,
    #[serde(rename = "start")]
    #[sqlx(rename = "start_min", try_from = "i32")]
    pub start: TimeOfDay,
    #[serde(rename = "end")]
    #[sqlx(rename = "end_min", try_from = "i32")]
    pub end: TimeOfDay,
    pub area_or_customer: Option<String>,
    pub customer_id: Option<i32>,
    pub description: Option<String>,
    pub order_number: Option<String>,
    pub todo: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Client-supplied fields for creating or updating an entry.
///
/// Everything is optional at the parsing stage; required fields are enforced
/// by the entry service so that a partial update can reuse the same shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDraft {
    pub date: Option<String>,
    pub code: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub customer_id: Option<i32>,
    pub description: Option<String>,
    pub order_number: Option<String>,
    pub todo: Option<bool>,
}
