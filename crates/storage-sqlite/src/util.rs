//! Conversions between domain values and their TEXT column encodings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use quizkit_core::errors::{DatabaseError, Error, Result};

pub(crate) fn to_ts(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            Error::Database(DatabaseError::Internal(format!(
                "bad timestamp '{value}': {e}"
            )))
        })
}

pub(crate) fn parse_ts_opt(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value.map(parse_ts).transpose()
}

pub(crate) fn to_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        Error::Database(DatabaseError::Internal(format!("bad date '{value}': {e}")))
    })
}

/// JSON-encoded string list columns (duel question lists, selected sets).
pub(crate) fn to_json_list(values: &[String]) -> Result<String> {
    Ok(serde_json::to_string(values)?)
}

pub(crate) fn from_json_list(value: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(value)?)
}
