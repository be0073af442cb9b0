//! Text encodings for columns `SQLite` has no native type for.
//!
//! Timestamps are fixed-width RFC 3339 in UTC with a `Z` suffix, so string
//! comparison in SQL matches chronological order.

use std::str::FromStr;

use chrono::{NaiveDate, SecondsFormat};

use pillminder_domain::id::MedicineId;
use pillminder_domain::time::Timestamp;

pub(crate) fn encode_created_at(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn encode_due_at(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn decode_error(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

pub(crate) fn decode_timestamp(value: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.to_utc())
        .map_err(decode_error)
}

pub(crate) fn decode_date(value: &str) -> Result<NaiveDate, sqlx::Error> {
    NaiveDate::from_str(value).map_err(decode_error)
}

pub(crate) fn decode_id(value: &str) -> Result<MedicineId, sqlx::Error> {
    MedicineId::from_str(value).map_err(decode_error)
}

pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(value: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(value).map_err(decode_error)
}
