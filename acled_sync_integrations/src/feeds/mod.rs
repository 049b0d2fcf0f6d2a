//! Feed implementations. Each module owns one provider shape and an explicit
//! typed mapping into the canonical feature schema.

pub mod global;
pub mod region;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Canonical `YYYY-MM-DD` rendering of a provider date string.
///
/// Accepts the date forms the provider has been seen emitting: plain ISO
/// dates, ISO datetimes with or without offsets, and space-separated
/// datetimes. `None` means the record carries no usable date.
pub(crate) fn format_event_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Numeric-parse policy for attributes: failure yields `None`, which the
/// store receives as null.
pub(crate) fn parse_i64(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

pub(crate) fn parse_i32(raw: &str) -> Option<i32> {
    raw.trim().parse().ok()
}

pub(crate) fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse().ok()
}
