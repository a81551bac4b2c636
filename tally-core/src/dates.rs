//! Date parsing for the formats found in statement exports.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parse a date written either ISO style or day-first (UK exports).
///
/// A trailing time of day is accepted and discarded.
pub fn parse_day_first(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    bail!("unrecognised date {s:?}")
}

/// Calendar date of an RFC 3339 timestamp, in the timestamp's own offset.
///
/// Example: "2017-03-04T12:34:56.789Z" -> 2017-03-04
pub fn parse_timestamp_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    // Fall back to the leading YYYY-MM-DD
    let prefix = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").with_context(|| format!("unrecognised timestamp {s:?}"))
}
