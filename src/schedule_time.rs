//! # Schedule Times
//!
//! Start and end times travel as text in the fixed layout
//! `YYYY-MM-DDThh:mm:ssZ` (UTC, second precision). The same layout is used
//! to parse configuration and to format what the remote API returns, so a
//! value read back compares equal to the value that was declared.

use crate::constants::SCHEDULE_TIME_LAYOUT;
use crate::error::ReconcileError;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a configured time, naming the field in the error
///
/// # Errors
///
/// Returns [`ReconcileError::TimeParse`] if `value` is not in the fixed layout.
pub fn parse(field: &'static str, value: &str) -> Result<DateTime<Utc>, ReconcileError> {
    NaiveDateTime::parse_from_str(value, SCHEDULE_TIME_LAYOUT)
        .map(|naive| naive.and_utc())
        .map_err(|source| ReconcileError::TimeParse {
            field,
            value: value.to_string(),
            source,
        })
}

/// Parse an optional configured time
///
/// # Errors
///
/// Returns [`ReconcileError::TimeParse`] if a value is present and malformed.
pub fn parse_opt(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, ReconcileError> {
    value.map(|v| parse(field, v)).transpose()
}

/// Format a remote timestamp in the fixed layout
#[must_use]
pub fn format(time: &DateTime<Utc>) -> String {
    time.format(SCHEDULE_TIME_LAYOUT).to_string()
}
