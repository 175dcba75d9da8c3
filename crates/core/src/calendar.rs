//! Calendar-month arithmetic on UTC instants.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

use crate::error::{DomainError, DomainResult};

/// First instant (00:00:00 UTC on day 1) of the month containing `at`.
pub fn month_start(at: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(at.year(), at.month(), 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(at)
}

/// Shift an instant by whole calendar months (negative moves backwards).
///
/// Day-of-month is clamped to the target month's length.
pub fn add_months(at: DateTime<Utc>, months: i64) -> DomainResult<DateTime<Utc>> {
    let magnitude = u32::try_from(months.unsigned_abs())
        .map_err(|_| DomainError::date_out_of_range(format!("{months} months")))?;
    let shifted = if months >= 0 {
        at.checked_add_months(Months::new(magnitude))
    } else {
        at.checked_sub_months(Months::new(magnitude))
    };
    shifted.ok_or_else(|| DomainError::date_out_of_range(format!("{at} shifted by {months} months")))
}

/// Month starts from `from`'s month through `to`'s month, inclusive.
pub fn month_starts_between(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let last = month_start(to);
    let mut cursor = month_start(from);
    while cursor <= last {
        out.push(cursor);
        match cursor.checked_add_months(Months::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    out
}
