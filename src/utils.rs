use crate::error::{Result, ValuationError};
use crate::schema::EntityId;
use chrono::{Days, NaiveDate};

pub const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a stored `YYYY-MM-DD` date. Never falls back to a default date.
///
/// Only the zero-padded form is accepted, so the text of a valid date sorts
/// and compares the same way as the date itself.
pub fn parse_snapshot_date(entity_id: EntityId, raw: &str) -> Result<NaiveDate> {
    let malformed = || ValuationError::MalformedDate {
        entity_id,
        raw: raw.to_string(),
    };

    let text = raw.trim();
    let well_formed = text.len() == 10
        && text.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(malformed());
    }

    NaiveDate::parse_from_str(text, SNAPSHOT_DATE_FORMAT).map_err(|_| malformed())
}

pub fn format_snapshot_date(date: NaiveDate) -> String {
    date.format(SNAPSHOT_DATE_FORMAT).to_string()
}

/// Number of calendar days in `[start, end]`, zero when `end < start`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    if end < start {
        return 0;
    }
    (end - start).num_days() + 1
}

/// Every calendar day in `[start, end]`, ascending. Empty when `end < start`.
pub fn day_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Every calendar day strictly between `after` and `before`.
pub fn days_between_exclusive(
    after: NaiveDate,
    before: NaiveDate,
) -> impl Iterator<Item = NaiveDate> {
    after
        .iter_days()
        .skip(1)
        .take_while(move |d| *d < before)
}

pub fn window_start(today: NaiveDate, days: u64) -> Option<NaiveDate> {
    today.checked_sub_days(Days::new(days))
}

pub fn previous_day(date: NaiveDate) -> Option<NaiveDate> {
    date.pred_opt()
}
