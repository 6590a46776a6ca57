//! Local-time helpers.
//!
//! Timestamps are stored in UTC, but a parking lot lives in one time zone:
//! "today", report day boundaries and weekday buckets are all local notions.
//! The service runs with a single fixed UTC offset.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Utc};

/// Weekday labels indexed by [`weekday_index`] (0 = Sunday).
pub const WEEKDAY_LABELS: [&str; 7] = ["Dom", "Seg", "Ter", "Qua", "Qui", "Sex", "Sáb"];

/// First instant (00:00:00.000) of `date` in the given offset.
#[must_use]
pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::default());
    let utc = local - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, Utc)
}

/// Last millisecond (23:59:59.999) of `date` in the given offset.
#[must_use]
pub fn end_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    start_of_day(date, offset) + TimeDelta::days(1) - TimeDelta::milliseconds(1)
}

/// Local midnight of the day containing `now`.
#[must_use]
pub fn local_midnight(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    start_of_day(now.with_timezone(&offset).date_naive(), offset)
}

/// Local weekday of `at`, 0 = Sunday through 6 = Saturday.
#[must_use]
pub fn weekday_index(at: DateTime<Utc>, offset: FixedOffset) -> usize {
    at.with_timezone(&offset).weekday().num_days_from_sunday() as usize
}
