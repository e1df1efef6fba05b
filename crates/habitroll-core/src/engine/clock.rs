//! Calendar-day arithmetic under a fixed UTC offset.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// Calendar date of `at` as seen from `offset`.
pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// `[start, end)` in UTC covering the local calendar day `date`.
pub fn day_bounds(date: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let utc_midnight = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
    let start = Utc.from_utc_datetime(&utc_midnight);
    (start, start + Duration::days(1))
}
