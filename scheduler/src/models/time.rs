//! Calendar arithmetic over epoch-millisecond timestamps.
//!
//! The engine computes on raw `f64` epoch milliseconds; this module holds the
//! chrono-backed conversions needed to project recurring restrictions onto
//! the calendar (day/week/year snapping, decimal day and month offsets).
//! All calendar math is UTC.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};

/// Milliseconds in one hour.
pub const MS_PER_HOUR: f64 = 3_600_000.0;
/// Milliseconds in one day.
pub const MS_PER_DAY: f64 = 86_400_000.0;
/// Milliseconds in one week.
pub const MS_PER_WEEK: f64 = 7.0 * MS_PER_DAY;

/// Convert an epoch-millisecond timestamp to a chrono `DateTime<Utc>`.
pub fn to_datetime(ts_ms: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts_ms.floor() as i64).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Convert a chrono `DateTime<Utc>` to epoch milliseconds.
pub fn from_datetime(dt: DateTime<Utc>) -> f64 {
    dt.timestamp_millis() as f64
}

/// Midnight of the day containing `ts_ms`.
pub fn start_of_day(ts_ms: f64) -> f64 {
    let date = to_datetime(ts_ms).date_naive();
    from_datetime(date.and_time(NaiveTime::MIN).and_utc())
}

/// Midnight of the ISO week (Monday) containing `ts_ms`.
pub fn start_of_week(ts_ms: f64) -> f64 {
    let dt = to_datetime(ts_ms);
    let offset_days = dt.weekday().num_days_from_monday() as f64;
    start_of_day(ts_ms) - offset_days * MS_PER_DAY
}

/// Midnight of January 1st of the year containing `ts_ms`.
pub fn start_of_year(ts_ms: f64) -> f64 {
    let dt = to_datetime(ts_ms);
    let jan1 = NaiveDate::from_ymd_opt(dt.year(), 1, 1).unwrap_or(dt.date_naive());
    from_datetime(jan1.and_time(NaiveTime::MIN).and_utc())
}

/// Shift by a fractional number of hours.
pub fn add_hours(ts_ms: f64, hours: f64) -> f64 {
    ts_ms + hours * MS_PER_HOUR
}

/// Shift by a fractional number of days (whole days plus 24h fractions; in
/// UTC both collapse to a constant millisecond offset).
pub fn add_decimal_days(ts_ms: f64, days: f64) -> f64 {
    ts_ms + days * MS_PER_DAY
}

/// Shift by a fractional number of months: whole months move through the
/// calendar, the fraction scales with the length of the landing month.
pub fn add_decimal_months(ts_ms: f64, months: f64) -> f64 {
    let whole = months.floor();
    let fraction = months - whole;
    let dt = to_datetime(ts_ms);
    let shifted = if whole >= 0.0 {
        dt.checked_add_months(Months::new(whole as u32)).unwrap_or(dt)
    } else {
        dt.checked_sub_months(Months::new((-whole) as u32)).unwrap_or(dt)
    };
    from_datetime(shifted) + fraction * days_in_month(shifted.year(), shifted.month()) * MS_PER_DAY
}

/// Shift by whole calendar years (12-month steps, leap-year aware).
pub fn add_calendar_years(ts_ms: f64, years: u32) -> f64 {
    let dt = to_datetime(ts_ms);
    let shifted = dt.checked_add_months(Months::new(12 * years)).unwrap_or(dt);
    from_datetime(shifted)
}

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> f64 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(a), Some(b)) => (b - a).num_days() as f64,
        _ => 30.0,
    }
}
