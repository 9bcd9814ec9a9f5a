//! Calendar arithmetic for deadline windows.
//!
//! Every "days until" figure in the engine is a ceiling over whole days:
//!
//! - Calendar dates are first normalised to local midnight, so two
//!   timestamps on the same local day are always zero days apart.
//! - Full-precision timestamps (standalone reminders) are compared to the
//!   millisecond and the difference is rounded up with [`ceil_days`].
//!
//! Dates arrive as raw strings so a malformed value can be reported against
//! the single record that carries it. Accepted forms:
//!
//! - `YYYY-MM-DD`
//! - RFC 3339 (`2025-03-15T09:30:00Z`, `2025-03-15T09:30:00+01:00`)
//! - naive `YYYY-MM-DDTHH:MM:SS[.fff]`, read as office-local time

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};

use crate::EngineError;

/// Milliseconds in one calendar day.
pub const DAY_MS: i64 = 86_400_000;

const DATE_FORMAT: &str = "%Y-%m-%d";
const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Round a millisecond difference up to whole days.
///
/// `ceil_days(1) == 1`, `ceil_days(-1) == 0`, `ceil_days(-DAY_MS) == -1`.
pub fn ceil_days(ms: i64) -> i64 {
    let floor_of_negated = ms.saturating_neg().div_euclid(DAY_MS);
    -floor_of_negated
}

/// Whole days from `today` to `target`, both already at local midnight.
pub fn days_until(target: NaiveDate, today: NaiveDate) -> i64 {
    ceil_days((target - today).num_milliseconds())
}

/// The office-local calendar day containing `now`.
pub fn local_today(now: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    now.with_timezone(offset).date_naive()
}

/// Shift a calendar date by `days`, reporting overflow against `field`.
pub fn add_days(date: NaiveDate, days: i64, field: &'static str) -> Result<NaiveDate, EngineError> {
    TimeDelta::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or(EngineError::DateOutOfRange { field, days })
}

/// Parse a calendar-date field and drop its time of day.
///
/// Offset-carrying timestamps are converted to the office offset first, so
/// `2025-03-14T23:30:00-01:00` is 15 March for a UTC office.
pub fn parse_calendar_date(
    field: &'static str,
    raw: &str,
    offset: &FixedOffset,
) -> Result<NaiveDate, EngineError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Ok(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(offset).date_naive());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, NAIVE_DATETIME_FORMAT) {
        return Ok(naive.date());
    }
    Err(invalid(field, raw))
}

/// Parse a timestamp field at full precision.
///
/// A bare date means local midnight of that day.
pub fn parse_instant(
    field: &'static str,
    raw: &str,
    offset: &FixedOffset,
) -> Result<DateTime<Utc>, EngineError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let naive = match NaiveDateTime::parse_from_str(raw, NAIVE_DATETIME_FORMAT) {
        Ok(naive) => naive,
        Err(_) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map(|date| date.and_time(NaiveTime::MIN))
            .map_err(|_| invalid(field, raw))?,
    };
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|ts| ts.with_timezone(&Utc))
        .ok_or_else(|| invalid(field, raw))
}

fn invalid(field: &'static str, raw: &str) -> EngineError {
    EngineError::InvalidDate {
        field,
        value: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ceil_days_rounds_toward_positive_infinity() {
        assert_eq!(ceil_days(0), 0);
        assert_eq!(ceil_days(1), 1);
        assert_eq!(ceil_days(DAY_MS), 1);
        assert_eq!(ceil_days(DAY_MS + 1), 2);
        assert_eq!(ceil_days(-1), 0);
        assert_eq!(ceil_days(-DAY_MS), -1);
        assert_eq!(ceil_days(-DAY_MS - 1), -1);
        assert_eq!(ceil_days(-7 * DAY_MS), -7);
    }

    #[test]
    fn days_until_counts_whole_days() {
        let today = ymd(2025, 3, 15);
        assert_eq!(days_until(ymd(2025, 3, 15), today), 0);
        assert_eq!(days_until(ymd(2025, 3, 17), today), 2);
        assert_eq!(days_until(ymd(2025, 3, 5), today), -10);
        assert_eq!(days_until(ymd(2025, 4, 1), today), 17);
    }

    #[test]
    fn same_day_timestamps_normalise_to_zero() {
        let today = ymd(2025, 3, 15);
        let early = parse_calendar_date("d", "2025-03-15T00:01:00Z", &utc()).unwrap();
        let late = parse_calendar_date("d", "2025-03-15T23:59:00Z", &utc()).unwrap();
        assert_eq!(days_until(early, today), 0);
        assert_eq!(days_until(late, today), 0);
    }

    #[test]
    fn calendar_date_forms() {
        let expected = ymd(2025, 3, 15);
        assert_eq!(parse_calendar_date("d", "2025-03-15", &utc()).unwrap(), expected);
        assert_eq!(parse_calendar_date("d", " 2025-03-15 ", &utc()).unwrap(), expected);
        assert_eq!(
            parse_calendar_date("d", "2025-03-15T10:30:00.000Z", &utc()).unwrap(),
            expected
        );
        assert_eq!(
            parse_calendar_date("d", "2025-03-15T10:30:00", &utc()).unwrap(),
            expected
        );
    }

    #[test]
    fn calendar_date_uses_office_offset() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        // 23:30 UTC on the 14th is already the 15th two hours east.
        let date = parse_calendar_date("d", "2025-03-14T23:30:00Z", &plus_two).unwrap();
        assert_eq!(date, ymd(2025, 3, 15));
    }

    #[test]
    fn malformed_date_names_field() {
        let err = parse_calendar_date("applicationDate", "15/03/2025", &utc()).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidDate {
                field: "applicationDate",
                value: "15/03/2025".into()
            }
        );
        assert!(parse_calendar_date("d", "", &utc()).is_err());
        assert!(parse_calendar_date("d", "2025-02-30", &utc()).is_err());
    }

    #[test]
    fn instant_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 15, 9, 30, 0).unwrap();
        assert_eq!(parse_instant("t", "2025-03-15T09:30:00Z", &utc()).unwrap(), expected);
        assert_eq!(
            parse_instant("t", "2025-03-15T10:30:00+01:00", &utc()).unwrap(),
            expected
        );
        assert_eq!(parse_instant("t", "2025-03-15T09:30:00", &utc()).unwrap(), expected);
    }

    #[test]
    fn bare_date_instant_is_local_midnight() {
        let plus_one = FixedOffset::east_opt(3600).unwrap();
        let ts = parse_instant("t", "2025-03-15", &plus_one).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 3, 14, 23, 0, 0).unwrap());
    }

    #[test]
    fn local_today_follows_offset() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 22, 0, 0).unwrap();
        assert_eq!(local_today(now, &utc()), ymd(2025, 3, 15));
        let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();
        assert_eq!(local_today(now, &plus_three), ymd(2025, 3, 16));
    }

    #[test]
    fn add_days_overflow_is_reported() {
        assert_eq!(add_days(ymd(2025, 1, 1), 60, "x").unwrap(), ymd(2025, 3, 2));
        assert_eq!(add_days(ymd(2025, 1, 1), -1, "x").unwrap(), ymd(2024, 12, 31));
        assert!(matches!(
            add_days(ymd(2025, 1, 1), i64::MAX, "x"),
            Err(EngineError::DateOutOfRange { field: "x", .. })
        ));
    }
}
