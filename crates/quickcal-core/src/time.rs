//! Temporal context and time-of-day helpers.
//!
//! This module provides [`TemporalContext`], the ambient "now + timezone"
//! snapshot that relative phrases like "tomorrow" or "at noon" are resolved
//! against, plus parsers for the `HH:MM` and `YYYY-MM-DD` strings that flow
//! through the resolver.

use std::path::Path;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::ValidationError;

/// Format used for times of day on the wire (`13:05`).
pub const TIME_FORMAT: &str = "%H:%M";

/// Format used for calendar dates on the wire (`2024-01-02`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The ambient temporal context a resolution runs against.
///
/// Holds the user's timezone and the current instant rendered in it. A
/// context is derived fresh for every resolution and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalContext {
    timezone: Tz,
    now: DateTime<Tz>,
}

impl TemporalContext {
    /// Captures the current instant in the given timezone.
    pub fn now(timezone: Tz) -> Self {
        Self::at(timezone, Utc::now())
    }

    /// Builds a context for a fixed instant.
    pub fn at(timezone: Tz, instant: DateTime<Utc>) -> Self {
        Self {
            timezone,
            now: instant.with_timezone(&timezone),
        }
    }

    /// Builds a context from a wall-clock time in the given timezone.
    ///
    /// Returns `None` if the wall-clock time does not exist in that zone
    /// (inside a DST gap).
    pub fn from_local(timezone: Tz, local: NaiveDateTime) -> Option<Self> {
        let now = timezone.from_local_datetime(&local).earliest()?;
        Some(Self { timezone, now })
    }

    /// Returns the user's timezone.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Returns the current instant in the user's timezone.
    pub fn now_local(&self) -> DateTime<Tz> {
        self.now
    }

    /// Returns today's calendar date in the user's timezone.
    pub fn current_date(&self) -> NaiveDate {
        self.now.date_naive()
    }

    /// Returns the current wall-clock time in the user's timezone.
    pub fn current_time(&self) -> NaiveTime {
        self.now.time()
    }

    /// Returns tomorrow's calendar date in the user's timezone.
    pub fn tomorrow(&self) -> NaiveDate {
        let today = self.current_date();
        today.checked_add_days(Days::new(1)).unwrap_or(today)
    }
}

/// Parses a 24-hour time of day.
///
/// Accepts `HH:MM` and `HH:MM:SS`; seconds are dropped.
pub fn parse_time_of_day(field: &'static str, value: &str) -> Result<NaiveTime, ValidationError> {
    let trimmed = value.trim();
    let parsed = NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidTime {
            field,
            value: value.to_string(),
        })?;
    Ok(parsed.with_second(0).unwrap_or(parsed))
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

/// Parses an IANA timezone identifier such as `America/New_York`.
pub fn parse_timezone(value: &str) -> Result<Tz, ValidationError> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|_| ValidationError::UnknownTimezone(value.to_string()))
}

/// Combines a date and a wall-clock time into an instant in `tz`.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times
/// inside a DST gap are rejected.
pub fn local_instant(
    date: NaiveDate,
    time: NaiveTime,
    tz: Tz,
) -> Result<DateTime<Tz>, ValidationError> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .ok_or_else(|| ValidationError::NonexistentLocalTime {
            date,
            time,
            timezone: tz.name().to_string(),
        })
}

/// Detects the host's IANA timezone.
///
/// Checks, in order: the `TZ` environment variable, `/etc/timezone`, and
/// the `/etc/localtime` symlink target. Falls back to UTC.
pub fn detect_host_timezone() -> Tz {
    if let Ok(value) = std::env::var("TZ")
        && let Ok(tz) = parse_timezone(value.trim_start_matches(':'))
    {
        debug!("timezone {} from TZ", tz.name());
        return tz;
    }

    if let Ok(content) = std::fs::read_to_string("/etc/timezone")
        && let Ok(tz) = parse_timezone(content.trim())
    {
        debug!("timezone {} from /etc/timezone", tz.name());
        return tz;
    }

    if let Some(tz) = timezone_from_localtime_link(Path::new("/etc/localtime")) {
        debug!("timezone {} from /etc/localtime", tz.name());
        return tz;
    }

    debug!("could not detect host timezone, using UTC");
    Tz::UTC
}

/// Extracts a zone name from a `.../zoneinfo/Area/City` symlink target.
fn timezone_from_localtime_link(path: &Path) -> Option<Tz> {
    let target = std::fs::read_link(path).ok()?;
    zone_from_zoneinfo_path(&target.to_string_lossy())
}

fn zone_from_zoneinfo_path(target: &str) -> Option<Tz> {
    let (_, name) = target.split_once("zoneinfo/")?;
    parse_timezone(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    fn ny_context(y: i32, m: u32, d: u32, h: u32, min: u32) -> TemporalContext {
        let local = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap();
        TemporalContext::from_local(New_York, local).unwrap()
    }

    #[test]
    fn context_renders_in_user_timezone() {
        // 03:30 UTC on Jan 2 is still Jan 1 in New York
        let instant = Utc.with_ymd_and_hms(2024, 1, 2, 3, 30, 0).unwrap();
        let ctx = TemporalContext::at(New_York, instant);

        assert_eq!(ctx.current_date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(ctx.current_time(), NaiveTime::from_hms_opt(22, 30, 0).unwrap());
        assert_eq!(ctx.tomorrow(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn tomorrow_crosses_month_and_year() {
        let ctx = ny_context(2024, 12, 31, 9, 0);
        assert_eq!(ctx.tomorrow(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn from_local_rejects_dst_gap() {
        // 2024-03-10 02:30 does not exist in New York
        let local = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        assert!(TemporalContext::from_local(New_York, local).is_none());
    }

    #[test]
    fn parse_time_variants() {
        assert_eq!(
            parse_time_of_day("startTime", "12:00").unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap()
        );
        assert_eq!(
            parse_time_of_day("startTime", " 09:05 ").unwrap(),
            NaiveTime::from_hms_opt(9, 5, 0).unwrap()
        );
        assert_eq!(
            parse_time_of_day("startTime", "23:59:45").unwrap(),
            NaiveTime::from_hms_opt(23, 59, 0).unwrap()
        );
    }

    #[test]
    fn parse_time_rejects_garbage() {
        for bad in ["noon", "25:00", "12:61", "", "3pm"] {
            let err = parse_time_of_day("endTime", bad).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidTime { field: "endTime", .. }),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn parse_date_strict() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("2023-02-29").is_err());
        assert!(parse_date("01/02/2024").is_err());
    }

    #[test]
    fn parse_timezone_names() {
        assert_eq!(parse_timezone("America/New_York").unwrap(), New_York);
        assert_eq!(parse_timezone("UTC").unwrap(), Tz::UTC);
        assert!(matches!(
            parse_timezone("Mars/Olympus_Mons"),
            Err(ValidationError::UnknownTimezone(_))
        ));
    }

    #[test]
    fn local_instant_handles_dst() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let gap = NaiveTime::from_hms_opt(2, 30, 0).unwrap();
        assert!(matches!(
            local_instant(date, gap, New_York),
            Err(ValidationError::NonexistentLocalTime { .. })
        ));

        // Fall-back hour resolves to the earlier (EDT) instant
        let date = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap();
        let ambiguous = NaiveTime::from_hms_opt(1, 30, 0).unwrap();
        let instant = local_instant(date, ambiguous, New_York).unwrap();
        assert_eq!(
            instant.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap()
        );
    }

    #[test]
    fn zoneinfo_path_extraction() {
        assert_eq!(
            zone_from_zoneinfo_path("/usr/share/zoneinfo/Europe/Paris"),
            Some(chrono_tz::Europe::Paris)
        );
        assert_eq!(
            zone_from_zoneinfo_path("../usr/share/zoneinfo/America/New_York"),
            Some(New_York)
        );
        assert_eq!(zone_from_zoneinfo_path("/etc/some/other/file"), None);
    }
}
