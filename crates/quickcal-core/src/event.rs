//! Event types flowing between the resolver and the publisher.
//!
//! - [`ParsedEvent`]: the resolver's output, wall-clock times plus a date
//! - [`EventDescriptor`]: absolute start/end instants, ready for the calendar API
//! - [`EventDateTime`]: one end of a descriptor (instant + timezone name)

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::local_instant;

/// A structured event produced by the resolver.
///
/// Serialized with camelCase keys (`startTime`, `endTime`, `timeZone`) and
/// `HH:MM` / `YYYY-MM-DD` strings, matching what the browser extension
/// exchanges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedEvent {
    /// Event title.
    pub summary: String,
    /// Start time of day (24h).
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    /// End time of day (24h).
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    /// Calendar date the event happens on.
    pub date: NaiveDate,
    /// IANA timezone the times are expressed in.
    pub time_zone: Tz,
}

impl ParsedEvent {
    /// Returns the start as an instant in the event's timezone.
    pub fn start(&self) -> Result<DateTime<Tz>, ValidationError> {
        local_instant(self.date, self.start_time, self.time_zone)
    }

    /// Returns the end as an instant in the event's timezone.
    ///
    /// An end time earlier than the start time is taken to mean the
    /// following day ("11pm to 1am").
    pub fn end(&self) -> Result<DateTime<Tz>, ValidationError> {
        let end_date = if self.end_time < self.start_time {
            self.date
                .checked_add_days(Days::new(1))
                .unwrap_or(self.date)
        } else {
            self.date
        };
        local_instant(end_date, self.end_time, self.time_zone)
    }

    /// Builds the absolute-time descriptor submitted to the calendar.
    pub fn to_descriptor(&self) -> Result<EventDescriptor, ValidationError> {
        let zone = self.time_zone.name().to_string();
        Ok(EventDescriptor {
            summary: self.summary.clone(),
            start: EventDateTime {
                date_time: self.start()?.with_timezone(&Utc),
                time_zone: zone.clone(),
            },
            end: EventDateTime {
                date_time: self.end()?.with_timezone(&Utc),
                time_zone: zone,
            },
        })
    }
}

/// One end of an [`EventDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    /// Absolute instant, serialized as RFC 3339.
    pub date_time: DateTime<Utc>,
    /// IANA timezone name the event was expressed in.
    pub time_zone: String,
}

/// The absolute-time form of an event, as sent to the calendar API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// Event title.
    pub summary: String,
    /// Start instant.
    pub start: EventDateTime,
    /// End instant.
    pub end: EventDateTime,
}

/// Serde adapter for `HH:MM` times of day.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::time::{TIME_FORMAT, parse_time_of_day};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_time_of_day("time", &raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;
    use chrono_tz::Asia::Tokyo;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lunch() -> ParsedEvent {
        ParsedEvent {
            summary: "lunch".to_string(),
            start_time: time(12, 0),
            end_time: time(13, 0),
            date: date(2024, 1, 2),
            time_zone: New_York,
        }
    }

    #[test]
    fn serializes_with_extension_field_names() {
        let json = serde_json::to_value(lunch()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "summary": "lunch",
                "startTime": "12:00",
                "endTime": "13:00",
                "date": "2024-01-02",
                "timeZone": "America/New_York",
            })
        );
    }

    #[test]
    fn deserializes_extension_shape() {
        let json = r#"{"summary":"standup","startTime":"09:30","endTime":"09:45",
                       "date":"2024-06-03","timeZone":"Asia/Tokyo"}"#;
        let event: ParsedEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.start_time, time(9, 30));
        assert_eq!(event.time_zone, Tokyo);
    }

    #[test]
    fn descriptor_uses_user_timezone() {
        let descriptor = lunch().to_descriptor().unwrap();

        assert_eq!(descriptor.summary, "lunch");
        // Noon EST is 17:00 UTC
        assert_eq!(
            descriptor.start.date_time,
            Utc.with_ymd_and_hms(2024, 1, 2, 17, 0, 0).unwrap()
        );
        assert_eq!(
            descriptor.end.date_time,
            Utc.with_ymd_and_hms(2024, 1, 2, 18, 0, 0).unwrap()
        );
        assert_eq!(descriptor.start.time_zone, "America/New_York");
        assert_eq!(descriptor.end.time_zone, "America/New_York");
    }

    #[test]
    fn descriptor_reinterpreted_in_timezone_reproduces_wall_clock() {
        let cases = [
            (New_York, date(2024, 3, 9), time(8, 15), time(9, 0)),
            (New_York, date(2024, 7, 4), time(0, 0), time(23, 59)),
            (Tokyo, date(2024, 12, 31), time(23, 0), time(23, 30)),
            (Tz::UTC, date(2024, 2, 29), time(12, 0), time(12, 0)),
        ];

        for (tz, day, start, end) in cases {
            let event = ParsedEvent {
                summary: "x".to_string(),
                start_time: start,
                end_time: end,
                date: day,
                time_zone: tz,
            };
            let descriptor = event.to_descriptor().unwrap();

            let local_start = descriptor.start.date_time.with_timezone(&tz);
            let local_end = descriptor.end.date_time.with_timezone(&tz);
            assert_eq!(local_start.date_naive(), day);
            assert_eq!(local_start.time(), start);
            assert_eq!(local_end.date_naive(), day);
            assert_eq!(local_end.time(), end);
        }
    }

    #[test]
    fn end_before_start_rolls_to_next_day() {
        let event = ParsedEvent {
            start_time: time(23, 0),
            end_time: time(1, 0),
            ..lunch()
        };
        let descriptor = event.to_descriptor().unwrap();
        let local_end = descriptor.end.date_time.with_timezone(&New_York);
        assert_eq!(local_end.date_naive(), date(2024, 1, 3));
        assert_eq!(local_end.time(), time(1, 0));
    }

    #[test]
    fn descriptor_rejects_dst_gap() {
        let event = ParsedEvent {
            date: date(2024, 3, 10),
            start_time: time(2, 30),
            end_time: time(3, 30),
            ..lunch()
        };
        assert!(matches!(
            event.to_descriptor(),
            Err(ValidationError::NonexistentLocalTime { .. })
        ));
    }

    #[test]
    fn descriptor_serializes_rfc3339() {
        let json = serde_json::to_value(lunch().to_descriptor().unwrap()).unwrap();
        assert_eq!(json["start"]["dateTime"], "2024-01-02T17:00:00Z");
        assert_eq!(json["start"]["timeZone"], "America/New_York");
        assert_eq!(json["end"]["dateTime"], "2024-01-02T18:00:00Z");
    }
}
