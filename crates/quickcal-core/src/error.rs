//! Validation errors for completion payloads and event data.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Errors raised while turning untrusted completion output into a
/// [`ParsedEvent`](crate::ParsedEvent) or an event into absolute times.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The completion content is not a JSON object of the expected shape.
    #[error("completion content is not a valid event object: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// A required field is absent or null.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// The summary is empty after cleanup.
    #[error("event summary is empty")]
    EmptySummary,

    /// A time field is not a 24-hour `HH:MM` time.
    #[error("`{field}` is not a 24-hour HH:MM time: {value:?}")]
    InvalidTime { field: &'static str, value: String },

    /// The date field is not a `YYYY-MM-DD` calendar date.
    #[error("`date` is not a YYYY-MM-DD calendar date: {0:?}")]
    InvalidDate(String),

    /// The wall-clock time falls in a DST gap.
    #[error("{date} {time} does not exist in {timezone}")]
    NonexistentLocalTime {
        date: NaiveDate,
        time: NaiveTime,
        timezone: String,
    },

    /// The timezone identifier is not a known IANA zone.
    #[error("unknown timezone: {0:?}")]
    UnknownTimezone(String),

    /// A default duration that a wall-clock end time cannot express.
    #[error("default event duration must be between 1 minute and 24 hours, got {0} minutes")]
    UnsupportedDuration(i64),
}
