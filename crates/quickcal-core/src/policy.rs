//! Resolution policy: validating completion output and disambiguating dates.
//!
//! The completion service is asked to follow the extraction rules, but its
//! output is untrusted text. This module turns that text into a
//! [`ParsedEvent`] in three steps:
//!
//! 1. [`parse_completion_content`] - decode the JSON object (tolerating code fences)
//! 2. [`validate_payload`] - check every field's shape, clean the summary
//! 3. [`apply_rollover`] - the local 24-hour rule, which has the last word
//!
//! [`resolve_content`] runs all three.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::event::ParsedEvent;
use crate::time::{TemporalContext, local_instant, parse_date, parse_time_of_day};

/// How far in the past a returned start may be before it is rolled forward.
pub const ROLLOVER_THRESHOLD_HOURS: i64 = 24;

/// Longest default duration an `HH:MM` end time can carry; anything at or
/// past a full day would collapse onto the start time.
pub const MAX_DEFAULT_DURATION_MINUTES: i64 = 24 * 60 - 1;

/// Leading/trailing filler prepositions that never belong in a title.
static FILLER_EDGES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:from|at|to)(?:\s+|$))+|(?:(?:^|\s+)(?:from|at|to))+$")
        .expect("valid regex")
});

/// Tunables for turning completion output into an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionOptions {
    /// Duration used when the completion omits `endTime`.
    pub default_duration: Duration,
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self {
            default_duration: Duration::minutes(60),
        }
    }
}

impl ResolutionOptions {
    /// Sets the default event duration.
    #[must_use]
    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }
}

/// The raw object returned by the completion service, before validation.
///
/// Every field is optional so that shape errors surface as
/// [`ValidationError::MissingField`] rather than opaque serde messages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionPayload {
    pub summary: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub date: Option<String>,
}

/// Decodes the completion's message content.
pub fn parse_completion_content(content: &str) -> Result<CompletionPayload, ValidationError> {
    let body = strip_code_fence(content);
    Ok(serde_json::from_str(body)?)
}

/// Removes a surrounding ```` ```json ```` fence, if any.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Trims filler prepositions from the edges of a summary.
///
/// Interior words are left alone so titles like "Back to school night"
/// survive.
pub fn clean_summary(summary: &str) -> String {
    let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
    FILLER_EDGES.replace_all(&collapsed, "").trim().to_string()
}

/// Validates a payload's shape and builds a [`ParsedEvent`].
///
/// The date is taken as returned; see [`apply_rollover`] for the
/// disambiguation step.
pub fn validate_payload(
    payload: CompletionPayload,
    ctx: &TemporalContext,
    options: &ResolutionOptions,
) -> Result<ParsedEvent, ValidationError> {
    let summary = payload
        .summary
        .ok_or(ValidationError::MissingField("summary"))?;
    let summary = clean_summary(&summary);
    if summary.is_empty() {
        return Err(ValidationError::EmptySummary);
    }

    let start_raw = payload
        .start_time
        .ok_or(ValidationError::MissingField("startTime"))?;
    let start_time = parse_time_of_day("startTime", &start_raw)?;

    let end_time = match payload.end_time.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_time_of_day("endTime", raw)?,
        _ => {
            let minutes = options.default_duration.num_minutes();
            if !(1..=MAX_DEFAULT_DURATION_MINUTES).contains(&minutes) {
                return Err(ValidationError::UnsupportedDuration(minutes));
            }
            debug!(
                "no endTime returned, using default duration of {} minutes",
                options.default_duration.num_minutes()
            );
            start_time.overflowing_add_signed(options.default_duration).0
        }
    };

    let date_raw = payload.date.ok_or(ValidationError::MissingField("date"))?;
    let date = parse_date(&date_raw)?;

    Ok(ParsedEvent {
        summary,
        start_time,
        end_time,
        date,
        time_zone: ctx.timezone(),
    })
}

/// Applies the local 24-hour rule.
///
/// If the event's start, read in the user's timezone, lies more than
/// [`ROLLOVER_THRESHOLD_HOURS`] before now, the date becomes tomorrow
/// (relative to now in the user's timezone). A start less than that far in
/// the past is kept as-is. Only `date` is ever rewritten.
///
/// Returns `true` if the date was changed.
pub fn apply_rollover(
    event: &mut ParsedEvent,
    ctx: &TemporalContext,
) -> Result<bool, ValidationError> {
    let returned = local_instant(event.date, event.start_time, ctx.timezone())?;
    let cutoff = ctx.now_local() - Duration::hours(ROLLOVER_THRESHOLD_HOURS);

    if returned < cutoff {
        let tomorrow: NaiveDate = ctx.tomorrow();
        warn!(
            "event start {} is more than {}h in the past, moving to {}",
            returned, ROLLOVER_THRESHOLD_HOURS, tomorrow
        );
        event.date = tomorrow;
        return Ok(true);
    }

    Ok(false)
}

/// Runs the full policy on a completion's message content.
pub fn resolve_content(
    content: &str,
    ctx: &TemporalContext,
    options: &ResolutionOptions,
) -> Result<ParsedEvent, ValidationError> {
    let payload = parse_completion_content(content)?;
    let mut event = validate_payload(payload, ctx, options)?;
    apply_rollover(&mut event, ctx)?;
    Ok(event)
}
