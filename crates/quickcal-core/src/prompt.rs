//! Instruction templating for the completion service.
//!
//! The system instruction is a pure function of the [`TemporalContext`]:
//! same context in, same text out.

use crate::time::{DATE_FORMAT, TIME_FORMAT, TemporalContext};

/// Builds the system instruction sent alongside the user's raw text.
pub fn system_prompt(ctx: &TemporalContext) -> String {
    let timezone = ctx.timezone().name();
    let today = ctx.current_date().format(DATE_FORMAT);
    let now = ctx.current_time().format(TIME_FORMAT);

    format!(
        "You are a calendar event parser.\n\
         Timezone context:\n\
         - User timezone: {timezone}\n\
         - Current date: {today}\n\
         - Current time: {now}\n\
         \n\
         Parse the input and return ONLY a JSON object with these fields:\n\
         - summary: event title/description\n\
         - startTime: time in 24-hour format (HH:MM)\n\
         - endTime: time in 24-hour format (HH:MM)\n\
         - date: YYYY-MM-DD\n\
         \n\
         Rules:\n\
         - Use the user's timezone ({timezone})\n\
         - If no date is specified, use TODAY ({today})\n\
         - Only use tomorrow's date if:\n\
         \x20   1. The user specifically mentions \"tomorrow\" or\n\
         \x20   2. The requested time is more than 24 hours in the past\n\
         - For times between midnight and 4am, assume today unless specified\n\
         - For \"noon\", use 12:00\n\
         - For \"midnight\", use 00:00\n\
         - Remove words like \"from\", \"at\", \"to\" from the summary\n\
         - Output raw JSON only, no prose, markdown, or code fences"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono_tz::America::New_York;

    fn ctx() -> TemporalContext {
        let local = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        TemporalContext::from_local(New_York, local).unwrap()
    }

    #[test]
    fn embeds_temporal_context() {
        let prompt = system_prompt(&ctx());
        assert!(prompt.contains("- User timezone: America/New_York"));
        assert!(prompt.contains("- Current date: 2024-01-01"));
        assert!(prompt.contains("- Current time: 10:00"));
        assert!(prompt.contains("use TODAY (2024-01-01)"));
    }

    #[test]
    fn lists_extraction_rules() {
        let prompt = system_prompt(&ctx());
        for rule in [
            "startTime: time in 24-hour format (HH:MM)",
            "more than 24 hours in the past",
            "between midnight and 4am, assume today",
            "For \"noon\", use 12:00",
            "For \"midnight\", use 00:00",
            "\"from\", \"at\", \"to\"",
        ] {
            assert!(prompt.contains(rule), "missing rule: {rule}");
        }
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(system_prompt(&ctx()), system_prompt(&ctx()));
    }
}
