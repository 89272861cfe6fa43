//! `quickcal add`: resolve then publish.

use std::io::Write;
use std::process::ExitCode;

use quickcal_core::time::{DATE_FORMAT, TIME_FORMAT};
use quickcal_protocol::Response;

use crate::error::{ClientError, ClientResult};
use crate::flow::{EventFlow, Stage, Submission, user_message};

#[derive(Debug, Clone, Copy, Default)]
pub struct AddOptions {
    /// Stop after resolving.
    pub dry_run: bool,
    /// Print protocol responses instead of messages.
    pub json: bool,
}

/// Creates an event from `text`.
///
/// Results go to `out`; failure messages go to stderr, except in JSON mode
/// where the failure response itself is the output.
pub async fn run(
    flow: &EventFlow,
    text: &str,
    options: AddOptions,
    out: &mut impl Write,
) -> ClientResult<ExitCode> {
    let event = match flow.parse(text).await {
        Ok(event) => event,
        Err(e) => return fail(Stage::Resolve, &e, options, out),
    };

    if options.json {
        print_response(out, &Response::success_with(event.clone()))?;
    }

    if options.dry_run {
        if !options.json {
            writeln!(out, "{}", describe(&event))?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let submission = match flow.publish(event).await {
        Ok(submission) => submission,
        Err(e) => return fail(Stage::Publish, &e, options, out),
    };

    if options.json {
        print_response(out, &Response::ok())?;
    } else {
        write_created(out, &submission)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn fail(
    stage: Stage,
    err: &ClientError,
    options: AddOptions,
    out: &mut impl Write,
) -> ClientResult<ExitCode> {
    if options.json {
        print_response(out, &Response::failure(err.to_string()))?;
    } else {
        eprintln!("{}", user_message(stage, err));
    }
    Ok(ExitCode::FAILURE)
}

fn print_response(out: &mut impl Write, response: &Response) -> ClientResult<()> {
    let line = serde_json::to_string(response).map_err(|e| ClientError::Io(e.into()))?;
    writeln!(out, "{line}")?;
    Ok(())
}

fn write_created(out: &mut impl Write, submission: &Submission) -> ClientResult<()> {
    writeln!(out, "Event Created!")?;
    writeln!(out, "  {}", describe(&submission.event))?;
    if let Some(ref link) = submission.created.html_link {
        writeln!(out, "  {link}")?;
    }
    Ok(())
}

/// One-line summary, e.g. `lunch: 2024-01-02 12:00-13:00 (America/New_York)`.
fn describe(event: &quickcal_core::ParsedEvent) -> String {
    format!(
        "{}: {} {}-{} ({})",
        event.summary,
        event.date.format(DATE_FORMAT),
        event.start_time.format(TIME_FORMAT),
        event.end_time.format(TIME_FORMAT),
        event.time_zone.name()
    )
}
