//! `quickcal parse`: resolve only.

use std::io::Write;

use serde::Serialize;

use quickcal_core::{EventDescriptor, ParsedEvent};

use crate::error::{ClientError, ClientResult};
use crate::flow::EventFlow;

#[derive(Serialize)]
struct WithDescriptor<'a> {
    event: &'a ParsedEvent,
    descriptor: &'a EventDescriptor,
}

/// Resolves `text` and writes the event as JSON to `out`.
pub async fn run(
    flow: &EventFlow,
    text: &str,
    descriptor: bool,
    out: &mut impl Write,
) -> ClientResult<()> {
    let event = flow.parse(text).await?;

    let json = if descriptor {
        let built = event
            .to_descriptor()
            .map_err(quickcal_providers::ProviderError::from)?;
        serde_json::to_string_pretty(&WithDescriptor {
            event: &event,
            descriptor: &built,
        })
    } else {
        serde_json::to_string_pretty(&event)
    }
    .map_err(|e| ClientError::Io(e.into()))?;

    writeln!(out, "{json}")?;
    Ok(())
}
