//! The submit flow: text in, calendar event out.
//!
//! Resolution and publication run strictly one after the other. Each step
//! is exposed separately so the CLI can stop after resolving and the host
//! can serve the two protocol actions independently.

use chrono_tz::Tz;
use tracing::{debug, info, instrument};

use quickcal_core::{EventDescriptor, ParsedEvent, TemporalContext};
use quickcal_protocol::{Request, Response};
use quickcal_providers::{CreatedEvent, EventPublisher, EventResolver};

use crate::error::{ClientError, ClientResult};

/// Shown when the input is empty or whitespace.
pub const EMPTY_INPUT_MESSAGE: &str = "Please enter event details.";

/// Which half of the flow failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Publish,
}

impl Stage {
    fn failure_message(self) -> &'static str {
        match self {
            Self::Resolve => "Could not understand the input.",
            Self::Publish => "Error creating event.",
        }
    }
}

/// Renders `err` for a person at a terminal.
pub fn user_message(stage: Stage, err: &ClientError) -> String {
    match err {
        ClientError::Input(message) => message.clone(),
        err if err.is_auth() => format!(
            "Not signed in to Google Calendar: {err}\nRun `quickcal auth google` to authorize."
        ),
        err => format!("{}\n{}", stage.failure_message(), err),
    }
}

/// A resolved and published event.
#[derive(Debug, Clone)]
pub struct Submission {
    pub event: ParsedEvent,
    pub descriptor: EventDescriptor,
    pub created: CreatedEvent,
}

/// Resolver plus optional publisher, bound to the user's timezone.
pub struct EventFlow {
    resolver: Box<dyn EventResolver>,
    publisher: Option<Box<dyn EventPublisher>>,
    timezone: Tz,
}

impl EventFlow {
    pub fn new(resolver: Box<dyn EventResolver>, timezone: Tz) -> Self {
        Self {
            resolver,
            publisher: None,
            timezone,
        }
    }

    #[must_use]
    pub fn with_publisher(mut self, publisher: Box<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Resolves `input` against the current time.
    pub async fn parse(&self, input: &str) -> ClientResult<ParsedEvent> {
        self.parse_at(input, TemporalContext::now(self.timezone)).await
    }

    /// Resolves `input` against a fixed context.
    #[instrument(skip(self, ctx), fields(resolver = self.resolver.name()))]
    pub async fn parse_at(&self, input: &str, ctx: TemporalContext) -> ClientResult<ParsedEvent> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ClientError::Input(EMPTY_INPUT_MESSAGE.to_string()));
        }

        let event = self.resolver.resolve(input, ctx).await?;
        debug!(
            summary = %event.summary,
            date = %event.date,
            "resolved event"
        );
        Ok(event)
    }

    /// Publishes an already-built descriptor.
    pub async fn create(&self, descriptor: &EventDescriptor) -> ClientResult<CreatedEvent> {
        let publisher = self.publisher.as_ref().ok_or_else(|| {
            ClientError::Config(
                "no calendar configured; add a [google] section or run `quickcal auth google`"
                    .to_string(),
            )
        })?;

        let created = publisher.create_event(descriptor).await?;
        info!(
            publisher = publisher.name(),
            id = created.id.as_deref().unwrap_or("-"),
            "event created"
        );
        Ok(created)
    }

    /// Resolves `input` and publishes the result.
    ///
    /// The error carries the [`Stage`] that failed.
    pub async fn submit(&self, input: &str) -> Result<Submission, (Stage, ClientError)> {
        let event = self.parse(input).await.map_err(|e| (Stage::Resolve, e))?;
        self.publish(event).await.map_err(|e| (Stage::Publish, e))
    }

    /// Converts and publishes a resolved event.
    pub async fn publish(&self, event: ParsedEvent) -> ClientResult<Submission> {
        let descriptor = event
            .to_descriptor()
            .map_err(quickcal_providers::ProviderError::from)?;
        let created = self.create(&descriptor).await?;
        Ok(Submission {
            event,
            descriptor,
            created,
        })
    }

    /// Serves one protocol request.
    ///
    /// Every failure becomes `{success:false, error}`.
    pub async fn handle(&self, request: Request) -> Response {
        let action = request.action();
        let result = match request {
            Request::ParseEvent { input } => self.parse(&input).await.map(Response::success_with),
            Request::CreateEvent { event_details } => {
                self.create(&event_details).await.map(|_| Response::ok())
            }
        };

        result.unwrap_or_else(|e| {
            debug!(action, error = %e, "request failed");
            Response::failure(e.to_string())
        })
    }
}
