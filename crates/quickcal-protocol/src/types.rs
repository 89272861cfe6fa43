//! Request and response types exchanged with the browser extension.

use quickcal_core::{EventDescriptor, ParsedEvent};
use serde::{Deserialize, Serialize};

/// A request from the extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Resolve free text into a [`ParsedEvent`].
    ParseEvent { input: String },

    /// Publish an already-resolved event.
    #[serde(rename_all = "camelCase")]
    CreateEvent { event_details: EventDescriptor },
}

impl Request {
    pub fn parse_event(input: impl Into<String>) -> Self {
        Self::ParseEvent {
            input: input.into(),
        }
    }

    pub fn create_event(event_details: EventDescriptor) -> Self {
        Self::CreateEvent { event_details }
    }

    /// The wire name of the action, for logging.
    pub fn action(&self) -> &'static str {
        match self {
            Self::ParseEvent { .. } => "parseEvent",
            Self::CreateEvent { .. } => "createEvent",
        }
    }
}

/// The uniform result of every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ParsedEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Success carrying a parsed event.
    pub fn success_with(data: ParsedEvent) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Success with no payload.
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    /// Failure with a human-readable description.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}
