//! Core types: temporal context, events, instruction text, resolution policy

pub mod error;
pub mod event;
pub mod policy;
pub mod prompt;
pub mod time;
pub mod tracing;

pub use error::ValidationError;
pub use event::{EventDateTime, EventDescriptor, ParsedEvent};
pub use policy::{
    CompletionPayload, ResolutionOptions, apply_rollover, clean_summary, parse_completion_content,
    resolve_content, validate_payload,
};
pub use prompt::system_prompt;
pub use time::{TemporalContext, detect_host_timezone, local_instant, parse_timezone};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
