//! Resolver and publisher backends.
//!
//! - [`EventResolver`] / [`OpenAiResolver`]: free text to [`ParsedEvent`](quickcal_core::ParsedEvent)
//! - [`EventPublisher`] / [`google::GooglePublisher`]: descriptor to calendar entry
//! - [`ProviderError`]: the shared error taxonomy
//!
//! ```text
//! "lunch tomorrow at noon"
//!          │
//!          ▼  EventResolver::resolve
//!    ParsedEvent  ──to_descriptor()──▶  EventDescriptor
//!                                             │
//!                                             ▼  EventPublisher::create_event
//!                                        CreatedEvent
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod openai;
pub mod provider;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use openai::{OpenAiConfig, OpenAiResolver};
pub use provider::{BoxFuture, CreatedEvent, EventPublisher, EventResolver};
