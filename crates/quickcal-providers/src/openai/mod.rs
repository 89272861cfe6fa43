//! Event resolution through an OpenAI-compatible chat-completions API.
//!
//! The resolver sends a system instruction built from the
//! [`TemporalContext`](quickcal_core::TemporalContext) plus the user's raw
//! text, asks for a JSON object, and runs the answer through
//! [`quickcal_core::policy`]. Any service that speaks the chat-completions
//! protocol works; point `base_url` at it.

mod client;
mod config;
mod resolver;

pub use client::CompletionClient;
pub use config::OpenAiConfig;
pub use resolver::OpenAiResolver;
