//! Resolver and publisher traits.
//!
//! - [`EventResolver`] turns free text into a [`ParsedEvent`]
//! - [`EventPublisher`] creates an [`EventDescriptor`] in a calendar
//!
//! Both are object-safe so the client can hold `Box<dyn EventResolver>`
//! and swap in fakes for tests.

use std::future::Future;
use std::pin::Pin;

use quickcal_core::{EventDescriptor, ParsedEvent, TemporalContext};

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
///
/// Used instead of `async fn` in traits to keep the traits usable behind
/// `dyn`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The calendar's view of a freshly created event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedEvent {
    /// Calendar-assigned event id.
    pub id: Option<String>,
    /// Link to the event in the calendar's web UI.
    pub html_link: Option<String>,
}

/// Resolves natural-language text into a structured event.
///
/// # Errors
///
/// Implementations return:
/// - `ConfigurationError` when no credential is configured (before any I/O)
/// - `UpstreamError` for transport failures and non-success responses
/// - `ValidationError` when the service's answer has the wrong shape
pub trait EventResolver: Send + Sync {
    /// Backend name used in logs and errors.
    fn name(&self) -> &str;

    /// Resolves `input` against `ctx`.
    ///
    /// The returned event's `time_zone` is always `ctx.timezone()`.
    fn resolve<'a>(
        &'a self,
        input: &'a str,
        ctx: TemporalContext,
    ) -> BoxFuture<'a, ProviderResult<ParsedEvent>>;
}

/// Publishes events to a calendar.
pub trait EventPublisher: Send + Sync {
    fn name(&self) -> &str;

    /// Returns a usable access token, refreshing or acquiring one as
    /// needed.
    ///
    /// Fails with `AuthError` when no token can be obtained.
    fn get_access_token(&self) -> BoxFuture<'_, ProviderResult<String>>;

    /// Creates the event.
    ///
    /// Fails with `AuthError` when the calendar rejects the token and
    /// `UpstreamError` for other failures.
    fn create_event<'a>(
        &'a self,
        event: &'a EventDescriptor,
    ) -> BoxFuture<'a, ProviderResult<CreatedEvent>>;
}
