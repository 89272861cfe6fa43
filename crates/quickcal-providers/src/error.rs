//! Error types for resolver and publisher backends.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// A credential or setting is missing or invalid. Raised before any
    /// network call.
    ConfigurationError,
    /// Transport failure, non-success HTTP status, or a malformed envelope.
    UpstreamError,
    /// The completion content does not have the expected shape.
    ValidationError,
    /// An access token could not be obtained or was rejected.
    AuthError,
    /// Local state misuse (token storage and the like).
    InternalError,
}

impl ProviderErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "configuration_error",
            Self::UpstreamError => "upstream_error",
            Self::ValidationError => "validation_error",
            Self::AuthError => "auth_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised by a resolver or publisher backend.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// Backend that raised it ("openai", "google").
    provider: Option<String>,
    /// HTTP status, for upstream errors.
    status: Option<u16>,
    /// Response body, for upstream errors.
    body: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            status: None,
            body: None,
            source: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::UpstreamError, message)
    }

    /// An upstream error for a non-success HTTP response.
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::upstream(format!("request failed with status {status}"))
            .with_status(status)
            .with_body(body)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ValidationError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// True for errors that need the user to (re)authorize.
    pub fn is_auth(&self) -> bool {
        self.code == ProviderErrorCode::AuthError
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref body) = self.body
            && !body.is_empty()
        {
            write!(f, " ({})", truncate(body, 200))?;
        }
        Ok(())
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl From<quickcal_core::ValidationError> for ProviderError {
    fn from(err: quickcal_core::ValidationError) -> Self {
        Self::validation(err.to_string()).with_source(err)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
