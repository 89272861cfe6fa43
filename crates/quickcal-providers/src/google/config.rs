//! Google Calendar publisher configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// OAuth 2.0 client credentials from the Google Cloud Console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// The downloadable credentials JSON, either nested under
/// `installed`/`web` or flat.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a Cloud Console JSON download.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parses either `{"installed": {...}}`, `{"web": {...}}` or a flat
    /// `{"client_id": ..., "client_secret": ...}` object.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }
        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(ProviderError::configuration(
            "credentials file must contain an 'installed'/'web' section or root-level 'client_id'/'client_secret'",
        ))
    }

    pub fn validate(&self) -> ProviderResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(ProviderError::configuration("google client_id is required"));
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err(ProviderError::configuration(
                "google client_id should end with .apps.googleusercontent.com",
            ));
        }
        if self.client_secret.trim().is_empty() {
            return Err(ProviderError::configuration("google client_secret is required"));
        }
        Ok(())
    }
}

/// Configuration for [`GooglePublisher`](super::GooglePublisher).
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: OAuthCredentials,

    /// Where OAuth tokens are persisted.
    pub token_path: PathBuf,

    /// Calendar events are inserted into.
    pub calendar_id: String,

    /// Calendar API root, overridable for tests.
    pub api_base: String,

    /// OAuth endpoints, overridable for tests.
    pub auth_url: String,
    pub token_url: String,

    pub timeout: Duration,
    pub user_agent: String,

    /// Inclusive port range tried for the loopback redirect listener.
    pub loopback_port_range: (u16, u16),

    pub scopes: Vec<String>,

    /// Whether `get_access_token` may open a browser for consent when no
    /// usable token exists.
    pub interactive: bool,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Read/write access to events, nothing else.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.events";

    pub const DEFAULT_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";
    pub const DEFAULT_AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    pub const DEFAULT_TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            calendar_id: "primary".to_string(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            auth_url: Self::DEFAULT_AUTH_URL.to_string(),
            token_url: Self::DEFAULT_TOKEN_URL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("quickcal/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (8080, 8090),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            interactive: false,
        }
    }

    /// `~/.local/share/quickcal/google-tokens.json`
    pub fn default_token_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quickcal")
            .join("google-tokens.json")
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// URL of the insert endpoint for the configured calendar.
    pub fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base.trim_end_matches('/'),
            urlencoding::encode(&self.calendar_id)
        )
    }

    pub fn validate(&self) -> ProviderResult<()> {
        self.credentials.validate()?;

        if self.calendar_id.trim().is_empty() {
            return Err(ProviderError::configuration("google calendar_id must not be empty"));
        }
        if self.scopes.is_empty() {
            return Err(ProviderError::configuration(
                "at least one OAuth scope is required",
            ));
        }
        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(ProviderError::configuration("invalid loopback port range"));
        }
        Ok(())
    }
}
