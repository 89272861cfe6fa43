//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/quickcal/config.toml` by default.
//!
//! Credential values (`api_key`, `client_id`, `client_secret`) support
//! secret references:
//! - `pass::path/in/store` - resolved via `pass show`
//! - `env::VAR_NAME` - resolved from the environment
//! - plain text - used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use quickcal_core::policy::MAX_DEFAULT_DURATION_MINUTES;
use quickcal_core::{ResolutionOptions, detect_host_timezone, parse_timezone};
use quickcal_providers::OpenAiConfig;

use crate::error::{ClientError, ClientResult};

/// Environment variable consulted when `[openai] api_key` is unset.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the quickcal client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// IANA timezone events are expressed in. Detected from the host when
    /// unset.
    pub timezone: Option<String>,

    /// Debug mode.
    pub debug: bool,

    /// Completion service settings.
    pub openai: OpenAiSettings,

    /// Google Calendar settings.
    #[cfg(feature = "google")]
    pub google: Option<GoogleSettings>,

    /// Event defaults.
    pub event: EventSettings,
}

/// Completion service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    /// API key (supports `pass::` and `env::` prefixes). Falls back to
    /// `$OPENAI_API_KEY`.
    pub api_key: Option<String>,

    pub model: String,

    /// API root of an OpenAI-compatible service.
    pub base_url: String,

    pub temperature: f32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: OpenAiConfig::DEFAULT_MODEL.to_string(),
            base_url: OpenAiConfig::DEFAULT_BASE_URL.to_string(),
            temperature: OpenAiConfig::DEFAULT_TEMPERATURE,
            timeout_secs: OpenAiConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Defaults applied to resolved events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    /// Duration used when the input names no end time.
    pub default_duration_minutes: u32,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            default_duration_minutes: 60,
        }
    }
}

impl EventSettings {
    pub fn to_resolution_options(&self) -> ClientResult<ResolutionOptions> {
        let minutes = i64::from(self.default_duration_minutes);
        if !(1..=MAX_DEFAULT_DURATION_MINUTES).contains(&minutes) {
            return Err(ClientError::Config(format!(
                "[event] default_duration_minutes must be between 1 and {}, got {}",
                MAX_DEFAULT_DURATION_MINUTES, minutes
            )));
        }
        Ok(ResolutionOptions::default().with_default_duration(chrono::Duration::minutes(minutes)))
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quickcal")
    }

    /// Picks the user's timezone.
    ///
    /// Precedence: `flag`, then the `timezone` key, then host detection.
    pub fn resolve_timezone(&self, flag: Option<&str>) -> ClientResult<Tz> {
        match flag.or(self.timezone.as_deref()) {
            Some(name) => parse_timezone(name).map_err(|e| ClientError::Config(e.to_string())),
            None => Ok(detect_host_timezone()),
        }
    }

    /// Builds the resolver configuration.
    ///
    /// A missing API key is not an error here; the resolver reports it as
    /// a configuration error before sending anything.
    pub fn openai_config(&self) -> ClientResult<OpenAiConfig> {
        let settings = &self.openai;

        let mut config = OpenAiConfig::default()
            .with_model(&settings.model)
            .with_base_url(&settings.base_url)
            .with_temperature(settings.temperature)
            .with_timeout(Duration::from_secs(settings.timeout_secs))
            .with_resolution(self.event.to_resolution_options()?);

        if let Some(key) = self.openai_api_key()? {
            config = config.with_api_key(key);
        }

        Ok(config)
    }

    fn openai_api_key(&self) -> ClientResult<Option<String>> {
        if let Some(ref raw) = self.openai.api_key {
            let key = crate::secret::resolve(raw)
                .map_err(|e| ClientError::Config(format!("failed to resolve [openai] api_key: {}", e)))?;
            return Ok(Some(key));
        }

        Ok(std::env::var(OPENAI_API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty()))
    }

    /// Checks every section, returning the first problem found.
    pub fn validate(&self) -> ClientResult<()> {
        if let Some(ref name) = self.timezone {
            parse_timezone(name).map_err(|e| ClientError::Config(e.to_string()))?;
        }

        if !(0.0..=2.0).contains(&self.openai.temperature) {
            return Err(ClientError::Config(format!(
                "[openai] temperature must be between 0 and 2, got {}",
                self.openai.temperature
            )));
        }
        if self.openai.timeout_secs == 0 {
            return Err(ClientError::Config(
                "[openai] timeout_secs must be greater than zero".to_string(),
            ));
        }
        url::Url::parse(&self.openai.base_url).map_err(|e| {
            ClientError::Config(format!("[openai] base_url is not a URL: {}", e))
        })?;
        self.event.to_resolution_options()?;
        self.openai_api_key()?;

        #[cfg(feature = "google")]
        if let Some(ref google) = self.google {
            google.validate()?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// GoogleSettings (in config.toml, including credentials)
// ---------------------------------------------------------------------------

/// Google Calendar publisher settings.
///
/// Credentials (`client_id`, `client_secret`) are stored inline and support
/// secret references (`pass::…`, `env::…`).
#[cfg(feature = "google")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Calendar events are created in.
    pub calendar_id: String,

    /// Path to token storage.
    pub token_path: Option<PathBuf>,
}

#[cfg(feature = "google")]
impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            calendar_id: "primary".to_string(),
            token_path: None,
        }
    }
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Converts to publisher configuration.
    ///
    /// Resolves credentials (expanding `pass::` / `env::` references) and
    /// builds a `GoogleConfig`.
    pub fn to_provider_config(&self) -> ClientResult<quickcal_providers::google::GoogleConfig> {
        let credentials = self.resolve_credentials()?;
        Ok(self.apply(quickcal_providers::google::GoogleConfig::new(credentials)))
    }

    /// Applies the non-credential settings to `config`.
    pub fn apply(
        &self,
        config: quickcal_providers::google::GoogleConfig,
    ) -> quickcal_providers::google::GoogleConfig {
        let config = config.with_calendar_id(&self.calendar_id);
        match self.token_path {
            Some(ref path) => config.with_token_path(path),
            None => config,
        }
    }

    fn validate(&self) -> ClientResult<()> {
        if self.calendar_id.trim().is_empty() {
            return Err(ClientError::Config(
                "[google] calendar_id must not be empty".to_string(),
            ));
        }
        if self.client_id.is_some() || self.client_secret.is_some() {
            self.resolve_credentials()?;
        }
        Ok(())
    }

    /// Resolves Google OAuth credentials from inline fields.
    ///
    /// Both `client_id` and `client_secret` must be set.
    pub(crate) fn resolve_credentials(
        &self,
    ) -> ClientResult<quickcal_providers::google::OAuthCredentials> {
        use quickcal_providers::google::OAuthCredentials;

        let raw_id = self.client_id.as_deref().ok_or_else(|| {
            ClientError::Config(format!(
                "Google credentials not found. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"YOUR_SECRET\"\n\n  \
                 Or run: quickcal auth google --credentials-file <path>",
                ClientConfig::default_path().display()
            ))
        })?;

        let raw_secret = self.client_secret.as_deref().ok_or_else(|| {
            ClientError::Config(
                "client_secret is missing from [google] section in config.toml".to_string(),
            )
        })?;

        let resolved_id = crate::secret::resolve(raw_id)
            .map_err(|e| ClientError::Config(format!("failed to resolve client_id: {}", e)))?;
        let resolved_secret = crate::secret::resolve(raw_secret)
            .map_err(|e| ClientError::Config(format!("failed to resolve client_secret: {}", e)))?;

        let credentials = OAuthCredentials::new(resolved_id, resolved_secret);
        credentials.validate()?;
        Ok(credentials)
    }
}

/// Writes Google credentials into the `[google]` table of `path`.
///
/// Existing keys, comments and formatting elsewhere in the file survive.
/// The file and its parent directory are created when missing.
pub fn persist_google_credentials(
    path: &Path,
    client_id: &str,
    client_secret: &str,
) -> ClientResult<()> {
    let content = if path.exists() {
        std::fs::read_to_string(path)?
    } else {
        String::new()
    };

    let mut doc = content.parse::<toml_edit::DocumentMut>().map_err(|e| {
        ClientError::Config(format!("could not parse {} for writing: {}", path.display(), e))
    })?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    let google = doc["google"].as_table_mut().ok_or_else(|| {
        ClientError::Config(format!("`google` in {} is not a table", path.display()))
    })?;
    google["client_id"] = toml_edit::value(client_id);
    google["client_secret"] = toml_edit::value(client_secret);
    if !google.contains_key("calendar_id") {
        google["calendar_id"] = toml_edit::value("primary");
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, doc.to_string())?;
    info!("credentials saved to {}", path.display());
    Ok(())
}
