//! Completion service configuration.

use std::time::Duration;

use quickcal_core::ResolutionOptions;

use crate::error::{ProviderError, ProviderResult};

/// Settings for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Bearer credential. `None` makes every resolution fail with a
    /// configuration error before any request is sent.
    pub api_key: Option<String>,
    pub model: String,
    /// API root; `/chat/completions` is appended.
    pub base_url: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub user_agent: String,
    /// Policy knobs applied to the completion's answer.
    pub resolution: ResolutionOptions,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            temperature: Self::DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("quickcal/{}", env!("CARGO_PKG_VERSION")),
            resolution: ResolutionOptions::default(),
        }
    }
}

impl OpenAiConfig {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_TEMPERATURE: f32 = 0.3;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new(api_key: impl Into<String>) -> Self {
        Self::default().with_api_key(api_key)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_resolution(mut self, resolution: ResolutionOptions) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// The API key, or a configuration error if none is set.
    pub fn require_api_key(&self) -> ProviderResult<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ProviderError::configuration(
                "no OpenAI API key configured (set [openai] api_key or OPENAI_API_KEY)",
            )),
        }
    }
}
