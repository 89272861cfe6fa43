//! Chat-completions HTTP client.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

use super::config::OpenAiConfig;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Sends one system + user exchange and returns the first choice's text.
#[derive(Debug)]
pub struct CompletionClient {
    http_client: reqwest::Client,
    url: String,
    model: String,
    temperature: f32,
}

impl CompletionClient {
    pub fn new(config: &OpenAiConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e)).with_source(e)
            })?;

        Ok(Self {
            http_client,
            url: config.completions_url(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Returns `choices[0].message.content`.
    ///
    /// Transport failures, non-success statuses and envelopes without
    /// content are all upstream errors.
    pub async fn complete(&self, api_key: &str, system: &str, user: &str) -> ProviderResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!("requesting completion from {} ({})", self.url, self.model);
        let response = self
            .http_client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "completion request timed out".to_string()
                } else {
                    format!("completion request failed: {}", e)
                };
                ProviderError::upstream(message).with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::upstream(format!("failed to read completion response: {}", e))
                .with_source(e)
        })?;

        if !status.is_success() {
            return Err(ProviderError::http_status(status.as_u16(), body));
        }

        let envelope: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::upstream(format!("malformed completion envelope: {}", e))
                .with_body(body.clone())
                .with_source(e)
        })?;

        envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| {
                ProviderError::upstream("completion response has no choices[0].message.content")
                    .with_body(body)
            })
    }
}
