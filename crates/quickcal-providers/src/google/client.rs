//! Google Calendar v3 `events.insert` client.

use std::time::Duration;

use quickcal_core::EventDescriptor;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::CreatedEvent;

/// Thin HTTP client for inserting events into one calendar.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    events_url: String,
}

/// The fields of the inserted event we care about.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedEvent {
    id: Option<String>,
    html_link: Option<String>,
}

impl GoogleCalendarClient {
    pub fn new(
        events_url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e)).with_source(e)
            })?;

        Ok(Self {
            http_client,
            events_url: events_url.into(),
        })
    }

    /// Inserts `event` and returns the created event's id and link.
    pub async fn insert_event(
        &self,
        access_token: &str,
        event: &EventDescriptor,
    ) -> ProviderResult<CreatedEvent> {
        debug!("inserting event {:?} via {}", event.summary, self.events_url);

        let response = self
            .http_client
            .post(&self.events_url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "calendar request timed out".to_string()
                } else {
                    format!("calendar request failed: {}", e)
                };
                ProviderError::upstream(message).with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::upstream(format!("failed to read calendar response: {}", e)).with_source(e)
        })?;

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ProviderError::auth(format!(
                    "calendar rejected the access token ({}), run `quickcal auth google`",
                    status
                ))
                .with_status(status.as_u16())
                .with_body(body));
            }
            s if !s.is_success() => return Err(ProviderError::http_status(s.as_u16(), body)),
            _ => {}
        }

        // The event exists at this point; an unreadable body only loses the link.
        let inserted: InsertedEvent = match serde_json::from_str(&body) {
            Ok(inserted) => inserted,
            Err(e) => {
                debug!("could not parse insert response: {}", e);
                InsertedEvent {
                    id: None,
                    html_link: None,
                }
            }
        };

        Ok(CreatedEvent {
            id: inserted.id,
            html_link: inserted.html_link,
        })
    }
}
