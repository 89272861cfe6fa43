//! [`EventPublisher`] backed by Google Calendar.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use quickcal_core::EventDescriptor;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CreatedEvent, EventPublisher};

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::{TokenInfo, TokenStorage};

const NAME: &str = "google";

const REAUTH_HINT: &str = "run `quickcal auth google`";

/// Publishes events to a Google calendar.
///
/// Token acquisition, in order: stored access token if still valid; refresh
/// via the stored refresh token; interactive consent when
/// [`GoogleConfig::interactive`] is set. Anything else is an `AuthError`.
pub struct GooglePublisher {
    config: GoogleConfig,
    token_storage: TokenStorage,
    oauth_client: OAuthClient,
    api_client: GoogleCalendarClient,
    /// Serializes refresh and consent so concurrent callers don't race.
    acquire: Mutex<()>,
}

impl GooglePublisher {
    /// Builds the publisher and loads any persisted tokens.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(|e| e.with_provider(NAME))?;

        let token_storage = TokenStorage::new(&config.token_path);
        if let Err(e) = token_storage.load() {
            warn!("ignoring stored Google tokens: {}", e);
        }

        let oauth_client = OAuthClient::new(&config)?;
        let api_client =
            GoogleCalendarClient::new(config.events_url(), config.timeout, &config.user_agent)?;

        Ok(Self {
            config,
            token_storage,
            oauth_client,
            api_client,
            acquire: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Runs the consent flow and persists the resulting tokens.
    pub async fn authenticate(&self) -> ProviderResult<TokenInfo> {
        let _guard = self.acquire.lock().await;
        self.authenticate_locked().await
    }

    async fn authenticate_locked(&self) -> ProviderResult<TokenInfo> {
        info!("starting Google consent flow");
        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await
            .map_err(|e| e.with_provider(NAME))?;
        self.token_storage.set(tokens.clone())?;
        info!("Google tokens saved to {}", self.token_storage.path().display());
        Ok(tokens)
    }

    /// True if stored tokens are missing or lack the configured scopes.
    pub fn needs_reauth(&self) -> bool {
        self.token_storage.needs_reauth(&self.config.scopes)
    }

    async fn access_token(&self) -> ProviderResult<String> {
        let _guard = self.acquire.lock().await;

        let stored = self
            .token_storage
            .get()
            .filter(|tokens| tokens.has_scopes(&self.config.scopes));

        let Some(tokens) = stored else {
            return self.consent_or_fail("not authorized with Google").await;
        };

        if !tokens.is_expired() {
            return Ok(tokens.access_token);
        }

        let Some(refresh_token) = tokens.refresh_token else {
            return self.consent_or_fail("Google access token expired and no refresh token is stored").await;
        };

        debug!("refreshing expired Google access token");
        match self.oauth_client.refresh(&refresh_token).await {
            Ok(response) => {
                let updated = self.token_storage.apply_refresh(
                    response.access_token,
                    response.expires_in,
                    response.refresh_token,
                )?;
                Ok(updated.access_token)
            }
            Err(e) if self.config.interactive => {
                warn!("token refresh failed ({}), asking for consent again", e);
                Ok(self.authenticate_locked().await?.access_token)
            }
            Err(e) => Err(e.with_provider(NAME)),
        }
    }

    async fn consent_or_fail(&self, reason: &str) -> ProviderResult<String> {
        if self.config.interactive {
            return Ok(self.authenticate_locked().await?.access_token);
        }
        Err(ProviderError::auth(format!("{}, {}", reason, REAUTH_HINT)).with_provider(NAME))
    }
}

impl EventPublisher for GooglePublisher {
    fn name(&self) -> &str {
        NAME
    }

    fn get_access_token(&self) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(self.access_token())
    }

    fn create_event<'a>(
        &'a self,
        event: &'a EventDescriptor,
    ) -> BoxFuture<'a, ProviderResult<CreatedEvent>> {
        Box::pin(async move {
            let token = self.access_token().await?;
            let created = self
                .api_client
                .insert_event(&token, event)
                .await
                .map_err(|e| e.with_provider(NAME))?;
            info!(
                "created event {:?} in calendar {}",
                event.summary, self.config.calendar_id
            );
            Ok(created)
        })
    }
}
