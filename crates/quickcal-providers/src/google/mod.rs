//! Google Calendar publisher.
//!
//! # Authorization
//!
//! Google requires each installation to bring its own OAuth client (a
//! "Desktop app" client from the Cloud Console). `quickcal auth google`
//! runs the PKCE consent flow once:
//!
//! 1. A listener binds `127.0.0.1` on a port in the configured range
//! 2. The browser opens Google's consent page
//! 3. The redirect delivers the authorization code
//! 4. Code + verifier are exchanged for access and refresh tokens
//! 5. Tokens are written to `~/.local/share/quickcal/google-tokens.json`
//!
//! Afterwards the publisher refreshes the access token on its own.
//!
//! # Example
//!
//! ```ignore
//! use quickcal_providers::google::{GoogleConfig, GooglePublisher, OAuthCredentials};
//! use quickcal_providers::EventPublisher;
//!
//! let credentials = OAuthCredentials::new("id.apps.googleusercontent.com", "secret");
//! let publisher = GooglePublisher::new(GoogleConfig::new(credentials))?;
//! let created = publisher.create_event(&descriptor).await?;
//! ```

mod client;
mod config;
mod oauth;
mod publisher;
mod tokens;

pub use client::GoogleCalendarClient;
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow, TokenResponse};
pub use publisher::GooglePublisher;
pub use tokens::{TokenInfo, TokenStorage};
