//! OAuth 2.0 authorization code flow with PKCE and a loopback redirect.
//!
//! 1. Generate a code verifier, its S256 challenge, and a random state
//! 2. Bind a listener on `127.0.0.1` within the configured port range
//! 3. Open the consent page in the browser
//! 4. Accept the redirect, check the state, extract the code
//! 5. Exchange code + verifier for access and refresh tokens

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};

use super::config::{GoogleConfig, OAuthCredentials};
use super::tokens::TokenInfo;

/// Bytes of entropy in the code verifier (43 chars once encoded).
const CODE_VERIFIER_BYTES: usize = 32;

/// How long to wait for the browser to hit the loopback redirect.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const SUCCESS_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
    <html><body><h1>quickcal is authorized</h1>\
    <p>You can close this window and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
    <html><body><h1>Authorization failed</h1>\
    <p>You can close this window.</p></body></html>";

/// Token endpoint client and consent flow driver.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    auth_url: String,
    token_url: String,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e)).with_source(e)
            })?;

        Ok(Self {
            credentials: config.credentials.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            http_client,
        })
    }

    /// Runs the interactive consent flow and returns fresh tokens.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();
        let (listener, port) = bind_loopback(port_range).await?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);
        let consent_url = pkce.build_auth_url(
            &self.auth_url,
            &self.credentials.client_id,
            &redirect_uri,
            scopes,
        )?;

        info!("opening browser for Google consent");
        debug!("authorization URL: {}", consent_url);
        if let Err(e) = open::that(consent_url.as_str()) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nOpen this URL in your browser to authorize quickcal:\n\n{}\n", consent_url);
        }

        let callback = tokio::time::timeout(CALLBACK_TIMEOUT, wait_for_callback(&listener))
            .await
            .map_err(|_| {
                ProviderError::auth(format!(
                    "no authorization received within {} minutes",
                    CALLBACK_TIMEOUT.as_secs() / 60
                ))
            })??;

        if callback.state != pkce.state {
            return Err(ProviderError::auth(
                "OAuth state mismatch, refusing authorization code",
            ));
        }

        info!("received authorization code, exchanging for tokens");
        self.exchange_code(&callback.code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> ProviderResult<TokenResponse> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self.post_token(&params, "token refresh").await?;
        info!("refreshed Google access token");
        Ok(response)
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];
        let response = self.post_token(&params, "token exchange").await?;

        let granted = response
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| scopes.to_vec());

        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            granted,
        ))
    }

    async fn post_token(&self, params: &[(&str, &str)], what: &str) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::auth(format!("{} request failed: {}", what, e)).with_source(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::auth(format!("failed to read {} response: {}", what, e)).with_source(e)
        })?;

        if !status.is_success() {
            return Err(ProviderError::auth(format!("{} failed ({})", what, status))
                .with_status(status.as_u16())
                .with_body(body));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::auth(format!("invalid {} response: {}", what, e)).with_source(e)
        })
    }
}

/// Binds the first free port in `range` on the loopback interface.
async fn bind_loopback(range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
    for port in range.0..=range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await {
            debug!("loopback listener on port {}", port);
            return Ok((listener, port));
        }
    }
    Err(ProviderError::auth(format!(
        "no free port for the OAuth redirect in {}-{}",
        range.0, range.1
    )))
}

/// Code and state carried by the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Callback {
    pub code: String,
    pub state: String,
}

/// Accepts connections until one carries the OAuth redirect.
async fn wait_for_callback(listener: &TcpListener) -> ProviderResult<Callback> {
    loop {
        let (stream, peer) = listener.accept().await.map_err(|e| {
            ProviderError::auth(format!("loopback accept failed: {}", e)).with_source(e)
        })?;
        debug!("loopback connection from {}", peer);
        if let Some(result) = handle_connection(stream).await {
            return result;
        }
    }
}

async fn handle_connection(mut stream: TcpStream) -> Option<ProviderResult<Callback>> {
    let mut request_line = String::new();
    {
        let mut reader = BufReader::new(&mut stream);
        reader.read_line(&mut request_line).await.ok()?;
    }

    let result = parse_callback(&request_line)?;
    let page = if result.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };
    let _ = stream.write_all(page.as_bytes()).await;
    let _ = stream.shutdown().await;
    Some(result)
}

/// Parses `GET /callback?code=..&state=.. HTTP/1.1`.
///
/// Returns `None` for requests that are not the redirect (favicon and the
/// like), which keeps the listener waiting.
pub(crate) fn parse_callback(request_line: &str) -> Option<ProviderResult<Callback>> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    let url = Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;
    if url.path() != "/callback" {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(ProviderError::auth(format!("authorization denied: {}", error))));
    }
    match code {
        Some(code) => Some(Ok(Callback {
            code,
            state: state.unwrap_or_default(),
        })),
        None => Some(Err(ProviderError::auth("redirect carried no authorization code"))),
    }
}

/// RFC 7636 verifier/challenge pair plus a CSRF state.
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_BYTES);
        let challenge = Self::challenge_for(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    /// S256 challenge: base64url(sha256(verifier)), unpadded.
    pub fn challenge_for(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the consent URL. `access_type=offline` and `prompt=consent`
    /// make Google return a refresh token every time.
    pub fn build_auth_url(
        &self,
        auth_url: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<Url> {
        let scope = scopes.join(" ");
        Url::parse_with_params(
            auth_url,
            &[
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("code_challenge", self.challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("state", self.state.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| {
            ProviderError::configuration(format!("invalid OAuth authorization URL: {}", e))
                .with_source(e)
        })
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}
