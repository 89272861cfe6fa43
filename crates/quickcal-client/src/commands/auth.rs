//! Authentication commands.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use quickcal_providers::google::{GooglePublisher, OAuthCredentials};

use crate::config::{ClientConfig, GoogleSettings, persist_google_credentials};
use crate::error::{ClientError, ClientResult};

/// Google credentials as given on the command line.
#[derive(Debug, Default)]
pub struct GoogleAuthArgs {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub credentials_file: Option<PathBuf>,
    pub force: bool,
}

/// Run the Google consent flow.
///
/// Resolves credentials from CLI flags, a `--credentials-file`, or
/// `config.toml`, then runs the OAuth 2.0 PKCE flow.
///
/// Credentials from CLI flags or `--credentials-file` are persisted to
/// `config_path` so later `add` and `host` runs find them.
pub async fn google(args: GoogleAuthArgs, config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    let settings = config.google.clone().unwrap_or_default();

    let (credentials, source) = resolve_google_credentials(
        args.client_id,
        args.client_secret,
        args.credentials_file,
        config.google.as_ref(),
    )?;

    let google_config = settings.apply(quickcal_providers::google::GoogleConfig::new(credentials.clone()));
    let publisher = GooglePublisher::new(google_config)?;

    if !publisher.needs_reauth() && !args.force {
        save_credentials(&credentials, source, config_path);
        println!("Already authenticated with Google Calendar.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("Starting Google Calendar authorization...");
    println!();
    println!("A browser window will open for you to grant calendar access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    publisher.authenticate().await?;

    save_credentials(&credentials, source, config_path);

    info!("Google authentication successful");
    println!();
    println!("Authorization successful!");
    println!(
        "Tokens saved to {}.",
        publisher.config().token_path.display()
    );
    println!();
    println!("Try it: quickcal add \"lunch tomorrow at noon\"");

    Ok(())
}

/// Where the credentials were resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CredentialSource {
    /// From CLI flags (--client-id/--client-secret or --credentials-file)
    Cli,
    /// From config.toml (already persisted)
    Config,
}

/// Persists credentials that came from a transient source.
///
/// Failing to write is not fatal: authorization already succeeded.
fn save_credentials(credentials: &OAuthCredentials, source: CredentialSource, path: &Path) {
    if source == CredentialSource::Config {
        return;
    }

    match persist_google_credentials(path, &credentials.client_id, &credentials.client_secret) {
        Ok(()) => println!("Credentials saved to {}", path.display()),
        Err(e) => warn!("could not save credentials to {}: {}", path.display(), e),
    }
}

/// Resolves Google credentials from multiple sources.
///
/// Priority (highest to lowest):
/// 1. CLI `--client-id` + `--client-secret`
/// 2. CLI `--credentials-file` (Google Cloud Console JSON)
/// 3. `config.toml` `[google]` section (with secret resolution)
fn resolve_google_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_google: Option<&GoogleSettings>,
) -> ClientResult<(OAuthCredentials, CredentialSource)> {
    if let (Some(id), Some(secret)) = (&cli_client_id, &cli_client_secret) {
        let credentials = OAuthCredentials::new(id, secret);
        credentials.validate()?;
        return Ok((credentials, CredentialSource::Cli));
    }

    if cli_client_id.is_some() || cli_client_secret.is_some() {
        return Err(ClientError::Config(
            "both --client-id and --client-secret are required when providing credentials directly"
                .to_string(),
        ));
    }

    if let Some(ref path) = cli_credentials_file {
        let credentials = OAuthCredentials::from_file(path).map_err(|e| {
            ClientError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e
            ))
        })?;
        credentials.validate()?;
        return Ok((credentials, CredentialSource::Cli));
    }

    if let Some(google) = config_google
        && google.client_id.is_some()
        && google.client_secret.is_some()
    {
        let credentials = google.resolve_credentials()?;
        return Ok((credentials, CredentialSource::Config));
    }

    Err(ClientError::Config(format!(
        "Google credentials are required. Provide via:\n  \
         - client_id + client_secret in {}\n  \
         - --client-id and --client-secret flags\n  \
         - --credentials-file flag (path to Google Cloud Console JSON)\n  \
         - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET env vars",
        ClientConfig::default_path().display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_credentials_from_cli() {
        let (creds, source) = resolve_google_credentials(
            Some("cli-id.apps.googleusercontent.com".to_string()),
            Some("cli-secret".to_string()),
            None,
            None,
        )
        .unwrap();
        assert_eq!(creds.client_id, "cli-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "cli-secret");
        assert_eq!(source, CredentialSource::Cli);
    }

    #[test]
    fn resolve_credentials_from_config() {
        let settings = GoogleSettings {
            client_id: Some("config-id.apps.googleusercontent.com".to_string()),
            client_secret: Some("config-secret".to_string()),
            ..Default::default()
        };
        let (creds, source) = resolve_google_credentials(None, None, None, Some(&settings)).unwrap();
        assert_eq!(creds.client_id, "config-id.apps.googleusercontent.com");
        assert_eq!(source, CredentialSource::Config);
    }

    #[test]
    fn resolve_credentials_cli_overrides_config() {
        let settings = GoogleSettings {
            client_id: Some("config-id.apps.googleusercontent.com".to_string()),
            client_secret: Some("config-secret".to_string()),
            ..Default::default()
        };
        let (creds, source) = resolve_google_credentials(
            Some("cli-id.apps.googleusercontent.com".to_string()),
            Some("cli-secret".to_string()),
            None,
            Some(&settings),
        )
        .unwrap();
        assert_eq!(creds.client_id, "cli-id.apps.googleusercontent.com");
        assert_eq!(source, CredentialSource::Cli);
    }

    #[test]
    fn resolve_credentials_partial_cli_fails() {
        let settings = GoogleSettings {
            client_id: Some("config-id.apps.googleusercontent.com".to_string()),
            client_secret: Some("config-secret".to_string()),
            ..Default::default()
        };
        assert!(
            resolve_google_credentials(
                Some("id.apps.googleusercontent.com".to_string()),
                None,
                None,
                Some(&settings),
            )
            .is_err()
        );
        assert!(resolve_google_credentials(None, Some("secret".to_string()), None, None).is_err());
    }

    #[test]
    fn resolve_credentials_rejects_malformed_client_id() {
        let err = resolve_google_credentials(
            Some("not-a-google-id".to_string()),
            Some("secret".to_string()),
            None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("apps.googleusercontent.com"));
    }

    #[test]
    fn resolve_credentials_no_credentials_fails() {
        let err = resolve_google_credentials(None, None, None, None).unwrap_err();
        assert!(err.to_string().contains("Google credentials are required"));
    }

    #[test]
    fn resolve_credentials_from_credentials_file() {
        let tmp = tempfile::tempdir().unwrap();
        let creds_path = tmp.path().join("creds.json");
        std::fs::write(
            &creds_path,
            r#"{
                "installed": {
                    "client_id": "file-id.apps.googleusercontent.com",
                    "client_secret": "file-secret"
                }
            }"#,
        )
        .unwrap();

        let (creds, source) = resolve_google_credentials(None, None, Some(creds_path), None).unwrap();
        assert_eq!(creds.client_id, "file-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "file-secret");
        assert_eq!(source, CredentialSource::Cli);
    }

    #[test]
    fn save_credentials_skips_config_source() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let creds = OAuthCredentials::new("id.apps.googleusercontent.com", "secret");

        save_credentials(&creds, CredentialSource::Config, &path);
        assert!(!path.exists());

        save_credentials(&creds, CredentialSource::Cli, &path);
        let google = ClientConfig::load_from(&path).unwrap().google.unwrap();
        assert_eq!(google.client_id.as_deref(), Some("id.apps.googleusercontent.com"));
    }

    #[tokio::test]
    async fn already_authorized_skips_consent() {
        use quickcal_providers::google::{GoogleConfig, TokenInfo, TokenStorage};

        let tmp = tempfile::tempdir().unwrap();
        let token_path = tmp.path().join("tokens.json");
        let config_path = tmp.path().join("config.toml");

        let storage = TokenStorage::new(&token_path);
        storage
            .set(TokenInfo::new(
                "access",
                Some("refresh".to_string()),
                Some(3600),
                vec![GoogleConfig::DEFAULT_SCOPE.to_string()],
            ))
            .unwrap();

        let config = ClientConfig {
            google: Some(GoogleSettings {
                token_path: Some(token_path),
                ..Default::default()
            }),
            ..Default::default()
        };
        let args = GoogleAuthArgs {
            client_id: Some("cli.apps.googleusercontent.com".to_string()),
            client_secret: Some("cli-secret".to_string()),
            ..Default::default()
        };

        google(args, &config, &config_path).await.unwrap();

        let saved = ClientConfig::load_from(&config_path).unwrap().google.unwrap();
        assert_eq!(saved.client_id.as_deref(), Some("cli.apps.googleusercontent.com"));
    }
}
