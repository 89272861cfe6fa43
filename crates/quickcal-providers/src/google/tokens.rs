//! OAuth token persistence.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Margin subtracted from `expires_in` so tokens are refreshed early.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A persisted OAuth token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Already includes the refresh margin.
    pub expires_at: Option<DateTime<Utc>>,
    /// Granted scopes.
    #[serde(default)]
    pub scopes: Vec<String>,
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(|secs| expiry_from(now, secs)),
            scopes,
            last_refresh: now,
        }
    }

    /// Tokens without an expiry are treated as valid.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Replaces the access token after a refresh.
    ///
    /// Google may rotate the refresh token; a `None` keeps the current one.
    pub fn apply_refresh(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
    ) {
        let now = Utc::now();
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(|secs| expiry_from(now, secs));
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.last_refresh = now;
    }
}

fn expiry_from(now: DateTime<Utc>, expires_in_secs: i64) -> DateTime<Utc> {
    now + Duration::seconds(expires_in_secs) - Duration::seconds(EXPIRY_MARGIN_SECS)
}

/// File-backed token store.
///
/// Writes go to a sibling temp file that is renamed into place, so a crash
/// never leaves a half-written token file. On Unix the file is `0600`.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    tokens: Mutex<Option<TokenInfo>>,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<TokenInfo>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads tokens from disk. Returns `false` if no token file exists.
    pub fn load(&self) -> ProviderResult<bool> {
        if !self.path.exists() {
            debug!("no token file at {}", self.path.display());
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::auth(format!("failed to read token file: {}", e)).with_source(e)
        })?;
        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::auth(format!(
                "token file {} is corrupt, run `quickcal auth google` again",
                self.path.display()
            ))
            .with_source(e)
        })?;

        debug!("loaded tokens from {}", self.path.display());
        *self.lock() = Some(tokens);
        Ok(true)
    }

    fn persist(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        let io_err = |what: &str, e: std::io::Error| {
            ProviderError::internal(format!("failed to {} {}: {}", what, self.path.display(), e))
                .with_source(e)
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| io_err("create directory for", e))?;
        }

        let content = serde_json::to_string_pretty(tokens).map_err(|e| {
            ProviderError::internal(format!("failed to serialize tokens: {}", e)).with_source(e)
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| io_err("write", e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))
                .map_err(|e| io_err("set permissions on", e))?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| io_err("replace", e))?;
        debug!("saved tokens to {}", self.path.display());
        Ok(())
    }

    pub fn get(&self) -> Option<TokenInfo> {
        self.lock().clone()
    }

    /// Replaces the stored tokens and persists them.
    pub fn set(&self, tokens: TokenInfo) -> ProviderResult<()> {
        self.persist(&tokens)?;
        *self.lock() = Some(tokens);
        Ok(())
    }

    /// Applies a refresh response to the stored tokens and persists them.
    pub fn apply_refresh(
        &self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
    ) -> ProviderResult<TokenInfo> {
        let mut updated = self
            .get()
            .ok_or_else(|| ProviderError::internal("no tokens to update"))?;
        updated.apply_refresh(access_token, expires_in_secs, refresh_token);
        self.set(updated.clone())?;
        Ok(updated)
    }

    /// Removes the tokens from memory and disk.
    pub fn clear(&self) -> ProviderResult<()> {
        *self.lock() = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::internal(format!("failed to remove token file: {}", e)).with_source(e)
            })?;
            info!("removed tokens at {}", self.path.display());
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if stored tokens are missing or lack one of `required`.
    pub fn needs_reauth(&self, required: &[String]) -> bool {
        self.lock()
            .as_ref()
            .is_none_or(|tokens| !tokens.has_scopes(required))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;

    const SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

    fn scopes() -> Vec<String> {
        vec![SCOPE.to_string()]
    }

    #[test]
    fn new_token_expires_with_margin() {
        let token = TokenInfo::new("access", Some("refresh".into()), Some(3600), scopes());
        let remaining = token.expires_at.unwrap() - Utc::now();
        assert!(remaining <= Duration::seconds(3540));
        assert!(remaining > Duration::seconds(3500));
        assert!(!token.is_expired());
    }

    #[test]
    fn expiry_checks() {
        let mut token = TokenInfo::new("access", None, None, vec![]);
        assert!(!token.is_expired());
        token.expires_at = Some(Utc::now() - Duration::minutes(1));
        assert!(token.is_expired());

        // expires_in below the margin is already expired
        assert!(TokenInfo::new("a", None, Some(30), vec![]).is_expired());
    }

    #[test]
    fn refresh_keeps_refresh_token_unless_rotated() {
        let mut token = TokenInfo::new("old", Some("r1".into()), Some(10), scopes());
        token.apply_refresh("new", Some(3600), None);
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("r1"));

        token.apply_refresh("newer", Some(3600), Some("r2".into()));
        assert_eq!(token.refresh_token.as_deref(), Some("r2"));
    }

    #[test]
    fn set_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("google-tokens.json");

        let storage = TokenStorage::new(&path);
        storage
            .set(TokenInfo::new("access", Some("refresh".into()), Some(3600), scopes()))
            .unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reloaded = TokenStorage::new(&path);
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.get(), storage.get());
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("google-tokens.json");
        TokenStorage::new(&path)
            .set(TokenInfo::new("access", None, None, vec![]))
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("absent.json"));
        assert!(!storage.load().unwrap());
        assert!(storage.get().is_none());
        assert!(storage.needs_reauth(&scopes()));
    }

    #[test]
    fn corrupt_file_is_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("google-tokens.json");
        fs::write(&path, "{not json").unwrap();

        let err = TokenStorage::new(&path).load().unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthError);
        assert!(err.message().contains("quickcal auth google"));
    }

    #[test]
    fn apply_refresh_without_tokens_is_internal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("t.json"));
        let err = storage.apply_refresh("x", None, None).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InternalError);
    }

    #[test]
    fn apply_refresh_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        let storage = TokenStorage::new(&path);
        storage
            .set(TokenInfo::new("old", Some("r".into()), Some(10), scopes()))
            .unwrap();

        storage.apply_refresh("fresh", Some(3600), None).unwrap();

        let reloaded = TokenStorage::new(&path);
        reloaded.load().unwrap();
        let tokens = reloaded.get().unwrap();
        assert_eq!(tokens.access_token, "fresh");
        assert_eq!(tokens.refresh_token.as_deref(), Some("r"));
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        let storage = TokenStorage::new(&path);
        storage.set(TokenInfo::new("a", None, None, vec![])).unwrap();

        storage.clear().unwrap();
        assert!(!path.exists());
        assert!(storage.get().is_none());
    }

    #[test]
    fn reauth_when_scope_missing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("t.json"));
        storage
            .set(TokenInfo::new(
                "a",
                None,
                None,
                vec!["https://www.googleapis.com/auth/calendar.readonly".into()],
            ))
            .unwrap();
        assert!(storage.needs_reauth(&scopes()));
    }
}
