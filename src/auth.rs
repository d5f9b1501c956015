//! Bearer-token acquisition.
//!
//! The sync engine only sees [`TokenProvider`]. [`RefreshTokenProvider`]
//! exchanges a stored refresh token for a short-lived access token and hands
//! any rotated refresh token back to its [`CredentialStore`].

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::{EnvFile, StravaConfig, REFRESH_TOKEN_VAR};
use crate::error::{Error, Result};

/// Source of a bearer token for the Strava API.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// `Ok(None)` means no credential is configured at all.
    async fn access_token(&self) -> Result<Option<SecretString>>;
}

/// Durable home of the refresh token.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<SecretString>>;
    fn save(&self, refresh_token: &SecretString) -> Result<()>;
}

/// Keeps the refresh token as `STRAVA_REFRESH_TOKEN` in a `.env` file.
///
/// A value in the process environment takes precedence on load; saves
/// always go to the file.
pub struct EnvFileCredentialStore {
    path: PathBuf,
}

impl EnvFileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for EnvFileCredentialStore {
    fn load(&self) -> Result<Option<SecretString>> {
        if let Ok(token) = std::env::var(REFRESH_TOKEN_VAR) {
            if !token.is_empty() {
                return Ok(Some(SecretString::from(token)));
            }
        }
        let env = EnvFile::load(&self.path)?;
        Ok(env
            .get(REFRESH_TOKEN_VAR)
            .filter(|t| !t.is_empty())
            .map(|t| SecretString::from(t.to_string())))
    }

    fn save(&self, refresh_token: &SecretString) -> Result<()> {
        let mut env = EnvFile::load(&self.path)?;
        env.set(REFRESH_TOKEN_VAR, refresh_token.expose_secret());
        env.write()?;
        log::debug!("Stored rotated refresh token in {}", self.path.display());
        Ok(())
    }
}

/// In-memory store, handy for tests and one-shot tokens.
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<SecretString>>,
}

impl MemoryCredentialStore {
    pub fn new(token: Option<SecretString>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<SecretString>> {
        let guard = self
            .token
            .lock()
            .map_err(|_| Error::Other("credential store lock poisoned".into()))?;
        Ok(guard.clone())
    }

    fn save(&self, refresh_token: &SecretString) -> Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| Error::Other("credential store lock poisoned".into()))?;
        *guard = Some(refresh_token.clone());
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
}

/// OAuth2 refresh-token grant against Strava's token endpoint.
pub struct RefreshTokenProvider {
    http: reqwest::Client,
    config: StravaConfig,
    store: Box<dyn CredentialStore>,
}

impl RefreshTokenProvider {
    pub fn new(config: StravaConfig, store: Box<dyn CredentialStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            store,
        })
    }
}

#[async_trait]
impl TokenProvider for RefreshTokenProvider {
    async fn access_token(&self) -> Result<Option<SecretString>> {
        let (Some(client_id), Some(client_secret)) =
            (&self.config.client_id, &self.config.client_secret)
        else {
            log::error!("STRAVA_CLIENT_ID and STRAVA_CLIENT_SECRET must both be set");
            return Ok(None);
        };
        let Some(refresh_token) = self.store.load()? else {
            log::error!("No {REFRESH_TOKEN_VAR} found");
            return Ok(None);
        };

        log::info!("Refreshing Strava access token");
        let resp = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.expose_secret()),
                ("refresh_token", refresh_token.expose_secret()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(256).collect();
            return Err(Error::Auth(format!(
                "token refresh failed with {status}: {snippet}"
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| Error::Auth(format!("unexpected token response: {e}")))?;

        if let Some(expires_at) = token.expires_at {
            log::debug!("Access token expires at {expires_at}");
        }
        if let Some(new_refresh) = token.refresh_token {
            if new_refresh != refresh_token.expose_secret() {
                self.store.save(&SecretString::from(new_refresh))?;
            }
        }
        Ok(Some(SecretString::from(token.access_token)))
    }
}

/// A fixed access token, e.g. from `STRAVA_ACCESS_TOKEN`.
pub struct StaticTokenProvider {
    token: Option<SecretString>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<SecretString>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<Option<SecretString>> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "STRAVA_CLIENT_ID=1\n").unwrap();
        let store = EnvFileCredentialStore::new(&path);

        store
            .save(&SecretString::from("rotated".to_string()))
            .unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "STRAVA_CLIENT_ID=1\nSTRAVA_REFRESH_TOKEN=rotated\n");
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::new(None);
        assert!(store.load().unwrap().is_none());
        store.save(&SecretString::from("abc".to_string())).unwrap();
        assert_eq!(store.load().unwrap().unwrap().expose_secret(), "abc");
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticTokenProvider::new(None);
        assert!(provider.access_token().await.unwrap().is_none());

        let provider = StaticTokenProvider::new(Some(SecretString::from("tok".to_string())));
        let token = provider.access_token().await.unwrap().unwrap();
        assert_eq!(token.expose_secret(), "tok");
    }

    #[tokio::test]
    async fn test_refresh_without_client_credentials_is_none() {
        let provider = RefreshTokenProvider::new(
            StravaConfig::default(),
            Box::new(MemoryCredentialStore::new(Some(SecretString::from(
                "r".to_string(),
            )))),
        )
        .unwrap();
        assert!(provider.access_token().await.unwrap().is_none());
    }
}
