use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://www.strava.com/api/v3";
pub const DEFAULT_TOKEN_URL: &str = "https://www.strava.com/oauth/token";
pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const CLIENT_ID_VAR: &str = "STRAVA_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "STRAVA_CLIENT_SECRET";
pub const REFRESH_TOKEN_VAR: &str = "STRAVA_REFRESH_TOKEN";
pub const ACCESS_TOKEN_VAR: &str = "STRAVA_ACCESS_TOKEN";
const API_BASE_URL_VAR: &str = "STRAVA_API_BASE_URL";
const TOKEN_URL_VAR: &str = "STRAVA_TOKEN_URL";

/// Connection settings for the Strava API.
#[derive(Debug, Clone)]
pub struct StravaConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub api_base_url: String,
    pub token_url: String,
    pub request_timeout: Duration,
}

impl Default for StravaConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl StravaConfig {
    /// Build from the process environment, falling back to values in
    /// `env_file` for anything unset.
    pub fn from_env(env_file: &EnvFile) -> Result<Self> {
        let lookup = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.is_empty())
                .or_else(|| env_file.get(key).filter(|v| !v.is_empty()).map(str::to_string))
        };

        let api_base_url = lookup(API_BASE_URL_VAR).unwrap_or_else(|| DEFAULT_API_BASE_URL.into());
        let token_url = lookup(TOKEN_URL_VAR).unwrap_or_else(|| DEFAULT_TOKEN_URL.into());
        validate_url(&api_base_url)?;
        validate_url(&token_url)?;

        Ok(Self {
            client_id: lookup(CLIENT_ID_VAR),
            client_secret: lookup(CLIENT_SECRET_VAR).map(SecretString::from),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }
}

fn validate_url(s: &str) -> Result<()> {
    Url::parse(s)
        .map(|_| ())
        .map_err(|e| Error::Config(format!("invalid URL {s:?}: {e}")))
}

/// A dotenv-style `KEY=VALUE` file. Key order is preserved on write.
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    path: PathBuf,
    entries: Vec<(String, String)>,
}

impl EnvFile {
    /// Read `path`; a missing file yields an empty set of entries.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match dotenvy::from_path_iter(&path) {
            Ok(iter) => iter.collect::<std::result::Result<Vec<_>, _>>()?,
            Err(e) if e.not_found() => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn write(&self) -> Result<()> {
        let mut out = String::new();
        for (k, v) in &self.entries {
            out.push_str(k);
            out.push('=');
            out.push_str(&quote_value(v));
            out.push('\n');
        }
        fs::write(&self.path, out)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

/// Single-quote values dotenv would otherwise split, expand or unescape.
fn quote_value(v: &str) -> String {
    let plain = v
        .chars()
        .all(|c| !c.is_whitespace() && !matches!(c, '#' | '"' | '\'' | '$' | '\\'));
    if plain || v.contains('\'') {
        v.to_string()
    } else {
        format!("'{v}'")
    }
}
