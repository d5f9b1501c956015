use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};

use crate::activity::ActivityRecord;
use crate::config::StravaConfig;
use crate::error::{Error, Result};
use crate::sync::SyncWindow;

/// Thin client for the one Strava endpoint the sync needs.
#[derive(Clone, Debug)]
pub struct StravaClient {
    base_url: String,
    http: reqwest::Client,
}

impl StravaClient {
    pub fn new(config: &StravaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Point at a different API root, e.g. a mock server.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Self::new(&StravaConfig {
            api_base_url: base_url.to_string(),
            ..StravaConfig::default()
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One page of `GET /athlete/activities`.
    ///
    /// A 429 comes back as [`Error::RateLimited`] so the caller can decide to
    /// wait; every other non-success status is a hard error.
    pub async fn list_activities(
        &self,
        token: &SecretString,
        page: u32,
        per_page: u32,
        window: &SyncWindow,
    ) -> Result<Vec<ActivityRecord>> {
        let mut query: Vec<(&str, String)> = vec![
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
        ];
        if let Some(after) = window.after {
            query.push(("after", after.to_string()));
        }
        if let Some(before) = window.before {
            query.push(("before", before.to_string()));
        }

        let resp = self
            .http
            .get(format!("{}/athlete/activities", self.base_url))
            .bearer_auth(token.expose_secret())
            .query(&query)
            .send()
            .await?;

        let status = resp.status();
        match status {
            s if s.is_success() => Ok(resp.json::<Vec<ActivityRecord>>().await?),
            StatusCode::TOO_MANY_REQUESTS => Err(Error::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = resp.text().await.unwrap_or_default();
                Err(Error::Auth(snippet(&body)))
            }
            _ => {
                let body = resp.text().await.unwrap_or_default();
                Err(Error::Api {
                    status: status.as_u16(),
                    message: snippet(&body),
                })
            }
        }
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(256).collect()
}
