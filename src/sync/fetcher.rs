use secrecy::SecretString;

use crate::activity::ActivityRecord;
use crate::client::StravaClient;
use crate::error::{Error, Result};
use crate::sync::rate_limit::RateLimitPolicy;
use crate::sync::{SyncProgress, SyncWindow};

/// Strava's page size for the activity listing.
pub const PAGE_SIZE: u32 = 100;

/// Walks every page of the activity listing for one window.
pub struct ActivityFetcher<'a> {
    client: &'a StravaClient,
    policy: &'a RateLimitPolicy,
    progress: &'a dyn SyncProgress,
}

impl<'a> ActivityFetcher<'a> {
    pub fn new(
        client: &'a StravaClient,
        policy: &'a RateLimitPolicy,
        progress: &'a dyn SyncProgress,
    ) -> Self {
        Self {
            client,
            policy,
            progress,
        }
    }

    /// Fetch pages 1, 2, … until one comes back empty.
    ///
    /// The same window goes out with every page. A 429 waits out the
    /// policy's cooldown and repeats the same page; any other failure aborts.
    pub async fn fetch(
        &self,
        token: &SecretString,
        window: &SyncWindow,
    ) -> Result<Vec<ActivityRecord>> {
        let mut all = Vec::new();
        let mut page: u32 = 1;
        loop {
            let records = self.fetch_page(token, page, window).await?;
            if records.is_empty() {
                break;
            }
            log::info!("{} activities found on page {page}", records.len());
            self.progress.on_page(page, records.len());
            all.extend(records);
            page += 1;
            self.policy.page_pause().await;
        }
        log::debug!("Fetched {} activities in {} pages", all.len(), page - 1);
        Ok(all)
    }

    async fn fetch_page(
        &self,
        token: &SecretString,
        page: u32,
        window: &SyncWindow,
    ) -> Result<Vec<ActivityRecord>> {
        let mut attempts: u32 = 0;
        loop {
            match self
                .client
                .list_activities(token, page, PAGE_SIZE, window)
                .await
            {
                Err(Error::RateLimited) => {
                    if !self.policy.should_retry(attempts) {
                        return Err(Error::RateLimitExhausted { attempts });
                    }
                    self.progress.on_rate_limited(page, self.policy.cooldown);
                    self.policy.cooldown_sleep(attempts).await;
                    attempts += 1;
                }
                other => return other,
            }
        }
    }
}
