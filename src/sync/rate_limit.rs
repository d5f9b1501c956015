use std::time::Duration;

/// Strava's short-term limit window is 15 minutes.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(15 * 60);

/// Pause between successful page requests.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);

/// How the fetcher reacts to HTTP 429 and paces itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Fixed wait after each 429 before retrying the same request.
    pub cooldown: Duration,
    /// `None` retries forever.
    pub max_retries: Option<u32>,
    pub page_delay: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            max_retries: None,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }
}

impl RateLimitPolicy {
    /// No waiting at all. Tests only need the retry semantics.
    pub fn immediate() -> Self {
        Self {
            cooldown: Duration::ZERO,
            max_retries: None,
            page_delay: Duration::ZERO,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Whether another retry is allowed after `attempts` failed ones.
    pub fn should_retry(&self, attempts: u32) -> bool {
        match self.max_retries {
            Some(max) => attempts < max,
            None => true,
        }
    }

    /// Sleep through the cooldown before retry number `attempt + 1`.
    pub async fn cooldown_sleep(&self, attempt: u32) {
        match self.max_retries {
            Some(max) => log::warn!(
                "Rate limited (429). Waiting {}s before retry {}/{max}",
                self.cooldown.as_secs(),
                attempt + 1
            ),
            None => log::warn!(
                "Rate limited (429). Waiting {}s before retry {}",
                self.cooldown.as_secs(),
                attempt + 1
            ),
        }
        tokio::time::sleep(self.cooldown).await;
    }

    pub async fn page_pause(&self) {
        if !self.page_delay.is_zero() {
            tokio::time::sleep(self.page_delay).await;
        }
    }
}
