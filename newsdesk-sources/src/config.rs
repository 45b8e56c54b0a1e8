//! Harvest configuration

use std::env;
use std::time::Duration;

/// Configuration for fetching and media resolution
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Per-request timeout for source fetches (in seconds)
    pub fetch_timeout_secs: u64,
    /// Per-request timeout for article page fetches (in seconds)
    pub page_timeout_secs: u64,
    /// Revalidation window attached to every fetched document (in seconds)
    pub revalidate_secs: u64,
    /// Extra article-page requests allowed per source per cycle
    pub media_fallback_budget: usize,
    /// Maximum concurrent article-page requests across all sources
    pub media_fetch_concurrency: usize,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 10,
            page_timeout_secs: 5,
            revalidate_secs: 900, // 15 minutes
            media_fallback_budget: 4,
            media_fetch_concurrency: 4,
            user_agent: "Mozilla/5.0 (compatible; Newsdesk/1.0)".to_string(),
        }
    }
}

impl HarvestConfig {
    /// Load configuration from environment variables, falling back to defaults
    ///
    /// Reads:
    /// - NEWSDESK_FETCH_TIMEOUT_SECS
    /// - NEWSDESK_PAGE_TIMEOUT_SECS
    /// - NEWSDESK_REVALIDATE_SECS
    /// - NEWSDESK_MEDIA_FALLBACK_BUDGET
    /// - NEWSDESK_MEDIA_FETCH_CONCURRENCY
    /// - NEWSDESK_USER_AGENT
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fetch_timeout_secs: env_positive("NEWSDESK_FETCH_TIMEOUT_SECS")
                .unwrap_or(defaults.fetch_timeout_secs),
            page_timeout_secs: env_positive("NEWSDESK_PAGE_TIMEOUT_SECS")
                .unwrap_or(defaults.page_timeout_secs),
            revalidate_secs: env_parse("NEWSDESK_REVALIDATE_SECS")
                .unwrap_or(defaults.revalidate_secs),
            media_fallback_budget: env_parse("NEWSDESK_MEDIA_FALLBACK_BUDGET")
                .unwrap_or(defaults.media_fallback_budget),
            media_fetch_concurrency: env_positive("NEWSDESK_MEDIA_FETCH_CONCURRENCY")
                .unwrap_or(defaults.media_fetch_concurrency),
            user_agent: env::var("NEWSDESK_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn revalidate(&self) -> Duration {
        Duration::from_secs(self.revalidate_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Zero would disable the setting outright (a zero timeout fails every request)
fn env_positive<T: std::str::FromStr + PartialOrd + Default>(key: &str) -> Option<T> {
    env_parse::<T>(key).filter(|n| *n > T::default())
}
