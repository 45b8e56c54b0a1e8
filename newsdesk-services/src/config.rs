//! Aggregator configuration

use std::env;

/// Settings for the query/filter layer
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Multiplier applied to per-source boost hits
    pub boost_weight: u32,
    /// Serve per-source harvests from the TTL cache
    pub cache_enabled: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            boost_weight: 1,
            cache_enabled: true,
        }
    }
}

impl AggregatorConfig {
    /// Reads NEWSDESK_BOOST_WEIGHT and NEWSDESK_CACHE_ENABLED
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            boost_weight: env::var("NEWSDESK_BOOST_WEIGHT")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.boost_weight),
            cache_enabled: env::var("NEWSDESK_CACHE_ENABLED")
                .ok()
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(defaults.cache_enabled),
        }
    }
}
