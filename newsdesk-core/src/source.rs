//! Source configuration records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Category;

/// Default number of items kept per source per cycle
pub const DEFAULT_SOURCE_CAP: usize = 20;

/// Extraction patterns for sources without a machine-readable feed
///
/// Each pattern is a regular expression. When a pattern has a capture
/// group, the first group is used; otherwise the whole match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRules {
    /// Matches one item block in the homepage markup
    pub item: String,
    /// Extracts the link from an item block
    pub link: String,
    /// Extracts the title from an item block
    pub title: String,
    /// Extracts the raw date string from an item block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// How a source is fetched and parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum FetchMode {
    /// RSS / Atom / RDF feed at `url`
    Feed { url: String },
    /// Homepage markup scraped with `rules`
    Scrape { rules: ScrapeRules },
}

impl FetchMode {
    pub fn is_scrape(&self) -> bool {
        matches!(self, FetchMode::Scrape { .. })
    }
}

/// One configured publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    /// Display name (also part of the classifier haystack)
    pub name: String,
    /// Base for resolving relative links; fetched directly in scrape mode
    pub homepage: String,
    #[serde(flatten)]
    pub mode: FetchMode,
    /// Maximum items retained per cycle
    #[serde(default = "default_cap")]
    pub cap: usize,
    /// Extra classifier terms, scored only for this source
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub boosts: BTreeMap<Category, Vec<String>>,
}

fn default_cap() -> usize {
    DEFAULT_SOURCE_CAP
}

impl Source {
    pub fn feed(id: &str, name: &str, homepage: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            homepage: homepage.to_string(),
            mode: FetchMode::Feed {
                url: url.to_string(),
            },
            cap: DEFAULT_SOURCE_CAP,
            boosts: BTreeMap::new(),
        }
    }

    pub fn scrape(id: &str, name: &str, homepage: &str, rules: ScrapeRules) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            homepage: homepage.to_string(),
            mode: FetchMode::Scrape { rules },
            cap: DEFAULT_SOURCE_CAP,
            boosts: BTreeMap::new(),
        }
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_boost(mut self, category: Category, terms: &[&str]) -> Self {
        self.boosts
            .entry(category)
            .or_default()
            .extend(terms.iter().map(|t| t.to_string()));
        self
    }

    /// URL fetched each cycle: the feed for feed sources, the homepage otherwise
    pub fn fetch_url(&self) -> &str {
        match &self.mode {
            FetchMode::Feed { url } => url,
            FetchMode::Scrape { .. } => &self.homepage,
        }
    }
}
