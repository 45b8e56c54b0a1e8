//! Query/filter entry point
//!
//! Fans out one harvest per source, merges and deduplicates the results,
//! then filters, sorts and truncates them according to an [`AggregateQuery`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use newsdesk_core::{ClassifiedItem, NewsdeskError, NormalizedItem};
use newsdesk_sources::{Harvester, RegisteredSource, SourceRegistry};

use crate::cache::HarvestCache;
use crate::classifier::Classifier;
use crate::config::AggregatorConfig;
use crate::dedup::dedup_by_url;

/// Default page size when the caller gives none
pub const DEFAULT_LIMIT: i64 = 50;

/// Caller errors, the only failures `aggregate` surfaces
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("date_from ({from}) is after date_to ({to})")]
    InvalidWindow {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("limit must not be negative (got {0})")]
    NegativeLimit(i64),
}

impl From<AggregateError> for NewsdeskError {
    fn from(err: AggregateError) -> Self {
        NewsdeskError::invalid_input(err.to_string())
    }
}

/// Filters for one aggregate call
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AggregateQuery {
    /// Case-insensitive substring over title, source name and tags
    #[serde(default)]
    pub query: Option<String>,
    /// Inclusive lower bound
    #[serde(default)]
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    #[serde(default)]
    pub date_to: Option<DateTime<Utc>>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Default for AggregateQuery {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

impl AggregateQuery {
    pub fn new(limit: i64) -> Self {
        Self {
            query: None,
            date_from: None,
            date_to: None,
            limit,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_window(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// Whether either date bound is set
    pub fn has_window(&self) -> bool {
        self.date_from.is_some() || self.date_to.is_some()
    }

    /// Check caller input; returns the normalized needle and limit
    pub fn validate(&self) -> Result<(Option<String>, usize), AggregateError> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(AggregateError::InvalidWindow { from, to });
            }
        }

        let limit = usize::try_from(self.limit).map_err(|_| AggregateError::NegativeLimit(self.limit))?;

        let needle = self
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        Ok((needle, limit))
    }
}

/// Text filter, date window, sort and truncation over merged items
pub fn apply_query(
    items: Vec<NormalizedItem>,
    query: &AggregateQuery,
) -> Result<Vec<NormalizedItem>, AggregateError> {
    let (needle, limit) = query.validate()?;

    let mut items: Vec<NormalizedItem> = items
        .into_iter()
        .filter(|item| needle.as_deref().is_none_or(|n| matches_text(item, n)))
        .filter(|item| within_window(item, query.date_from, query.date_to))
        .collect();

    // Option orders None first, so descending puts undated items last.
    // Stable sort keeps merge order for equal timestamps.
    items.sort_by(|a, b| b.published.timestamp().cmp(&a.published.timestamp()));
    items.truncate(limit);

    Ok(items)
}

fn matches_text(item: &NormalizedItem, needle: &str) -> bool {
    item.title.to_lowercase().contains(needle)
        || item.source_name.to_lowercase().contains(needle)
        || item.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
}

/// With any bound set, undated items are out
fn within_window(
    item: &NormalizedItem,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> bool {
    if from.is_none() && to.is_none() {
        return true;
    }

    match item.published.timestamp() {
        Some(ts) => from.is_none_or(|f| ts >= f) && to.is_none_or(|t| ts <= t),
        None => false,
    }
}

/// Aggregates every registered source
pub struct Aggregator {
    registry: Arc<SourceRegistry>,
    harvester: Harvester,
    classifier: Classifier,
    cache: Option<Arc<dyn HarvestCache>>,
}

impl Aggregator {
    pub fn new(registry: Arc<SourceRegistry>, harvester: Harvester, config: &AggregatorConfig) -> Self {
        let classifier = Classifier::from_sources(registry.sources(), config.boost_weight);
        info!(
            "Initializing Aggregator ({} sources, boost weight {})",
            registry.len(),
            config.boost_weight
        );
        Self {
            registry,
            harvester,
            classifier,
            cache: None,
        }
    }

    /// Serve repeat harvests from `cache` within their revalidation window
    pub fn with_cache(mut self, cache: Arc<dyn HarvestCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Harvest all sources concurrently and apply `query`.
    ///
    /// Only invalid caller input fails; broken sources contribute nothing.
    #[instrument(skip(self, query), fields(query = ?query.query, limit = query.limit))]
    pub async fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<NormalizedItem>, AggregateError> {
        query.validate()?;

        let harvests = join_all(
            self.registry
                .entries()
                .iter()
                .map(|entry| self.harvest_source(entry)),
        )
        .await;

        let merged: Vec<NormalizedItem> = harvests.into_iter().flatten().collect();
        let harvested = merged.len();
        let unique = dedup_by_url(merged);
        let items = apply_query(unique, query)?;

        info!("Aggregated {} items ({} harvested)", items.len(), harvested);
        Ok(items)
    }

    /// Annotate items with their category
    pub fn classify(&self, items: Vec<NormalizedItem>) -> Vec<ClassifiedItem> {
        self.classifier.classify(items)
    }

    async fn harvest_source(&self, entry: &RegisteredSource) -> Vec<NormalizedItem> {
        let source_id = entry.source.id.as_str();

        if let Some(cache) = &self.cache {
            if let Some(items) = cache.get(source_id).await {
                return items;
            }
        }

        match self.harvester.harvest(entry).await {
            Ok(harvest) => {
                if let Some(cache) = &self.cache {
                    cache.put(&harvest).await;
                }
                harvest.items
            }
            Err(e) => {
                warn!("Source {} failed, contributing no items: {}", source_id, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use newsdesk_core::Published;

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn item(url: &str, title: &str, published: Published) -> NormalizedItem {
        NormalizedItem {
            id: url.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            published,
            source_id: "lab".to_string(),
            source_name: "Lab Blog".to_string(),
            tags: vec![],
            media: None,
        }
    }

    fn sample() -> Vec<NormalizedItem> {
        vec![
            item("https://lab.example/undated", "Undated note", Published::Undated),
            item("https://lab.example/old", "Old post", Published::At(ts(1, 0))),
            item("https://lab.example/new", "New post", Published::At(ts(5, 0))),
            item("https://lab.example/mid", "Mid post", Published::At(ts(3, 0))),
        ]
    }

    fn urls(items: &[NormalizedItem]) -> Vec<&str> {
        items.iter().map(|i| i.url.as_str()).collect()
    }

    #[test]
    fn test_sorts_newest_first_with_undated_last() {
        let items = apply_query(sample(), &AggregateQuery::new(10)).unwrap();
        assert_eq!(
            urls(&items),
            vec![
                "https://lab.example/new",
                "https://lab.example/mid",
                "https://lab.example/old",
                "https://lab.example/undated",
            ]
        );
    }

    #[test]
    fn test_window_bounds_are_inclusive_and_drop_undated() {
        let query = AggregateQuery::new(10).with_window(Some(ts(1, 0)), Some(ts(3, 0)));
        let items = apply_query(sample(), &query).unwrap();
        assert_eq!(urls(&items), vec!["https://lab.example/mid", "https://lab.example/old"]);
    }

    #[test]
    fn test_single_bound_also_drops_undated() {
        let query = AggregateQuery::new(10).with_window(Some(ts(2, 0)), None);
        let items = apply_query(sample(), &query).unwrap();
        assert_eq!(urls(&items), vec!["https://lab.example/new", "https://lab.example/mid"]);
    }

    #[test]
    fn test_query_matches_tags_case_insensitively() {
        let mut items = sample();
        items[1].tags = vec!["Research".to_string()];

        let found = apply_query(items, &AggregateQuery::new(10).with_query("  RESEARCH ")).unwrap();
        assert_eq!(urls(&found), vec!["https://lab.example/old"]);
    }

    #[test]
    fn test_blank_query_is_ignored() {
        let items = apply_query(sample(), &AggregateQuery::new(10).with_query("   ")).unwrap();
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn test_limit_truncates() {
        let items = apply_query(sample(), &AggregateQuery::new(2)).unwrap();
        assert_eq!(urls(&items), vec!["https://lab.example/new", "https://lab.example/mid"]);
        assert!(apply_query(sample(), &AggregateQuery::new(0)).unwrap().is_empty());
    }

    #[test]
    fn test_caller_errors() {
        assert_eq!(
            apply_query(sample(), &AggregateQuery::new(-1)),
            Err(AggregateError::NegativeLimit(-1))
        );

        let inverted = AggregateQuery::new(10).with_window(Some(ts(5, 0)), Some(ts(1, 0)));
        assert!(matches!(
            apply_query(sample(), &inverted),
            Err(AggregateError::InvalidWindow { .. })
        ));

        let err: NewsdeskError = AggregateError::NegativeLimit(-3).into();
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_query_deserializes_with_defaults() {
        let query: AggregateQuery = serde_json::from_str(r#"{"query": "gpt"}"#).unwrap();
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.query.as_deref(), Some("gpt"));
        assert!(!query.has_window());
    }
}
