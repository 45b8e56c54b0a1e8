//! Per-source pipeline: fetch, parse, resolve media, normalize

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use newsdesk_core::NormalizedItem;

use crate::config::HarvestConfig;
use crate::error::SourceError;
use crate::fetcher::{Expect, HttpFetch, HttpFetcher};
use crate::limiter::FetchLimiter;
use crate::media::{MediaBudget, MediaResolver};
use crate::normalize::{canonicalize_url, normalize, resolve_link};
use crate::registry::RegisteredSource;

/// Items harvested from one source in one cycle
#[derive(Debug, Clone)]
pub struct Harvest {
    pub source_id: String,
    pub items: Vec<NormalizedItem>,
    /// How long this harvest may be served from cache
    pub revalidate_after: Duration,
}

/// Runs the pipeline for a single source
#[derive(Clone)]
pub struct Harvester {
    fetcher: Arc<dyn HttpFetch>,
    resolver: MediaResolver,
    media_budget: usize,
}

impl Harvester {
    /// Build a harvester around any fetcher. The page-fetch limiter is
    /// shared by every source harvested through this instance.
    pub fn new(fetcher: Arc<dyn HttpFetch>, config: &HarvestConfig) -> Self {
        let limiter = Arc::new(FetchLimiter::new(config.media_fetch_concurrency, "media"));
        Self {
            resolver: MediaResolver::new(fetcher.clone(), limiter),
            fetcher,
            media_budget: config.media_fallback_budget,
        }
    }

    /// Harvester backed by the reqwest fetcher
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(Arc::new(HttpFetcher::new(config)), config)
    }

    /// Fetch and process one source.
    ///
    /// Errors cover the source fetch only; entry-level problems are skipped
    /// and media failures leave media unset.
    #[instrument(skip(self, entry), fields(source = %entry.source.id))]
    pub async fn harvest(&self, entry: &RegisteredSource) -> Result<Harvest, SourceError> {
        let source = &entry.source;
        let expect = if source.mode.is_scrape() {
            Expect::Html
        } else {
            Expect::Feed
        };

        let doc = self.fetcher.fetch(source.fetch_url(), expect).await?;
        doc.ensure_content_type(expect)?;

        let raw_items = entry.parser.parse(&doc.body)?;
        let parsed = raw_items.len();

        let mut budget = MediaBudget::new(self.media_budget);
        let mut items = Vec::with_capacity(raw_items.len().min(source.cap));

        // cap counts usable items only
        for raw in raw_items {
            if items.len() >= source.cap {
                break;
            }
            let Some(link) = resolve_link(&source.homepage, &raw.link)
                .filter(|link| canonicalize_url(link).is_some())
            else {
                debug!("Skipping entry with unusable link '{}'", raw.link);
                continue;
            };
            let media = self.resolver.resolve(&raw.media, &link, &mut budget).await;
            if let Some(item) = normalize(raw, source, media) {
                items.push(item);
            }
        }

        debug!(
            "{} parsed via {}, {} kept (cap {}), media budget left {}",
            parsed,
            entry.parser.name(),
            items.len(),
            source.cap,
            budget.remaining()
        );

        Ok(Harvest {
            source_id: source.id.clone(),
            items,
            revalidate_after: doc.revalidate_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use newsdesk_core::{MediaKind, Source};

    use crate::fetcher::FetchedDocument;
    use crate::registry::SourceRegistry;

    struct StaticFetcher {
        docs: HashMap<String, (String, &'static str)>,
    }

    #[async_trait]
    impl HttpFetch for StaticFetcher {
        async fn fetch(&self, url: &str, _expect: Expect) -> Result<FetchedDocument, SourceError> {
            let (body, content_type) = self.docs.get(url).cloned().ok_or_else(|| {
                SourceError::ApiError {
                    status: 500,
                    message: format!("Failed to fetch {}", url),
                }
            })?;
            Ok(FetchedDocument {
                url: url.to_string(),
                body,
                content_type: Some(content_type.to_string()),
                revalidate_after: Duration::from_secs(300),
            })
        }
    }

    const FEED: &str = r#"<rss><channel>
        <item><title>First</title><link>/news/1</link><pubDate>Mon, 03 Mar 2025 10:00:00 GMT</pubDate>
            <media:thumbnail url="https://cdn.example/1.jpg"/></item>
        <item><title>Second</title><link>https://lab.example/news/2?utm=rss</link></item>
        <item><title>Third</title><link>https://lab.example/news/3</link></item>
    </channel></rss>"#;

    fn harvester(docs: Vec<(&str, &str, &'static str)>) -> Harvester {
        let fetcher = StaticFetcher {
            docs: docs
                .into_iter()
                .map(|(u, b, ct)| (u.to_string(), (b.to_string(), ct)))
                .collect(),
        };
        let config = HarvestConfig {
            media_fallback_budget: 0,
            ..HarvestConfig::default()
        };
        Harvester::new(Arc::new(fetcher), &config)
    }

    fn registry(cap: usize) -> SourceRegistry {
        SourceRegistry::new(vec![Source::feed(
            "lab",
            "Lab",
            "https://lab.example",
            "https://lab.example/feed.xml",
        )
        .with_cap(cap)])
        .unwrap()
    }

    #[tokio::test]
    async fn test_harvest_feed_source() {
        let harvester = harvester(vec![("https://lab.example/feed.xml", FEED, "application/rss+xml")]);
        let registry = registry(20);

        let harvest = harvester.harvest(&registry.entries()[0]).await.unwrap();

        assert_eq!(harvest.items.len(), 3);
        assert_eq!(harvest.revalidate_after, Duration::from_secs(300));
        assert_eq!(harvest.items[0].url, "https://lab.example/news/1");
        assert_eq!(harvest.items[0].media.as_ref().map(|m| m.kind), Some(MediaKind::Image));
        assert_eq!(harvest.items[1].url, "https://lab.example/news/2");
        assert!(harvest.items[1].published.is_undated());
        assert!(harvest.items[1].media.is_none());
    }

    #[tokio::test]
    async fn test_cap_bounds_items() {
        let harvester = harvester(vec![("https://lab.example/feed.xml", FEED, "text/xml")]);
        let registry = registry(2);

        let harvest = harvester.harvest(&registry.entries()[0]).await.unwrap();
        assert_eq!(harvest.items.len(), 2);
    }

    #[tokio::test]
    async fn test_cap_counts_only_usable_items() {
        let feed = r#"<rss><channel>
            <item><title>Mail us</title><link>mailto:press@lab.example</link></item>
            <item><title>Script</title><link>javascript:void(0)</link></item>
            <item><title>First</title><link>/news/1</link></item>
            <item><title>Second</title><link>/news/2</link></item>
            <item><title>Third</title><link>/news/3</link></item>
        </channel></rss>"#;
        let harvester = harvester(vec![("https://lab.example/feed.xml", feed, "application/rss+xml")]);
        let registry = registry(2);

        let harvest = harvester.harvest(&registry.entries()[0]).await.unwrap();
        let urls: Vec<&str> = harvest.items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["https://lab.example/news/1", "https://lab.example/news/2"]);
    }

    #[tokio::test]
    async fn test_non_feed_body_is_parse_error() {
        let page = "<html><body><p>This feed has moved</p></body></html>";
        let harvester = harvester(vec![("https://lab.example/feed.xml", page, "text/xml")]);
        let registry = registry(20);

        assert!(matches!(
            harvester.harvest(&registry.entries()[0]).await,
            Err(SourceError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_error() {
        let harvester = harvester(vec![("https://lab.example/feed.xml", FEED, "image/png")]);
        let registry = registry(20);

        assert!(matches!(
            harvester.harvest(&registry.entries()[0]).await,
            Err(SourceError::UnexpectedContentType { .. })
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_error() {
        let harvester = harvester(vec![]);
        let registry = registry(20);

        assert!(matches!(
            harvester.harvest(&registry.entries()[0]).await,
            Err(SourceError::ApiError { status: 500, .. })
        ));
    }
}
