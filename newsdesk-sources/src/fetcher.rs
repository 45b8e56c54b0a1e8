//! HTTP fetching for sources and article pages
//!
//! Network access goes through the [`HttpFetch`] trait so that the rest of
//! the pipeline can be exercised without a network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;

use crate::config::HarvestConfig;
use crate::error::SourceError;

/// What a request expects to get back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// A machine-readable feed (RSS, Atom, RDF)
    Feed,
    /// A homepage to be scraped
    Html,
    /// An article page, fetched for media metadata
    Page,
}

impl Expect {
    fn accept_header(&self) -> &'static str {
        match self {
            Expect::Feed => {
                "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.9, */*;q=0.5"
            }
            Expect::Html | Expect::Page => "text/html, application/xhtml+xml;q=0.9, */*;q=0.5",
        }
    }

    /// Whether a `Content-Type` header value is acceptable for this request
    pub fn accepts(&self, content_type: &str) -> bool {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match self {
            Expect::Feed => {
                mime.contains("xml")
                    || mime.contains("rss")
                    || mime.contains("atom")
                    || mime == "text/plain"
            }
            Expect::Html | Expect::Page => mime == "text/html" || mime.contains("xhtml"),
        }
    }
}

/// A successfully fetched document
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: String,
    pub body: String,
    pub content_type: Option<String>,
    /// How long callers may treat this document as fresh
    pub revalidate_after: Duration,
}

impl FetchedDocument {
    /// Reject documents whose declared content type does not fit `expect`.
    /// A missing `Content-Type` is accepted.
    pub fn ensure_content_type(&self, expect: Expect) -> Result<(), SourceError> {
        match &self.content_type {
            Some(ct) if !expect.accepts(ct) => Err(SourceError::UnexpectedContentType {
                url: self.url.clone(),
                content_type: ct.clone(),
            }),
            _ => Ok(()),
        }
    }
}

/// Issues GET requests
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Fetch `url`, failing on transport errors and non-success statuses
    async fn fetch(&self, url: &str, expect: Expect) -> Result<FetchedDocument, SourceError>;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: Client,
    page_timeout: Duration,
    revalidate: Duration,
}

impl HttpFetcher {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.fetch_timeout())
                .user_agent(config.user_agent.clone())
                .build()
                .unwrap_or_else(|_| Client::new()),
            page_timeout: config.page_timeout(),
            revalidate: config.revalidate(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(&HarvestConfig::default())
    }
}

#[async_trait]
impl HttpFetch for HttpFetcher {
    async fn fetch(&self, url: &str, expect: Expect) -> Result<FetchedDocument, SourceError> {
        let mut request = self.client.get(url).header(ACCEPT, expect.accept_header());
        if expect == Expect::Page {
            request = request.timeout(self.page_timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::ApiError {
                status: response.status().as_u16(),
                message: format!("Failed to fetch {}", url),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;

        debug!("Fetched {} ({} bytes)", url, body.len());

        Ok(FetchedDocument {
            url: url.to_string(),
            body,
            content_type,
            revalidate_after: self.revalidate,
        })
    }
}
