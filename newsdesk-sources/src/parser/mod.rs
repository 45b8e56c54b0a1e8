//! Parsing strategies
//!
//! Both strategies turn a fetched document into ordered [`RawItem`]s.
//! The strategy is picked from the source's fetch mode, so a structured
//! parser can replace pattern extraction without touching the fetcher,
//! the media resolver or the classifier.

pub mod feed;
pub mod scrape;

use newsdesk_core::{FetchMode, RawItem};

use crate::error::SourceError;

pub use feed::{detect_dialect, FeedDialect, FeedParser};
pub use scrape::ScrapeParser;

/// Turns a document body into raw items.
///
/// A malformed entry is skipped; it never drops the rest of the document.
/// An error means the document as a whole is not of the expected kind.
pub trait ItemParser: Send + Sync {
    fn parse(&self, body: &str) -> Result<Vec<RawItem>, SourceError>;

    fn name(&self) -> &'static str;
}

/// Build the parser for a fetch mode, compiling any scrape patterns
pub fn parser_for(mode: &FetchMode) -> Result<Box<dyn ItemParser>, SourceError> {
    match mode {
        FetchMode::Feed { .. } => Ok(Box::new(FeedParser)),
        FetchMode::Scrape { rules } => Ok(Box::new(ScrapeParser::compile(rules)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsdesk_core::ScrapeRules;

    #[test]
    fn test_parser_for_dispatches_on_mode() {
        let feed = FetchMode::Feed {
            url: "https://example.com/rss".to_string(),
        };
        assert_eq!(parser_for(&feed).unwrap().name(), "feed");

        let scrape = FetchMode::Scrape {
            rules: ScrapeRules {
                item: "<li>.*?</li>".to_string(),
                link: "href=\"([^\"]+)\"".to_string(),
                title: "<a[^>]*>(.*?)</a>".to_string(),
                date: None,
            },
        };
        assert_eq!(parser_for(&scrape).unwrap().name(), "scrape");
    }

    #[test]
    fn test_parser_for_rejects_bad_pattern() {
        let scrape = FetchMode::Scrape {
            rules: ScrapeRules {
                item: "(unclosed".to_string(),
                link: "href".to_string(),
                title: "title".to_string(),
                date: None,
            },
        };
        assert!(matches!(
            parser_for(&scrape),
            Err(SourceError::InvalidConfig(_))
        ));
    }
}
