//! Scrape strategy: pattern-based extraction from an HTML listing page

use std::collections::HashSet;

use regex::Regex;
use tracing::debug;

use newsdesk_core::{MediaHints, RawItem, ScrapeRules};

use super::ItemParser;
use crate::error::SourceError;
use crate::text::{clean_text, decode_entities};

/// Parser driven by a source's [`ScrapeRules`]
#[derive(Debug, Clone)]
pub struct ScrapeParser {
    item: Regex,
    link: Regex,
    title: Regex,
    date: Option<Regex>,
}

impl ScrapeParser {
    /// Compile the source's patterns, rejecting any that are not valid regexes
    pub fn compile(rules: &ScrapeRules) -> Result<Self, SourceError> {
        let compile = |field: &str, pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                SourceError::InvalidConfig(format!("invalid {} pattern: {}", field, e))
            })
        };

        Ok(Self {
            item: compile("item", &rules.item)?,
            link: compile("link", &rules.link)?,
            title: compile("title", &rules.title)?,
            date: rules
                .date
                .as_deref()
                .map(|pattern| compile("date", pattern))
                .transpose()?,
        })
    }

    fn parse_fragment(&self, fragment: &str) -> Option<RawItem> {
        let link = capture(&self.link, fragment)
            .map(|l| decode_entities(l.trim()))
            .filter(|l| !l.is_empty())?;

        let title = capture(&self.title, fragment)
            .map(clean_text)
            .filter(|t| !t.is_empty())?;

        let date = self
            .date
            .as_ref()
            .and_then(|re| capture(re, fragment))
            .map(clean_text)
            .filter(|d| !d.is_empty());

        Some(RawItem {
            title,
            link,
            date,
            tags: Vec::new(),
            media: MediaHints {
                scraped_fragment: Some(fragment.to_string()),
                ..MediaHints::default()
            },
        })
    }
}

impl ItemParser for ScrapeParser {
    fn parse(&self, body: &str) -> Result<Vec<RawItem>, SourceError> {
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        let mut fragments = 0usize;

        for fragment in self.item.find_iter(body) {
            fragments += 1;
            let Some(item) = self.parse_fragment(fragment.as_str()) else {
                continue;
            };
            // Listing pages often link the same article from a card and its image
            if seen.insert(item.link.clone()) {
                items.push(item);
            }
        }

        debug!("Scraped {} items from {} fragments", items.len(), fragments);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "scrape"
    }
}

/// First capture group if the pattern has one, otherwise the whole match
fn capture<'a>(re: &Regex, haystack: &'a str) -> Option<&'a str> {
    let caps = re.captures(haystack)?;
    caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str())
}
