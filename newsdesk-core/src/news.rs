//! Item data structures for the aggregation pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Category;

/// Publication time of an item
///
/// `Undated` is explicit: an unparsable date never turns into "now".
/// Serializes as an RFC 3339 string, or `null` when undated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Published {
    At(DateTime<Utc>),
    Undated,
}

impl Published {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Published::At(ts) => Some(*ts),
            Published::Undated => None,
        }
    }

    pub fn is_undated(&self) -> bool {
        matches!(self, Published::Undated)
    }
}

impl From<Option<DateTime<Utc>>> for Published {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map(Published::At).unwrap_or(Published::Undated)
    }
}

/// Kind of a resolved media asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// One representative media asset for an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub url: String,
    pub kind: MediaKind,
}

impl Media {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: MediaKind::Image,
        }
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: MediaKind::Video,
        }
    }
}

/// An `<enclosure>` or `<media:content>` element as declared by the feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaContentHint {
    pub url: String,
    /// `medium` attribute (e.g. "image", "video")
    pub medium: Option<String>,
    /// `type` attribute (MIME type)
    pub mime: Option<String>,
}

/// Raw media hints collected while parsing, consumed by the media resolver
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaHints {
    pub enclosures: Vec<MediaContentHint>,
    pub media_contents: Vec<MediaContentHint>,
    pub thumbnails: Vec<String>,
    /// Inlined HTML content fields (description, content:encoded, ...)
    pub html_fragments: Vec<String>,
    /// Markup fragment a scrape-sourced item was cut from
    pub scraped_fragment: Option<String>,
}

/// One candidate entry before normalization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    /// Link as found in the document; may be relative
    pub link: String,
    /// Raw date string, unparsed
    pub date: Option<String>,
    /// Declared category tags
    pub tags: Vec<String>,
    pub media: MediaHints,
}

/// Canonical output record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    /// Unique identifier (hash of canonical URL)
    pub id: String,
    pub title: String,
    /// Canonical URL, used as the dedup key
    pub url: String,
    pub published: Published,
    pub source_id: String,
    pub source_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
}

/// A normalized item annotated with its assigned category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedItem {
    #[serde(flatten)]
    pub item: NormalizedItem,
    pub category: Category,
}
