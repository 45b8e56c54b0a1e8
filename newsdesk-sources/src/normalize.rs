//! RawItem to NormalizedItem mapping

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use newsdesk_core::{Media, NormalizedItem, Published, RawItem, Source};

use crate::text::clean_text;

/// Naive date-time layouts, read as UTC
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Date-only layouts, read as midnight UTC
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%Y/%m/%d",
];

/// Resolve a possibly relative link against `base`
pub fn resolve_link(base: &str, link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }

    match Url::parse(link) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base)
            .and_then(|base| base.join(link))
            .ok()
            .map(|url| url.to_string()),
        Err(_) => None,
    }
}

/// Canonical form used as the dedup key: scheme + host (+ non-default port) + path.
/// Query, fragment and userinfo are dropped. Only http(s) URLs qualify.
pub fn canonicalize_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let host = url.host_str()?;
    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();

    Some(format!("{}://{}{}{}", url.scheme(), host, port, url.path()))
}

/// Parse a feed or page date string. Anything unrecognised is `Undated`.
pub fn parse_date(raw: &str) -> Published {
    let raw = raw.trim();
    if raw.is_empty() {
        return Published::Undated;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Published::At(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Published::At(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Published::At(naive.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Published::At(naive.and_utc());
            }
        }
    }

    debug!("Unparsable date '{}', item left undated", raw);
    Published::Undated
}

/// Stable item id: first 8 bytes of the SHA-256 of the canonical URL, hex encoded
pub fn item_id(canonical_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_url.as_bytes());
    hex::encode(&hasher.finalize()[..8])
}

/// Build the canonical record. `None` when the item has no usable title or link.
pub fn normalize(raw: RawItem, source: &Source, media: Option<Media>) -> Option<NormalizedItem> {
    let title = clean_text(&raw.title);
    if title.is_empty() {
        return None;
    }

    let link = resolve_link(&source.homepage, &raw.link)?;
    let url = canonicalize_url(&link)?;

    let published = raw
        .date
        .as_deref()
        .map(parse_date)
        .unwrap_or(Published::Undated);

    let mut tags: Vec<String> = Vec::with_capacity(raw.tags.len());
    for tag in raw.tags {
        let tag = clean_text(&tag);
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    Some(NormalizedItem {
        id: item_id(&url),
        title,
        url,
        published,
        source_id: source.id.clone(),
        source_name: source.name.clone(),
        tags,
        media,
    })
}
