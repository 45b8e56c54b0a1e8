//! Media resolution
//!
//! Picks one representative image or video per item. Hints found in the
//! fetched document are tried first; as a last resort the article page is
//! fetched for its social-preview image, bounded by a per-source budget and
//! the shared [`FetchLimiter`].

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;
use url::Url;

use newsdesk_core::{Media, MediaContentHint, MediaHints, MediaKind};

use crate::fetcher::{Expect, HttpFetch};
use crate::limiter::FetchLimiter;

/// Hosts whose URLs are always treated as video
const VIDEO_DOMAINS: [&str; 6] = [
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "dailymotion.com",
    "twitch.tv",
    "loom.com",
];

static IMG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]+src=["']([^"']+)["']"#).unwrap());

/// og:image then twitter:image, each in both attribute orders
static META_IMAGE_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        Regex::new(r#"<meta[^>]+property=["']og:image["'][^>]+content=["']([^"']+)["']"#).unwrap(),
        Regex::new(r#"<meta[^>]+content=["']([^"']+)["'][^>]+property=["']og:image["']"#).unwrap(),
        Regex::new(r#"<meta[^>]+name=["']twitter:image["'][^>]+content=["']([^"']+)["']"#).unwrap(),
        Regex::new(r#"<meta[^>]+content=["']([^"']+)["'][^>]+name=["']twitter:image["']"#).unwrap(),
    ]
});

/// Remaining article-page fetches for one source in one cycle
#[derive(Debug, Clone, Copy)]
pub struct MediaBudget {
    remaining: usize,
}

impl MediaBudget {
    pub fn new(requests: usize) -> Self {
        Self { remaining: requests }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Spend one request; `false` once exhausted
    pub fn try_spend(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Whether `url` is on a known video-hosting domain
pub fn is_video_host(url: &str) -> bool {
    let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(|h| h.to_lowercase()))
    else {
        return false;
    };

    VIDEO_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
}

/// Resolve media from the hints carried by the item itself (no network).
///
/// `link` must be absolute; relative media URLs are resolved against it.
pub fn resolve_inline(hints: &MediaHints, link: &str) -> Option<Media> {
    // 1. enclosures declared as image or video
    if let Some(media) = hints.enclosures.iter().find_map(|hint| declared_media(hint, link)) {
        return Some(media);
    }

    // 2. media:content with an explicit medium or type
    if let Some(media) = hints
        .media_contents
        .iter()
        .find_map(|hint| declared_media(hint, link))
    {
        return Some(media);
    }

    // 3. thumbnails
    if let Some(media) = hints
        .thumbnails
        .iter()
        .find_map(|url| to_media(url, link, MediaKind::Image))
    {
        return Some(media);
    }

    // 4. first image inside inlined HTML
    if let Some(media) = hints
        .html_fragments
        .iter()
        .find_map(|html| first_image(html, link))
    {
        return Some(media);
    }

    // 5. first image in the scraped fragment
    hints
        .scraped_fragment
        .as_deref()
        .and_then(|fragment| first_image(fragment, link))
}

/// Social-preview image declared in a page's `<meta>` tags
pub fn extract_meta_image(html: &str) -> Option<String> {
    META_IMAGE_PATTERNS.iter().find_map(|re| {
        re.captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|url| !url.is_empty())
    })
}

fn declared_media(hint: &MediaContentHint, link: &str) -> Option<Media> {
    let declared = |value: &Option<String>, prefix: &str| {
        value
            .as_deref()
            .map(|v| v.to_ascii_lowercase().starts_with(prefix))
            .unwrap_or(false)
    };

    let kind = if declared(&hint.medium, "video") || declared(&hint.mime, "video/") {
        MediaKind::Video
    } else if declared(&hint.medium, "image") || declared(&hint.mime, "image/") {
        MediaKind::Image
    } else {
        return None;
    };

    to_media(&hint.url, link, kind)
}

fn first_image(html: &str, link: &str) -> Option<Media> {
    IMG_RE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|src| !is_tracking_pixel(src) && !src.starts_with("data:"))
        .find_map(|src| to_media(src, link, MediaKind::Image))
}

/// Beacon images: a file or directory named like `pixel`/`spacer`, or a
/// `1x1` token in the file name. `google-pixel-9.jpg` is a real image.
fn is_tracking_pixel(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let mut segments = path.rsplit('/');
    let file = segments.next().unwrap_or_default().to_ascii_lowercase();
    let stem = file.split('.').next().unwrap_or_default();

    let beacon_name = |name: &str| matches!(name, "pixel" | "spacer" | "1x1" | "blank" | "transparent");

    beacon_name(stem)
        || stem
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| token == "1x1")
        || segments.any(|segment| beacon_name(&segment.to_ascii_lowercase()))
}

/// Absolutize `candidate` and type it; video hosts override `kind`
fn to_media(candidate: &str, link: &str, kind: MediaKind) -> Option<Media> {
    let candidate = html_escape::decode_html_entities(candidate.trim()).into_owned();
    if candidate.is_empty() {
        return None;
    }

    let absolute = match Url::parse(&candidate) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(link).ok()?.join(&candidate).ok()?,
        Err(_) => return None,
    };
    if !matches!(absolute.scheme(), "http" | "https") {
        return None;
    }

    let url = absolute.to_string();
    if is_video_host(&url) {
        return Some(Media::video(url));
    }

    Some(Media { url, kind })
}

/// Resolves media for items, falling back to article-page metadata
#[derive(Clone)]
pub struct MediaResolver {
    fetcher: Arc<dyn HttpFetch>,
    limiter: Arc<FetchLimiter>,
}

impl MediaResolver {
    pub fn new(fetcher: Arc<dyn HttpFetch>, limiter: Arc<FetchLimiter>) -> Self {
        Self { fetcher, limiter }
    }

    /// Run every tier in order. Never fails; `None` means no media.
    pub async fn resolve(
        &self,
        hints: &MediaHints,
        link: &str,
        budget: &mut MediaBudget,
    ) -> Option<Media> {
        if let Some(media) = resolve_inline(hints, link) {
            return Some(media);
        }

        if is_video_host(link) {
            return Some(Media::video(link));
        }

        self.fetch_preview_image(link, budget).await
    }

    /// Tier 6: read og:image / twitter:image from the article page
    async fn fetch_preview_image(&self, link: &str, budget: &mut MediaBudget) -> Option<Media> {
        if !budget.try_spend() {
            debug!("Media fallback budget exhausted, skipping {}", link);
            return None;
        }

        let _permit = self.limiter.acquire().await.ok()?;

        let doc = match self.fetcher.fetch(link, Expect::Page).await {
            Ok(doc) => doc,
            Err(e) => {
                debug!("Preview fetch failed for {}: {}", link, e);
                return None;
            }
        };

        if doc.ensure_content_type(Expect::Page).is_err() {
            return None;
        }

        let image = extract_meta_image(&doc.body)?;
        to_media(&image, link, MediaKind::Image)
    }
}
