//! Feed strategy: RSS 2.0, RSS 1.0 (RDF) and Atom
//!
//! The document is streamed through an XML reader and every entry is
//! collected on its own, so one broken entry cannot take the rest of the
//! feed with it.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use newsdesk_core::{MediaContentHint, MediaHints, RawItem};

use super::ItemParser;
use crate::error::SourceError;
use crate::text::{clean_text, decode_entities};

/// Date fields in order of preference
const DATE_FIELDS: [&str; 6] = ["pubDate", "published", "dc:date", "updated", "issued", "modified"];

/// Fields that may carry inlined HTML
const HTML_FIELDS: [&str; 4] = ["description", "content:encoded", "content", "summary"];

/// Namespace prefixes kept in element names. Any other prefix (`atom:`,
/// `rss:`) is dropped, so prefixed and default-namespace feeds read alike.
const EXTENSION_PREFIXES: [&str; 5] = ["content", "dc", "media", "itunes", "rdf"];

/// Feed dialect detected from the root element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedDialect {
    /// RSS 2.0 (`<rss>` / `<channel>` / `<item>`)
    Rss,
    /// RSS 1.0 (`<rdf:RDF>` with top-level `<item rdf:about>`)
    Rdf,
    /// Atom (`<feed>` / `<entry>`)
    Atom,
}

impl FeedDialect {
    fn from_root(name: &str) -> Option<Self> {
        match name {
            "rss" | "channel" => Some(Self::Rss),
            "rdf:RDF" => Some(Self::Rdf),
            "feed" => Some(Self::Atom),
            _ => None,
        }
    }

    fn entry_element(self) -> &'static str {
        match self {
            Self::Rss | Self::Rdf => "item",
            Self::Atom => "entry",
        }
    }
}

/// Detect the feed dialect, or `None` if the document is not a feed
pub fn detect_dialect(doc: &str) -> Option<FeedDialect> {
    let mut reader = Reader::from_str(doc);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return FeedDialect::from_root(&element_key(e.name().as_ref()));
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Parser for machine-readable feeds
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedParser;

impl ItemParser for FeedParser {
    fn parse(&self, body: &str) -> Result<Vec<RawItem>, SourceError> {
        let dialect = detect_dialect(body).ok_or_else(|| {
            SourceError::ParseError("document is not an RSS, RDF or Atom feed".to_string())
        })?;
        let entry_element = dialect.entry_element();

        let mut reader = Reader::from_str(body);
        reader.config_mut().check_end_names = false;

        let mut current: Option<Entry> = None;
        let mut items = Vec::new();
        let mut skipped = 0usize;

        loop {
            let position = reader.buffer_position();
            let event = match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(event) => event,
                Err(e) => {
                    debug!("Feed markup error near byte {}: {}", position, e);
                    if let Some(entry) = current.as_mut() {
                        entry.broken = true;
                    }
                    if reader.buffer_position() == position {
                        break;
                    }
                    continue;
                }
            };

            match event {
                // entries never nest, so a new entry start abandons an unterminated one
                Event::Start(e) if element_key(e.name().as_ref()) == entry_element => {
                    if current.replace(Entry::new(&e)).is_some() {
                        skipped += 1;
                    }
                }
                Event::Start(e) => {
                    if let Some(entry) = current.as_mut() {
                        entry.open(&e, false);
                    }
                }
                Event::Empty(e) => {
                    if let Some(entry) = current.as_mut() {
                        entry.open(&e, true);
                    }
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let closed = current
                        .as_mut()
                        .is_some_and(|entry| entry.close(&name, entry_element));
                    if let Some(entry) = current.take_if(|_| closed) {
                        match entry.into_item(dialect) {
                            Some(item) => items.push(item),
                            None => skipped += 1,
                        }
                    }
                }
                Event::Text(text) => {
                    if let Some(entry) = current.as_mut() {
                        entry.push_text(&decode_entities(&String::from_utf8_lossy(&text)));
                    }
                }
                Event::CData(cdata) => {
                    if let Some(entry) = current.as_mut() {
                        entry.push_text(&String::from_utf8_lossy(&cdata));
                    }
                }
                Event::GeneralRef(reference) => {
                    if let Some(entry) = current.as_mut() {
                        let raw = format!("&{};", String::from_utf8_lossy(&reference));
                        entry.push_text(&decode_entities(&raw));
                    }
                }
                _ => {}
            }
        }

        // unterminated entry at end of document
        if current.is_some() {
            skipped += 1;
        }
        if skipped > 0 {
            debug!("Skipped {} malformed {:?} entries", skipped, dialect);
        }

        Ok(items)
    }

    fn name(&self) -> &'static str {
        "feed"
    }
}

/// One element inside an entry, at any depth
#[derive(Debug)]
struct Element {
    name: String,
    attrs: HashMap<String, String>,
    text: String,
}

/// Elements collected from one `<item>` or `<entry>`
#[derive(Debug, Default)]
struct Entry {
    /// Attributes on the entry tag itself (`rdf:about`)
    attrs: HashMap<String, String>,
    elements: Vec<Element>,
    /// Indexes into `elements` of the currently open elements
    open: Vec<usize>,
    /// Inline markup tags open inside a text field
    markup: Vec<String>,
    broken: bool,
}

impl Entry {
    fn new(start: &BytesStart) -> Self {
        Self {
            attrs: read_attrs(start),
            ..Self::default()
        }
    }

    /// Title and HTML fields keep nested tags as markup text
    fn in_markup_field(&self) -> bool {
        self.open.last().is_some_and(|&i| {
            let name = self.elements[i].name.as_str();
            name == "title" || HTML_FIELDS.contains(&name)
        })
    }

    fn open(&mut self, start: &BytesStart, empty: bool) {
        let raw_name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

        if self.in_markup_field() {
            let raw = String::from_utf8_lossy(start);
            let tag = raw.trim_end_matches('/').trim_end();
            if empty {
                self.push_text(&format!("<{}/>", tag));
            } else {
                self.push_text(&format!("<{}>", tag));
                self.markup.push(raw_name);
            }
            return;
        }

        self.elements.push(Element {
            name: element_key(raw_name.as_bytes()),
            attrs: read_attrs(start),
            text: String::new(),
        });
        if !empty {
            self.open.push(self.elements.len() - 1);
        }
    }

    /// Handle a closing tag; `true` once the entry itself is closed.
    /// Stray closing tags are ignored.
    fn close(&mut self, raw_name: &str, entry_element: &str) -> bool {
        if let Some(pos) = self.markup.iter().rposition(|m| m == raw_name) {
            self.markup.truncate(pos);
            self.push_text(&format!("</{}>", raw_name));
            return false;
        }
        self.markup.clear();

        let key = element_key(raw_name.as_bytes());
        if let Some(pos) = self
            .open
            .iter()
            .rposition(|&i| self.elements[i].name == key)
        {
            self.open.truncate(pos);
            return false;
        }

        key == entry_element
    }

    fn push_text(&mut self, text: &str) {
        if let Some(&i) = self.open.last() {
            self.elements[i].text.push_str(text);
        }
    }

    /// First non-blank text of `name`
    fn text(&self, name: &str) -> Option<&str> {
        self.elements
            .iter()
            .filter(|e| e.name == name)
            .map(|e| e.text.as_str())
            .find(|t| !t.trim().is_empty())
    }

    fn texts<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.elements
            .iter()
            .filter(move |e| e.name == name)
            .map(|e| e.text.as_str())
            .filter(|t| !t.trim().is_empty())
    }

    fn attrs_of<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a HashMap<String, String>> + 'a {
        self.elements
            .iter()
            .filter(move |e| e.name == name)
            .map(|e| &e.attrs)
    }

    /// `None` when the entry is broken or lacks a title or a link
    fn into_item(self, dialect: FeedDialect) -> Option<RawItem> {
        if self.broken {
            return None;
        }

        let title = self
            .text("title")
            .map(clean_text)
            .filter(|t| !t.is_empty())?;

        let link = self.link(dialect)?;

        let date = DATE_FIELDS
            .iter()
            .filter_map(|field| self.text(field))
            .map(clean_text)
            .find(|d| !d.is_empty());

        Some(RawItem {
            title,
            link,
            date,
            tags: self.tags(),
            media: self.media_hints(),
        })
    }

    fn link(&self, dialect: FeedDialect) -> Option<String> {
        let from_text = self.text("link").map(clean_text).filter(|l| !l.is_empty());

        // Atom: <link href=".." rel="alternate"/>; a missing rel means alternate
        let from_attrs = || {
            let links: Vec<&HashMap<String, String>> = self
                .attrs_of("link")
                .filter(|attrs| attrs.get("href").is_some_and(|h| !h.is_empty()))
                .collect();
            links
                .iter()
                .find(|attrs| attrs.get("rel").is_none_or(|r| r == "alternate"))
                .or_else(|| links.first())
                .and_then(|attrs| attrs.get("href").cloned())
        };

        let from_guid = || {
            let permalink = self
                .attrs_of("guid")
                .next()
                .and_then(|attrs| attrs.get("isPermaLink"))
                .is_none_or(|v| !v.eq_ignore_ascii_case("false"));
            self.text("guid")
                .map(clean_text)
                .filter(|g| permalink && looks_like_url(g))
        };

        let from_id = || self.text("id").map(clean_text).filter(|i| looks_like_url(i));

        let from_about = || {
            self.attrs
                .get("rdf:about")
                .filter(|a| looks_like_url(a))
                .cloned()
        };

        match dialect {
            FeedDialect::Atom => from_attrs().or(from_text).or_else(from_id),
            FeedDialect::Rss => from_text.or_else(from_guid).or_else(from_attrs),
            FeedDialect::Rdf => from_text.or_else(from_about).or_else(from_guid),
        }
    }

    fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .texts("category")
            .chain(self.texts("dc:subject"))
            .map(clean_text)
            .collect();

        tags.extend(
            self.attrs_of("category")
                .filter_map(|attrs| attrs.get("term"))
                .map(|term| clean_text(term.as_str())),
        );

        tags.retain(|t| !t.is_empty());
        tags
    }

    fn media_hints(&self) -> MediaHints {
        let content_hint =
            |attrs: &HashMap<String, String>, url_key: &str| -> Option<MediaContentHint> {
                let url = attrs.get(url_key).filter(|u| !u.is_empty())?;
                Some(MediaContentHint {
                    url: url.clone(),
                    medium: attrs.get("medium").cloned(),
                    mime: attrs.get("type").cloned(),
                })
            };

        let mut enclosures: Vec<MediaContentHint> = self
            .attrs_of("enclosure")
            .filter_map(|attrs| content_hint(attrs, "url"))
            .collect();

        // Atom: <link rel="enclosure" type="image/png" href=".."/>
        enclosures.extend(
            self.attrs_of("link")
                .filter(|attrs| attrs.get("rel").is_some_and(|r| r == "enclosure"))
                .filter_map(|attrs| content_hint(attrs, "href")),
        );

        let media_contents = self
            .attrs_of("media:content")
            .filter_map(|attrs| content_hint(attrs, "url"))
            .collect();

        let thumbnails = self
            .attrs_of("media:thumbnail")
            .filter_map(|attrs| attrs.get("url"))
            .chain(
                self.attrs_of("itunes:image")
                    .filter_map(|attrs| attrs.get("href")),
            )
            .filter(|u| !u.is_empty())
            .cloned()
            .collect();

        let html_fragments = HTML_FIELDS
            .iter()
            .filter_map(|field| self.text(field))
            .map(str::to_string)
            .collect();

        MediaHints {
            enclosures,
            media_contents,
            thumbnails,
            html_fragments,
            scraped_fragment: None,
        }
    }
}

/// Element name with foreign namespace prefixes dropped
fn element_key(qname: &[u8]) -> String {
    let name = String::from_utf8_lossy(qname);
    if let Some((prefix, local)) = name.split_once(':') {
        if !EXTENSION_PREFIXES.contains(&prefix) {
            return local.to_string();
        }
    }
    name.into_owned()
}

/// Attributes with entities decoded; malformed attributes are dropped
fn read_attrs(start: &BytesStart) -> HashMap<String, String> {
    start
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = decode_entities(&String::from_utf8_lossy(&attr.value));
            (key, value.trim().to_string())
        })
        .collect()
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel>
  <title>Example AI</title>
  <link>https://example.ai</link>
  <item>
    <title><![CDATA[Launching the <em>Agents</em> SDK]]></title>
    <link>https://example.ai/news/agents-sdk</link>
    <pubDate>Tue, 04 Mar 2025 16:00:00 GMT</pubDate>
    <category>Developers</category>
    <category><![CDATA[Product]]></category>
    <enclosure url="https://cdn.example.ai/agents.png" type="image/png" length="1234"/>
  </item>
  <item>
    <description>No title here</description>
    <link>https://example.ai/news/broken</link>
  </item>
  <item>
    <title>Research &amp; safety update</title>
    <guid isPermaLink="true">https://example.ai/research/safety</guid>
    <content:encoded><![CDATA[<p>Body</p><img src="/img/safety.jpg" />]]></content:encoded>
    <media:content url="https://cdn.example.ai/safety.mp4" medium="video" />
    <media:thumbnail url="https://cdn.example.ai/safety-thumb.jpg" />
  </item>
</channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Lab Blog</title>
  <entry>
    <title type="html">Open weights &lt;b&gt;release&lt;/b&gt;</title>
    <link rel="self" href="https://lab.example/entries/1.xml"/>
    <link rel="alternate" type="text/html" href="https://lab.example/blog/open-weights"/>
    <id>tag:lab.example,2025:1</id>
    <updated>2025-02-10T09:30:00Z</updated>
    <category term="models"/>
    <summary type="html">&lt;img src="https://lab.example/w.png"&gt;</summary>
  </entry>
  <entry>
    <title>Relative entry</title>
    <link href="/blog/relative"/>
    <published>2025-02-01T00:00:00+01:00</published>
  </entry>
</feed>"#;

    const RDF: &str = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel rdf:about="https://dw.example/"><title>DW</title></channel>
  <item rdf:about="https://dw.example/a/1">
    <title>Item one</title>
    <dc:date>2025-01-05T10:00:00Z</dc:date>
    <dc:subject>Tech</dc:subject>
  </item>
</rdf:RDF>"#;

    #[test]
    fn test_detect_dialect() {
        assert_eq!(detect_dialect(RSS), Some(FeedDialect::Rss));
        assert_eq!(detect_dialect(ATOM), Some(FeedDialect::Atom));
        assert_eq!(detect_dialect(RDF), Some(FeedDialect::Rdf));
        assert_eq!(detect_dialect("<html><body>hi</body></html>"), None);
    }

    #[test]
    fn test_rss_items_parse_and_malformed_entry_is_skipped() {
        let items = FeedParser.parse(RSS).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.title, "Launching the Agents SDK");
        assert_eq!(first.link, "https://example.ai/news/agents-sdk");
        assert_eq!(first.date.as_deref(), Some("Tue, 04 Mar 2025 16:00:00 GMT"));
        assert_eq!(first.tags, vec!["Developers", "Product"]);
        assert_eq!(first.media.enclosures.len(), 1);
        assert_eq!(first.media.enclosures[0].mime.as_deref(), Some("image/png"));

        let second = &items[1];
        assert_eq!(second.title, "Research & safety update");
        assert_eq!(second.link, "https://example.ai/research/safety");
        assert!(second.date.is_none());
        assert_eq!(second.media.media_contents[0].medium.as_deref(), Some("video"));
        assert_eq!(second.media.thumbnails, vec!["https://cdn.example.ai/safety-thumb.jpg"]);
        assert!(second.media.html_fragments[0].contains("<img src=\"/img/safety.jpg\""));
    }

    #[test]
    fn test_atom_prefers_alternate_link() {
        let items = FeedParser.parse(ATOM).unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].title, "Open weights release");
        assert_eq!(items[0].link, "https://lab.example/blog/open-weights");
        assert_eq!(items[0].date.as_deref(), Some("2025-02-10T09:30:00Z"));
        assert_eq!(items[0].tags, vec!["models"]);
        assert!(items[0].media.html_fragments[0].contains("https://lab.example/w.png"));

        assert_eq!(items[1].link, "/blog/relative");
        assert_eq!(items[1].date.as_deref(), Some("2025-02-01T00:00:00+01:00"));
    }

    #[test]
    fn test_rdf_uses_about_attribute() {
        let items = FeedParser.parse(RDF).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://dw.example/a/1");
        assert_eq!(items[0].date.as_deref(), Some("2025-01-05T10:00:00Z"));
        assert_eq!(items[0].tags, vec!["Tech"]);
    }

    #[test]
    fn test_non_permalink_guid_is_not_a_link() {
        let doc = r#"<rss><channel><item>
            <title>Guid only</title>
            <guid isPermaLink="false">https://example.ai/internal/42</guid>
        </item></channel></rss>"#;
        assert!(FeedParser.parse(doc).unwrap().is_empty());
    }

    #[test]
    fn test_non_feed_document_is_parse_error() {
        assert!(matches!(
            FeedParser.parse("<html><body><p>Not a feed</p></body></html>"),
            Err(SourceError::ParseError(_))
        ));
    }

    #[test]
    fn test_cdata_may_contain_closing_item_tag() {
        let doc = r#"<rss><channel><item>
            <title>Markup tips</title>
            <description><![CDATA[Write </item> to close it, then <b>save</b>]]></description>
            <link>https://example.ai/news/markup-tips</link>
        </item></channel></rss>"#;

        let items = FeedParser.parse(doc).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://example.ai/news/markup-tips");
        assert!(items[0].media.html_fragments[0].starts_with("Write </item>"));
    }

    #[test]
    fn test_commented_out_link_is_ignored() {
        let doc = r#"<rss><channel><item>
            <title>Moved post</title>
            <!-- <link>https://old.example/retired</link> -->
            <link>https://example.ai/news/moved</link>
        </item></channel></rss>"#;

        let items = FeedParser.parse(doc).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://example.ai/news/moved");
    }

    #[test]
    fn test_namespace_prefixed_atom() {
        let doc = r#"<?xml version="1.0"?>
<atom:feed xmlns:atom="http://www.w3.org/2005/Atom">
  <atom:title>Prefixed</atom:title>
  <atom:entry>
    <atom:title>Prefixed entry</atom:title>
    <atom:link rel="alternate" href="https://lab.example/blog/prefixed"/>
    <atom:updated>2025-02-11T08:00:00Z</atom:updated>
    <atom:category term="research"/>
  </atom:entry>
</atom:feed>"#;

        assert_eq!(detect_dialect(doc), Some(FeedDialect::Atom));
        let items = FeedParser.parse(doc).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Prefixed entry");
        assert_eq!(items[0].link, "https://lab.example/blog/prefixed");
        assert_eq!(items[0].date.as_deref(), Some("2025-02-11T08:00:00Z"));
        assert_eq!(items[0].tags, vec!["research"]);
    }

    #[test]
    fn test_stray_closing_tag_stays_inside_its_entry() {
        let doc = r#"<rss><channel>
            <item><title>Stray</title></div><link>https://example.ai/a</link></item>
            <item><title>Next</title><link>https://example.ai/b</link></item>
        </channel></rss>"#;

        let links: Vec<String> = FeedParser
            .parse(doc)
            .unwrap()
            .into_iter()
            .map(|item| item.link)
            .collect();
        assert_eq!(links, vec!["https://example.ai/a", "https://example.ai/b"]);
    }

    #[test]
    fn test_unterminated_entry_is_skipped() {
        let doc = r#"<rss><channel>
            <item><title>Cut off</title><link>https://example.ai/cut</link>
            <item><title>Whole</title><link>https://example.ai/whole</link></item>
        </channel></rss>"#;

        let items = FeedParser.parse(doc).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://example.ai/whole");
    }

    #[test]
    fn test_inline_xhtml_content_is_kept_as_markup() {
        let doc = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
            <title>Inline</title>
            <link href="https://lab.example/blog/inline"/>
            <content type="xhtml"><div><p>Hi</p><img src="/img/inline.png"/></div></content>
        </entry></feed>"#;

        let items = FeedParser.parse(doc).unwrap();
        let html = &items[0].media.html_fragments[0];
        assert!(html.contains("<p>Hi</p>"));
        assert!(html.contains(r#"<img src="/img/inline.png"/>"#));
    }
}
