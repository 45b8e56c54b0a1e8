//! Text cleanup shared by the parsers and the normalizer

use std::sync::LazyLock;

use regex::Regex;

static CDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[A-Za-z/!?][^>]*>").unwrap());

/// Remove `<![CDATA[ ... ]]>` wrappers, keeping their contents verbatim
pub fn unwrap_cdata(s: &str) -> String {
    CDATA_RE.replace_all(s, "$1").into_owned()
}

/// Decode HTML/XML entities (`&amp;`, `&#8217;`, `&nbsp;`, ...)
pub fn decode_entities(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}

/// Collapse runs of whitespace into single spaces and trim
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip HTML tags from text
pub fn strip_tags(s: &str) -> String {
    TAG_RE.replace_all(s, " ").into_owned()
}

/// Turn a raw field value into display text.
///
/// CDATA is unwrapped first, then entities are decoded so that escaped
/// markup (`&lt;b&gt;`) is recognised as markup and removed.
pub fn clean_text(raw: &str) -> String {
    let unwrapped = unwrap_cdata(raw);
    let decoded = decode_entities(&unwrapped);
    let stripped = strip_tags(&decoded);
    collapse_whitespace(&stripped)
}
