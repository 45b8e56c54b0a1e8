//! Source registry
//!
//! The registry is built once at startup and never mutated. Every entry is
//! validated up front and carries its compiled parser, so a bad scrape
//! pattern fails the process at boot rather than silently on every cycle.

use std::collections::HashSet;
use std::env;
use std::fmt;
use std::path::Path;

use tracing::info;
use url::Url;

use newsdesk_core::{Category, FetchMode, ScrapeRules, Source};

use crate::error::SourceError;
use crate::parser::{parser_for, ItemParser};

/// Curated AI-industry publishers
pub fn curated_sources() -> Vec<Source> {
    vec![
        // Vendor newsrooms with feeds
        Source::feed(
            "openai",
            "OpenAI News",
            "https://openai.com/news/",
            "https://openai.com/news/rss.xml",
        )
        .with_boost(Category::Llm, &["gpt", "chatgpt", "openai", "reasoning"])
        .with_boost(Category::Tooling, &["codex", "agents sdk", "responses api"])
        .with_boost(Category::Models, &["sora", "dall-e"]),
        Source::feed(
            "google-deepmind",
            "Google DeepMind",
            "https://deepmind.google/discover/blog/",
            "https://deepmind.google/blog/rss.xml",
        )
        .with_boost(Category::Llm, &["gemini", "gemma"])
        .with_boost(Category::Models, &["alphafold", "veo", "imagen"]),
        Source::feed(
            "huggingface",
            "Hugging Face Blog",
            "https://huggingface.co/blog",
            "https://huggingface.co/blog/feed.xml",
        )
        .with_boost(Category::Tooling, &["transformers", "diffusers", "spaces", "inference endpoints"])
        .with_boost(Category::Models, &["open weights", "leaderboard"]),
        Source::feed(
            "github-ai",
            "GitHub Blog: AI & ML",
            "https://github.blog/ai-and-ml/",
            "https://github.blog/ai-and-ml/feed/",
        )
        .with_cap(15)
        .with_boost(Category::Tooling, &["copilot", "github models", "actions"]),
        // Newsrooms without a usable feed
        Source::scrape(
            "anthropic",
            "Anthropic News",
            "https://www.anthropic.com/news",
            ScrapeRules {
                item: r#"(?s)<a[^>]+href="/news/[^"]+"[^>]*>.*?</a>"#.to_string(),
                link: r#"href="(/news/[^"]+)""#.to_string(),
                title: r#"(?s)<h[234][^>]*>(.*?)</h[234]>"#.to_string(),
                date: Some(r#"(?s)<(?:time|div class="[^"]*date[^"]*")[^>]*>(.*?)</(?:time|div)>"#.to_string()),
            },
        )
        .with_boost(Category::Llm, &["claude", "sonnet", "opus", "haiku"])
        .with_boost(Category::Tooling, &["claude code", "mcp", "model context protocol"]),
        Source::scrape(
            "mistral",
            "Mistral AI News",
            "https://mistral.ai/news",
            ScrapeRules {
                item: r#"(?s)<a[^>]+href="/news/[^"]+"[^>]*>.*?</a>"#.to_string(),
                link: r#"href="(/news/[^"]+)""#.to_string(),
                title: r#"(?s)<h[23][^>]*>(.*?)</h[23]>"#.to_string(),
                date: Some(r#"(?s)<time[^>]*>(.*?)</time>"#.to_string()),
            },
        )
        .with_cap(10)
        .with_boost(Category::Llm, &["mistral", "mixtral", "le chat"])
        .with_boost(Category::Tooling, &["codestral", "la plateforme"]),
    ]
}

/// A validated source with its parser compiled
pub struct RegisteredSource {
    pub source: Source,
    pub parser: Box<dyn ItemParser>,
}

impl fmt::Debug for RegisteredSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredSource")
            .field("id", &self.source.id)
            .field("parser", &self.parser.name())
            .finish()
    }
}

/// Read-only table of sources
#[derive(Debug)]
pub struct SourceRegistry {
    entries: Vec<RegisteredSource>,
}

impl SourceRegistry {
    /// Validate `sources` and compile their parsers
    pub fn new(sources: Vec<Source>) -> Result<Self, SourceError> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(sources.len());

        for source in sources {
            validate(&source)?;
            if !seen.insert(source.id.clone()) {
                return Err(SourceError::InvalidConfig(format!(
                    "duplicate source id '{}'",
                    source.id
                )));
            }

            let parser = parser_for(&source.mode).map_err(|e| {
                SourceError::InvalidConfig(format!("source '{}': {}", source.id, e))
            })?;
            entries.push(RegisteredSource { source, parser });
        }

        Ok(Self { entries })
    }

    /// Built-in catalog
    pub fn curated() -> Result<Self, SourceError> {
        Self::new(curated_sources())
    }

    /// Load sources from a JSON array on disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SourceError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let sources: Vec<Source> = serde_json::from_str(&raw).map_err(|e| {
            SourceError::InvalidConfig(format!("cannot parse {}: {}", path.display(), e))
        })?;
        Self::new(sources)
    }

    /// `NEWSDESK_SOURCES_PATH` if set, otherwise the curated catalog
    pub fn from_env() -> Result<Self, SourceError> {
        match env::var("NEWSDESK_SOURCES_PATH") {
            Ok(path) if !path.trim().is_empty() => {
                info!("Loading sources from {}", path);
                Self::from_path(path.trim())
            }
            _ => Self::curated(),
        }
    }

    pub fn entries(&self) -> &[RegisteredSource] {
        &self.entries
    }

    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.entries.iter().map(|entry| &entry.source)
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredSource> {
        self.entries.iter().find(|entry| entry.source.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate(source: &Source) -> Result<(), SourceError> {
    let invalid = |msg: String| SourceError::InvalidConfig(format!("source '{}': {}", source.id, msg));

    if source.id.trim().is_empty() {
        return Err(SourceError::InvalidConfig("source id must not be empty".to_string()));
    }
    if source.cap == 0 {
        return Err(invalid("cap must be at least 1".to_string()));
    }

    require_http_url(&source.homepage).map_err(|e| invalid(format!("homepage {}", e)))?;
    if let FetchMode::Feed { url } = &source.mode {
        require_http_url(url).map_err(|e| invalid(format!("feed url {}", e)))?;
    }

    Ok(())
}

fn require_http_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("'{}' is not a valid URL: {}", raw, e))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(format!("'{}' must be an absolute http(s) URL", raw));
    }
    Ok(())
}
