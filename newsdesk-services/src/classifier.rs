//! Keyword classifier
//!
//! Assigns exactly one [`Category`] per item from a case-folded haystack of
//! title, declared tags and source name. Scoring depends only on the item
//! and the static dictionaries, so identical input always gives identical
//! output.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use url::Url;

use newsdesk_core::{Category, ClassifiedItem, NormalizedItem, Source};

const LLM_TERMS: &[&str] = &[
    "llm",
    "llms",
    "large language model",
    "language model",
    "gpt",
    "chatgpt",
    "claude",
    "gemini",
    "llama",
    "mistral",
    "chatbot",
    "assistant",
    "reasoning",
    "prompt",
    "prompting",
    "context window",
    "fine-tuning",
    "rlhf",
    "tokens",
];

const MODELS_TERMS: &[&str] = &[
    "model",
    "models",
    "weights",
    "open weights",
    "checkpoint",
    "parameters",
    "benchmark",
    "benchmarks",
    "multimodal",
    "diffusion",
    "text-to-image",
    "text-to-video",
    "image generation",
    "video generation",
    "embedding",
    "embeddings",
    "vision",
    "research",
    "paper",
    "dataset",
    "training",
];

const TOOLING_TERMS: &[&str] = &[
    "api",
    "sdk",
    "cli",
    "ide",
    "plugin",
    "extension",
    "integration",
    "integrations",
    "developer",
    "developers",
    "agent",
    "agents",
    "framework",
    "library",
    "open source",
    "copilot",
    "tool",
    "tools",
    "tooling",
    "workflow",
    "automation",
    "code",
    "coding",
    "playground",
    "github",
];

/// Off-topic context: policy, finance, unrelated hardware
const NEGATIVE_TERMS: &[&str] = &[
    "regulation",
    "regulators",
    "regulatory",
    "compliance",
    "lawsuit",
    "court",
    "policy",
    "legislation",
    "senate",
    "congress",
    "election",
    "funding",
    "raises",
    "valuation",
    "ipo",
    "stock",
    "shares",
    "earnings",
    "revenue",
    "investors",
    "acquisition",
    "tariff",
    "tariffs",
    "chip",
    "chips",
    "semiconductor",
    "data center",
    "smartphone",
    "laptop",
];

/// URL path segments that indicate model research
const MODELS_URL_SEGMENTS: &[&str] = &["research", "models", "papers"];

/// Bonus added to `Models` when the URL path has a research segment
pub const URL_SEGMENT_BONUS: u32 = 2;

/// Per-item scores, kept so a decision can be explained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryScores {
    pub llm: u32,
    pub models: u32,
    pub tooling: u32,
    /// Whether any negative-context term matched
    pub negative_context: bool,
}

impl CategoryScores {
    pub fn get(&self, category: Category) -> u32 {
        match category {
            Category::Llm => self.llm,
            Category::Models => self.models,
            Category::Tooling => self.tooling,
            Category::Updates => 0,
        }
    }

    fn get_mut(&mut self, category: Category) -> Option<&mut u32> {
        match category {
            Category::Llm => Some(&mut self.llm),
            Category::Models => Some(&mut self.models),
            Category::Tooling => Some(&mut self.tooling),
            Category::Updates => None,
        }
    }

    /// Highest substantive score, ties broken by [`Category::SUBSTANTIVE`]
    /// order; the catch-all when everything is zero
    pub fn category(&self) -> Category {
        let mut best = Category::Updates;
        let mut best_score = 0;
        for category in Category::SUBSTANTIVE {
            let score = self.get(category);
            if score > best_score {
                best = category;
                best_score = score;
            }
        }
        best
    }
}

/// Scores items against the keyword dictionaries and per-source boosts
#[derive(Debug, Clone)]
pub struct Classifier {
    /// source id -> category -> lowercased boost terms
    boosts: HashMap<String, BTreeMap<Category, Vec<String>>>,
    boost_weight: u32,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Classifier {
    /// Classifier without source boosts
    pub fn new(boost_weight: u32) -> Self {
        Self {
            boosts: HashMap::new(),
            boost_weight,
        }
    }

    /// Classifier carrying each source's boost table
    pub fn from_sources<'a>(sources: impl IntoIterator<Item = &'a Source>, boost_weight: u32) -> Self {
        let boosts = sources
            .into_iter()
            .filter(|source| !source.boosts.is_empty())
            .map(|source| {
                let table = source
                    .boosts
                    .iter()
                    .map(|(category, terms)| {
                        let terms = terms.iter().map(|t| t.trim().to_lowercase()).collect();
                        (*category, terms)
                    })
                    .collect();
                (source.id.clone(), table)
            })
            .collect();

        Self {
            boosts,
            boost_weight,
        }
    }

    pub fn boost_weight(&self) -> u32 {
        self.boost_weight
    }

    /// Score one item
    pub fn score(&self, item: &NormalizedItem) -> CategoryScores {
        let haystack = haystack(item);
        let mut scores = CategoryScores {
            llm: count_hits(&haystack, LLM_TERMS.iter().copied()),
            models: count_hits(&haystack, MODELS_TERMS.iter().copied()),
            tooling: count_hits(&haystack, TOOLING_TERMS.iter().copied()),
            negative_context: false,
        };

        if let Some(table) = self.boosts.get(&item.source_id) {
            for (category, terms) in table {
                let hits = count_hits(&haystack, terms.iter().map(String::as_str));
                if let Some(score) = scores.get_mut(*category) {
                    *score += hits * self.boost_weight;
                }
            }
        }

        if has_models_segment(&item.url) {
            scores.models += URL_SEGMENT_BONUS;
        }

        if NEGATIVE_TERMS.iter().any(|term| contains_term(&haystack, term)) {
            scores.negative_context = true;
            for category in Category::SUBSTANTIVE {
                if let Some(score) = scores.get_mut(category) {
                    *score = score.saturating_sub(1);
                }
            }
        }

        scores
    }

    /// Category for one item
    pub fn classify_item(&self, item: &NormalizedItem) -> Category {
        self.score(item).category()
    }

    /// Annotate every item with its category, preserving order
    pub fn classify(&self, items: Vec<NormalizedItem>) -> Vec<ClassifiedItem> {
        items
            .into_iter()
            .map(|item| {
                let category = self.classify_item(&item);
                ClassifiedItem { item, category }
            })
            .collect()
    }
}

fn haystack(item: &NormalizedItem) -> String {
    let mut parts = Vec::with_capacity(item.tags.len() + 2);
    parts.push(item.title.as_str());
    parts.extend(item.tags.iter().map(String::as_str));
    parts.push(item.source_name.as_str());
    parts.join(" ").to_lowercase()
}

fn count_hits<'a>(haystack: &str, terms: impl Iterator<Item = &'a str>) -> u32 {
    terms.filter(|term| contains_term(haystack, term)).count() as u32
}

/// Whole-word (or whole-phrase) match; `term` must already be lowercase
fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }

    haystack.match_indices(term).any(|(start, _)| {
        let end = start + term.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn has_models_segment(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|url| {
            url.path_segments().map(|segments| {
                segments
                    .map(|s| s.to_lowercase())
                    .any(|s| MODELS_URL_SEGMENTS.contains(&s.as_str()))
            })
        })
        .unwrap_or(false)
}
