//! Topical categories assigned by the classifier

use serde::{Deserialize, Serialize};
use std::fmt;

/// Topical bucket for a harvested item
///
/// `Updates` is the catch-all; the other three are substantive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Developer tools, SDKs, agents and integrations
    Tooling,
    /// Language models and chat assistants
    Llm,
    /// Model releases, weights, benchmarks and research
    Models,
    /// Everything else
    Updates,
}

impl Category {
    /// Substantive categories in tie-break order (earlier wins)
    pub const SUBSTANTIVE: [Category; 3] = [Category::Llm, Category::Models, Category::Tooling];

    /// Short lowercase identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tooling => "tooling",
            Category::Llm => "llm",
            Category::Models => "models",
            Category::Updates => "updates",
        }
    }

    /// Get the full display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Tooling => "Tooling",
            Category::Llm => "LLM",
            Category::Models => "Models",
            Category::Updates => "Updates",
        }
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self, Category::Updates)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tooling" | "tools" => Ok(Category::Tooling),
            "llm" | "llms" => Ok(Category::Llm),
            "models" | "model" => Ok(Category::Models),
            "updates" | "update" => Ok(Category::Updates),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}
