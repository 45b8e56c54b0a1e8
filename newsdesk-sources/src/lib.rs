//! Source harvesting for Newsdesk
//!
//! This crate turns configured publishers into normalized items:
//! - Registry: the validated, read-only source table
//! - Fetcher: bounded-timeout HTTP with content-type checks
//! - Parsers: feed (RSS / Atom / RDF) and pattern-based scrape strategies
//! - Media: tiered image/video discovery with a budgeted page fallback
//! - Normalizer: absolute canonical URLs, parsed dates or explicit "undated"

pub mod config;
pub mod error;
pub mod fetcher;
pub mod harvester;
pub mod limiter;
pub mod media;
pub mod normalize;
pub mod parser;
pub mod registry;
pub mod text;

pub use config::HarvestConfig;
pub use error::SourceError;
pub use fetcher::{Expect, FetchedDocument, HttpFetch, HttpFetcher};
pub use harvester::{Harvest, Harvester};
pub use limiter::{FetchLimiter, FetchLimiterStats};
pub use media::{MediaBudget, MediaResolver};
pub use normalize::{canonicalize_url, normalize, parse_date, resolve_link};
pub use parser::{parser_for, ItemParser};
pub use registry::{curated_sources, RegisteredSource, SourceRegistry};
