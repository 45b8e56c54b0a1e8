//! Aggregation services for Newsdesk
//!
//! This crate sits on top of the source harvesters and provides the
//! public entry points: `aggregate` (fan-out, dedup, filter, sort, cap)
//! and `classify` (deterministic keyword categorisation).

pub mod aggregator;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod dedup;

pub use aggregator::{apply_query, AggregateError, AggregateQuery, Aggregator, DEFAULT_LIMIT};
pub use cache::{HarvestCache, TtlHarvestCache};
pub use classifier::{CategoryScores, Classifier, URL_SEGMENT_BONUS};
pub use config::AggregatorConfig;
pub use dedup::dedup_by_url;
