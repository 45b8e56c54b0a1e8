//! Core types for the Newsdesk aggregation pipeline
//!
//! This crate defines the shared data structures used across the workspace:
//! source configuration, raw and normalized items, and the category taxonomy.

pub mod category;
pub mod error;
pub mod news;
pub mod source;

pub use category::Category;
pub use error::{NewsdeskError, NewsdeskResult};
pub use news::{
    ClassifiedItem, Media, MediaContentHint, MediaHints, MediaKind, NormalizedItem, Published,
    RawItem,
};
pub use source::{FetchMode, ScrapeRules, Source, DEFAULT_SOURCE_CAP};
