// src/models/mod.rs

//! Domain models for the pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod credentials;
mod record;

// Re-export all public types
pub use config::{AnalysisConfig, Config, CrawlerConfig, ListingsConfig, PathsConfig};
pub use credentials::Credentials;
pub use record::{Comment, ContentKind, DELETED_AUTHOR, Keyed, ListingView, Post, TimeFilter};

/// One page of a listing view.
#[derive(Debug, Default, Clone)]
pub struct ListingPage {
    pub posts: Vec<Post>,
    /// Cursor for the next page; `None` once the view is exhausted
    pub after: Option<String>,
    /// Children returned by the API, including ones that were not usable posts
    pub children: usize,
}

/// Summary of a crawl run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlOutcome {
    /// Records returned by the API
    pub fetched: usize,
    /// Records appended to the cache
    pub added: usize,
    /// Records already present in the checkpoint
    pub duplicates: usize,
    /// Listing views (posts) or parent posts (comments) that were attempted
    pub units_total: usize,
    /// Units abandoned after an API error
    pub units_failed: usize,
    /// Posts whose comments were already cached and not re-fetched
    pub units_skipped: usize,
    /// Records in the cache file after the run
    pub total_records: usize,
}

/// Summary of loading one JSON file into the store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub kind: Option<ContentKind>,
    /// Records found in the file
    pub read: usize,
    pub inserted: usize,
    /// Records whose id was already in the store
    pub duplicates: usize,
    /// Records skipped for missing or mistyped fields
    pub malformed: usize,
    /// Comments whose post is not in the store (loaded anyway)
    pub orphans: usize,
}
