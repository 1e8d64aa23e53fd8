//! Service layer for the pipeline.
//!
//! This module contains the business logic for:
//! - Talking to the forum API (`ForumApi`, `RedditClient`)
//! - Incremental crawling of posts and comments (`ForumCrawler`)

mod checkpoint;
mod crawler;
pub mod payload;
mod reddit;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Comment, ListingPage, ListingView};

pub use checkpoint::Checkpoint;
pub use crawler::ForumCrawler;
pub use reddit::RedditClient;

/// Read access to the forum, implemented by the real API client and by test fixtures.
#[async_trait]
pub trait ForumApi: Send + Sync {
    /// Fetch one page of a listing view, continuing after the `after` cursor.
    async fn listing_page(
        &self,
        forum: &str,
        view: &ListingView,
        after: Option<&str>,
    ) -> Result<ListingPage>;

    /// Fetch every comment of a post, flattened, in as few calls as the API allows.
    async fn comment_tree(&self, post_id: &str) -> Result<Vec<Comment>>;
}
