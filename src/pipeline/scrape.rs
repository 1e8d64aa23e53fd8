// src/pipeline/scrape.rs

//! Scrape stage: forum API into the JSON cache.

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, ContentKind, CrawlOutcome, Credentials};
use crate::services::{ForumApi, ForumCrawler, RedditClient};
use crate::storage::JsonCache;

/// Run the scraper for one forum and content kind.
///
/// Credentials are read once here; an authentication failure aborts the
/// whole run, any other API error only skips the affected view or post.
pub async fn run_scrape(
    config: Arc<Config>,
    cache: &JsonCache,
    forum: &str,
    kind: ContentKind,
) -> Result<CrawlOutcome> {
    let credentials = Credentials::load(&config.paths.credentials)?;
    let client = RedditClient::new(&config.crawler, credentials)?;
    client.authenticate().await?;
    log::info!("Authenticated with the forum API");

    crawl_with(client, config, cache, forum, kind).await
}

/// Crawl with an already-built API client.
pub async fn crawl_with<A: ForumApi>(
    api: A,
    config: Arc<Config>,
    cache: &JsonCache,
    forum: &str,
    kind: ContentKind,
) -> Result<CrawlOutcome> {
    let start_time = Utc::now();
    log::info!("Scraping {kind} of r/{forum}");

    let crawler = ForumCrawler::new(api, cache.clone(), config);
    let outcome = crawler.crawl(forum, kind).await?;

    let elapsed = Utc::now() - start_time;
    log::info!(
        "Scrape finished in {}s: {} fetched, {} new, {} already saved",
        elapsed.num_seconds(),
        outcome.fetched,
        outcome.added,
        outcome.duplicates
    );
    if outcome.units_failed > 0 {
        let unit = match kind {
            ContentKind::Posts => "listing views",
            ContentKind::Comments => "posts",
        };
        log::warn!(
            "{} of {} {unit} failed and were skipped",
            outcome.units_failed,
            outcome.units_total
        );
    }
    log::info!(
        "{} {kind} saved in {}",
        outcome.total_records,
        cache.path(forum, kind).display()
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Comment, ListingPage, ListingView, Post};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct OnePost;

    #[async_trait]
    impl ForumApi for OnePost {
        async fn listing_page(
            &self,
            _forum: &str,
            view: &ListingView,
            _after: Option<&str>,
        ) -> Result<ListingPage> {
            let post = Post {
                id: "lb6s2z".to_string(),
                title: "Silver".to_string(),
                author: "ape".to_string(),
                created_utc: 1_612_137_600,
                score: 1,
                listing: view.to_string(),
                num_comments: 0,
                selftext: String::new(),
                url: String::new(),
                permalink: String::new(),
                edited: None,
            };
            Ok(ListingPage {
                posts: vec![post],
                after: None,
                children: 1,
            })
        }

        async fn comment_tree(&self, _post_id: &str) -> Result<Vec<Comment>> {
            Err(AppError::api(500, "comments"))
        }
    }

    #[tokio::test]
    async fn test_crawl_with_writes_cache() {
        let tmp = TempDir::new().unwrap();
        let cache = JsonCache::new(tmp.path());
        let config = Arc::new(Config::default());

        let outcome = crawl_with(OnePost, config.clone(), &cache, "wsv", ContentKind::Posts)
            .await
            .unwrap();
        assert_eq!(outcome.total_records, 1);
        assert_eq!(outcome.units_total, config.listings.all_views().len());
        assert!(cache.exists("wsv", ContentKind::Posts).await);

        let comments = crawl_with(OnePost, config, &cache, "wsv", ContentKind::Comments)
            .await
            .unwrap();
        assert_eq!(comments.units_failed, 1);
        assert_eq!(comments.total_records, 0);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_crawling() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.credentials = tmp.path().join("absent.ini");
        let cache = JsonCache::new(tmp.path());

        // Only meaningful when the override variables are unset.
        if std::env::var("SUBCRAWL_CLIENT_ID").is_err() {
            let err = run_scrape(Arc::new(config), &cache, "wsv", ContentKind::Posts)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Config(_)));
        }
    }
}
