// src/services/crawler.rs

//! Incremental forum crawler.
//!
//! Walks every configured listing view for posts, or every cached post's
//! comment tree for comments, and appends records whose ids are not yet in
//! the checkpoint. Output is written once at the end of the batch (and
//! periodically during long comment crawls).

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{Comment, Config, ContentKind, CrawlOutcome, ListingView, Post};
use crate::services::{Checkpoint, ForumApi};
use crate::storage::JsonCache;

/// Service for crawling one forum into the JSON cache.
pub struct ForumCrawler<A> {
    api: A,
    cache: JsonCache,
    config: Arc<Config>,
}

impl<A: ForumApi> ForumCrawler<A> {
    /// Create a new crawler writing into `cache`.
    pub fn new(api: A, cache: JsonCache, config: Arc<Config>) -> Self {
        Self { api, cache, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Crawl one content kind of `forum`.
    pub async fn crawl(&self, forum: &str, kind: ContentKind) -> Result<CrawlOutcome> {
        match kind {
            ContentKind::Posts => self.crawl_posts(forum).await,
            ContentKind::Comments => self.crawl_comments(forum).await,
        }
    }

    /// Walk every listing view and append unseen posts to `posts.json`.
    pub async fn crawl_posts(&self, forum: &str) -> Result<CrawlOutcome> {
        let prior: Vec<Post> = self.cache.load(forum, ContentKind::Posts).await?;
        let mut checkpoint = Checkpoint::from_records(prior);
        log::info!("{} posts saved so far for r/{forum}", checkpoint.len());

        let views = self.config.listings.all_views();
        let mut outcome = CrawlOutcome {
            units_total: views.len(),
            ..CrawlOutcome::default()
        };

        for view in &views {
            match self.walk_view(forum, view, &mut checkpoint, &mut outcome).await {
                Ok(()) => {}
                Err(e) if e.is_auth() => {
                    self.persist(forum, ContentKind::Posts, checkpoint.records()).await?;
                    return Err(e);
                }
                Err(e) => {
                    outcome.units_failed += 1;
                    log::warn!("Skipping listing view {view}: {e}");
                }
            }
        }

        self.persist(forum, ContentKind::Posts, checkpoint.records()).await?;
        outcome.total_records = checkpoint.len();
        Ok(outcome)
    }

    /// Page through one listing view until it is exhausted or the page budget runs out.
    async fn walk_view(
        &self,
        forum: &str,
        view: &ListingView,
        checkpoint: &mut Checkpoint<Post>,
        outcome: &mut CrawlOutcome,
    ) -> Result<()> {
        let max_pages = self.config.crawler.max_pages_per_view;
        let mut after: Option<String> = None;

        for page_no in 1..=max_pages {
            let page = self.api.listing_page(forum, view, after.as_deref()).await?;
            if page.children == 0 {
                break;
            }

            let mut added = 0;
            for post in page.posts {
                outcome.fetched += 1;
                if checkpoint.insert(post) {
                    added += 1;
                } else {
                    outcome.duplicates += 1;
                }
            }
            outcome.added += added;
            log::debug!("{view} page {page_no}: {added} new posts");

            match page.after {
                Some(next) => after = Some(next),
                None => break,
            }
        }

        log::info!("Finished listing view {view}");
        Ok(())
    }

    /// Fetch comment trees for cached posts that have no comments saved yet.
    pub async fn crawl_comments(&self, forum: &str) -> Result<CrawlOutcome> {
        let posts: Vec<Post> = self.cache.load(forum, ContentKind::Posts).await?;
        let prior: Vec<Comment> = self.cache.load(forum, ContentKind::Comments).await?;
        let mut checkpoint = Checkpoint::from_records(prior);

        let mut outcome = CrawlOutcome::default();
        if posts.is_empty() {
            log::warn!("No posts cached for r/{forum}; crawl posts before comments");
            outcome.total_records = checkpoint.len();
            return Ok(outcome);
        }

        let done: HashSet<String> = checkpoint
            .records()
            .iter()
            .map(|c| c.post_id.clone())
            .collect();
        log::info!(
            "{} comments for {} posts saved so far",
            checkpoint.len(),
            done.len()
        );

        let flush_every = self.config.crawler.flush_every;
        let mut unsaved = 0usize;

        for (post_no, post) in posts.iter().enumerate() {
            let post_no = post_no + 1;
            if done.contains(&post.id) {
                log::debug!(
                    "Comments for post {post_no}/{} ({}) already present, skipping",
                    posts.len(),
                    post.id
                );
                outcome.units_skipped += 1;
                continue;
            }

            outcome.units_total += 1;
            log::info!(
                "Saving comments for post {post_no}/{} ({})",
                posts.len(),
                post.id
            );

            match self.api.comment_tree(&post.id).await {
                Ok(comments) => {
                    for comment in comments {
                        outcome.fetched += 1;
                        if checkpoint.insert(comment) {
                            outcome.added += 1;
                            unsaved += 1;
                        } else {
                            outcome.duplicates += 1;
                        }
                    }
                }
                Err(e) if e.is_auth() => {
                    self.persist(forum, ContentKind::Comments, checkpoint.records()).await?;
                    return Err(e);
                }
                Err(e) => {
                    outcome.units_failed += 1;
                    log::warn!("Skipping comments for post {}: {e}", post.id);
                }
            }

            if flush_every > 0 && unsaved > 0 && outcome.units_total % flush_every == 0 {
                self.persist(forum, ContentKind::Comments, checkpoint.records()).await?;
                unsaved = 0;
            }
        }

        self.persist(forum, ContentKind::Comments, checkpoint.records()).await?;
        outcome.total_records = checkpoint.len();
        Ok(outcome)
    }

    async fn persist<T: serde::Serialize>(
        &self,
        forum: &str,
        kind: ContentKind,
        records: &[T],
    ) -> Result<()> {
        let path = self.cache.save(forum, kind, records).await?;
        log::debug!("Checkpoint: {} {kind} in {}", records.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::error::AppError;
    use crate::models::{ListingPage, TimeFilter};

    /// Forum double serving fixed pages per listing view.
    #[derive(Default)]
    struct FixtureApi {
        pages: HashMap<String, Vec<Vec<Post>>>,
        failing_views: HashSet<String>,
        auth_broken: bool,
        trees: HashMap<String, Vec<Comment>>,
        failing_trees: HashSet<String>,
        listing_calls: Mutex<Vec<String>>,
        tree_calls: Mutex<Vec<String>>,
    }

    impl FixtureApi {
        fn with_view(mut self, view: &str, pages: Vec<Vec<Post>>) -> Self {
            self.pages.insert(view.to_string(), pages);
            self
        }

        fn with_tree(mut self, post_id: &str, comments: Vec<Comment>) -> Self {
            self.trees.insert(post_id.to_string(), comments);
            self
        }

        fn tree_calls(&self) -> Vec<String> {
            self.tree_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ForumApi for FixtureApi {
        async fn listing_page(
            &self,
            _forum: &str,
            view: &ListingView,
            after: Option<&str>,
        ) -> Result<ListingPage> {
            let label = view.to_string();
            self.listing_calls.lock().unwrap().push(label.clone());
            if self.auth_broken {
                return Err(AppError::auth("invalid_grant"));
            }
            if self.failing_views.contains(&label) {
                return Err(AppError::api(503, label));
            }

            let pages = self.pages.get(&label).cloned().unwrap_or_default();
            let idx: usize = after.map(|a| a.parse().unwrap()).unwrap_or(0);
            let posts = pages
                .get(idx)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|mut p| {
                    p.listing = label.clone();
                    p
                })
                .collect();
            // A configured empty page stands for one whose children were all unusable.
            let children = match pages.get(idx) {
                Some(page) => page.len().max(1),
                None => 0,
            };
            Ok(ListingPage {
                posts,
                after: (idx + 1 < pages.len()).then(|| (idx + 1).to_string()),
                children,
            })
        }

        async fn comment_tree(&self, post_id: &str) -> Result<Vec<Comment>> {
            self.tree_calls.lock().unwrap().push(post_id.to_string());
            if self.failing_trees.contains(post_id) {
                return Err(AppError::api(500, post_id.to_string()));
            }
            Ok(self.trees.get(post_id).cloned().unwrap_or_default())
        }
    }

    fn post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            title: format!("post {id}"),
            author: "ape".to_string(),
            created_utc: 1_612_137_600,
            score: 1,
            listing: String::new(),
            num_comments: 2,
            selftext: String::new(),
            url: String::new(),
            permalink: String::new(),
            edited: None,
        }
    }

    fn comment(id: &str, post_id: &str) -> Comment {
        Comment {
            id: id.to_string(),
            post_id: post_id.to_string(),
            author: "ape".to_string(),
            created_utc: 1_612_137_700,
            score: 1,
            body: "hodl".to_string(),
            parent_id: Some(format!("t3_{post_id}")),
            permalink: String::new(),
            edited: None,
        }
    }

    fn config(views: Vec<ListingView>) -> Arc<Config> {
        let mut config = Config::default();
        config.listings.views = views;
        config.crawler.flush_every = 2;
        Arc::new(config)
    }

    fn ids<T: crate::models::Keyed>(records: &[T]) -> Vec<String> {
        records.iter().map(|r| r.key().to_string()).collect()
    }

    #[tokio::test]
    async fn test_rerun_does_not_duplicate_posts() {
        let tmp = TempDir::new().unwrap();
        let cache = JsonCache::new(tmp.path());
        let api = FixtureApi::default()
            .with_view("new", vec![vec![post("a"), post("b")], vec![post("c")]]);
        let crawler = ForumCrawler::new(api, cache.clone(), config(vec![ListingView::New]));

        let first = crawler.crawl_posts("silver").await.unwrap();
        assert_eq!(first.added, 3);
        assert_eq!(first.total_records, 3);

        let second = crawler.crawl_posts("silver").await.unwrap();
        assert_eq!(second.fetched, 3);
        assert_eq!(second.added, 0);
        assert_eq!(second.duplicates, 3);

        let saved: Vec<Post> = cache.load("silver", ContentKind::Posts).await.unwrap();
        assert_eq!(ids(&saved), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_post_in_several_views_keeps_first_listing() {
        let tmp = TempDir::new().unwrap();
        let cache = JsonCache::new(tmp.path());
        let api = FixtureApi::default()
            .with_view("new", vec![vec![post("a")]])
            .with_view("top:day", vec![vec![post("a"), post("b")]]);
        let views = vec![ListingView::New, ListingView::Top(TimeFilter::Day)];
        let crawler = ForumCrawler::new(api, cache.clone(), config(views));

        let outcome = crawler.crawl_posts("silver").await.unwrap();
        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.duplicates, 1);

        let saved: Vec<Post> = cache.load("silver", ContentKind::Posts).await.unwrap();
        assert_eq!(saved[0].listing, "new");
        assert_eq!(saved[1].listing, "top:day");
    }

    #[tokio::test]
    async fn test_failing_view_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let cache = JsonCache::new(tmp.path());
        let mut api = FixtureApi::default().with_view("hot", vec![vec![post("h")]]);
        api.failing_views.insert("new".to_string());
        let crawler = ForumCrawler::new(
            api,
            cache.clone(),
            config(vec![ListingView::New, ListingView::Hot]),
        );

        let outcome = crawler.crawl_posts("silver").await.unwrap();
        assert_eq!(outcome.units_total, 2);
        assert_eq!(outcome.units_failed, 1);
        assert_eq!(outcome.total_records, 1);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_crawl() {
        let tmp = TempDir::new().unwrap();
        let cache = JsonCache::new(tmp.path());
        let api = FixtureApi {
            auth_broken: true,
            ..FixtureApi::default()
        };
        let crawler = ForumCrawler::new(
            api,
            cache,
            config(vec![ListingView::New, ListingView::Hot]),
        );

        let err = crawler.crawl_posts("silver").await.unwrap_err();
        assert!(err.is_auth());
        assert_eq!(crawler.api().listing_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_page_budget_limits_walk() {
        let tmp = TempDir::new().unwrap();
        let cache = JsonCache::new(tmp.path());
        let pages = (0..5).map(|i| vec![post(&format!("p{i}"))]).collect();
        let api = FixtureApi::default().with_view("new", pages);
        let mut config = Config::default();
        config.listings.views = vec![ListingView::New];
        config.crawler.max_pages_per_view = 3;
        let crawler = ForumCrawler::new(api, cache, Arc::new(config));

        let outcome = crawler.crawl_posts("silver").await.unwrap();
        assert_eq!(outcome.total_records, 3);
        assert_eq!(crawler.api().listing_calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_page_without_usable_posts_keeps_paging() {
        let tmp = TempDir::new().unwrap();
        let cache = JsonCache::new(tmp.path());
        let api = FixtureApi::default()
            .with_view("new", vec![vec![], vec![post("a")], vec![post("b")]]);
        let crawler = ForumCrawler::new(api, cache, config(vec![ListingView::New]));

        let outcome = crawler.crawl_posts("silver").await.unwrap();
        assert_eq!(outcome.total_records, 2);
        assert_eq!(crawler.api().listing_calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_view_without_children_stops() {
        let tmp = TempDir::new().unwrap();
        let cache = JsonCache::new(tmp.path());
        let crawler = ForumCrawler::new(
            FixtureApi::default(),
            cache,
            config(vec![ListingView::Rising]),
        );

        let outcome = crawler.crawl_posts("silver").await.unwrap();
        assert_eq!(outcome.fetched, 0);
        assert_eq!(crawler.api().listing_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_comment_crawl_is_incremental() {
        let tmp = TempDir::new().unwrap();
        let cache = JsonCache::new(tmp.path());
        cache
            .save("silver", ContentKind::Posts, &[post("a"), post("b"), post("c")])
            .await
            .unwrap();
        cache
            .save("silver", ContentKind::Comments, &[comment("x1", "a")])
            .await
            .unwrap();

        let api = FixtureApi::default()
            .with_tree("a", vec![comment("x1", "a"), comment("x2", "a")])
            .with_tree("b", vec![comment("y1", "b"), comment("y2", "b")])
            .with_tree("c", vec![comment("z1", "c")]);
        let crawler = ForumCrawler::new(api, cache.clone(), config(vec![ListingView::New]));

        let outcome = crawler.crawl_comments("silver").await.unwrap();
        assert_eq!(crawler.api().tree_calls(), vec!["b", "c"]);
        assert_eq!(outcome.units_skipped, 1);
        assert_eq!(outcome.added, 3);
        assert_eq!(outcome.total_records, 4);

        let again = crawler.crawl_comments("silver").await.unwrap();
        assert_eq!(again.added, 0);
        assert_eq!(again.units_skipped, 3);
        assert_eq!(crawler.api().tree_calls().len(), 2);

        let saved: Vec<Comment> = cache.load("silver", ContentKind::Comments).await.unwrap();
        let unique: HashSet<_> = saved.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(unique.len(), saved.len());
    }

    #[tokio::test]
    async fn test_comment_failure_moves_on() {
        let tmp = TempDir::new().unwrap();
        let cache = JsonCache::new(tmp.path());
        cache
            .save("silver", ContentKind::Posts, &[post("a"), post("b")])
            .await
            .unwrap();

        let mut api = FixtureApi::default().with_tree("b", vec![comment("y1", "b")]);
        api.failing_trees.insert("a".to_string());
        let crawler = ForumCrawler::new(api, cache, config(vec![ListingView::New]));

        let outcome = crawler.crawl("silver", ContentKind::Comments).await.unwrap();
        assert_eq!(outcome.units_failed, 1);
        assert_eq!(outcome.total_records, 1);
    }

    #[tokio::test]
    async fn test_comments_without_posts() {
        let tmp = TempDir::new().unwrap();
        let crawler = ForumCrawler::new(
            FixtureApi::default(),
            JsonCache::new(tmp.path()),
            config(vec![ListingView::New]),
        );

        let outcome = crawler.crawl_comments("silver").await.unwrap();
        assert_eq!(outcome, CrawlOutcome::default());
        assert!(crawler.api().tree_calls().is_empty());
    }
}
