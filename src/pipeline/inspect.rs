// src/pipeline/inspect.rs

//! `validate` and `info` commands.

use std::path::Path;

use crate::error::Result;
use crate::models::{Config, ContentKind, Credentials};
use crate::storage::{ForumStore, JsonCache};

/// Check configuration values and that credentials are complete.
///
/// No network call is made; token validity is only known at scrape time.
pub fn run_validate(config: &Config) -> Result<()> {
    config.validate()?;
    log::info!("Config OK ({} listing views)", config.listings.all_views().len());
    log::debug!(
        "user_agent={}, timeout={}s, delay={}ms",
        config.crawler.user_agent,
        config.crawler.timeout_secs,
        config.crawler.request_delay_ms
    );

    let credentials = Credentials::load(&config.paths.credentials)?;
    log::info!("Credentials OK ({credentials:?})");
    Ok(())
}

/// Cache and store record counts for one forum.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ForumInfo {
    pub cached_posts: Option<usize>,
    pub cached_comments: Option<usize>,
    pub stored_posts: Option<i64>,
    pub stored_comments: Option<i64>,
}

/// Summarize what has been scraped and loaded for `forum`.
pub async fn run_info(cache: &JsonCache, forum: &str, db_path: &Path) -> Result<ForumInfo> {
    let mut info = ForumInfo {
        cached_posts: cache.read_raw(forum, ContentKind::Posts).await?.map(|r| r.len()),
        cached_comments: cache
            .read_raw(forum, ContentKind::Comments)
            .await?
            .map(|r| r.len()),
        ..ForumInfo::default()
    };

    let describe = |n: Option<usize>| n.map_or("not scraped".to_string(), |n| n.to_string());
    log::info!("Cache directory: {}", cache.forum_root(forum).display());
    log::info!("Cached posts: {}", describe(info.cached_posts));
    log::info!("Cached comments: {}", describe(info.cached_comments));

    if tokio::fs::try_exists(db_path).await.unwrap_or(false) {
        let store = ForumStore::open_read_only(db_path).await?;
        info.stored_posts = Some(store.count_for_forum(ContentKind::Posts, forum).await?);
        info.stored_comments = Some(store.count_for_forum(ContentKind::Comments, forum).await?);
        store.close().await;
        log::info!(
            "Store {}: {} posts, {} comments",
            db_path.display(),
            info.stored_posts.unwrap_or_default(),
            info.stored_comments.unwrap_or_default()
        );
    } else {
        log::info!("No store at {} yet", db_path.display());
    }

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Post;
    use tempfile::TempDir;

    #[test]
    fn test_validate_rejects_bad_config() {
        let mut config = Config::default();
        config.crawler.page_size = 0;
        assert!(run_validate(&config).is_err());
    }

    #[tokio::test]
    async fn test_info_counts() {
        let tmp = TempDir::new().unwrap();
        let cache = JsonCache::new(tmp.path());
        let post = Post {
            id: "a".to_string(),
            title: "t".to_string(),
            author: "ape".to_string(),
            created_utc: 0,
            score: 0,
            listing: String::new(),
            num_comments: 0,
            selftext: String::new(),
            url: String::new(),
            permalink: String::new(),
            edited: None,
        };
        cache.save("wsv", ContentKind::Posts, &[post.clone()]).await.unwrap();
        let db = tmp.path().join("wsv.db");

        let before = run_info(&cache, "wsv", &db).await.unwrap();
        assert_eq!(before.cached_posts, Some(1));
        assert_eq!(before.cached_comments, None);
        assert_eq!(before.stored_posts, None);

        let store = ForumStore::open(&db).await.unwrap();
        store.insert_posts("wsv", &[post], 0).await.unwrap();
        store.close().await;

        let after = run_info(&cache, "wsv", &db).await.unwrap();
        assert_eq!(after.stored_posts, Some(1));
        assert_eq!(after.stored_comments, Some(0));
    }
}
