//! SQLite store for loaded posts and comments.
//!
//! Both tables are keyed by the forum identifier; inserts use
//! `INSERT OR IGNORE` so loading the same records twice is a no-op.
//! `comments.post_id` has no foreign key; orphan comments are stored like
//! any other.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::{AppError, Result};
use crate::models::{Comment, ContentKind, Post};
use crate::utils::{b36decode, time::hour_bucket};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id            TEXT PRIMARY KEY,
    id_num        INTEGER,
    forum         TEXT NOT NULL,
    title         TEXT NOT NULL,
    author        TEXT NOT NULL,
    selftext      TEXT NOT NULL DEFAULT '',
    url           TEXT NOT NULL DEFAULT '',
    permalink     TEXT NOT NULL DEFAULT '',
    score         INTEGER NOT NULL,
    num_comments  INTEGER NOT NULL DEFAULT 0,
    created_utc   INTEGER NOT NULL,
    created_hour  TEXT NOT NULL,
    edited        INTEGER,
    listing       TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS comments (
    id            TEXT PRIMARY KEY,
    id_num        INTEGER,
    forum         TEXT NOT NULL,
    post_id       TEXT NOT NULL,
    parent_id     TEXT,
    author        TEXT NOT NULL,
    body          TEXT NOT NULL,
    score         INTEGER NOT NULL,
    created_utc   INTEGER NOT NULL,
    created_hour  TEXT NOT NULL,
    edited        INTEGER,
    permalink     TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_posts_forum_created ON posts(forum, created_utc);
CREATE INDEX IF NOT EXISTS idx_comments_forum_created ON comments(forum, created_utc);
CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id);
"#;

/// Counts from inserting one batch of rows.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InsertCounts {
    pub inserted: usize,
    pub duplicates: usize,
    /// Inserted comments whose post is not in the store
    pub orphans: usize,
}

/// Handle to one forum's SQLite store.
#[derive(Debug, Clone)]
pub struct ForumStore {
    pool: SqlitePool,
}

impl ForumStore {
    /// Open the store, creating the file and schema if absent.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        log::debug!("Opened store at {}", path.display());

        Ok(Self { pool })
    }

    /// Open an existing store without write access.
    pub async fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(AppError::MissingInput(path.to_path_buf()));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert posts that are not yet stored, in one transaction.
    pub async fn insert_posts(
        &self,
        forum: &str,
        posts: &[Post],
        offset_secs: i64,
    ) -> Result<InsertCounts> {
        let mut counts = InsertCounts::default();
        let mut tx = self.pool.begin().await?;

        for post in posts {
            let result = sqlx::query(
                r#"INSERT OR IGNORE INTO posts
                   (id, id_num, forum, title, author, selftext, url, permalink,
                    score, num_comments, created_utc, created_hour, edited, listing)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&post.id)
            .bind(b36decode(&post.id))
            .bind(forum)
            .bind(&post.title)
            .bind(&post.author)
            .bind(&post.selftext)
            .bind(&post.url)
            .bind(&post.permalink)
            .bind(post.score)
            .bind(post.num_comments)
            .bind(post.created_utc)
            .bind(hour_bucket(post.created_utc, offset_secs))
            .bind(post.edited)
            .bind(&post.listing)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                counts.inserted += 1;
            } else {
                counts.duplicates += 1;
            }
        }

        tx.commit().await?;
        Ok(counts)
    }

    /// Insert comments that are not yet stored, in one transaction.
    pub async fn insert_comments(
        &self,
        forum: &str,
        comments: &[Comment],
        offset_secs: i64,
    ) -> Result<InsertCounts> {
        let mut counts = InsertCounts::default();
        let mut tx = self.pool.begin().await?;

        for comment in comments {
            let result = sqlx::query(
                r#"INSERT OR IGNORE INTO comments
                   (id, id_num, forum, post_id, parent_id, author, body,
                    score, created_utc, created_hour, edited, permalink)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&comment.id)
            .bind(b36decode(&comment.id))
            .bind(forum)
            .bind(&comment.post_id)
            .bind(&comment.parent_id)
            .bind(&comment.author)
            .bind(&comment.body)
            .bind(comment.score)
            .bind(comment.created_utc)
            .bind(hour_bucket(comment.created_utc, offset_secs))
            .bind(comment.edited)
            .bind(&comment.permalink)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                counts.duplicates += 1;
                continue;
            }
            counts.inserted += 1;

            let has_parent: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?)")
                    .bind(&comment.post_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if has_parent == 0 {
                log::debug!(
                    "Comment {} references unknown post {}",
                    comment.id,
                    comment.post_id
                );
                counts.orphans += 1;
            }
        }

        tx.commit().await?;
        Ok(counts)
    }

    /// Number of rows stored for a content kind.
    pub async fn count(&self, kind: ContentKind) -> Result<i64> {
        let sql = match kind {
            ContentKind::Posts => "SELECT COUNT(*) FROM posts",
            ContentKind::Comments => "SELECT COUNT(*) FROM comments",
        };
        Ok(sqlx::query_scalar(sql).fetch_one(&self.pool).await?)
    }

    /// Number of rows stored for one forum.
    pub async fn count_for_forum(&self, kind: ContentKind, forum: &str) -> Result<i64> {
        let sql = match kind {
            ContentKind::Posts => "SELECT COUNT(*) FROM posts WHERE forum = ?",
            ContentKind::Comments => "SELECT COUNT(*) FROM comments WHERE forum = ?",
        };
        Ok(sqlx::query_scalar(sql).bind(forum).fetch_one(&self.pool).await?)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
