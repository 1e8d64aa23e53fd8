//! Daily and hourly aggregates over one forum's rows.
//!
//! Rows are fetched with plain `SELECT`s and bucketed in Rust so that day
//! boundaries follow the configured timezone offset rather than SQLite's.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{AppError, Result};
use crate::storage::ForumStore;
use crate::utils::time::{day_of, hour_of};

/// Count or sum per calendar day, ordered by day.
pub type DailySeries = BTreeMap<NaiveDate, i64>;

pub const HOURS: usize = 24;

/// Case-insensitive, word-bounded match for `term`, with an optional `$` prefix.
pub fn mention_pattern(term: &str) -> Result<Regex> {
    let term = term.trim().trim_start_matches('$');
    if term.is_empty() {
        return Err(AppError::validation("mention term is empty"));
    }
    let tail = if term.ends_with(|c: char| c.is_alphanumeric() || c == '_') {
        r"\b"
    } else {
        ""
    };
    Regex::new(&format!(r"(?i)(?:^|[^\w$])\$?{}{tail}", regex::escape(term)))
        .map_err(|e| AppError::validation(format!("bad mention term: {e}")))
}

/// Posts (title or selftext) plus comments (body) mentioning `term`, per day.
pub async fn daily_mentions(
    store: &ForumStore,
    forum: &str,
    term: &str,
    offset_secs: i64,
) -> Result<DailySeries> {
    let pattern = mention_pattern(term)?;
    let mut series = DailySeries::new();

    let posts: Vec<(i64, String, String)> =
        sqlx::query_as("SELECT created_utc, title, selftext FROM posts WHERE forum = ?")
            .bind(forum)
            .fetch_all(store.pool())
            .await?;
    for (created, title, selftext) in posts {
        if pattern.is_match(&title) || pattern.is_match(&selftext) {
            *series.entry(day_of(created, offset_secs)).or_default() += 1;
        }
    }

    let comments: Vec<(i64, String)> =
        sqlx::query_as("SELECT created_utc, body FROM comments WHERE forum = ?")
            .bind(forum)
            .fetch_all(store.pool())
            .await?;
    for (created, body) in comments {
        if pattern.is_match(&body) {
            *series.entry(day_of(created, offset_secs)).or_default() += 1;
        }
    }

    Ok(series)
}

/// Sum of post scores per day.
pub async fn daily_scores(store: &ForumStore, forum: &str, offset_secs: i64) -> Result<DailySeries> {
    let rows: Vec<(i64, i64)> =
        sqlx::query_as("SELECT created_utc, score FROM posts WHERE forum = ?")
            .bind(forum)
            .fetch_all(store.pool())
            .await?;

    let mut series = DailySeries::new();
    for (created, score) in rows {
        *series.entry(day_of(created, offset_secs)).or_default() += score;
    }
    Ok(series)
}

async fn timestamps(store: &ForumStore, sql: &str, forum: &str) -> Result<Vec<i64>> {
    Ok(sqlx::query_scalar(sql)
        .bind(forum)
        .fetch_all(store.pool())
        .await?)
}

/// Posts per day and comments per day.
pub async fn daily_activity(
    store: &ForumStore,
    forum: &str,
    offset_secs: i64,
) -> Result<(DailySeries, DailySeries)> {
    let mut posts = DailySeries::new();
    for created in timestamps(store, "SELECT created_utc FROM posts WHERE forum = ?", forum).await? {
        *posts.entry(day_of(created, offset_secs)).or_default() += 1;
    }

    let mut comments = DailySeries::new();
    for created in timestamps(store, "SELECT created_utc FROM comments WHERE forum = ?", forum).await? {
        *comments.entry(day_of(created, offset_secs)).or_default() += 1;
    }

    Ok((posts, comments))
}

/// Posts plus comments by hour of day.
pub async fn hourly_activity(store: &ForumStore, forum: &str, offset_secs: i64) -> Result<[i64; HOURS]> {
    let mut counts = [0i64; HOURS];
    for sql in [
        "SELECT created_utc FROM posts WHERE forum = ?",
        "SELECT created_utc FROM comments WHERE forum = ?",
    ] {
        for created in timestamps(store, sql, forum).await? {
            counts[hour_of(created, offset_secs) as usize] += 1;
        }
    }
    Ok(counts)
}
