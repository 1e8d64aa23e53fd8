// src/pipeline/load.rs

//! Load stage: JSON cache into the SQLite store.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Comment, Config, ContentKind, Keyed, LoadReport, Post};
use crate::storage::{ForumStore, InsertCounts, JsonCache};

/// Raw record arrays read from one forum's cache.
#[derive(Debug, Default)]
pub struct CachedRecords {
    pub posts: Option<Vec<Value>>,
    pub comments: Option<Vec<Value>>,
}

impl CachedRecords {
    /// Read both cache files of `forum`.
    ///
    /// Fails with [`AppError::MissingInput`] if neither exists and with
    /// [`AppError::CorruptInput`] if either is not a JSON array.
    pub async fn read(cache: &JsonCache, forum: &str) -> Result<Self> {
        let records = Self {
            posts: cache.read_raw(forum, ContentKind::Posts).await?,
            comments: cache.read_raw(forum, ContentKind::Comments).await?,
        };

        if records.posts.is_none() && records.comments.is_none() {
            return Err(AppError::MissingInput(
                cache.path(forum, ContentKind::Posts),
            ));
        }
        for (kind, missing) in [
            (ContentKind::Posts, records.posts.is_none()),
            (ContentKind::Comments, records.comments.is_none()),
        ] {
            if missing {
                log::warn!(
                    "No {kind} file at {}, loading the rest only",
                    cache.path(forum, kind).display()
                );
            }
        }
        Ok(records)
    }
}

/// Inserts cached records into a store.
pub struct Loader<'a> {
    store: &'a ForumStore,
    offset_secs: i64,
}

impl<'a> Loader<'a> {
    pub fn new(store: &'a ForumStore, offset_secs: i64) -> Self {
        Self { store, offset_secs }
    }

    /// Load posts, then comments, so orphan detection sees this run's posts.
    pub async fn load(&self, forum: &str, records: CachedRecords) -> Result<Vec<LoadReport>> {
        let mut reports = Vec::with_capacity(2);

        if let Some(raw) = records.posts {
            let (posts, malformed) = parse_records::<Post>(raw, ContentKind::Posts);
            let counts = self.store.insert_posts(forum, &posts, self.offset_secs).await?;
            reports.push(report(ContentKind::Posts, posts.len(), malformed, counts));
        }
        if let Some(raw) = records.comments {
            let (comments, malformed) = parse_records::<Comment>(raw, ContentKind::Comments);
            let counts = self
                .store
                .insert_comments(forum, &comments, self.offset_secs)
                .await?;
            reports.push(report(ContentKind::Comments, comments.len(), malformed, counts));
        }

        Ok(reports)
    }
}

/// Deserialize each element on its own; bad elements are counted, not fatal.
fn parse_records<T: DeserializeOwned + Keyed>(raw: Vec<Value>, kind: ContentKind) -> (Vec<T>, usize) {
    let mut records = Vec::with_capacity(raw.len());
    let mut malformed = 0;

    for (index, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(record) if !record.key().is_empty() => records.push(record),
            Ok(_) => {
                log::debug!("{kind} record {index} has an empty id");
                malformed += 1;
            }
            Err(e) => {
                log::debug!("{kind} record {index} is malformed: {e}");
                malformed += 1;
            }
        }
    }

    (records, malformed)
}

fn report(kind: ContentKind, valid: usize, malformed: usize, counts: InsertCounts) -> LoadReport {
    LoadReport {
        kind: Some(kind),
        read: valid + malformed,
        inserted: counts.inserted,
        duplicates: counts.duplicates,
        malformed,
        orphans: counts.orphans,
    }
}

/// Run the load stage for one forum.
///
/// The store defaults to `<cache_dir>/<forum>.db`.
pub async fn run_load(
    config: &Config,
    cache: &JsonCache,
    forum: &str,
    db_path: Option<&Path>,
) -> Result<Vec<LoadReport>> {
    let db_path: PathBuf = db_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cache.root().join(format!("{forum}.db")));
    let records = CachedRecords::read(cache, forum).await?;
    log::info!("Loading r/{forum} into {}", db_path.display());

    let store = ForumStore::open(&db_path).await?;
    let loader = Loader::new(&store, config.analysis.offset_secs());
    let result = loader.load(forum, records).await;
    store.close().await;
    let reports = result?;

    for r in &reports {
        let kind = r.kind.map(|k| k.as_str()).unwrap_or("records");
        log::info!(
            "{kind}: {} read, {} inserted, {} already stored, {} malformed",
            r.read,
            r.inserted,
            r.duplicates,
            r.malformed
        );
        if r.malformed > 0 {
            log::warn!("Skipped {} malformed {kind}", r.malformed);
        }
        if r.orphans > 0 {
            log::warn!("{} comments reference posts missing from the store", r.orphans);
        }
    }

    Ok(reports)
}
