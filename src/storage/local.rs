//! Local filesystem JSON cache.
//!
//! ## Storage Layout
//!
//! ```text
//! {cache_dir}/
//! ├── {forum}.db            # Relational store written by `load`
//! └── {forum}/
//!     ├── posts.json        # Array of flat post objects
//!     └── comments.json     # Array of flat comment objects
//! ```

use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::ContentKind;

/// JSON cache rooted at the configured cache directory.
#[derive(Debug, Clone)]
pub struct JsonCache {
    root_dir: PathBuf,
}

impl JsonCache {
    /// Create a cache rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Directory holding one forum's cache files.
    pub fn forum_root(&self, forum: &str) -> PathBuf {
        self.root_dir.join(forum)
    }

    /// Path of the cache file for one forum and content kind.
    pub fn path(&self, forum: &str, kind: ContentKind) -> PathBuf {
        self.forum_root(forum).join(kind.file_name())
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_dir(path).await?;

        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Whether a cache file exists for this forum and kind.
    pub async fn exists(&self, forum: &str, kind: ContentKind) -> bool {
        tokio::fs::try_exists(self.path(forum, kind))
            .await
            .unwrap_or(false)
    }

    /// Read the raw record array, `None` if the file does not exist.
    ///
    /// Fails with [`AppError::CorruptInput`] if the file is not a JSON array.
    pub async fn read_raw(&self, forum: &str, kind: ContentKind) -> Result<Option<Vec<Value>>> {
        let path = self.path(forum, kind);
        let Some(bytes) = Self::read_bytes(&path).await? else {
            return Ok(None);
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Array(records)) => Ok(Some(records)),
            Ok(other) => Err(AppError::corrupt(
                &path,
                format!("expected a JSON array, found {}", json_type(&other)),
            )),
            Err(e) => Err(AppError::corrupt(&path, e)),
        }
    }

    /// Read typed records; a missing file yields an empty list.
    pub async fn load<T: DeserializeOwned>(&self, forum: &str, kind: ContentKind) -> Result<Vec<T>> {
        let path = self.path(forum, kind);
        match Self::read_bytes(&path).await? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| AppError::corrupt(&path, e)),
            None => {
                log::debug!("No cache at {}, starting empty", path.display());
                Ok(Vec::new())
            }
        }
    }

    /// Replace the cache file with `records`, atomically.
    pub async fn save<T: Serialize>(
        &self,
        forum: &str,
        kind: ContentKind,
        records: &[T],
    ) -> Result<PathBuf> {
        let path = self.path(forum, kind);
        let bytes = serde_json::to_vec_pretty(records)?;
        Self::write_bytes(&path, &bytes).await?;
        log::debug!("Wrote {} {} to {}", records.len(), kind, path.display());
        Ok(path)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
