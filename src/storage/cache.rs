//! Read-through cache of raw match and timeline JSON.
//!
//! Match data is immutable once a game ends, so a cached file is never
//! refetched or evicted. The finalizer rebuilds everything from this cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{write_atomic, StorageConfig, StorageError};
use crate::fetch::RiotApi;
use crate::models::{MatchRecord, Timeline};

/// Match and timeline cache backed by the data directory.
pub struct MatchCache {
    matches_dir: PathBuf,
    timelines_dir: PathBuf,
    api: Arc<dyn RiotApi>,
}

impl MatchCache {
    pub fn new(config: &StorageConfig, api: Arc<dyn RiotApi>) -> Self {
        Self {
            matches_dir: config.matches_dir(),
            timelines_dir: config.timelines_dir(),
            api,
        }
    }

    /// Path of the cached match file for `match_id`.
    pub fn match_path(&self, match_id: &str) -> Result<PathBuf, StorageError> {
        entry_path(&self.matches_dir, match_id)
    }

    /// Path of the cached timeline file for `match_id`.
    pub fn timeline_path(&self, match_id: &str) -> Result<PathBuf, StorageError> {
        entry_path(&self.timelines_dir, match_id)
    }

    pub fn contains_match(&self, match_id: &str) -> bool {
        self.match_path(match_id)
            .map(|path| path.exists())
            .unwrap_or(false)
    }

    /// Get a match, fetching and persisting it on a cache miss.
    pub async fn get_match(&self, match_id: &str) -> Result<MatchRecord, StorageError> {
        let path = self.match_path(match_id)?;
        let api = Arc::clone(&self.api);
        read_through(&path, || async move { api.match_json(match_id).await }).await
    }

    /// Get a match timeline, fetching and persisting it on a cache miss.
    pub async fn get_timeline(&self, match_id: &str) -> Result<Timeline, StorageError> {
        let path = self.timeline_path(match_id)?;
        let api = Arc::clone(&self.api);
        read_through(&path, || async move { api.timeline_json(match_id).await }).await
    }

    /// All cached match files, sorted by path.
    pub fn list_match_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        list_match_files(&self.matches_dir)
    }
}

/// All `*.json` files in a match cache directory, sorted by path.
pub fn list_match_files(matches_dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    if !matches_dir.exists() {
        return Ok(Vec::new());
    }

    let pattern = matches_dir.join("*.json");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| StorageError::InvalidPath(format!("{:?}", matches_dir)))?;

    let mut files: Vec<PathBuf> = glob::glob(pattern)
        .map_err(|e| StorageError::InvalidPath(e.to_string()))?
        .filter_map(Result::ok)
        .collect();
    files.sort();

    info!("Found {} cached matches in {:?}", files.len(), matches_dir);
    Ok(files)
}

fn entry_path(dir: &Path, match_id: &str) -> Result<PathBuf, StorageError> {
    if match_id.is_empty()
        || match_id.contains('/')
        || match_id.contains('\\')
        || match_id.contains("..")
    {
        return Err(StorageError::InvalidPath(match_id.to_string()));
    }
    Ok(dir.join(format!("{}.json", match_id)))
}

async fn read_through<T, F, Fut>(path: &Path, fetch: F) -> Result<T, StorageError>
where
    T: DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<String, crate::fetch::FetchError>>,
{
    if path.exists() {
        debug!("Cache hit: {:?}", path);
        let raw = tokio::fs::read_to_string(path).await?;
        return Ok(serde_json::from_str(&raw)?);
    }

    let raw = fetch().await?;
    let value = serde_json::from_str(&raw)?;
    write_atomic(path, raw.as_bytes())?;
    debug!("Cached {} bytes to {:?}", raw.len(), path);

    Ok(value)
}
