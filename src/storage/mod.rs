//! Filesystem data directory operations.
//!
//! Handles reading and writing to the local data directory:
//! - Raw match and timeline JSON (the permanent cache)
//! - Crawl state (seen sets, cursors, pending work, aggregate rows)
//! - Finalized output artifacts
//! - Data Dragon metadata files

pub mod cache;
pub mod frontier;
pub mod jsonl;

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use cache::MatchCache;
pub use frontier::{FrontierState, ResetFlags};
pub use jsonl::{JsonlReader, JsonlWriter, StateFile};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt line {line} in {path:?}: {source}")]
    CorruptLine {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crate::fetch::FetchError),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn matches_dir(&self) -> PathBuf {
        self.cache_dir().join("matches")
    }

    pub fn timelines_dir(&self) -> PathBuf {
        self.cache_dir().join("timelines")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("output")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.data_dir.join("metadata")
    }

    /// Path of a crawl state file.
    pub fn state_path(&self, file: StateFile) -> PathBuf {
        self.state_dir().join(file.filename())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

/// Write bytes to `path` through a sibling temp file and a rename, so readers
/// never observe a half-written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let mut json = serde_json::to_vec_pretty(value)?;
    json.push(b'\n');
    write_atomic(path, &json)
}

/// Read a JSON file, returning `None` when it does not exist.
pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Delete a file if present. Returns whether something was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool, StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
