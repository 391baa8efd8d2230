//! JSONL (JSON Lines) storage.
//!
//! The crawl state sets and aggregate rows are kept as JSONL so a file can be
//! inspected or grepped line by line. Each line is one JSON value.
//!
//! Every JSONL file here is authoritative state that gets rewritten in full,
//! so reads are strict: one bad line fails the load instead of being dropped.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use super::{write_atomic, StorageConfig, StorageError};

/// Crawl state files under `state/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFile {
    SeenMatches,
    SeenPuuids,
    Cursors,
    Pending,
    Aggregate,
}

impl StateFile {
    /// Get the filename for this state file.
    pub fn filename(&self) -> &'static str {
        match self {
            StateFile::SeenMatches => "seen_matches.jsonl",
            StateFile::SeenPuuids => "seen_puuids.jsonl",
            StateFile::Cursors => "cursors.json",
            StateFile::Pending => "pending.json",
            StateFile::Aggregate => "aggregate.jsonl",
        }
    }
}

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    /// Create a new JSONL writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a writer for a crawl state file.
    pub fn for_state(config: &StorageConfig, file: StateFile) -> Self {
        Self::new(config.state_path(file))
    }

    /// Write entities, replacing the entire file atomically.
    pub fn write_all<'a, I>(&self, entities: I) -> Result<usize, StorageError>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut buf = Vec::new();
        let mut count = 0;

        for entity in entities {
            serde_json::to_writer(&mut buf, entity)?;
            writeln!(buf)?;
            count += 1;
        }

        write_atomic(&self.path, &buf)?;
        info!("Wrote {} entries to {:?}", count, self.path);

        Ok(count)
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a reader for a crawl state file.
    pub fn for_state(config: &StorageConfig, file: StateFile) -> Self {
        Self::new(config.state_path(file))
    }

    /// Read all entities from the file. A missing file is empty; an
    /// unparseable line is a [`StorageError::CorruptLine`].
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entities = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            let entity = serde_json::from_str(&line).map_err(|source| StorageError::CorruptLine {
                path: self.path.clone(),
                line: idx + 1,
                source,
            })?;
            entities.push(entity);
        }

        debug!("Read {} entries from {:?}", entities.len(), self.path);
        Ok(entities)
    }
}
