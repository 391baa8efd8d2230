//! Incremental per-build counters maintained by the crawler.
//!
//! Keys are structural `(patch, queue, champion, role, signature)` tuples held
//! in a flat map. Replay protection is the caller's job: the crawler only
//! increments for matches it has not seen before.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{ChampionId, ItemId, Role};
use crate::storage::{JsonlReader, JsonlWriter, StateFile, StorageConfig, StorageError};

/// Composite aggregation key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateKey {
    /// `major.minor`
    pub patch: String,
    pub queue: u32,
    pub champion_id: ChampionId,
    pub role: Role,
    pub build_sig: String,
}

/// Counters for one key. `wins <= games` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub games: u64,
    pub wins: u64,
    pub boots: Option<ItemId>,
    pub core: Vec<ItemId>,
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AggregateRow {
    #[serde(flatten)]
    key: AggregateKey,
    #[serde(flatten)]
    bucket: Bucket,
}

/// Flat map of aggregation buckets.
#[derive(Debug, Clone, Default)]
pub struct AggregationStore {
    buckets: HashMap<AggregateKey, Bucket>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one game for `key`, creating the bucket if needed.
    pub fn increment(
        &mut self,
        key: AggregateKey,
        boots: Option<ItemId>,
        core: &[ItemId],
        win: bool,
        seen_at: DateTime<Utc>,
    ) -> &Bucket {
        let bucket = self.buckets.entry(key).or_insert_with(|| Bucket {
            games: 0,
            wins: 0,
            boots,
            core: core.to_vec(),
            last_seen_at: seen_at,
        });

        bucket.games += 1;
        if win {
            bucket.wins += 1;
        }
        bucket.boots = boots;
        bucket.core = core.to_vec();
        bucket.last_seen_at = seen_at;
        bucket
    }

    pub fn get(&self, key: &AggregateKey) -> Option<&Bucket> {
        self.buckets.get(key)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AggregateKey, &Bucket)> {
        self.buckets.iter()
    }

    pub fn total_games(&self) -> u64 {
        self.buckets.values().map(|b| b.games).sum()
    }

    /// Load `state/aggregate.jsonl`. A missing file yields an empty store.
    pub fn load(config: &StorageConfig) -> Result<Self, StorageError> {
        let rows = JsonlReader::<AggregateRow>::for_state(config, StateFile::Aggregate).read_all()?;
        let buckets: HashMap<AggregateKey, Bucket> =
            rows.into_iter().map(|row| (row.key, row.bucket)).collect();

        info!("Loaded {} aggregate buckets", buckets.len());
        Ok(Self { buckets })
    }

    /// Persist all buckets, one row per key, sorted by key.
    pub fn save(&self, config: &StorageConfig) -> Result<usize, StorageError> {
        let mut rows: Vec<AggregateRow> = self
            .buckets
            .iter()
            .map(|(key, bucket)| AggregateRow {
                key: key.clone(),
                bucket: bucket.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));

        JsonlWriter::<AggregateRow>::for_state(config, StateFile::Aggregate).write_all(&rows)
    }
}
