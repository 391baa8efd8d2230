//! Crawl frontier state: which matches and players have been seen, where each
//! player's match history pager stands, and work left over from the last run.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{
    read_json_opt, remove_if_exists, write_json_atomic, JsonlReader, JsonlWriter, StateFile,
    StorageConfig, StorageError,
};
use crate::models::{MatchId, Puuid};

/// Which state files to delete before a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetFlags {
    pub seen_matches: bool,
    pub seen_puuids: bool,
    pub cursors: bool,
    pub pending: bool,
    pub aggregate: bool,
}

impl ResetFlags {
    /// State files selected for deletion.
    pub fn files(&self) -> Vec<StateFile> {
        [
            (self.seen_matches, StateFile::SeenMatches),
            (self.seen_puuids, StateFile::SeenPuuids),
            (self.cursors, StateFile::Cursors),
            (self.pending, StateFile::Pending),
            (self.aggregate, StateFile::Aggregate),
        ]
        .into_iter()
        .filter_map(|(on, file)| on.then_some(file))
        .collect()
    }

    pub fn any(&self) -> bool {
        !self.files().is_empty()
    }

    /// Delete the selected state files. Returns the files actually removed.
    pub fn apply(&self, config: &StorageConfig) -> Result<Vec<StateFile>, StorageError> {
        let mut removed = Vec::new();
        for file in self.files() {
            if remove_if_exists(&config.state_path(file))? {
                warn!("Reset: deleted {}", file.filename());
                removed.push(file);
            }
        }
        Ok(removed)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PendingFile {
    #[serde(default)]
    puuids: Vec<Puuid>,
    #[serde(default)]
    matches: Vec<MatchId>,
}

/// Persistent crawl frontier.
#[derive(Debug, Clone, Default)]
pub struct FrontierState {
    pub seen_matches: HashSet<MatchId>,
    pub seen_puuids: HashSet<Puuid>,
    /// Next `start` offset into each player's match history
    pub cursors: HashMap<Puuid, u32>,
    /// Players still queued when the last run stopped
    pub pending_puuids: Vec<Puuid>,
    /// Paged match ids the last run had no budget left for
    pub pending_matches: Vec<MatchId>,
}

impl FrontierState {
    /// Load all frontier files. Missing files yield empty state.
    pub fn load(config: &StorageConfig) -> Result<Self, StorageError> {
        let seen_matches: HashSet<MatchId> =
            JsonlReader::<MatchId>::for_state(config, StateFile::SeenMatches)
                .read_all()?
                .into_iter()
                .collect();
        let seen_puuids: HashSet<Puuid> =
            JsonlReader::<Puuid>::for_state(config, StateFile::SeenPuuids)
                .read_all()?
                .into_iter()
                .collect();
        let cursors: HashMap<Puuid, u32> =
            read_json_opt(&config.state_path(StateFile::Cursors))?.unwrap_or_default();
        let pending: PendingFile =
            read_json_opt(&config.state_path(StateFile::Pending))?.unwrap_or_default();

        info!(
            "Loaded frontier: {} seen matches, {} seen players, {} cursors, {} pending players, {} pending matches",
            seen_matches.len(),
            seen_puuids.len(),
            cursors.len(),
            pending.puuids.len(),
            pending.matches.len()
        );

        Ok(Self {
            seen_matches,
            seen_puuids,
            cursors,
            pending_puuids: pending.puuids,
            pending_matches: pending.matches,
        })
    }

    /// Persist every frontier file. Seen sets are written sorted.
    pub fn save(&self, config: &StorageConfig) -> Result<(), StorageError> {
        let mut matches: Vec<&MatchId> = self.seen_matches.iter().collect();
        matches.sort();
        JsonlWriter::<MatchId>::for_state(config, StateFile::SeenMatches).write_all(matches)?;

        let mut puuids: Vec<&Puuid> = self.seen_puuids.iter().collect();
        puuids.sort();
        JsonlWriter::<Puuid>::for_state(config, StateFile::SeenPuuids).write_all(puuids)?;

        let cursors: std::collections::BTreeMap<&Puuid, &u32> = self.cursors.iter().collect();
        write_json_atomic(&config.state_path(StateFile::Cursors), &cursors)?;

        let pending = PendingFile {
            puuids: self.pending_puuids.clone(),
            matches: self.pending_matches.clone(),
        };
        write_json_atomic(&config.state_path(StateFile::Pending), &pending)?;

        Ok(())
    }

    pub fn is_match_seen(&self, match_id: &str) -> bool {
        self.seen_matches.contains(match_id)
    }

    /// Returns `true` if the match was not seen before.
    pub fn mark_match_seen(&mut self, match_id: &str) -> bool {
        self.seen_matches.insert(match_id.to_string())
    }

    pub fn is_puuid_seen(&self, puuid: &str) -> bool {
        self.seen_puuids.contains(puuid)
    }

    /// Returns `true` if the player was not seen before.
    pub fn mark_puuid_seen(&mut self, puuid: &str) -> bool {
        self.seen_puuids.insert(puuid.to_string())
    }

    pub fn cursor(&self, puuid: &str) -> u32 {
        self.cursors.get(puuid).copied().unwrap_or(0)
    }

    /// Move a player's cursor forward. Cursors never move backwards.
    pub fn advance_cursor(&mut self, puuid: &str, by: u32) -> u32 {
        let cursor = self.cursors.entry(puuid.to_string()).or_insert(0);
        *cursor = cursor.saturating_add(by);
        *cursor
    }

    /// Take the pending work, leaving both lists empty.
    pub fn take_pending(&mut self) -> (Vec<Puuid>, Vec<MatchId>) {
        (
            std::mem::take(&mut self.pending_puuids),
            std::mem::take(&mut self.pending_matches),
        )
    }
}
