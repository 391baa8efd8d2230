//! Full-rescan finalizer.
//!
//! Rebuilds meta builds and champion tiers from every cached match, ignoring
//! the crawler's incremental aggregate. Output is fully determined by the
//! cache contents and options, apart from `generatedAt`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::builds::{extract_final_items, BootsSet};
use super::tiers::{TierCounter, TierOptions};
use super::{calculate_bayes_score, calculate_win_rate, round4};
use crate::models::{
    BuildEntry, ChampionCatalog, ChampionId, ChampionTierRow, ItemCatalog, ItemId, MatchRecord,
    MetaBuildsOutput, PatchBucket, PatchBuilds, QueueGroup, Role,
};
use crate::storage::cache::list_match_files;
use crate::storage::{write_json_atomic, StorageError};

/// Tier list output filename.
pub const TIERS_FILENAME: &str = "champion_tiers.json";

/// Errors that can occur while finalizing.
#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Thresholds and scoring parameters.
#[derive(Debug, Clone)]
pub struct FinalizeOptions {
    /// Champion/role groups with fewer total games are dropped
    pub min_sample: u64,
    /// Builds with fewer games are not shown
    pub min_display_sample: u64,
    pub bayes_k: f64,
    pub prior_winrate: f64,
    pub tier_min_picks: u64,
    /// Matches on an older major version are skipped (0 = no filter)
    pub min_patch_major: u32,
    pub patch_bucket: PatchBucket,
    /// Builds kept per champion/role
    pub max_builds: usize,
}

impl Default for FinalizeOptions {
    fn default() -> Self {
        Self {
            min_sample: 10,
            min_display_sample: 5,
            bayes_k: 100.0,
            prior_winrate: 0.5,
            tier_min_picks: 20,
            min_patch_major: 0,
            patch_bucket: PatchBucket::Minor,
            max_builds: 10,
        }
    }
}

/// Counters from one finalize pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeStats {
    pub files_scanned: usize,
    pub parse_failures: usize,
    pub queue_filtered: usize,
    pub patch_filtered: usize,
    pub matches_used: usize,
    pub participants_used: usize,
    pub participants_dropped: usize,
}

/// Everything a finalize pass produces.
#[derive(Debug, Clone)]
pub struct FinalizeOutput {
    pub ranked: MetaBuildsOutput,
    pub casual: MetaBuildsOutput,
    pub tiers: Vec<ChampionTierRow>,
    pub stats: FinalizeStats,
}

impl FinalizeOutput {
    pub fn builds(&self, group: QueueGroup) -> &MetaBuildsOutput {
        match group {
            QueueGroup::Ranked => &self.ranked,
            QueueGroup::Casual => &self.casual,
        }
    }

    /// Write all three output files atomically. Returns the written paths.
    pub fn write(&self, output_dir: &Path) -> Result<Vec<PathBuf>, FinalizeError> {
        let mut written = Vec::new();
        for group in QueueGroup::ALL {
            let path = output_dir.join(group.output_filename());
            write_json_atomic(&path, self.builds(group))?;
            written.push(path);
        }

        let path = output_dir.join(TIERS_FILENAME);
        write_json_atomic(&path, &self.tiers)?;
        written.push(path);

        info!("Wrote {} output files to {:?}", written.len(), output_dir);
        Ok(written)
    }
}

#[derive(Debug, Clone)]
struct BuildTally {
    games: u64,
    wins: u64,
    boots: Option<ItemId>,
    core: Vec<ItemId>,
    items: Vec<ItemId>,
    summoners: BTreeMap<[u32; 2], u64>,
}

impl BuildTally {
    /// Most frequent pair; the smaller pair wins ties.
    fn top_summoners(&self) -> Vec<u32> {
        let mut best: Option<(&[u32; 2], u64)> = None;
        for (pair, &count) in &self.summoners {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((pair, count));
            }
        }
        best.map(|(pair, _)| pair.iter().copied().filter(|&id| id != 0).collect())
            .unwrap_or_default()
    }
}

type GroupKey = (String, ChampionId, Role);
type GroupTally = BTreeMap<GroupKey, BTreeMap<String, BuildTally>>;

/// Meta build and tier list builder.
pub struct Finalizer {
    options: FinalizeOptions,
    boots: BootsSet,
    champions: Option<ChampionCatalog>,
}

impl Finalizer {
    pub fn new(options: FinalizeOptions, boots: BootsSet, champions: Option<ChampionCatalog>) -> Self {
        Self {
            options,
            boots,
            champions,
        }
    }

    /// Load item and champion metadata. Without `item.json` the crawl-time
    /// boots set is used instead of tags.
    pub fn from_metadata(
        options: FinalizeOptions,
        item_path: &Path,
        champion_path: &Path,
    ) -> Result<Self, FinalizeError> {
        let boots = match ItemCatalog::load(item_path)? {
            Some(catalog) => {
                let boots = BootsSet::from_catalog(&catalog);
                info!("Using {} tag-derived boots ids from {:?}", boots.len(), item_path);
                boots
            }
            None => {
                warn!(
                    "Item metadata {:?} not found, falling back to hardcoded boots ids",
                    item_path
                );
                BootsSet::hardcoded()
            }
        };

        let champions = ChampionCatalog::load(champion_path)?;
        if champions.is_none() {
            warn!(
                "Champion metadata {:?} not found, tier rows will use champion ids as names",
                champion_path
            );
        }

        Ok(Self::new(options, boots, champions))
    }

    pub fn options(&self) -> &FinalizeOptions {
        &self.options
    }

    /// Scan every cached match in `matches_dir` and compute all outputs.
    pub fn run(
        &self,
        matches_dir: &Path,
        generated_at: DateTime<Utc>,
    ) -> Result<FinalizeOutput, FinalizeError> {
        let files = list_match_files(matches_dir)?;
        let mut stats = FinalizeStats::default();
        let mut ranked = GroupTally::new();
        let mut casual = GroupTally::new();
        let mut tiers = TierCounter::new();

        for path in &files {
            stats.files_scanned += 1;

            let record = match fs::read_to_string(path)
                .map_err(StorageError::from)
                .and_then(|raw| serde_json::from_str::<MatchRecord>(&raw).map_err(StorageError::from))
            {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping unreadable match file {:?}: {}", path, e);
                    stats.parse_failures += 1;
                    continue;
                }
            };

            let Some(group) = QueueGroup::from_queue_id(record.info.queue_id) else {
                stats.queue_filtered += 1;
                continue;
            };

            let Some(patch) = record.info.patch() else {
                debug!("No patch in {:?} ({})", path, record.info.game_version);
                stats.patch_filtered += 1;
                continue;
            };
            if patch.major < self.options.min_patch_major {
                stats.patch_filtered += 1;
                continue;
            }

            stats.matches_used += 1;
            if group == QueueGroup::Ranked {
                tiers.record_match(&record.info);
            }

            let bucket = patch.bucket(self.options.patch_bucket);
            let tally = match group {
                QueueGroup::Ranked => &mut ranked,
                QueueGroup::Casual => &mut casual,
            };

            for participant in &record.info.participants {
                let Some(role) = participant.role() else {
                    stats.participants_dropped += 1;
                    continue;
                };
                if participant.champion_id == 0 {
                    stats.participants_dropped += 1;
                    continue;
                }

                let build = extract_final_items(&participant.final_items(), &self.boots);
                let entry = tally
                    .entry((bucket.clone(), participant.champion_id, role))
                    .or_default()
                    .entry(build.signature())
                    .or_insert_with(|| BuildTally {
                        games: 0,
                        wins: 0,
                        boots: build.boots,
                        core: build.core.clone(),
                        items: build.items(),
                        summoners: BTreeMap::new(),
                    });

                entry.games += 1;
                if participant.win {
                    entry.wins += 1;
                }
                *entry.summoners.entry(participant.summoners()).or_insert(0) += 1;
                stats.participants_used += 1;
            }
        }

        let tier_options = TierOptions {
            min_picks: self.options.tier_min_picks,
            bayes_k: self.options.bayes_k,
            prior_winrate: self.options.prior_winrate,
        };

        let output = FinalizeOutput {
            ranked: self.meta_builds(QueueGroup::Ranked, &ranked, generated_at),
            casual: self.meta_builds(QueueGroup::Casual, &casual, generated_at),
            tiers: tiers.rows(&tier_options, self.champions.as_ref(), generated_at),
            stats,
        };

        info!(
            "Finalized {} files: {} used, {} parse failures, {} other queues, {} old patches",
            output.stats.files_scanned,
            output.stats.matches_used,
            output.stats.parse_failures,
            output.stats.queue_filtered,
            output.stats.patch_filtered
        );

        Ok(output)
    }

    fn meta_builds(
        &self,
        group: QueueGroup,
        tally: &GroupTally,
        generated_at: DateTime<Utc>,
    ) -> MetaBuildsOutput {
        let mut patches = PatchBuilds::new();

        for ((patch, champion_id, role), builds) in tally {
            let total: u64 = builds.values().map(|b| b.games).sum();
            if total < self.options.min_sample {
                continue;
            }

            let entries = self.rank_builds(builds);
            if entries.is_empty() {
                continue;
            }

            patches
                .entry(patch.clone())
                .or_default()
                .entry(*champion_id)
                .or_default()
                .insert(*role, entries);
        }

        MetaBuildsOutput {
            generated_at,
            queues: group.queue_ids().to_vec(),
            min_sample: self.options.min_display_sample,
            bayes_k: self.options.bayes_k,
            prior_winrate: self.options.prior_winrate,
            patches,
        }
    }

    fn rank_builds(&self, builds: &BTreeMap<String, BuildTally>) -> Vec<BuildEntry> {
        let mut entries: Vec<BuildEntry> = builds
            .iter()
            .filter(|(_, b)| b.games >= self.options.min_display_sample)
            .map(|(sig, b)| BuildEntry {
                build_sig: sig.clone(),
                boots: b.boots,
                core: b.core.clone(),
                items: b.items.clone(),
                summoners: b.top_summoners(),
                games: b.games,
                wins: b.wins,
                winrate: round4(calculate_win_rate(b.wins, b.games)),
                score: round4(calculate_bayes_score(
                    b.wins,
                    b.games,
                    self.options.bayes_k,
                    self.options.prior_winrate,
                )),
            })
            .collect();

        entries.sort_by(|a, b| {
            b.games
                .cmp(&a.games)
                .then(b.score.total_cmp(&a.score))
                .then(a.build_sig.cmp(&b.build_sig))
        });
        entries.truncate(self.options.max_builds);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn participant(champion_id: u32, position: &str, win: bool, items: [u32; 6], spells: [u32; 2]) -> serde_json::Value {
        json!({
            "championId": champion_id,
            "teamPosition": position,
            "win": win,
            "item0": items[0], "item1": items[1], "item2": items[2],
            "item3": items[3], "item4": items[4], "item5": items[5],
            "item6": 3364,
            "summoner1Id": spells[0],
            "summoner2Id": spells[1]
        })
    }

    fn write_match(dir: &Path, id: &str, queue: u32, version: &str, participants: Vec<serde_json::Value>) {
        let body = json!({
            "metadata": {"matchId": id},
            "info": {
                "queueId": queue,
                "gameVersion": version,
                "participants": participants,
                "teams": [{"teamId": 100, "win": true, "bans": [{"championId": 103, "pickTurn": 1}]}]
            }
        });
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(format!("{}.json", id)), body.to_string()).unwrap();
    }

    const BRUISER: [u32; 6] = [3047, 3071, 6333, 3053, 0, 0];
    const TANK: [u32; 6] = [3111, 3068, 3075, 2055, 0, 0];

    /// 12 ranked Aatrox top games: 8 bruiser (6 wins), 4 tank (1 win).
    fn seed_cache(dir: &Path) {
        for i in 0..12 {
            let (items, win) = if i < 8 { (BRUISER, i < 6) } else { (TANK, i == 8) };
            let spells = if i % 3 == 0 { [12, 4] } else { [4, 14] };
            write_match(
                dir,
                &format!("NA1_{}", i),
                420,
                "14.23.636.2135",
                vec![
                    participant(266, "TOP", win, items, spells),
                    participant(103, "", !win, BRUISER, [4, 14]),
                ],
            );
        }
    }

    fn options() -> FinalizeOptions {
        FinalizeOptions::default()
    }

    #[test]
    fn test_builds_ranked_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        seed_cache(temp_dir.path());

        let finalizer = Finalizer::new(options(), BootsSet::hardcoded(), None);
        let output = finalizer.run(temp_dir.path(), Utc::now()).unwrap();

        let builds = output.ranked.builds_for("14.23", 266, Role::Top);
        assert_eq!(builds.len(), 1);
        let top = &builds[0];
        assert_eq!(top.build_sig, "b=3047|c=3053,3071,6333");
        assert_eq!(top.games, 8);
        assert_eq!(top.wins, 6);
        assert_eq!(top.winrate, 0.75);
        assert_eq!(top.score, round4(56.0 / 108.0));
        assert_eq!(top.items, vec![3047, 3053, 3071, 6333]);
        assert_eq!(top.summoners, vec![4, 14]);

        // unknown role dropped
        assert!(output.ranked.builds_for("14.23", 103, Role::Top).is_empty());
        assert_eq!(output.stats.participants_dropped, 12);
        assert_eq!(output.stats.participants_used, 12);
        assert!(output.casual.patches.is_empty());
        assert_eq!(output.ranked.min_sample, 5);
        assert_eq!(output.ranked.queues, vec![420]);
        assert_eq!(output.casual.queues, vec![400, 430]);
    }

    #[test]
    fn test_min_sample_drops_role() {
        let temp_dir = TempDir::new().unwrap();
        seed_cache(temp_dir.path());

        let finalizer = Finalizer::new(
            FinalizeOptions {
                min_sample: 13,
                ..options()
            },
            BootsSet::hardcoded(),
            None,
        );
        let output = finalizer.run(temp_dir.path(), Utc::now()).unwrap();
        assert!(output.ranked.patches.is_empty());
    }

    #[test]
    fn test_sort_order_games_then_score() {
        let temp_dir = TempDir::new().unwrap();
        seed_cache(temp_dir.path());

        let finalizer = Finalizer::new(
            FinalizeOptions {
                min_display_sample: 1,
                ..options()
            },
            BootsSet::hardcoded(),
            None,
        );
        let output = finalizer.run(temp_dir.path(), Utc::now()).unwrap();
        let sigs: Vec<_> = output
            .ranked
            .builds_for("14.23", 266, Role::Top)
            .iter()
            .map(|b| b.build_sig.as_str())
            .collect();
        assert_eq!(sigs, vec!["b=3047|c=3053,3071,6333", "b=3111|c=3068,3075"]);
    }

    #[test]
    fn test_filters_queue_patch_and_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write_match(dir, "NA1_aram", 450, "14.23.1", vec![participant(266, "TOP", true, BRUISER, [4, 14])]);
        write_match(dir, "NA1_old", 420, "13.24.1", vec![participant(266, "TOP", true, BRUISER, [4, 14])]);
        write_match(dir, "NA1_new", 400, "14.1.1", vec![participant(266, "TOP", true, BRUISER, [4, 14])]);
        fs::write(dir.join("NA1_bad.json"), "{not json").unwrap();

        let finalizer = Finalizer::new(
            FinalizeOptions {
                min_patch_major: 14,
                min_sample: 1,
                min_display_sample: 1,
                ..options()
            },
            BootsSet::hardcoded(),
            None,
        );
        let output = finalizer.run(dir, Utc::now()).unwrap();

        assert_eq!(
            output.stats,
            FinalizeStats {
                files_scanned: 4,
                parse_failures: 1,
                queue_filtered: 1,
                patch_filtered: 1,
                matches_used: 1,
                participants_used: 1,
                participants_dropped: 0,
            }
        );
        assert_eq!(output.casual.builds_for("14.1", 266, Role::Top).len(), 1);
        assert!(output.tiers.is_empty());
    }

    #[test]
    fn test_major_patch_bucket() {
        let temp_dir = TempDir::new().unwrap();
        seed_cache(temp_dir.path());

        let finalizer = Finalizer::new(
            FinalizeOptions {
                patch_bucket: PatchBucket::Major,
                ..options()
            },
            BootsSet::hardcoded(),
            None,
        );
        let output = finalizer.run(temp_dir.path(), Utc::now()).unwrap();
        assert_eq!(output.ranked.builds_for("14", 266, Role::Top).len(), 1);
    }

    #[test]
    fn test_output_identical_across_runs() {
        let cache_dir = TempDir::new().unwrap();
        seed_cache(cache_dir.path());
        let generated_at = DateTime::parse_from_rfc3339("2024-11-20T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let run_into = |out: &Path| -> Vec<PathBuf> {
            let finalizer = Finalizer::new(
                FinalizeOptions {
                    tier_min_picks: 1,
                    ..options()
                },
                BootsSet::hardcoded(),
                None,
            );
            let output = finalizer.run(cache_dir.path(), generated_at).unwrap();
            assert_eq!(output.tiers.len(), 2);
            output.write(out).unwrap()
        };

        let out_dir = TempDir::new().unwrap();
        let first = run_into(&out_dir.path().join("first"));
        let second = run_into(&out_dir.path().join("second"));

        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 3);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.file_name(), b.file_name());
            let a_bytes = std::fs::read(a).unwrap();
            assert!(!a_bytes.is_empty());
            assert_eq!(a_bytes, std::fs::read(b).unwrap(), "{:?} differs", a.file_name());
        }

        let names: Vec<_> = first
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"meta_builds_casual.json".to_string()));
        assert!(names.contains(&"champion_tiers.json".to_string()));
    }

    #[test]
    fn test_write_outputs_always() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("output");

        let finalizer = Finalizer::new(options(), BootsSet::hardcoded(), None);
        let output = finalizer
            .run(&temp_dir.path().join("cache/matches"), Utc::now())
            .unwrap();
        let written = output.write(&out).unwrap();

        assert_eq!(written.len(), 3);
        let ranked: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("meta_builds_ranked.json")).unwrap()).unwrap();
        assert_eq!(ranked["patches"], json!({}));
        assert_eq!(ranked["minSample"], 5);
        let tiers: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join(TIERS_FILENAME)).unwrap()).unwrap();
        assert_eq!(tiers, json!([]));
    }

    #[test]
    fn test_from_metadata_uses_item_tags() {
        let temp_dir = TempDir::new().unwrap();
        let item_path = temp_dir.path().join("item.json");
        fs::write(
            &item_path,
            r#"{"data": {"3047": {"name": "Plated Steelcaps", "tags": ["Boots"]}}}"#,
        )
        .unwrap();

        let finalizer = Finalizer::from_metadata(
            options(),
            &item_path,
            &temp_dir.path().join("champion.json"),
        )
        .unwrap();
        assert!(finalizer.boots.contains(3047));
        assert!(!finalizer.boots.contains(3006));
        assert!(finalizer.champions.is_none());

        let fallback = Finalizer::from_metadata(
            options(),
            &temp_dir.path().join("missing.json"),
            &temp_dir.path().join("champion.json"),
        )
        .unwrap();
        assert!(fallback.boots.contains(3006));
    }

    #[test]
    fn test_top_summoners_tie_prefers_smaller_pair() {
        let mut summoners = BTreeMap::new();
        summoners.insert([4, 14], 2);
        summoners.insert([4, 12], 2);
        summoners.insert([3, 4], 1);
        let tally = BuildTally {
            games: 5,
            wins: 0,
            boots: None,
            core: Vec::new(),
            items: Vec::new(),
            summoners,
        };
        assert_eq!(tally.top_summoners(), vec![4, 12]);
    }
}
