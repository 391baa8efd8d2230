//! Derived statistics models: finalized meta builds and champion tiers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChampionId, ItemId, Role};

/// Tier classification by rank percentile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    S,
    A,
    B,
    C,
    D,
}

impl Tier {
    /// Bucket a rank percentile in `[0, 1]` (1 = best).
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile >= 0.90 {
            Tier::S
        } else if percentile >= 0.70 {
            Tier::A
        } else if percentile >= 0.40 {
            Tier::B
        } else if percentile >= 0.15 {
            Tier::C
        } else {
            Tier::D
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::S => write!(f, "S"),
            Tier::A => write!(f, "A"),
            Tier::B => write!(f, "B"),
            Tier::C => write!(f, "C"),
            Tier::D => write!(f, "D"),
        }
    }
}

/// One ranked build in the finalized output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildEntry {
    pub build_sig: String,
    pub boots: Option<ItemId>,
    pub core: Vec<ItemId>,
    /// Display order: boots first, then core
    pub items: Vec<ItemId>,
    /// Most common summoner spell pair for this build
    pub summoners: Vec<u32>,
    pub games: u64,
    pub wins: u64,
    pub winrate: f64,
    /// Bayesian-shrunk win rate used for ranking
    pub score: f64,
}

/// `patch bucket -> champion id -> role -> builds`
pub type PatchBuilds = BTreeMap<String, BTreeMap<ChampionId, BTreeMap<Role, Vec<BuildEntry>>>>;

/// Contents of `meta_builds_ranked.json` / `meta_builds_casual.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaBuildsOutput {
    pub generated_at: DateTime<Utc>,
    pub queues: Vec<u32>,
    pub min_sample: u64,
    pub bayes_k: f64,
    pub prior_winrate: f64,
    pub patches: PatchBuilds,
}

impl MetaBuildsOutput {
    /// Builds for one champion/role in a patch bucket.
    pub fn builds_for(&self, patch: &str, champion_id: ChampionId, role: Role) -> &[BuildEntry] {
        self.patches
            .get(patch)
            .and_then(|champions| champions.get(&champion_id))
            .and_then(|roles| roles.get(&role))
            .map(|builds| builds.as_slice())
            .unwrap_or(&[])
    }
}

/// One row of `champion_tiers.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionTierRow {
    pub champion_id: ChampionId,
    pub name: String,
    pub slug: String,
    pub picks: u64,
    pub wins: u64,
    pub bans: u64,
    pub winrate: f64,
    pub banrate: f64,
    pub score: f64,
    pub tier: Tier,
    pub matches_seen: u64,
    pub ddragon_version: String,
    pub generated_at: DateTime<Utc>,
}
