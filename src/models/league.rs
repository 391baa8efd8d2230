//! Ranked ladder wire types (`league/v4`, `summoner/v4`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Apex tiers that expose a full ladder listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LadderTier {
    #[default]
    Challenger,
    Grandmaster,
    Master,
}

impl LadderTier {
    /// Path segment prefix, as in `{tier}leagues/by-queue/{queue}`.
    pub fn path_segment(&self) -> &'static str {
        match self {
            LadderTier::Challenger => "challenger",
            LadderTier::Grandmaster => "grandmaster",
            LadderTier::Master => "master",
        }
    }
}

impl fmt::Display for LadderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for LadderTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "challenger" => Ok(LadderTier::Challenger),
            "grandmaster" => Ok(LadderTier::Grandmaster),
            "master" => Ok(LadderTier::Master),
            other => Err(format!(
                "must be challenger, grandmaster or master, got {}",
                other
            )),
        }
    }
}

/// A ladder listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueList {
    #[serde(default)]
    pub tier: Option<String>,

    #[serde(default)]
    pub queue: Option<String>,

    #[serde(default)]
    pub entries: Vec<LeagueEntry>,
}

/// One ladder row. Older API versions only carry `summonerId`; newer ones
/// include the `puuid` directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueEntry {
    #[serde(default)]
    pub summoner_id: Option<String>,

    #[serde(default)]
    pub puuid: Option<String>,

    #[serde(default)]
    pub league_points: i64,
}

/// `summoner/v4/summoners/{id}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summoner {
    pub puuid: String,
}
