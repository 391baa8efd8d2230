//! Match-v5 document model.
//!
//! Only the fields the pipeline reads are modelled; everything else in the
//! cached document is ignored on deserialization. The cache keeps the raw
//! body, so nothing is lost by the narrow view.

use serde::{Deserialize, Serialize};

use super::{ChampionId, ItemId, Patch, Role};

/// A match document as returned by `match/v5/matches/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    #[serde(default)]
    pub metadata: MatchMetadata,

    #[serde(default)]
    pub info: MatchInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    #[serde(default)]
    pub match_id: String,

    /// Participant PUUIDs in participant order
    #[serde(default)]
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    #[serde(default)]
    pub queue_id: u32,

    /// Full client version, e.g. `14.23.636.2135`
    #[serde(default)]
    pub game_version: String,

    #[serde(default)]
    pub participants: Vec<Participant>,

    #[serde(default)]
    pub teams: Vec<Team>,
}

impl MatchInfo {
    /// Parsed patch of this match, if the version string is usable.
    pub fn patch(&self) -> Option<Patch> {
        Patch::parse(&self.game_version)
    }
}

/// One player's slice of a match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// In-game participant number (1..=10), joins timeline events
    #[serde(default)]
    pub participant_id: u32,

    #[serde(default)]
    pub puuid: String,

    #[serde(default)]
    pub champion_id: ChampionId,

    #[serde(default)]
    pub team_position: String,

    #[serde(default)]
    pub win: bool,

    #[serde(default)]
    pub item0: ItemId,
    #[serde(default)]
    pub item1: ItemId,
    #[serde(default)]
    pub item2: ItemId,
    #[serde(default)]
    pub item3: ItemId,
    #[serde(default)]
    pub item4: ItemId,
    #[serde(default)]
    pub item5: ItemId,
    /// Trinket slot; not part of the build
    #[serde(default)]
    pub item6: ItemId,

    #[serde(default)]
    pub summoner1_id: u32,
    #[serde(default)]
    pub summoner2_id: u32,
}

impl Participant {
    /// The six build slots in slot order (0 = empty).
    pub fn final_items(&self) -> [ItemId; 6] {
        [
            self.item0, self.item1, self.item2, self.item3, self.item4, self.item5,
        ]
    }

    /// Recognised team role, `None` for anything else.
    pub fn role(&self) -> Option<Role> {
        Role::from_team_position(&self.team_position)
    }

    /// Summoner spell pair in ascending order.
    pub fn summoners(&self) -> [u32; 2] {
        let (a, b) = (self.summoner1_id, self.summoner2_id);
        if a <= b {
            [a, b]
        } else {
            [b, a]
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(default)]
    pub team_id: u32,

    #[serde(default)]
    pub win: bool,

    #[serde(default)]
    pub bans: Vec<Ban>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ban {
    /// `-1` when the ban slot was skipped
    #[serde(default)]
    pub champion_id: i64,

    #[serde(default)]
    pub pick_turn: u32,
}
