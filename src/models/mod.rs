//! Core data models for the meta build pipeline.

mod league;
mod match_record;
mod metadata;
mod patch;
mod queue;
mod role;
mod stats;
mod timeline;

pub use league::*;
pub use match_record::*;
pub use metadata::*;
pub use patch::*;
pub use queue::*;
pub use role::*;
pub use stats::*;
pub use timeline::*;

/// Stable pseudonymous player identifier.
pub type Puuid = String;

/// Globally unique match identifier, e.g. `NA1_5012345678`.
pub type MatchId = String;

/// Riot item id. `0` marks an empty slot.
pub type ItemId = u32;

/// Riot champion key (numeric id).
pub type ChampionId = u32;
