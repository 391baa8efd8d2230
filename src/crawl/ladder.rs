//! Ranked ladder bootstrap.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::fetch::{FetchError, RiotApi};
use crate::models::{LadderTier, LeagueEntry, Puuid};

/// Resolve the top `max_players` of a ladder into player ids.
///
/// Entries are ranked by league points (ties by summoner id). Entries that
/// fail to resolve are logged and skipped; only the ladder fetch itself is
/// fatal.
pub async fn bootstrap_puuids(
    api: &dyn RiotApi,
    tier: LadderTier,
    queue: &str,
    max_players: usize,
) -> Result<Vec<Puuid>, FetchError> {
    let list = api.league_list(tier, queue).await?;
    let mut entries: Vec<LeagueEntry> = list.entries;

    entries.sort_by(|a, b| {
        b.league_points
            .cmp(&a.league_points)
            .then_with(|| a.summoner_id.cmp(&b.summoner_id))
    });
    entries.truncate(max_players);

    info!(
        "Bootstrapping from {} {} ladder ({} entries)",
        tier,
        queue,
        entries.len()
    );

    let mut seen = HashSet::new();
    let mut puuids = Vec::with_capacity(entries.len());

    for entry in entries {
        let puuid = match (entry.puuid, entry.summoner_id) {
            (Some(puuid), _) if !puuid.is_empty() => puuid,
            (_, Some(summoner_id)) => match api.summoner_by_id(&summoner_id).await {
                Ok(summoner) => summoner.puuid,
                Err(e) => {
                    warn!("Failed to resolve summoner {}: {}", summoner_id, e);
                    continue;
                }
            },
            _ => {
                warn!("Ladder entry has neither puuid nor summoner id");
                continue;
            }
        };

        if seen.insert(puuid.clone()) {
            puuids.push(puuid);
        }
    }

    info!("Bootstrap resolved {} players", puuids.len());
    Ok(puuids)
}
