//! Champion tier list.
//!
//! Blends z-scores of smoothed win rate, pick volume and ban rate into one
//! score, ranks champions by it and buckets the rank percentile into tiers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{calculate_bayes_score, calculate_tier, rank_percentiles, round4, z_scores};
use crate::models::{ChampionCatalog, ChampionId, ChampionTierRow, MatchInfo};

const WINRATE_WEIGHT: f64 = 0.5;
const PICKS_WEIGHT: f64 = 0.3;
const BANRATE_WEIGHT: f64 = 0.2;

/// Raw pick/win/ban counts for one champion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChampionCounts {
    pub picks: u64,
    pub wins: u64,
    pub bans: u64,
}

/// Parameters for turning counts into tiers.
#[derive(Debug, Clone)]
pub struct TierOptions {
    pub min_picks: u64,
    pub bayes_k: f64,
    pub prior_winrate: f64,
}

impl Default for TierOptions {
    fn default() -> Self {
        Self {
            min_picks: 20,
            bayes_k: 100.0,
            prior_winrate: 0.5,
        }
    }
}

/// Accumulates champion counts over ranked matches.
#[derive(Debug, Clone, Default)]
pub struct TierCounter {
    champions: BTreeMap<ChampionId, ChampionCounts>,
    matches_seen: u64,
}

impl TierCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count picks, wins and bans from one match.
    pub fn record_match(&mut self, info: &MatchInfo) {
        self.matches_seen += 1;

        for participant in &info.participants {
            if participant.champion_id == 0 {
                continue;
            }
            let counts = self.champions.entry(participant.champion_id).or_default();
            counts.picks += 1;
            if participant.win {
                counts.wins += 1;
            }
        }

        for team in &info.teams {
            for ban in &team.bans {
                let Ok(champion_id) = ChampionId::try_from(ban.champion_id) else {
                    continue;
                };
                if champion_id > 0 {
                    self.champions.entry(champion_id).or_default().bans += 1;
                }
            }
        }
    }

    pub fn matches_seen(&self) -> u64 {
        self.matches_seen
    }

    pub fn counts(&self, champion_id: ChampionId) -> Option<&ChampionCounts> {
        self.champions.get(&champion_id)
    }

    /// Tier rows for champions with enough picks, best first.
    pub fn rows(
        &self,
        options: &TierOptions,
        catalog: Option<&ChampionCatalog>,
        generated_at: DateTime<Utc>,
    ) -> Vec<ChampionTierRow> {
        let candidates: Vec<(ChampionId, ChampionCounts)> = self
            .champions
            .iter()
            .filter(|(_, c)| c.picks >= options.min_picks && c.picks > 0)
            .map(|(id, c)| (*id, *c))
            .collect();

        let winrates: Vec<f64> = candidates
            .iter()
            .map(|(_, c)| calculate_bayes_score(c.wins, c.picks, options.bayes_k, options.prior_winrate))
            .collect();
        let banrates: Vec<f64> = candidates
            .iter()
            .map(|(_, c)| {
                if self.matches_seen == 0 {
                    0.0
                } else {
                    c.bans as f64 / self.matches_seen as f64
                }
            })
            .collect();
        let log_picks: Vec<f64> = candidates.iter().map(|(_, c)| (c.picks as f64).ln()).collect();

        let z_win = z_scores(&winrates);
        let z_picks = z_scores(&log_picks);
        let z_ban = z_scores(&banrates);

        let scores: Vec<f64> = (0..candidates.len())
            .map(|i| WINRATE_WEIGHT * z_win[i] + PICKS_WEIGHT * z_picks[i] + BANRATE_WEIGHT * z_ban[i])
            .collect();
        let percentiles = rank_percentiles(&scores);

        let version = catalog
            .and_then(|c| c.version.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let mut rows: Vec<(f64, ChampionTierRow)> = candidates
            .iter()
            .enumerate()
            .map(|(i, (champion_id, counts))| {
                let (name, slug) = match catalog.and_then(|c| c.get(*champion_id)) {
                    Some(info) => (info.name.clone(), info.slug.clone()),
                    None => (champion_id.to_string(), champion_id.to_string()),
                };
                let row = ChampionTierRow {
                    champion_id: *champion_id,
                    name,
                    slug,
                    picks: counts.picks,
                    wins: counts.wins,
                    bans: counts.bans,
                    winrate: round4(winrates[i]),
                    banrate: round4(banrates[i]),
                    score: round4(scores[i]),
                    tier: calculate_tier(percentiles[i]),
                    matches_seen: self.matches_seen,
                    ddragon_version: version.clone(),
                    generated_at,
                };
                (scores[i], row)
            })
            .collect();

        rows.sort_by(|(sa, a), (sb, b)| sb.total_cmp(sa).then(a.champion_id.cmp(&b.champion_id)));
        rows.into_iter().map(|(_, row)| row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ban, Participant, Team, Tier};
    use pretty_assertions::assert_eq;

    fn participant(champion_id: ChampionId, win: bool) -> Participant {
        Participant {
            champion_id,
            win,
            team_position: "TOP".to_string(),
            ..Default::default()
        }
    }

    fn info(picks: &[(ChampionId, bool)], bans: &[i64]) -> MatchInfo {
        MatchInfo {
            queue_id: 420,
            game_version: "14.23.1".to_string(),
            participants: picks.iter().map(|&(c, w)| participant(c, w)).collect(),
            teams: vec![Team {
                bans: bans
                    .iter()
                    .map(|&champion_id| Ban {
                        champion_id,
                        pick_turn: 1,
                    })
                    .collect(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn options(min_picks: u64) -> TierOptions {
        TierOptions {
            min_picks,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_match_counts() {
        let mut counter = TierCounter::new();
        counter.record_match(&info(&[(1, true), (2, false), (0, true)], &[3, -1, 0]));
        counter.record_match(&info(&[(1, false)], &[3]));

        assert_eq!(counter.matches_seen(), 2);
        assert_eq!(
            counter.counts(1),
            Some(&ChampionCounts {
                picks: 2,
                wins: 1,
                bans: 0
            })
        );
        assert_eq!(counter.counts(3).unwrap().bans, 2);
        assert!(counter.counts(0).is_none());
    }

    #[test]
    fn test_ten_champions_span_tiers() {
        let mut counter = TierCounter::new();
        // champion i wins i of 10 games
        for champion_id in 1..=10u32 {
            for game in 0..10u32 {
                counter.record_match(&info(&[(champion_id, game < champion_id)], &[]));
            }
        }

        let rows = counter.rows(&options(1), None, Utc::now());

        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].champion_id, 10);
        assert_eq!(rows[0].tier, Tier::S);
        assert_eq!(rows[9].champion_id, 1);
        assert_eq!(rows[9].tier, Tier::D);
        assert!(rows.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_single_champion_is_s() {
        let mut counter = TierCounter::new();
        counter.record_match(&info(&[(7, false)], &[]));

        let rows = counter.rows(&options(1), None, Utc::now());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tier, Tier::S);
        assert_eq!(rows[0].score, 0.0);
    }

    #[test]
    fn test_min_picks_filter_and_fallback_names() {
        let mut counter = TierCounter::new();
        for _ in 0..20 {
            counter.record_match(&info(&[(266, true), (103, false)], &[]));
        }
        counter.record_match(&info(&[(99, true)], &[]));

        let rows = counter.rows(&TierOptions::default(), None, Utc::now());

        let ids: Vec<_> = rows.iter().map(|r| r.champion_id).collect();
        assert_eq!(ids, vec![266, 103]);
        assert_eq!(rows[0].name, "266");
        assert_eq!(rows[0].slug, "266");
        assert_eq!(rows[0].ddragon_version, "unknown");
        assert_eq!(rows[0].matches_seen, 21);
    }

    #[test]
    fn test_catalog_names_and_banrate() {
        let catalog = ChampionCatalog::from_json(
            r#"{"version": "14.23.1", "data": {
                "Aatrox": {"id": "Aatrox", "key": "266", "name": "Aatrox"}
            }}"#,
        )
        .unwrap();
        let mut counter = TierCounter::new();
        for i in 0..4 {
            let bans: &[i64] = if i % 2 == 0 { &[266] } else { &[] };
            counter.record_match(&info(&[(266, true)], bans));
        }

        let rows = counter.rows(&options(1), Some(&catalog), Utc::now());
        assert_eq!(rows[0].name, "Aatrox");
        assert_eq!(rows[0].slug, "aatrox");
        assert_eq!(rows[0].ddragon_version, "14.23.1");
        assert_eq!(rows[0].banrate, 0.5);
        assert_eq!(rows[0].winrate, round4(calculate_bayes_score(4, 4, 100.0, 0.5)));
    }

    #[test]
    fn test_equal_scores_ordered_by_id() {
        let mut counter = TierCounter::new();
        counter.record_match(&info(&[(5, true), (2, true)], &[]));

        let rows = counter.rows(&options(1), None, Utc::now());
        let ids: Vec<_> = rows.iter().map(|r| r.champion_id).collect();
        assert_eq!(ids, vec![2, 5]);
    }
}
