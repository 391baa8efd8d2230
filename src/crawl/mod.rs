//! Frontier crawl.
//!
//! Walks a FIFO queue of players: pages each player's match history at its
//! stored cursor, aggregates builds from every unseen tracked match and
//! enqueues newly discovered players. A run stops when the queue drains or
//! the match budget is spent; leftover players and already-paged match ids
//! are persisted as pending work for the next run.

pub mod ladder;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calculate::builds::{extract_final_items, extract_timeline};
use crate::calculate::{AggregateKey, AggregationStore, BootsSet};
use crate::config::PipelineConfig;
use crate::fetch::{FetchError, RiotApi};
use crate::models::{is_tracked_queue, LadderTier, MatchId, MatchRecord, Puuid};
use crate::storage::{FrontierState, MatchCache, StorageConfig, StorageError};

pub use ladder::bootstrap_puuids;

/// Errors that abort a crawl run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// Budgets and switches for one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub max_matches_per_run: usize,
    pub max_new_puuids_per_run: usize,
    pub matches_per_puuid: u32,
    pub use_timeline: bool,
    pub checkpoint_every_player: bool,
    pub force_bootstrap: bool,
    pub force_bootstrap_refresh: bool,
    pub ladder_tier: LadderTier,
    pub ladder_queue: String,
    pub ladder_max_players: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl CrawlOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_matches_per_run: config.crawl.max_matches_per_run,
            max_new_puuids_per_run: config.crawl.max_new_puuids_per_run,
            matches_per_puuid: config.crawl.matches_per_puuid,
            use_timeline: config.crawl.use_timeline,
            checkpoint_every_player: config.crawl.checkpoint_every_player,
            force_bootstrap: config.crawl.force_bootstrap,
            force_bootstrap_refresh: config.crawl.force_bootstrap_refresh,
            ladder_tier: config.ladder.tier,
            ladder_queue: config.ladder.queue.clone(),
            ladder_max_players: config.ladder.max_players,
        }
    }
}

/// Explicit frontier seeds.
#[derive(Debug, Clone, Default)]
pub struct Seeds {
    pub puuids: Vec<Puuid>,
    pub match_ids: Vec<MatchId>,
}

impl Seeds {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            puuids: config.crawl.seed_puuids.clone(),
            match_ids: config.crawl.seed_match_ids.clone(),
        }
    }
}

/// Counters from one crawl run.
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    pub players_processed: usize,
    pub player_failures: usize,
    pub matches_processed: usize,
    /// Fetch failures plus matches whose game version has no patch
    pub match_failures: usize,
    pub matches_skipped_queue: usize,
    pub participants_aggregated: usize,
    pub participants_dropped: usize,
    pub new_puuids: usize,
    pub timelines_used: usize,
    pub timeline_fallbacks: usize,
    pub budget_exhausted: bool,
    pub pending_puuids: usize,
    pub pending_matches: usize,
    pub duration: Duration,
}

/// Per-run bookkeeping that is not persisted directly.
#[derive(Default)]
struct RunState {
    queue: VecDeque<Puuid>,
    queued: HashSet<Puuid>,
    processed: HashSet<Puuid>,
    parked: Vec<MatchId>,
    budget_used: usize,
    result: CrawlResult,
}

impl RunState {
    fn enqueue(&mut self, puuid: Puuid) -> bool {
        if puuid.is_empty() || !self.queued.insert(puuid.clone()) {
            return false;
        }
        self.queue.push_back(puuid);
        true
    }

    fn park(&mut self, match_id: &str) {
        if !self.parked.iter().any(|m| m == match_id) {
            self.parked.push(match_id.to_string());
        }
    }

    fn remaining_queue(&self) -> Vec<Puuid> {
        self.queue
            .iter()
            .filter(|p| !self.processed.contains(*p))
            .cloned()
            .collect()
    }
}

enum MatchOutcome {
    AlreadySeen,
    OverBudget,
    Counted,
}

/// Frontier crawler.
pub struct Crawler {
    api: Arc<dyn RiotApi>,
    cache: MatchCache,
    storage: StorageConfig,
    options: CrawlOptions,
    boots: BootsSet,
}

impl Crawler {
    pub fn new(api: Arc<dyn RiotApi>, storage: StorageConfig, options: CrawlOptions) -> Self {
        let cache = MatchCache::new(&storage, Arc::clone(&api));
        Self {
            api,
            cache,
            storage,
            options,
            boots: BootsSet::hardcoded(),
        }
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Run one budget-bounded crawl and persist frontier and aggregate state.
    pub async fn run(
        &self,
        frontier: &mut FrontierState,
        aggregate: &mut AggregationStore,
        seeds: &Seeds,
    ) -> Result<CrawlResult, CrawlError> {
        let started = Instant::now();
        let mut state = RunState::default();

        let pending_matches = self.build_queue(frontier, seeds, &mut state).await?;
        info!(
            "Crawl starting: {} players queued, {} pending matches, budget {}",
            state.queue.len(),
            pending_matches.len(),
            self.options.max_matches_per_run
        );

        for match_id in &pending_matches {
            if let MatchOutcome::OverBudget = self.process_match(match_id, frontier, aggregate, &mut state).await {
                state.park(match_id);
            }
        }

        while let Some(puuid) = state.queue.pop_front() {
            if self.budget_exhausted(&state) {
                state.queue.push_front(puuid);
                state.result.budget_exhausted = true;
                break;
            }
            if !state.processed.insert(puuid.clone()) {
                continue;
            }

            self.process_player(&puuid, frontier, aggregate, &mut state).await;

            if self.options.checkpoint_every_player {
                self.persist(frontier, aggregate, &state)?;
            }
        }

        if self.budget_exhausted(&state) {
            state.result.budget_exhausted = true;
        }
        self.persist(frontier, aggregate, &state)?;

        let mut result = state.result;
        result.pending_puuids = frontier.pending_puuids.len();
        result.pending_matches = frontier.pending_matches.len();
        result.duration = started.elapsed();

        info!(
            "Crawl finished: {} players, {} matches, {} new players, {} pending players, {} pending matches",
            result.players_processed,
            result.matches_processed,
            result.new_puuids,
            result.pending_puuids,
            result.pending_matches
        );
        Ok(result)
    }

    /// Fill the queue: pending players, seed players, players from seed
    /// matches, then the ladder. Returns the pending match ids.
    async fn build_queue(
        &self,
        frontier: &mut FrontierState,
        seeds: &Seeds,
        state: &mut RunState,
    ) -> Result<Vec<MatchId>, CrawlError> {
        let (pending_puuids, pending_matches) = frontier.take_pending();

        for puuid in pending_puuids {
            state.enqueue(puuid);
        }
        for puuid in &seeds.puuids {
            state.enqueue(puuid.clone());
        }

        for match_id in &seeds.match_ids {
            match self.cache.get_match(match_id).await {
                Ok(record) => {
                    for puuid in participant_puuids(&record) {
                        state.enqueue(puuid);
                    }
                }
                Err(e) => warn!("Failed to load seed match {}: {}", match_id, e),
            }
        }

        if state.queue.is_empty() || self.options.force_bootstrap {
            match bootstrap_puuids(
                self.api.as_ref(),
                self.options.ladder_tier,
                &self.options.ladder_queue,
                self.options.ladder_max_players,
            )
            .await
            {
                Ok(puuids) => {
                    let mut added = 0;
                    for puuid in puuids {
                        if !self.options.force_bootstrap_refresh && frontier.is_puuid_seen(&puuid) {
                            continue;
                        }
                        if state.enqueue(puuid) {
                            added += 1;
                        }
                    }
                    info!("Bootstrap added {} players", added);
                }
                Err(e) if state.queue.is_empty() && pending_matches.is_empty() => return Err(e.into()),
                Err(e) => warn!("Ladder bootstrap failed, continuing with existing queue: {}", e),
            }
        }

        Ok(pending_matches)
    }

    async fn process_player(
        &self,
        puuid: &str,
        frontier: &mut FrontierState,
        aggregate: &mut AggregationStore,
        state: &mut RunState,
    ) {
        frontier.mark_puuid_seen(puuid);

        let start = frontier.cursor(puuid);
        let page = self.options.matches_per_puuid;
        let ids = match self.api.match_ids_by_puuid(puuid, start, page).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Failed to page matches for {} at {}: {}", puuid, start, e);
                state.result.player_failures += 1;
                return;
            }
        };
        frontier.advance_cursor(puuid, page);
        state.result.players_processed += 1;
        debug!("Player {} page at {}: {} ids", puuid, start, ids.len());

        for match_id in &ids {
            if let MatchOutcome::OverBudget = self.process_match(match_id, frontier, aggregate, state).await {
                state.park(match_id);
            }
        }
    }

    async fn process_match(
        &self,
        match_id: &str,
        frontier: &mut FrontierState,
        aggregate: &mut AggregationStore,
        state: &mut RunState,
    ) -> MatchOutcome {
        if frontier.is_match_seen(match_id) {
            return MatchOutcome::AlreadySeen;
        }
        if self.budget_exhausted(state) {
            state.result.budget_exhausted = true;
            return MatchOutcome::OverBudget;
        }

        frontier.mark_match_seen(match_id);
        state.budget_used += 1;

        let record = match self.cache.get_match(match_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to load match {}: {}", match_id, e);
                state.result.match_failures += 1;
                return MatchOutcome::Counted;
            }
        };

        if !is_tracked_queue(record.info.queue_id) {
            state.result.matches_processed += 1;
            state.result.matches_skipped_queue += 1;
            return MatchOutcome::Counted;
        }
        // a failure, not a processed match
        let Some(patch) = record.info.patch() else {
            warn!("Match {} has unparseable version {:?}", match_id, record.info.game_version);
            state.result.match_failures += 1;
            return MatchOutcome::Counted;
        };
        state.result.matches_processed += 1;
        if record.info.participants.is_empty() {
            return MatchOutcome::Counted;
        }

        self.aggregate_match(match_id, &record, &patch.to_string(), aggregate, state)
            .await;
        self.harvest(&record, frontier, state);

        MatchOutcome::Counted
    }

    async fn aggregate_match(
        &self,
        match_id: &str,
        record: &MatchRecord,
        patch: &str,
        aggregate: &mut AggregationStore,
        state: &mut RunState,
    ) {
        let timeline = if self.options.use_timeline {
            match self.cache.get_timeline(match_id).await {
                Ok(timeline) => {
                    state.result.timelines_used += 1;
                    Some(timeline)
                }
                Err(e) => {
                    warn!("Timeline for {} unavailable, using final items: {}", match_id, e);
                    state.result.timeline_fallbacks += 1;
                    None
                }
            }
        } else {
            None
        };

        let seen_at = Utc::now();
        for participant in &record.info.participants {
            let Some(role) = participant.role() else {
                state.result.participants_dropped += 1;
                continue;
            };
            if participant.champion_id == 0 {
                state.result.participants_dropped += 1;
                continue;
            }

            let final_items = participant.final_items();
            let build = match &timeline {
                Some(timeline) => extract_timeline(
                    &timeline.purchases_for(participant.participant_id),
                    &final_items,
                    &self.boots,
                ),
                None => extract_final_items(&final_items, &self.boots),
            };

            let key = AggregateKey {
                patch: patch.to_string(),
                queue: record.info.queue_id,
                champion_id: participant.champion_id,
                role,
                build_sig: build.signature(),
            };
            aggregate.increment(key, build.boots, &build.core, participant.win, seen_at);
            state.result.participants_aggregated += 1;
        }
    }

    fn harvest(&self, record: &MatchRecord, frontier: &mut FrontierState, state: &mut RunState) {
        for puuid in participant_puuids(record) {
            if state.result.new_puuids >= self.options.max_new_puuids_per_run {
                return;
            }
            if frontier.is_puuid_seen(&puuid) {
                continue;
            }
            frontier.mark_puuid_seen(&puuid);
            if state.enqueue(puuid) {
                state.result.new_puuids += 1;
            }
        }
    }

    fn budget_exhausted(&self, state: &RunState) -> bool {
        state.budget_used >= self.options.max_matches_per_run
    }

    fn persist(
        &self,
        frontier: &mut FrontierState,
        aggregate: &AggregationStore,
        state: &RunState,
    ) -> Result<(), StorageError> {
        frontier.pending_puuids = state.remaining_queue();
        frontier.pending_matches = state.parked.clone();
        frontier.save(&self.storage)?;
        aggregate.save(&self.storage)?;
        Ok(())
    }
}

/// Participant player ids in a match, in participant order.
fn participant_puuids(record: &MatchRecord) -> Vec<Puuid> {
    let from_info: Vec<Puuid> = record
        .info
        .participants
        .iter()
        .map(|p| p.puuid.clone())
        .filter(|p| !p.is_empty())
        .collect();
    if !from_info.is_empty() {
        return from_info;
    }
    record
        .metadata
        .participants
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect()
}
