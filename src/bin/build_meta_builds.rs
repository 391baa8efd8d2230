use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use meta_builds::calculate::AggregationStore;
use meta_builds::cli::{init_tracing, CommonArgs};
use meta_builds::config::api_key_from_env;
use meta_builds::crawl::{CrawlOptions, Crawler, Seeds};
use meta_builds::fetch::RiotClient;
use meta_builds::storage::FrontierState;

#[derive(Parser)]
#[command(name = "build-meta-builds")]
#[command(about = "Crawl Riot match history and update incremental build aggregates")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.common.log_level, cli.common.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let env: HashMap<String, String> = std::env::vars().collect();

    // Refuse to touch the network or state without a well-formed key
    let api_key = api_key_from_env(&env).context("Riot API key check failed")?;
    let config = cli
        .common
        .load_config(&env)
        .context("Failed to load configuration")?;

    info!("Starting build-meta-builds v{}", env!("CARGO_PKG_VERSION"));

    let storage = config.storage();
    let removed = config
        .reset
        .apply(&storage)
        .context("Failed to reset state")?;
    if !removed.is_empty() {
        warn!("Reset {} state files before crawling", removed.len());
    }

    let client = RiotClient::new(config.riot_client_config(&api_key))
        .context("Failed to build Riot API client")?;

    let mut frontier = FrontierState::load(&storage).context("Failed to load frontier state")?;
    let mut aggregate = AggregationStore::load(&storage).context("Failed to load aggregate")?;

    let crawler = Crawler::new(Arc::new(client), storage, CrawlOptions::from_config(&config));
    let result = crawler
        .run(&mut frontier, &mut aggregate, &Seeds::from_config(&config))
        .await
        .context("Crawl failed")?;

    println!("\n=== Crawl Results ===");
    println!("Players crawled:  {}", result.players_processed);
    println!("Player failures:  {}", result.player_failures);
    println!("Matches:          {}", result.matches_processed);
    println!("Match failures:   {}", result.match_failures);
    println!("Other queues:     {}", result.matches_skipped_queue);
    println!("Participants:     {}", result.participants_aggregated);
    println!("Dropped:          {}", result.participants_dropped);
    println!("New players:      {}", result.new_puuids);
    if config.crawl.use_timeline {
        println!("Timelines:        {}", result.timelines_used);
        println!("Timeline misses:  {}", result.timeline_fallbacks);
    }
    println!("Pending players:  {}", result.pending_puuids);
    println!("Pending matches:  {}", result.pending_matches);
    println!("Aggregate keys:   {}", aggregate.len());
    println!("Duration:         {:?}", result.duration);
    if result.budget_exhausted {
        println!(
            "\n(match budget of {} reached - rerun to continue)",
            config.crawl.max_matches_per_run
        );
    }

    Ok(())
}
