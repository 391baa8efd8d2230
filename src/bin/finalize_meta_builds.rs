use std::collections::HashMap;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info};

use meta_builds::calculate::Finalizer;
use meta_builds::cli::{init_tracing, CommonArgs};

#[derive(Parser)]
#[command(name = "finalize-meta-builds")]
#[command(about = "Rebuild meta builds and champion tiers from the match cache")]
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
    let config = cli
        .common
        .load_config(&env)
        .context("Failed to load configuration")?;

    info!("Starting finalize-meta-builds v{}", env!("CARGO_PKG_VERSION"));

    let storage = config.storage();
    let finalizer = Finalizer::from_metadata(
        config.finalize_options(),
        &config.item_metadata_path(),
        &config.champion_metadata_path(),
    )
    .context("Failed to load metadata")?;

    let matches_dir = storage.matches_dir();
    let output = tokio::task::spawn_blocking(move || finalizer.run(&matches_dir, Utc::now()))
        .await
        .context("Finalize task panicked")?
        .context("Finalize scan failed")?;

    let written = output
        .write(&storage.output_dir())
        .context("Failed to write outputs")?;

    let stats = &output.stats;
    println!("\n=== Finalize Results ===");
    println!("Files scanned:    {}", stats.files_scanned);
    println!("Matches used:     {}", stats.matches_used);
    println!("Parse failures:   {}", stats.parse_failures);
    println!("Other queues:     {}", stats.queue_filtered);
    println!("Old patches:      {}", stats.patch_filtered);
    println!("Participants:     {}", stats.participants_used);
    println!("Dropped:          {}", stats.participants_dropped);
    println!("Ranked patches:   {}", output.ranked.patches.len());
    println!("Casual patches:   {}", output.casual.patches.len());
    println!("Tiered champions: {}", output.tiers.len());
    for path in &written {
        println!("Wrote {}", path.display());
    }

    Ok(())
}
