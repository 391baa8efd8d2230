//! Configuration loading and validation.
//!
//! Values come from an optional TOML file, then environment overrides. The
//! Riot API key is read from the environment only and never stored in files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculate::FinalizeOptions;
use crate::fetch::{platform_base_url, regional_base_url, RetryPolicy, RiotClientConfig};
use crate::models::{LadderTier, PatchBucket};
use crate::storage::{ResetFlags, StorageConfig};

/// Environment variable holding the Riot API key.
pub const API_KEY_ENV: &str = "RIOT_API_KEY";

const API_KEY_PATTERN: &str =
    r"^RGAPI-[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Riot API routing and HTTP behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiotConfig {
    /// Regional route for match-v5, e.g. `americas`
    #[serde(default = "default_regional")]
    pub regional: String,

    /// Platform route for league-v4 / summoner-v4, e.g. `na1`
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Full regional base URL, overrides `regional`
    #[serde(default)]
    pub regional_base: Option<String>,

    /// Full platform base URL, overrides `platform`
    #[serde(default)]
    pub platform_base: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_regional() -> String {
    "americas".to_string()
}

fn default_platform() -> String {
    "na1".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for RiotConfig {
    fn default() -> Self {
        Self {
            regional: default_regional(),
            platform: default_platform(),
            regional_base: None,
            platform_base: None,
            timeout_seconds: default_timeout(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Crawl budgets and frontier seeding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_max_matches")]
    pub max_matches_per_run: usize,

    #[serde(default = "default_max_new_puuids")]
    pub max_new_puuids_per_run: usize,

    /// Match history page size (1..=100)
    #[serde(default = "default_matches_per_puuid")]
    pub matches_per_puuid: u32,

    /// Derive builds from purchase timelines instead of final items
    #[serde(default)]
    pub use_timeline: bool,

    /// Persist frontier and aggregate after every player
    #[serde(default)]
    pub checkpoint_every_player: bool,

    /// Run the ladder bootstrap even when other seeds exist
    #[serde(default)]
    pub force_bootstrap: bool,

    /// Re-crawl bootstrap players that are already known
    #[serde(default = "default_true")]
    pub force_bootstrap_refresh: bool,

    #[serde(default)]
    pub seed_puuids: Vec<String>,

    #[serde(default)]
    pub seed_match_ids: Vec<String>,
}

fn default_max_matches() -> usize {
    200
}

fn default_max_new_puuids() -> usize {
    500
}

fn default_matches_per_puuid() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_matches_per_run: default_max_matches(),
            max_new_puuids_per_run: default_max_new_puuids(),
            matches_per_puuid: default_matches_per_puuid(),
            use_timeline: false,
            checkpoint_every_player: false,
            force_bootstrap: false,
            force_bootstrap_refresh: true,
            seed_puuids: Vec::new(),
            seed_match_ids: Vec::new(),
        }
    }
}

/// Ranked ladder used to bootstrap an empty frontier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LadderConfig {
    #[serde(default)]
    pub tier: LadderTier,

    #[serde(default = "default_ladder_queue")]
    pub queue: String,

    #[serde(default = "default_ladder_max_players")]
    pub max_players: usize,
}

fn default_ladder_queue() -> String {
    "RANKED_SOLO_5x5".to_string()
}

fn default_ladder_max_players() -> usize {
    50
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            tier: LadderTier::default(),
            queue: default_ladder_queue(),
            max_players: default_ladder_max_players(),
        }
    }
}

/// Finalizer thresholds and scoring parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_min_sample")]
    pub min_sample: u64,

    #[serde(default = "default_min_display_sample")]
    pub min_display_sample: u64,

    #[serde(default = "default_bayes_k")]
    pub bayes_k: f64,

    #[serde(default = "default_prior_winrate")]
    pub prior_winrate: f64,

    #[serde(default = "default_tier_min_picks")]
    pub tier_min_picks: u64,

    #[serde(default)]
    pub min_patch_major: u32,

    #[serde(default)]
    pub patch_bucket: PatchBucket,
}

fn default_min_sample() -> u64 {
    10
}

fn default_min_display_sample() -> u64 {
    5
}

fn default_bayes_k() -> f64 {
    100.0
}

fn default_prior_winrate() -> f64 {
    0.5
}

fn default_tier_min_picks() -> u64 {
    20
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_sample: default_min_sample(),
            min_display_sample: default_min_display_sample(),
            bayes_k: default_bayes_k(),
            prior_winrate: default_prior_winrate(),
            tier_min_picks: default_tier_min_picks(),
            min_patch_major: 0,
            patch_bucket: PatchBucket::default(),
        }
    }
}

/// Local Data Dragon files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Defaults to `<data_dir>/metadata/item.json`
    #[serde(default)]
    pub item_path: Option<PathBuf>,

    /// Defaults to `<data_dir>/metadata/champion.json`
    #[serde(default)]
    pub champion_path: Option<PathBuf>,
}

/// Main pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub riot: RiotConfig,

    #[serde(default)]
    pub crawl: CrawlConfig,

    #[serde(default)]
    pub ladder: LadderConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Destructive state resets; environment only
    #[serde(skip)]
    pub reset: ResetFlags,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            riot: RiotConfig::default(),
            crawl: CrawlConfig::default(),
            ladder: LadderConfig::default(),
            scoring: ScoringConfig::default(),
            metadata: MetadataConfig::default(),
            reset: ResetFlags::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// File (when present) + environment overrides, validated.
    pub fn load(path: Option<&Path>, env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self, env: &HashMap<String, String>) -> Result<(), ConfigError> {
        if let Some(v) = env_string(env, "RIOT_REGIONAL") {
            self.riot.regional = v;
        }
        if let Some(v) = env_string(env, "RIOT_PLATFORM") {
            self.riot.platform = v;
        }
        if let Some(v) = env_string(env, "RIOT_REGIONAL_BASE") {
            self.riot.regional_base = Some(v);
        }
        if let Some(v) = env_string(env, "RIOT_PLATFORM_BASE") {
            self.riot.platform_base = Some(v);
        }
        if let Some(v) = env_parse(env, "HTTP_MAX_ATTEMPTS")? {
            self.riot.max_attempts = v;
        }

        if let Some(v) = env_parse(env, "MAX_MATCHES_PER_RUN")? {
            self.crawl.max_matches_per_run = v;
        }
        if let Some(v) = env_parse(env, "MAX_NEW_PUUIDS_PER_RUN")? {
            self.crawl.max_new_puuids_per_run = v;
        }
        if let Some(v) = env_parse(env, "MATCHES_PER_PUUID")? {
            self.crawl.matches_per_puuid = v;
        }
        if let Some(v) = env_bool(env, "USE_TIMELINE")? {
            self.crawl.use_timeline = v;
        }
        if let Some(v) = env_bool(env, "CHECKPOINT_EVERY_PLAYER")? {
            self.crawl.checkpoint_every_player = v;
        }
        if let Some(v) = env_bool(env, "FORCE_BOOTSTRAP")? {
            self.crawl.force_bootstrap = v;
        }
        if let Some(v) = env_bool(env, "FORCE_BOOTSTRAP_REFRESH")? {
            self.crawl.force_bootstrap_refresh = v;
        }
        if let Some(v) = env_list(env, "SEED_PUUIDS") {
            self.crawl.seed_puuids = v;
        }
        if let Some(v) = env_list(env, "SEED_MATCH_IDS") {
            self.crawl.seed_match_ids = v;
        }

        if let Some(v) = env_parse(env, "LADDER_TIER")? {
            self.ladder.tier = v;
        }
        if let Some(v) = env_string(env, "LADDER_QUEUE") {
            self.ladder.queue = v;
        }
        if let Some(v) = env_parse(env, "LADDER_MAX_PLAYERS")? {
            self.ladder.max_players = v;
        }

        if let Some(v) = env_parse(env, "MIN_SAMPLE")? {
            self.scoring.min_sample = v;
        }
        if let Some(v) = env_parse(env, "MIN_DISPLAY_SAMPLE")? {
            self.scoring.min_display_sample = v;
        }
        if let Some(v) = env_parse(env, "BAYES_K")? {
            self.scoring.bayes_k = v;
        }
        if let Some(v) = env_parse(env, "PRIOR_WINRATE")? {
            self.scoring.prior_winrate = v;
        }
        if let Some(v) = env_parse(env, "TIER_MIN_PICKS")? {
            self.scoring.tier_min_picks = v;
        }
        if let Some(v) = env_parse(env, "MIN_PATCH_MAJOR")? {
            self.scoring.min_patch_major = v;
        }
        if let Some(v) = env_parse(env, "PATCH_BUCKET")? {
            self.scoring.patch_bucket = v;
        }

        if let Some(v) = env_string(env, "ITEM_METADATA_PATH") {
            self.metadata.item_path = Some(PathBuf::from(v));
        }
        if let Some(v) = env_string(env, "CHAMPION_METADATA_PATH") {
            self.metadata.champion_path = Some(PathBuf::from(v));
        }

        self.reset = ResetFlags {
            seen_matches: env_bool(env, "RESET_SEEN_MATCHES")?.unwrap_or(false),
            seen_puuids: env_bool(env, "RESET_SEEN_PUUIDS")?.unwrap_or(false),
            cursors: env_bool(env, "RESET_CURSORS")?.unwrap_or(false),
            pending: env_bool(env, "RESET_PENDING")?.unwrap_or(false),
            aggregate: env_bool(env, "RESET_AGGREGATE")?.unwrap_or(false),
        };

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.crawl.matches_per_puuid) {
            return Err(ConfigError::ValidationError(format!(
                "matches_per_puuid must be between 1 and 100, got {}",
                self.crawl.matches_per_puuid
            )));
        }

        if !self.scoring.bayes_k.is_finite() || self.scoring.bayes_k < 0.0 {
            return Err(ConfigError::ValidationError(
                "bayes_k must be a non-negative number".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.scoring.prior_winrate) {
            return Err(ConfigError::ValidationError(
                "prior_winrate must be between 0 and 1".to_string(),
            ));
        }

        if self.riot.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "HTTP max attempts must be greater than 0".to_string(),
            ));
        }

        if self.riot.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "HTTP timeout must be greater than 0".to_string(),
            ));
        }

        if self.ladder.queue.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "ladder queue must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn storage(&self) -> StorageConfig {
        StorageConfig::new(self.data_dir.clone())
    }

    pub fn item_metadata_path(&self) -> PathBuf {
        self.metadata
            .item_path
            .clone()
            .unwrap_or_else(|| self.storage().metadata_dir().join("item.json"))
    }

    pub fn champion_metadata_path(&self) -> PathBuf {
        self.metadata
            .champion_path
            .clone()
            .unwrap_or_else(|| self.storage().metadata_dir().join("champion.json"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.riot.max_attempts,
            ..RetryPolicy::default()
        }
    }

    /// HTTP client settings for the given API key.
    pub fn riot_client_config(&self, api_key: &str) -> RiotClientConfig {
        let mut config = RiotClientConfig::new(api_key, &self.riot.regional, &self.riot.platform);
        config.regional_base = self
            .riot
            .regional_base
            .clone()
            .unwrap_or_else(|| regional_base_url(&self.riot.regional));
        config.platform_base = self
            .riot
            .platform_base
            .clone()
            .unwrap_or_else(|| platform_base_url(&self.riot.platform));
        config.timeout = Duration::from_secs(self.riot.timeout_seconds);
        config.retry = self.retry_policy();
        config
    }

    pub fn finalize_options(&self) -> FinalizeOptions {
        FinalizeOptions {
            min_sample: self.scoring.min_sample,
            min_display_sample: self.scoring.min_display_sample,
            bayes_k: self.scoring.bayes_k,
            prior_winrate: self.scoring.prior_winrate,
            tier_min_picks: self.scoring.tier_min_picks,
            min_patch_major: self.scoring.min_patch_major,
            patch_bucket: self.scoring.patch_bucket,
            ..FinalizeOptions::default()
        }
    }
}

/// Read and validate the Riot API key from the environment.
pub fn api_key_from_env(env: &HashMap<String, String>) -> Result<String, ConfigError> {
    let key = env_string(env, API_KEY_ENV).ok_or_else(|| ConfigError::MissingEnv(API_KEY_ENV.to_string()))?;
    validate_api_key(&key)?;
    Ok(key)
}

/// Check that a key looks like `RGAPI-<uuid>`.
pub fn validate_api_key(key: &str) -> Result<(), ConfigError> {
    let pattern = Regex::new(API_KEY_PATTERN).map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    if pattern.is_match(key) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue(
            API_KEY_ENV.to_string(),
            "must look like RGAPI-xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx".to_string(),
        ))
    }
}

fn env_string(env: &HashMap<String, String>, key: &str) -> Option<String> {
    env.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(env: &HashMap<String, String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(env, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("{}: {}", raw, e))),
    }
}

fn env_bool(env: &HashMap<String, String>, key: &str) -> Result<Option<bool>, ConfigError> {
    match env_string(env, key) {
        None => Ok(None),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue(
                key.to_string(),
                format!("expected a boolean, got {}", raw),
            )),
        },
    }
}

fn env_list(env: &HashMap<String, String>, key: &str) -> Option<Vec<String>> {
    env_string(env, key).map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
