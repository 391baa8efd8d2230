//! Statistics calculation engine.
//!
//! Computes derived metrics from cached match data:
//! - Build signatures from final items or purchase timelines
//! - Incremental per-build aggregation
//! - Bayesian-smoothed meta build rankings
//! - Champion tier lists

pub mod aggregate;
pub mod builds;
pub mod finalize;
pub mod tiers;

use crate::models::Tier;

pub use aggregate::{AggregateKey, AggregationStore, Bucket};
pub use builds::{build_signature, BootsSet, ExtractedBuild};
pub use finalize::{FinalizeError, FinalizeOptions, FinalizeOutput, FinalizeStats, Finalizer};
pub use tiers::TierCounter;

/// Calculate tier from a rank percentile.
pub fn calculate_tier(percentile: f64) -> Tier {
    Tier::from_percentile(percentile)
}

/// Calculate raw win rate.
pub fn calculate_win_rate(wins: u64, games: u64) -> f64 {
    if games == 0 {
        0.0
    } else {
        wins as f64 / games as f64
    }
}

/// Bayesian-shrunk win rate: `(wins + k * prior) / (games + k)`.
///
/// Pulls small samples toward `prior`; with `k = 0` it is the raw win rate.
pub fn calculate_bayes_score(wins: u64, games: u64, k: f64, prior: f64) -> f64 {
    let denominator = games as f64 + k;
    if denominator <= 0.0 {
        return prior;
    }
    (wins as f64 + k * prior) / denominator
}

/// Population z-scores. All zeros when the spread is zero.
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let sd = variance.sqrt();

    if sd < f64::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / sd).collect()
}

/// Percentile of each score's ascending rank, `rank / (n - 1)`.
///
/// Equal scores keep input order. A single score is at the top (1.0).
pub fn rank_percentiles(scores: &[f64]) -> Vec<f64> {
    let n = scores.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![1.0];
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]).then(a.cmp(&b)));

    let mut percentiles = vec![0.0; n];
    for (rank, idx) in order.into_iter().enumerate() {
        percentiles[idx] = rank as f64 / (n - 1) as f64;
    }
    percentiles
}

/// Round to 4 decimal places for output.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
