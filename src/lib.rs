//! # Meta Builds
//!
//! Riot match crawler and meta build aggregator for League of Legends stats
//! pages.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (matches, timelines, ladder, outputs)
//! - **fetch**: Rate-limited Riot API client
//! - **storage**: Data directory operations (match cache, frontier, JSONL)
//! - **calculate**: Build signatures, aggregation, meta builds and tiers
//! - **crawl**: Budget-bounded frontier crawl and ladder bootstrap
//! - **config**: Configuration loading and validation
//! - **cli**: Shared command-line flags and logging setup

pub mod calculate;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod fetch;
pub mod models;
pub mod storage;

pub use models::*;
