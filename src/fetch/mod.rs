//! Riot API client.
//!
//! All calls go through [`RiotApi`] so the crawl and cache layers can be
//! exercised against in-memory fakes. [`RiotClient`] is the HTTP
//! implementation: it authenticates with `X-Riot-Token` and retries rate
//! limits and server errors per [`RetryPolicy`].

pub mod retry;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::models::{LadderTier, LeagueList, MatchId, Summoner};

pub use retry::{
    classify_status, parse_retry_after, with_retry, AttemptError, RetryPolicy, StatusClass,
    Transient,
};

/// Errors that can occur when talking to the Riot API.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus { status: u16, url: String, body: String },

    #[error("Attempt {attempt} for {url} failed: {failure:?}")]
    Retryable {
        url: String,
        attempt: u32,
        failure: Transient,
    },

    #[error("Gave up on {url} after {attempts} attempts (last status {status:?})")]
    RetriesExhausted {
        url: String,
        status: Option<u16>,
        attempts: u32,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Routing partition for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// Regional routing (`americas`, `europe`, ...): match-v5
    Regional,
    /// Platform routing (`na1`, `euw1`, ...): league-v4, summoner-v4
    Platform,
}

/// Read-only view of the Riot endpoints the pipeline uses.
#[async_trait]
pub trait RiotApi: Send + Sync {
    /// A page of match ids for a player, newest first.
    async fn match_ids_by_puuid(
        &self,
        puuid: &str,
        start: u32,
        count: u32,
    ) -> Result<Vec<MatchId>, FetchError>;

    /// Raw match-v5 body.
    async fn match_json(&self, match_id: &str) -> Result<String, FetchError>;

    /// Raw match-v5 timeline body.
    async fn timeline_json(&self, match_id: &str) -> Result<String, FetchError>;

    /// Apex ladder listing for a queue.
    async fn league_list(&self, tier: LadderTier, queue: &str) -> Result<LeagueList, FetchError>;

    /// Resolve an encrypted summoner id.
    async fn summoner_by_id(&self, summoner_id: &str) -> Result<Summoner, FetchError>;
}

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct RiotClientConfig {
    pub api_key: String,

    /// e.g. `https://americas.api.riotgames.com/lol`
    pub regional_base: String,

    /// e.g. `https://na1.api.riotgames.com/lol`
    pub platform_base: String,

    /// Per-request timeout
    pub timeout: Duration,

    pub user_agent: String,

    pub retry: RetryPolicy,
}

impl RiotClientConfig {
    pub fn new(api_key: impl Into<String>, regional: &str, platform: &str) -> Self {
        Self {
            api_key: api_key.into(),
            regional_base: regional_base_url(regional),
            platform_base: platform_base_url(platform),
            timeout: Duration::from_secs(30),
            user_agent: format!("meta-builds/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryPolicy::default(),
        }
    }
}

/// Default base URL for a regional route.
pub fn regional_base_url(regional: &str) -> String {
    format!("https://{}.api.riotgames.com/lol", regional)
}

/// Default base URL for a platform route.
pub fn platform_base_url(platform: &str) -> String {
    format!("https://{}.api.riotgames.com/lol", platform)
}

/// HTTP implementation of [`RiotApi`].
pub struct RiotClient {
    client: Client,
    regional_base: String,
    platform_base: String,
    retry: RetryPolicy,
}

impl RiotClient {
    pub fn new(config: RiotClientConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();

        let mut token = HeaderValue::from_str(&config.api_key)
            .map_err(|_| FetchError::InvalidHeader("X-Riot-Token".to_string()))?;
        token.set_sensitive(true);
        headers.insert("X-Riot-Token", token);

        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("meta-builds")),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            regional_base: config.regional_base.trim_end_matches('/').to_string(),
            platform_base: config.platform_base.trim_end_matches('/').to_string(),
            retry: config.retry,
        })
    }

    /// Build the full URL for an endpoint path such as `/match/v5/matches/X`.
    pub fn url_for(
        &self,
        partition: Partition,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Url, FetchError> {
        let base = match partition {
            Partition::Regional => &self.regional_base,
            Partition::Platform => &self.platform_base,
        };

        let raw = format!("{}{}", base, path);
        let mut url = Url::parse(&raw).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// GET an endpoint and return the body text, retrying transient failures.
    pub async fn get_text(
        &self,
        partition: Partition,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<String, FetchError> {
        let url = self.url_for(partition, path, query)?;
        debug!("GET {}", url);

        with_retry(&self.retry, url.as_str(), || {
            let request = self.client.get(url.clone());
            let url = url.to_string();
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| AttemptError::Transient(Transient::Transport(e.to_string())))?;

                let status = response.status();
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_string());

                match classify_status(status, retry_after.as_deref(), Utc::now()) {
                    StatusClass::Success => response
                        .text()
                        .await
                        .map_err(|e| AttemptError::Transient(Transient::Transport(e.to_string()))),
                    StatusClass::Retry(transient) => Err(AttemptError::Transient(transient)),
                    StatusClass::Permanent => {
                        let body = response.text().await.unwrap_or_default();
                        Err(AttemptError::Permanent(FetchError::HttpStatus {
                            status: status.as_u16(),
                            url,
                            body,
                        }))
                    }
                }
            }
        })
        .await
    }

    /// GET an endpoint and deserialize the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        partition: Partition,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let body = self.get_text(partition, path, query).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RiotApi for RiotClient {
    async fn match_ids_by_puuid(
        &self,
        puuid: &str,
        start: u32,
        count: u32,
    ) -> Result<Vec<MatchId>, FetchError> {
        self.get_json(
            Partition::Regional,
            &format!("/match/v5/matches/by-puuid/{}/ids", puuid),
            &[("start", start.to_string()), ("count", count.to_string())],
        )
        .await
    }

    async fn match_json(&self, match_id: &str) -> Result<String, FetchError> {
        self.get_text(
            Partition::Regional,
            &format!("/match/v5/matches/{}", match_id),
            &[],
        )
        .await
    }

    async fn timeline_json(&self, match_id: &str) -> Result<String, FetchError> {
        self.get_text(
            Partition::Regional,
            &format!("/match/v5/matches/{}/timeline", match_id),
            &[],
        )
        .await
    }

    async fn league_list(&self, tier: LadderTier, queue: &str) -> Result<LeagueList, FetchError> {
        self.get_json(
            Partition::Platform,
            &format!("/league/v4/{}leagues/by-queue/{}", tier.path_segment(), queue),
            &[],
        )
        .await
    }

    async fn summoner_by_id(&self, summoner_id: &str) -> Result<Summoner, FetchError> {
        self.get_json(
            Partition::Platform,
            &format!("/summoner/v4/summoners/{}", summoner_id),
            &[],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "RGAPI-00000000-0000-0000-0000-000000000000";

    fn client() -> RiotClient {
        RiotClient::new(RiotClientConfig::new(KEY, "americas", "na1")).unwrap()
    }

    #[test]
    fn test_base_urls() {
        assert_eq!(
            regional_base_url("europe"),
            "https://europe.api.riotgames.com/lol"
        );
        assert_eq!(platform_base_url("euw1"), "https://euw1.api.riotgames.com/lol");
    }

    #[test]
    fn test_url_for_regional_with_query() {
        let url = client()
            .url_for(
                Partition::Regional,
                "/match/v5/matches/by-puuid/abc-123/ids",
                &[("start", "40".to_string()), ("count", "20".to_string())],
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://americas.api.riotgames.com/lol/match/v5/matches/by-puuid/abc-123/ids?start=40&count=20"
        );
    }

    #[test]
    fn test_url_for_platform() {
        let url = client()
            .url_for(
                Partition::Platform,
                "/league/v4/challengerleagues/by-queue/RANKED_SOLO_5x5",
                &[],
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://na1.api.riotgames.com/lol/league/v4/challengerleagues/by-queue/RANKED_SOLO_5x5"
        );
    }

    #[test]
    fn test_base_override_trailing_slash() {
        let mut config = RiotClientConfig::new(KEY, "americas", "na1");
        config.regional_base = "http://127.0.0.1:8080/lol/".to_string();
        let client = RiotClient::new(config).unwrap();

        let url = client
            .url_for(Partition::Regional, "/match/v5/matches/NA1_1", &[])
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/lol/match/v5/matches/NA1_1");
    }

    #[test]
    fn test_invalid_key_header_rejected() {
        let result = RiotClient::new(RiotClientConfig::new("bad\nkey", "americas", "na1"));
        assert!(matches!(result, Err(FetchError::InvalidHeader(_))));
    }
}
