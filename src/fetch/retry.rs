//! Retry policy for the rate-limited Riot API.
//!
//! 429 responses honour `Retry-After` (seconds or HTTP-date, clamped) and fall
//! back to exponential backoff; 5xx and transport failures back off linearly.
//! Everything else is permanent and returned to the caller on the first try.

use std::future::Future;
use std::time::Duration;

use backoff::future::retry_notify;
use backoff::ExponentialBackoff;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tracing::warn;

use super::FetchError;

/// Retry policy for API requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// First 429 backoff when the server sends no hint
    pub rate_limit_base: Duration,

    /// Upper bound for computed 429 backoff
    pub rate_limit_cap: Duration,

    /// Linear step for 5xx / transport backoff
    pub server_error_step: Duration,

    /// Lower clamp for a server-provided `Retry-After`
    pub min_retry_after: Duration,

    /// Upper clamp for a server-provided `Retry-After`
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            rate_limit_base: Duration::from_millis(1200),
            rate_limit_cap: Duration::from_secs(60),
            server_error_step: Duration::from_millis(1000),
            min_retry_after: Duration::from_secs(5),
            max_retry_after: Duration::from_secs(300),
        }
    }
}

/// A failed attempt that may succeed if repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transient {
    RateLimited { retry_after: Option<Duration> },
    ServerError { status: u16 },
    Transport(String),
}

impl Transient {
    pub fn status(&self) -> Option<u16> {
        match self {
            Transient::RateLimited { .. } => Some(429),
            Transient::ServerError { status } => Some(*status),
            Transient::Transport(_) => None,
        }
    }
}

/// Outcome of one attempt that did not produce a value.
#[derive(Debug)]
pub enum AttemptError {
    Transient(Transient),
    Permanent(FetchError),
}

/// How a response status should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Retry(Transient),
    Permanent,
}

/// Classify a response by status and its `Retry-After` header value.
pub fn classify_status(
    status: StatusCode,
    retry_after: Option<&str>,
    now: DateTime<Utc>,
) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        StatusClass::Retry(Transient::RateLimited {
            retry_after: retry_after.and_then(|v| parse_retry_after(v, now)),
        })
    } else if status.is_server_error() {
        StatusClass::Retry(Transient::ServerError {
            status: status.as_u16(),
        })
    } else {
        StatusClass::Permanent
    }
}

/// Parse a `Retry-After` value: delta-seconds (`"5"`) or an HTTP-date
/// (`"Wed, 21 Oct 2015 07:28:00 GMT"`). Dates in the past yield zero.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    if let Ok(secs) = value.parse::<f64>() {
        if secs.is_finite() && secs >= 0.0 {
            return Some(Duration::from_secs_f64(secs));
        }
        return None;
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    let delta = at.signed_duration_since(now);
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

impl RetryPolicy {
    /// Delay before the next attempt after `attempt` (1-based) failed.
    pub fn delay_for(&self, failure: &Transient, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match failure {
            Transient::RateLimited {
                retry_after: Some(hint),
            } => (*hint).clamp(self.min_retry_after, self.max_retry_after),
            Transient::RateLimited { retry_after: None } => {
                let factor = 2u32.saturating_pow(attempt - 1);
                self.rate_limit_base
                    .saturating_mul(factor)
                    .min(self.rate_limit_cap)
            }
            Transient::ServerError { .. } | Transient::Transport(_) => {
                self.server_error_step.saturating_mul(attempt)
            }
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or the attempt budget is
/// spent. Each transient failure supplies its own delay from `policy`, which
/// overrides the backoff schedule; elapsed time is unbounded.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    url: &str,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    let schedule = ExponentialBackoff {
        max_elapsed_time: None,
        ..Default::default()
    };

    retry_notify(
        schedule,
        || {
            attempt += 1;
            let current = attempt;
            let pending = op();
            async move {
                let failure = match pending.await {
                    Ok(value) => return Ok(value),
                    Err(AttemptError::Permanent(e)) => return Err(backoff::Error::permanent(e)),
                    Err(AttemptError::Transient(t)) => t,
                };

                if current >= max_attempts {
                    return Err(backoff::Error::permanent(FetchError::RetriesExhausted {
                        url: url.to_string(),
                        status: failure.status(),
                        attempts: current,
                    }));
                }

                let delay = policy.delay_for(&failure, current);
                Err(backoff::Error::retry_after(
                    FetchError::Retryable {
                        url: url.to_string(),
                        attempt: current,
                        failure,
                    },
                    delay,
                ))
            }
        },
        |err: FetchError, delay: Duration| {
            warn!("{} (budget {}), retrying in {:?}", err, max_attempts, delay);
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            rate_limit_base: Duration::ZERO,
            rate_limit_cap: Duration::ZERO,
            server_error_step: Duration::ZERO,
            min_retry_after: Duration::ZERO,
            max_retry_after: Duration::from_secs(1),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2015-10-21T07:28:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.rate_limit_base, Duration::from_millis(1200));
        assert_eq!(policy.min_retry_after, Duration::from_secs(5));
        assert_eq!(policy.max_retry_after, Duration::from_secs(300));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("5", now()), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 12 ", now()), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after("1.5", now()), Some(Duration::from_millis(1500)));
        assert_eq!(parse_retry_after("", now()), None);
        assert_eq!(parse_retry_after("soon", now()), None);
        assert_eq!(parse_retry_after("-3", now()), None);
    }

    #[test]
    fn test_parse_retry_after_http_date_matches_seconds() {
        let from_date = parse_retry_after("Wed, 21 Oct 2015 07:28:05 GMT", now());
        let from_secs = parse_retry_after("5", now());

        assert_eq!(from_date, Some(Duration::from_secs(5)));
        assert_eq!(from_date, from_secs);
    }

    #[test]
    fn test_parse_retry_after_past_date_is_zero() {
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:00:00 GMT", now()),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_delay_honours_retry_after_within_clamp() {
        let policy = RetryPolicy::default();

        let five = Transient::RateLimited {
            retry_after: Some(Duration::from_secs(5)),
        };
        assert!(policy.delay_for(&five, 1) >= Duration::from_millis(5000));
        assert_eq!(policy.delay_for(&five, 1), Duration::from_secs(5));

        let tiny = Transient::RateLimited {
            retry_after: Some(Duration::from_secs(1)),
        };
        assert_eq!(policy.delay_for(&tiny, 1), Duration::from_secs(5));

        let huge = Transient::RateLimited {
            retry_after: Some(Duration::from_secs(3600)),
        };
        assert_eq!(policy.delay_for(&huge, 1), Duration::from_secs(300));
    }

    #[test]
    fn test_delay_without_hint_grows() {
        let policy = RetryPolicy::default();
        let no_hint = Transient::RateLimited { retry_after: None };

        assert_eq!(policy.delay_for(&no_hint, 1), Duration::from_millis(1200));
        assert_eq!(policy.delay_for(&no_hint, 2), Duration::from_millis(2400));
        assert_eq!(policy.delay_for(&no_hint, 3), Duration::from_millis(4800));
        assert_eq!(policy.delay_for(&no_hint, 30), Duration::from_secs(60));
    }

    #[test]
    fn test_delay_server_error_linear() {
        let policy = RetryPolicy::default();
        let err = Transient::ServerError { status: 503 };

        assert_eq!(policy.delay_for(&err, 1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(&err, 3), Duration::from_secs(3));
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(
            classify_status(StatusCode::OK, None, now()),
            StatusClass::Success
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, Some("7"), now()),
            StatusClass::Retry(Transient::RateLimited {
                retry_after: Some(Duration::from_secs(7))
            })
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, None, now()),
            StatusClass::Retry(Transient::RateLimited { retry_after: None })
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY, None, now()),
            StatusClass::Retry(Transient::ServerError { status: 502 })
        );
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN, None, now()),
            StatusClass::Permanent
        );
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND, None, now()),
            StatusClass::Permanent
        );
    }

    #[tokio::test]
    async fn test_with_retry_recovers_after_rate_limit() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_policy(), "https://example.test/a", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(AttemptError::Transient(Transient::RateLimited {
                        retry_after: None,
                    }))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_exhausts_budget() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&fast_policy(), "https://example.test/b", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::Transient(Transient::ServerError { status: 503 })) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        match result {
            Err(FetchError::RetriesExhausted {
                status, attempts, ..
            }) => {
                assert_eq!(status, Some(503));
                assert_eq!(attempts, 5);
            }
            other => panic!("Expected RetriesExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_with_retry_permanent_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&fast_policy(), "https://example.test/c", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(AttemptError::Permanent(FetchError::HttpStatus {
                    status: 403,
                    url: "https://example.test/c".to_string(),
                    body: "{\"status\":{\"message\":\"Forbidden\"}}".to_string(),
                }))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match result {
            Err(FetchError::HttpStatus { status, body, .. }) => {
                assert_eq!(status, 403);
                assert!(body.contains("Forbidden"));
            }
            other => panic!("Expected HttpStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_with_retry_single_attempt_budget() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..fast_policy()
        };
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&policy, "https://example.test/e", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::Transient(Transient::RateLimited { retry_after: None })) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match result {
            Err(FetchError::RetriesExhausted {
                url,
                status,
                attempts,
            }) => {
                assert_eq!(url, "https://example.test/e");
                assert_eq!(status, Some(429));
                assert_eq!(attempts, 1);
            }
            other => panic!("Expected RetriesExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_with_retry_permanent_after_transient_stops() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&fast_policy(), "https://example.test/f", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(AttemptError::Transient(Transient::Transport(
                        "connection reset".to_string(),
                    )))
                } else {
                    Err(AttemptError::Permanent(FetchError::HttpStatus {
                        status: 404,
                        url: "https://example.test/f".to_string(),
                        body: String::new(),
                    }))
                }
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(
            result,
            Err(FetchError::HttpStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_with_retry_sleeps_for_hint() {
        let policy = fast_policy();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        with_retry(&policy, "https://example.test/d", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(AttemptError::Transient(Transient::RateLimited {
                        retry_after: Some(Duration::from_millis(50)),
                    }))
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
