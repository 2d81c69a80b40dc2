//! Retry-After aware retry policy for outgoing requests.
//!
//! Cost Management throttles aggressively (HTTP 429) and tells the caller how
//! long to back off, either with the standard `Retry-After` header or with
//! one of its `x-ms-ratelimit-*-retry-after` headers. This policy honours
//! those hints and falls back to exponential backoff with jitter otherwise.

use std::time::Duration;

use azcost_core::RetrySettings;
use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, Response};
use tracing::{debug, info, warn};

use crate::error::{ApiError, Result};

/// Retry policy applied to every API call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum retries after the first attempt.
    pub max_retries: u32,
    /// Base delay when the server gives no hint.
    pub default_delay: Duration,
    /// Cap on any single wait.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    /// Build from config.
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            default_delay: Duration::from_secs(settings.default_delay_secs),
            max_delay: Duration::from_secs(settings.max_delay_secs),
        }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            default_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// A server hint wins (capped at `max_delay`). Without one the delay grows
    /// exponentially from `default_delay` with ±25% jitter.
    pub fn delay_for_attempt(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint.min(self.max_delay);
        }

        let base = self.default_delay.as_secs_f64() * 2f64.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        if capped <= 0.0 {
            return Duration::ZERO;
        }

        let jitter_range = capped * 0.25;
        let jitter = rand::rng().random_range(-jitter_range..jitter_range);
        let delay = (capped + jitter).max(0.0).min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(delay).unwrap_or(self.max_delay)
    }

    /// Send a request, retrying throttled and transient failures.
    ///
    /// `build` is called once per attempt because a `RequestBuilder` cannot be
    /// reused. Returns the successful response, or the last failure as an
    /// [`ApiError`].
    pub async fn execute<F>(&self, mut build: F) -> Result<Response>
    where
        F: FnMut() -> RequestBuilder,
    {
        let mut attempt: u32 = 0;

        loop {
            let outcome = match build().send().await {
                Ok(response) if response.status().is_success() => {
                    if attempt > 0 {
                        info!(target: "azcost::api", attempts = attempt + 1, "request succeeded after retry");
                    }
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let url = strip_query(response.url());
                    let hint = retry_after_header(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    ApiError::from_http_status(status, url, &body, hint.as_deref())
                }
                Err(e) => ApiError::from_transport(e),
            };

            if !outcome.is_retryable() || attempt >= self.max_retries {
                if attempt > 0 {
                    warn!(target: "azcost::api", attempts = attempt + 1, error = %outcome, "request failed after all retries");
                }
                return Err(outcome);
            }

            let hint = outcome.retry_after_secs().map(Duration::from_secs);
            let delay = self.delay_for_attempt(attempt, hint);
            debug!(
                target: "azcost::api",
                attempt = attempt + 1,
                status = outcome.status(),
                delay_ms = delay.as_millis() as u64,
                "retrying request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Find a retry hint among the response headers.
///
/// `Retry-After` first, then any Azure `x-ms-ratelimit-*-retry-after` header.
pub fn retry_after_header(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(value.to_string());
    }

    headers
        .iter()
        .filter(|(name, _)| {
            let name = name.as_str();
            name.starts_with("x-ms-ratelimit-") && name.ends_with("retry-after")
        })
        .filter_map(|(_, value)| value.to_str().ok())
        .filter_map(|v| v.trim().parse::<u64>().ok())
        .max()
        .map(|secs| secs.to_string())
}

fn strip_query(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
