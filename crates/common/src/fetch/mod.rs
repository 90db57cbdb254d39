//! Resilient HTTP fetcher for NCBI E-utilities
//!
//! Provides:
//! - A single GET with structured error classification
//! - Bounded retry with exponential backoff when the index answers 429
//! - Client-side request pacing (anonymous vs. API-key rate limits)
//! - JSON or raw-text payloads depending on the response content type
//!
//! Only rate limiting is retried. Timeouts, connection failures and any other
//! non-success status are returned to the caller on the first occurrence.

use crate::config::EutilsConfig;
use crate::errors::AppError;
use crate::metrics;
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::Rng;
use reqwest::{header::CONTENT_TYPE, StatusCode};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

/// Outgoing request pacer
pub type PacingLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Classified failure of a remote fetch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("client error: {0}")]
    Client(String),
}

impl FetchError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Connection(_) => "connection",
            FetchError::Client(_) => "client",
        }
    }

    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else {
            FetchError::Client(err.to_string())
        }
    }
}

/// Retry schedule for rate-limited requests
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for every further retry
    pub base_delay: Duration,
    /// Upper bound of the uniform jitter added to every delay
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &EutilsConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_jitter: Duration::from_millis(config.backoff_jitter_ms),
        }
    }

    /// Wait before zero-based attempt `attempt` (attempt >= 1):
    /// `base * 2^(attempt-1) + uniform(0, max_jitter)`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let scaled = self.base_delay.saturating_mul(1u32 << exponent);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        scaled + jitter
    }
}

/// HTTP GET client with rate-limit retry and request pacing
#[derive(Clone)]
pub struct ResilientFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
    api_key: Option<String>,
    pacer: Option<Arc<PacingLimiter>>,
}

impl ResilientFetcher {
    /// Create a fetcher without pacing or credentials
    pub fn new(policy: RetryPolicy) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("cocite/{}", crate::VERSION))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            policy,
            api_key: None,
            pacer: None,
        })
    }

    /// Create a fetcher from the E-utilities configuration
    pub fn from_config(config: &EutilsConfig) -> Result<Self, AppError> {
        let fetcher = Self::new(RetryPolicy::from_config(config))?
            .with_api_key(config.api_key.clone())
            .with_pacing(config.requests_per_second());

        if fetcher.api_key.is_none() {
            warn!(
                rps = config.anonymous_rps,
                "NCBI API key not configured, using anonymous request pacing"
            );
        }
        Ok(fetcher)
    }

    /// Append `api_key` to every request
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Pace outgoing requests to `requests_per_second`
    pub fn with_pacing(mut self, requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        self.pacer = Some(Arc::new(RateLimiter::direct(Quota::per_second(rate))));
        self
    }

    /// GET `url` with `params`, retrying only on 429
    #[instrument(skip(self, params, timeout))]
    pub async fn fetch(
        &self,
        url: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<Value, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self.policy.backoff(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited (429), backing off"
                );
                metrics::record_fetch_retry();
                tokio::time::sleep(delay).await;
            }

            match self.send_once(url, params, timeout).await {
                Err(FetchError::RateLimited { .. }) => continue,
                Ok(value) => {
                    metrics::record_fetch("ok");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(error = %e, kind = e.kind(), "Fetch failed");
                    metrics::record_fetch(e.kind());
                    return Err(e);
                }
            }
        }

        error!(max_attempts, "Max retries reached, giving up");
        metrics::record_fetch("rate_limited");
        Err(FetchError::RateLimited {
            attempts: max_attempts,
        })
    }

    async fn send_once(
        &self,
        url: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<Value, FetchError> {
        if let Some(pacer) = &self.pacer {
            pacer.until_ready().await;
        }

        let mut request = self.client.get(url).query(params).timeout(timeout);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited { attempts: 1 });
        }
        if !status.is_success() {
            return Err(FetchError::Client(format!("HTTP {}", status)));
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout))?;

        if is_json {
            debug!(bytes = body.len(), "JSON response received");
            serde_json::from_str(&body)
                .map_err(|e| FetchError::Client(format!("invalid JSON body: {}", e)))
        } else {
            debug!(bytes = body.len(), "Text response received");
            Ok(Value::String(body))
        }
    }
}

/// Decode a payload that may have arrived as text
///
/// Returns `None` when a text payload is not valid JSON.
pub fn decode_payload(value: Value) -> Option<Value> {
    match value {
        Value::String(text) => serde_json::from_str(&text).ok(),
        other => Some(other),
    }
}
