// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use backoff::ExponentialBackoff;

use crate::error::Result;
use crate::models::CrawlerConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig, user_agent: &str) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .gzip(true)
        .build()?;
    Ok(client)
}

/// Exponential backoff policy for transient API failures.
pub fn backoff_policy(config: &CrawlerConfig) -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: Duration::from_millis(config.backoff_initial_ms),
        initial_interval: Duration::from_millis(config.backoff_initial_ms),
        max_interval: Duration::from_millis(config.backoff_max_ms),
        max_elapsed_time: None,
        ..ExponentialBackoff::default()
    }
}

/// Seconds to wait before the rate-limit window resets, from response headers.
///
/// Returns `None` while requests remain in the current window.
pub fn rate_limit_wait(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
    };

    let remaining = read("x-ratelimit-remaining")?;
    if remaining >= 1.0 {
        return None;
    }
    let reset = read("x-ratelimit-reset").unwrap_or(1.0).max(1.0);
    Some(Duration::from_secs_f64(reset))
}

/// Delay requested by a `Retry-After` header, in seconds form only.
pub fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
