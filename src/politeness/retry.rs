//! Retry and backoff policy for transient fetch failures

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::config::PolitenessConfig;

/// Exponential backoff: `base * 2^attempt`, capped at `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    pub const fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before retry number `attempt` (0 for the first retry)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(20));
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// How often, and after how long, transient failures are retried
///
/// Only transient failures (timeouts, connection failures, HTTP 5xx) are
/// candidates; the fetcher decides which outcomes those are. HTTP 4xx is
/// never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    max_retries: u32,

    /// Backoff used when the server gives no `Retry-After`
    backoff: ExponentialBackoff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: ExponentialBackoff) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Builds the policy from the politeness settings
    pub fn from_config(config: &PolitenessConfig) -> Self {
        Self::new(
            config.max_retries,
            ExponentialBackoff::new(config.backoff_base(), config.backoff_max()),
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns true if another retry is allowed after `retries` retries
    pub fn should_retry(&self, retries: u32) -> bool {
        retries < self.max_retries
    }

    /// Delay before retry number `attempt`
    ///
    /// A `Retry-After` value from the server is used verbatim in place of the
    /// computed backoff.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| self.backoff.delay(attempt))
    }
}

/// Parses a `Retry-After` header value
///
/// Accepts both forms allowed by HTTP: a number of seconds, or an HTTP-date.
/// A date in the past yields a zero delay.
///
/// # Arguments
///
/// * `value` - Raw header value
/// * `now` - Reference time for the HTTP-date form
///
/// # Returns
///
/// * `Some(Duration)` - How long the server asked us to wait
/// * `None` - The value is not a valid `Retry-After`
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let wait = date.with_timezone(&Utc) - now;
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}
