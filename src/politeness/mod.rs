//! Politeness controller
//!
//! Groups everything that keeps the crawler a good citizen: the shared
//! inter-request timer, the per-session robots.txt cache and the retry
//! policy for transient failures.

mod rate_limit;
mod retry;

pub use rate_limit::RateLimiter;
pub use retry::{parse_retry_after, ExponentialBackoff, RetryPolicy};

use crate::config::Config;
use crate::robots::{fetch_robots, product_token, RobotsCache};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Owns the rate limiter, robots cache and retry policy of one session
#[derive(Debug, Clone)]
pub struct PolitenessController {
    limiter: RateLimiter,
    robots: RobotsCache,
    retry: RetryPolicy,
    respect_robots: bool,

    /// Robots.txt product token derived from the user agent
    agent: String,
}

impl PolitenessController {
    pub fn new(config: &Config) -> Self {
        Self {
            limiter: RateLimiter::new(config.politeness.rate_limit()),
            robots: RobotsCache::new(),
            retry: RetryPolicy::from_config(&config.politeness),
            respect_robots: config.crawler.respect_robots,
            agent: product_token(&config.politeness.user_agent).to_string(),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn limiter_mut(&mut self) -> &mut RateLimiter {
        &mut self.limiter
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn respects_robots(&self) -> bool {
        self.respect_robots
    }

    /// Checks robots.txt rules for `url`, fetching the origin's file on first use
    ///
    /// The robots.txt request itself is paced by the rate limiter. A
    /// `Crawl-delay` for our agent raises the inter-request delay for the
    /// rest of the session. Always true when robots are not respected.
    pub async fn is_allowed(&mut self, client: &Client, url: &Url) -> bool {
        if !self.respect_robots {
            return true;
        }

        if self.robots.get(url).is_none() {
            self.limiter.wait().await;
            let robots = fetch_robots(client, url).await;
            self.limiter.mark_completed();

            if let Some(delay) = robots
                .crawl_delay(&self.agent)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            {
                self.limiter.raise_min_delay(delay);
            }

            self.robots.insert(url, robots);
        }

        self.robots
            .get(url)
            .map_or(true, |robots| robots.is_allowed(url.as_str(), &self.agent))
    }
}
