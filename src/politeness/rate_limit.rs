//! Inter-request delay enforcement
//!
//! The limiter measures from the moment the previous request *completed*, so
//! a slow response never shortens the pause before the next one.

use std::time::{Duration, Instant};

/// Single shared timer pacing every outbound request of a session
///
/// With one worker the session awaits [`RateLimiter::wait`] before each
/// request, which serializes requests. A multi-worker session would replace
/// this with a token source shared by all workers.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Minimum time between one request completing and the next starting
    min_delay: Duration,

    /// When the last request completed
    last_completed: Option<Instant>,
}

impl RateLimiter {
    /// Creates a limiter that has not seen any request yet
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_completed: None,
        }
    }

    /// The effective minimum delay
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Raises the minimum delay to `delay` if it is larger
    ///
    /// Used to apply a robots.txt `Crawl-delay`; the configured delay is a
    /// floor that a site can only lengthen.
    pub fn raise_min_delay(&mut self, delay: Duration) {
        if delay > self.min_delay {
            tracing::info!(
                "Raising inter-request delay from {:?} to {:?}",
                self.min_delay,
                delay
            );
            self.min_delay = delay;
        }
    }

    /// Calculates the time until the next request may start
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        let last = self.last_completed?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.min_delay {
            Some(self.min_delay - elapsed)
        } else {
            None
        }
    }

    /// Sleeps until the next request may start
    pub async fn wait(&self) {
        if let Some(delay) = self.time_until_ready(Instant::now()) {
            tracing::trace!("Rate limiter sleeping {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Records that a request has just completed
    pub fn mark_completed(&mut self) {
        self.mark_completed_at(Instant::now());
    }

    /// Records that a request completed at `at`
    pub fn mark_completed_at(&mut self, at: Instant) {
        self.last_completed = Some(at);
    }
}
