//! Robots.txt caching implementation
//!
//! One entry per origin (`scheme://host:port`). Entries older than 24 hours
//! are treated as stale so long-running crawls pick up changes.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use url::Url;

/// Cached robots.txt data for an origin
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Creates a new CachedRobots stamped with the current time
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Returns true if the entry is older than 24 hours
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::hours(24)
    }
}

/// Per-session robots.txt cache keyed by origin
#[derive(Debug, Clone, Default)]
pub struct RobotsCache {
    entries: HashMap<String, CachedRobots>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the fresh entry for the URL's origin, if any
    pub fn get(&self, url: &Url) -> Option<&ParsedRobots> {
        self.entries
            .get(&origin_key(url))
            .filter(|cached| !cached.is_stale())
            .map(|cached| &cached.content)
    }

    /// Stores robots.txt for the URL's origin, replacing any previous entry
    pub fn insert(&mut self, url: &Url, robots: ParsedRobots) {
        self.entries
            .insert(origin_key(url), CachedRobots::new(robots));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache key for a URL: scheme, host and effective port
pub fn origin_key(url: &Url) -> String {
    format!(
        "{}://{}:{}",
        url.scheme(),
        url.host_str().unwrap_or("").to_lowercase(),
        url.port_or_known_default().unwrap_or(0)
    )
}
