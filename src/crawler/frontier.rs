//! Breadth-first frontier of pending URLs
//!
//! The frontier is a FIFO queue: entries are dequeued in the order they were
//! enqueued, which yields breadth-first traversal from the seed. Depth is
//! recorded for reporting only and never reorders the queue.

use crate::state::DedupStore;
use crate::url::{canonicalize, in_scope};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierEntry {
    /// Canonical URL
    pub url: String,

    /// Number of links followed from the seed
    pub depth: u32,

    /// Page the URL was discovered on (`None` for the seed)
    #[serde(default)]
    pub referrer: Option<String>,
}

/// FIFO queue of pending URLs restricted to one domain
///
/// Besides the queue itself the frontier tracks which canonical URLs are
/// currently pending, so a URL discovered twice before it is fetched is only
/// queued once.
#[derive(Debug, Clone)]
pub struct Frontier {
    /// Domain pattern URLs must match (see `url::matches_domain`)
    domain: String,

    /// Pending entries in insertion order
    queue: VecDeque<FrontierEntry>,

    /// Canonical URLs currently in `queue`
    pending: HashSet<String>,
}

impl Frontier {
    /// Creates an empty frontier for the given domain pattern
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_lowercase(),
            queue: VecDeque::new(),
            pending: HashSet::new(),
        }
    }

    /// Rebuilds a frontier from checkpointed entries
    ///
    /// Entries are re-admitted through [`Frontier::enqueue`] in their saved
    /// order, so anything already seen, duplicated, malformed or outside the
    /// domain is dropped.
    pub fn restore(domain: &str, entries: Vec<FrontierEntry>, dedup: &DedupStore) -> Self {
        let mut frontier = Self::new(domain);

        for entry in entries {
            match Url::parse(&entry.url) {
                Ok(url) => {
                    if !frontier.enqueue(&url, entry.depth, entry.referrer.as_deref(), dedup) {
                        tracing::debug!("Dropped restored frontier entry {}", entry.url);
                    }
                }
                Err(e) => {
                    tracing::warn!("Dropped unparsable frontier entry {}: {}", entry.url, e);
                }
            }
        }

        frontier
    }

    /// Adds a URL to the back of the queue
    ///
    /// This is a no-op when the URL is outside the domain, cannot be
    /// canonicalized, was already seen, or is already pending.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL as discovered
    /// * `depth` - Discovery depth (seed is 0)
    /// * `referrer` - Canonical URL of the page the link was found on
    /// * `dedup` - Seen-URL store to consult
    ///
    /// # Returns
    ///
    /// * `true` - The URL was queued
    /// * `false` - The URL was filtered out
    pub fn enqueue(
        &mut self,
        url: &Url,
        depth: u32,
        referrer: Option<&str>,
        dedup: &DedupStore,
    ) -> bool {
        if !in_scope(url, &self.domain) {
            return false;
        }

        let canonical = match canonicalize(url) {
            Ok(canonical) => canonical.to_string(),
            Err(_) => return false,
        };

        if dedup.is_seen_url(&canonical) || self.pending.contains(&canonical) {
            return false;
        }

        self.pending.insert(canonical.clone());
        self.queue.push_back(FrontierEntry {
            url: canonical,
            depth,
            referrer: referrer.map(str::to_string),
        });
        true
    }

    /// Removes and returns the oldest entry
    pub fn dequeue(&mut self) -> Option<FrontierEntry> {
        let entry = self.queue.pop_front()?;
        self.pending.remove(&entry.url);
        Some(entry)
    }

    /// Puts an entry back at the head of the queue
    ///
    /// Used when processing of a dequeued entry is abandoned so the entry is
    /// the first one fetched on resume.
    pub fn push_front(&mut self, entry: FrontierEntry) {
        if self.pending.insert(entry.url.clone()) {
            self.queue.push_front(entry);
        }
    }

    /// Drops a pending canonical URL wherever it sits in the queue
    pub fn remove(&mut self, canonical: &str) -> bool {
        if !self.pending.remove(canonical) {
            return false;
        }
        self.queue.retain(|entry| entry.url != canonical);
        true
    }

    /// Returns true if the canonical URL is pending
    pub fn contains(&self, canonical: &str) -> bool {
        self.pending.contains(canonical)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Pending entries in dequeue order
    pub fn entries(&self) -> impl Iterator<Item = &FrontierEntry> {
        self.queue.iter()
    }

    /// The domain pattern this frontier admits
    pub fn domain(&self) -> &str {
        &self.domain
    }
}
