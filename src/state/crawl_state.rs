use crate::crawler::{Frontier, FrontierEntry};
use crate::state::DedupStore;
use url::Url;

/// Everything a crawl session mutates while running
///
/// Owned exclusively by the crawl session. The checkpoint store only reads
/// or rebuilds its serialized form (`frontier.json` and `seen.txt`).
#[derive(Debug, Clone)]
pub struct CrawlState {
    /// Pending URLs in breadth-first order
    pub frontier: Frontier,

    /// Seen canonical URLs and content hashes
    pub dedup: DedupStore,

    /// Pages fetched so far, including those restored from a checkpoint
    pages_fetched: u64,
}

impl CrawlState {
    /// Creates a fresh state whose frontier holds only the seed at depth 0
    pub fn seeded(domain: &str, seed: &Url) -> Self {
        let dedup = DedupStore::new();
        let mut frontier = Frontier::new(domain);
        frontier.enqueue(seed, 0, None, &dedup);

        Self {
            frontier,
            dedup,
            pages_fetched: 0,
        }
    }

    /// Rebuilds a state from a restored frontier and dedup store
    ///
    /// The page counter resumes at the number of seen URLs, since every seen
    /// URL was counted when it was fetched.
    pub fn restored(frontier: Frontier, dedup: DedupStore) -> Self {
        let pages_fetched = dedup.seen_url_count() as u64;
        Self {
            frontier,
            dedup,
            pages_fetched,
        }
    }

    /// Number of pages fetched so far
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Records that the canonical URL has been fetched and processed
    ///
    /// # Returns
    ///
    /// * `true` - The URL was newly marked seen and the counter advanced
    /// * `false` - The URL was already seen; nothing changed
    pub fn record_fetched(&mut self, canonical: &str) -> bool {
        if self.dedup.mark_seen_url(canonical) {
            self.pages_fetched += 1;
            true
        } else {
            false
        }
    }

    /// Records the canonical URL a fetched page was redirected to
    ///
    /// The target's content has been fetched along with the original URL,
    /// so it is counted and marked seen too, and leaves the frontier if it
    /// was pending.
    pub fn record_redirect_target(&mut self, canonical: &str) -> bool {
        self.frontier.remove(canonical);
        self.record_fetched(canonical)
    }

    /// Returns true if the page cap has been hit (`None` means unlimited)
    pub fn cap_reached(&self, cap: Option<u64>) -> bool {
        cap.is_some_and(|cap| self.pages_fetched >= cap)
    }

    /// Puts an entry back at the head of the frontier without marking it seen
    pub fn requeue(&mut self, entry: FrontierEntry) {
        self.frontier.push_front(entry);
    }

    /// Returns true if no frontier URL is also in the seen set
    pub fn is_consistent(&self) -> bool {
        self.frontier
            .entries()
            .all(|entry| !self.dedup.is_seen_url(&entry.url))
    }
}
