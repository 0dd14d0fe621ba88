//! Dedup store for canonical URLs and content hashes
//!
//! Both sets are insert-only. `mark_*` performs the check and the insert as a
//! single call and reports whether the caller was the first to claim the key,
//! so a caller never has to pair `is_seen_*` with a separate insert.

use std::collections::HashSet;

/// Tracks canonical URLs and content hashes already processed
#[derive(Debug, Clone, Default)]
pub struct DedupStore {
    /// Canonical URLs, for membership checks
    urls: HashSet<String>,

    /// Canonical URLs in the order they were marked (for `seen.txt`)
    url_order: Vec<String>,

    /// SHA-256 hex digests of clean text
    content: HashSet<String>,
}

impl DedupStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from persisted seen URLs and content hashes
    ///
    /// Duplicate entries in the input are collapsed.
    pub fn from_parts<U, H>(urls: U, hashes: H) -> Self
    where
        U: IntoIterator<Item = String>,
        H: IntoIterator<Item = String>,
    {
        let mut store = Self::new();
        for url in urls {
            store.mark_seen_url(&url);
        }
        for hash in hashes {
            store.mark_seen_content(&hash);
        }
        store
    }

    /// Returns true if the canonical URL has been processed
    pub fn is_seen_url(&self, canonical: &str) -> bool {
        self.urls.contains(canonical)
    }

    /// Marks a canonical URL as processed
    ///
    /// # Returns
    ///
    /// * `true` - The URL was not seen before and is now claimed
    /// * `false` - The URL was already seen; nothing changed
    pub fn mark_seen_url(&mut self, canonical: &str) -> bool {
        if self.urls.insert(canonical.to_string()) {
            self.url_order.push(canonical.to_string());
            true
        } else {
            false
        }
    }

    /// Returns true if a page with this content hash has been stored
    pub fn is_seen_content(&self, hash: &str) -> bool {
        self.content.contains(hash)
    }

    /// Marks a content hash as stored; returns true if it was new
    pub fn mark_seen_content(&mut self, hash: &str) -> bool {
        self.content.insert(hash.to_string())
    }

    /// Number of distinct canonical URLs seen
    pub fn seen_url_count(&self) -> usize {
        self.url_order.len()
    }

    /// Number of distinct content hashes seen
    pub fn content_count(&self) -> usize {
        self.content.len()
    }

    /// Seen canonical URLs in the order they were marked
    pub fn seen_urls(&self) -> impl Iterator<Item = &str> {
        self.url_order.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_is_empty() {
        let store = DedupStore::new();
        assert_eq!(store.seen_url_count(), 0);
        assert_eq!(store.content_count(), 0);
        assert!(!store.is_seen_url("https://example.edu/"));
    }

    #[test]
    fn test_mark_url_claims_once() {
        let mut store = DedupStore::new();
        assert!(store.mark_seen_url("https://example.edu/a"));
        assert!(!store.mark_seen_url("https://example.edu/a"));
        assert!(store.is_seen_url("https://example.edu/a"));
        assert_eq!(store.seen_url_count(), 1);
    }

    #[test]
    fn test_mark_content_claims_once() {
        let mut store = DedupStore::new();
        assert!(store.mark_seen_content("abc123"));
        assert!(!store.mark_seen_content("abc123"));
        assert!(store.is_seen_content("abc123"));
        assert_eq!(store.content_count(), 1);
    }

    #[test]
    fn test_url_and_content_sets_are_independent() {
        let mut store = DedupStore::new();
        store.mark_seen_url("abc123");
        assert!(!store.is_seen_content("abc123"));
    }

    #[test]
    fn test_seen_urls_keep_insertion_order() {
        let mut store = DedupStore::new();
        store.mark_seen_url("https://example.edu/");
        store.mark_seen_url("https://example.edu/b");
        store.mark_seen_url("https://example.edu/a");
        store.mark_seen_url("https://example.edu/b");

        let urls: Vec<&str> = store.seen_urls().collect();
        assert_eq!(
            urls,
            vec![
                "https://example.edu/",
                "https://example.edu/b",
                "https://example.edu/a"
            ]
        );
    }

    #[test]
    fn test_from_parts_collapses_duplicates() {
        let store = DedupStore::from_parts(
            vec!["u1".to_string(), "u2".to_string(), "u1".to_string()],
            vec!["h1".to_string(), "h1".to_string()],
        );
        assert_eq!(store.seen_url_count(), 2);
        assert_eq!(store.content_count(), 1);
    }
}
