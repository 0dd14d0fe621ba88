//! File-based checkpoint: `seen.txt` and `frontier.json` under `BASE_DIR`
//!
//! # Save order
//!
//! `seen.txt` is replaced first, then `frontier.json`, each by an atomic
//! rename. A crash between the two renames leaves a frontier that may still
//! list URLs the new `seen.txt` already contains; `load` drops those, so the
//! restored state is always consistent.

use crate::crawler::{Frontier, FrontierEntry};
use crate::output::{write_atomic, OutputLayout};
use crate::state::{CrawlState, DedupStore};
use crate::storage::{CheckpointStore, StorageError, StorageResult};
use std::fs;
use std::io;

/// Checkpoint stored next to the corpus output
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    layout: OutputLayout,
}

impl FileCheckpoint {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }

    /// Returns true if either checkpoint file exists
    pub fn exists(&self) -> bool {
        self.layout.seen_path().exists() || self.layout.frontier_path().exists()
    }

    fn read_seen(&self) -> StorageResult<Vec<String>> {
        let path = self.layout.seen_path();
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    fn read_frontier(&self) -> StorageResult<Vec<FrontierEntry>> {
        let path = self.layout.frontier_path();
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
                path,
                message: e.to_string(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }
}

impl CheckpointStore for FileCheckpoint {
    fn save(&self, state: &CrawlState) -> StorageResult<()> {
        fs::create_dir_all(self.layout.base_dir())
            .map_err(|e| StorageError::io(self.layout.base_dir(), e))?;

        let mut seen = String::new();
        for url in state.dedup.seen_urls() {
            seen.push_str(url);
            seen.push('\n');
        }
        let seen_path = self.layout.seen_path();
        write_atomic(&seen_path, seen.as_bytes()).map_err(|e| StorageError::io(&seen_path, e))?;

        let entries: Vec<&FrontierEntry> = state.frontier.entries().collect();
        let frontier = serde_json::to_vec_pretty(&entries)?;
        let frontier_path = self.layout.frontier_path();
        write_atomic(&frontier_path, &frontier).map_err(|e| StorageError::io(&frontier_path, e))?;

        tracing::info!(
            "Checkpoint saved: {} seen, {} pending",
            state.dedup.seen_url_count(),
            state.frontier.len()
        );
        Ok(())
    }

    fn load(&self, domain: &str) -> StorageResult<Option<CrawlState>> {
        if !self.exists() {
            return Ok(None);
        }

        let seen = self.read_seen()?;
        let entries = self.read_frontier()?;
        let hashes = self
            .layout
            .stored_content_hashes()
            .map_err(|e| StorageError::io(self.layout.json_dir(), e))?;

        let dedup = DedupStore::from_parts(seen, hashes);
        let saved = entries.len();
        let frontier = Frontier::restore(domain, entries, &dedup);

        if frontier.len() < saved {
            tracing::warn!(
                "Dropped {} frontier entries that were seen, duplicated or out of scope",
                saved - frontier.len()
            );
        }

        tracing::info!(
            "Checkpoint restored: {} seen, {} pending, {} stored content hashes",
            dedup.seen_url_count(),
            frontier.len(),
            dedup.content_count()
        );

        Ok(Some(CrawlState::restored(frontier, dedup)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use url::Url;

    fn store(dir: &TempDir) -> FileCheckpoint {
        FileCheckpoint::new(OutputLayout::new(dir.path()))
    }

    fn sample_state() -> CrawlState {
        let mut state = CrawlState::seeded("example.edu", &Url::parse("https://example.edu/").unwrap());
        let seed = state.frontier.dequeue().unwrap();
        state.record_fetched(&seed.url);

        let dedup = state.dedup.clone();
        for path in ["/b", "/a"] {
            let url = Url::parse(&format!("https://example.edu{}", path)).unwrap();
            state.frontier.enqueue(&url, 1, Some(&seed.url), &dedup);
        }
        state
    }

    #[test]
    fn test_load_without_checkpoint() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).load("example.edu").unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let checkpoint = store(&dir);
        checkpoint.save(&sample_state()).unwrap();

        let restored = checkpoint.load("example.edu").unwrap().unwrap();
        assert_eq!(restored.pages_fetched(), 1);
        assert!(restored.dedup.is_seen_url("https://example.edu/"));

        let pending: Vec<&str> = restored.frontier.entries().map(|e| e.url.as_str()).collect();
        assert_eq!(pending, vec!["https://example.edu/b", "https://example.edu/a"]);
        assert_eq!(
            restored.frontier.entries().next().unwrap().referrer.as_deref(),
            Some("https://example.edu/")
        );
    }

    #[test]
    fn test_saved_files_format() {
        let dir = TempDir::new().unwrap();
        let checkpoint = store(&dir);
        checkpoint.save(&sample_state()).unwrap();

        let seen = fs::read_to_string(dir.path().join("seen.txt")).unwrap();
        assert_eq!(seen, "https://example.edu/\n");

        let frontier: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.path().join("frontier.json")).unwrap()).unwrap();
        assert_eq!(frontier.as_array().unwrap().len(), 2);
        assert_eq!(frontier[0]["url"], "https://example.edu/b");
        assert_eq!(frontier[0]["depth"], 1);
    }

    #[test]
    fn test_load_repairs_overlap() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("seen.txt"),
            "https://example.edu/\nhttps://example.edu/b\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("frontier.json"),
            r#"[{"url":"https://example.edu/b","depth":1},{"url":"https://example.edu/a","depth":1}]"#,
        )
        .unwrap();

        let restored = store(&dir).load("example.edu").unwrap().unwrap();
        assert!(restored.is_consistent());
        assert_eq!(restored.frontier.len(), 1);
        assert_eq!(restored.pages_fetched(), 2);
    }

    #[test]
    fn test_load_restores_content_hashes() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path());
        fs::create_dir_all(layout.json_dir()).unwrap();
        fs::write(layout.json_path("abc123"), "{}").unwrap();
        fs::write(layout.seen_path(), "https://example.edu/\n").unwrap();

        let restored = store(&dir).load("example.edu").unwrap().unwrap();
        assert!(restored.dedup.is_seen_content("abc123"));
        assert!(restored.frontier.is_empty());
    }

    #[test]
    fn test_corrupt_frontier_is_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("frontier.json"), "[{\"url\": ").unwrap();

        let result = store(&dir).load("example.edu");
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn test_save_overwrites_previous_checkpoint() {
        let dir = TempDir::new().unwrap();
        let checkpoint = store(&dir);
        let mut state = sample_state();
        checkpoint.save(&state).unwrap();

        let next = state.frontier.dequeue().unwrap();
        state.record_fetched(&next.url);
        checkpoint.save(&state).unwrap();

        let restored = checkpoint.load("example.edu").unwrap().unwrap();
        assert_eq!(restored.pages_fetched(), 2);
        assert_eq!(restored.frontier.len(), 1);
    }

    #[test]
    fn test_save_fails_when_base_is_a_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let checkpoint = FileCheckpoint::new(OutputLayout::new(&blocker));
        assert!(checkpoint.save(&sample_state()).is_err());
    }
}
