//! Crawl status read back from the output directory
//!
//! These are the same figures an external monitor derives from the files the
//! crawler writes: frontier size, seen count, stored pages and the tail of
//! the error log. Nothing here writes to the output directory.

use crate::crawler::FrontierEntry;
use crate::output::{ErrorRecord, OutputLayout};
use crate::{CorpusError, Result};
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Number of recent errors kept for display
const RECENT_ERRORS: usize = 5;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Entries in `frontier.json`
    pub frontier_size: usize,

    /// Lines in `seen.txt`
    pub seen_count: usize,

    /// Files in `json/` (unique content)
    pub stored_records: usize,

    /// Lines in `mapping.jsonl`
    pub mapped_urls: usize,

    /// Lines in `assets.jsonl`
    pub asset_count: usize,

    /// Lines in `errors.jsonl`
    pub error_count: usize,

    /// Last few parseable error records, oldest first
    pub recent_errors: Vec<ErrorRecord>,
}

impl CrawlStatistics {
    /// Share of known URLs already processed, in percent
    pub fn completion_percent(&self) -> f64 {
        let known = self.seen_count + self.frontier_size;
        if known == 0 {
            0.0
        } else {
            (self.seen_count as f64 / known as f64) * 100.0
        }
    }
}

/// Loads statistics from an output directory
///
/// Missing files count as empty, so this works on a directory that has
/// never been crawled.
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(CorpusError)` - A file exists but could not be read or parsed
pub fn load_statistics(layout: &OutputLayout) -> Result<CrawlStatistics> {
    let frontier_size = match fs::read(layout.frontier_path()) {
        Ok(bytes) => serde_json::from_slice::<Vec<FrontierEntry>>(&bytes)?.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
        Err(e) => return Err(CorpusError::output(&layout.frontier_path(), e)),
    };

    let (error_count, recent_errors) = read_error_tail(&layout.errors_path())?;

    Ok(CrawlStatistics {
        frontier_size,
        seen_count: count_lines(&layout.seen_path())?,
        stored_records: layout
            .stored_content_hashes()
            .map_err(|e| CorpusError::output(&layout.json_dir(), e))?
            .len(),
        mapped_urls: count_lines(&layout.mapping_path())?,
        asset_count: count_lines(&layout.assets_path())?,
        error_count,
        recent_errors,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages fetched (seen): {}", stats.seen_count);
    println!("  Pending in frontier: {}", stats.frontier_size);
    println!("  Unique page records: {}", stats.stored_records);
    println!("  Mapping entries: {}", stats.mapped_urls);
    println!("  Asset references: {}", stats.asset_count);
    println!("  Errors logged: {}", stats.error_count);
    println!();

    if !stats.recent_errors.is_empty() {
        println!("Recent Errors:");
        for error in &stats.recent_errors {
            println!(
                "  {} [{}] {} (retries: {}) {}",
                error.timestamp.format("%Y-%m-%d %H:%M:%S"),
                error.kind,
                error.url,
                error.retry_count,
                error.detail
            );
        }
        println!();
    }

    println!(
        "Completion: {:.1}% ({} / {} known URLs processed)",
        stats.completion_percent(),
        stats.seen_count,
        stats.seen_count + stats.frontier_size
    );
}

/// Counts non-empty lines; a missing file has zero
fn count_lines(path: &Path) -> Result<usize> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(CorpusError::output(path, e)),
    };

    let mut count = 0;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| CorpusError::output(path, e))?;
        if !line.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

/// Counts error lines and keeps the last few that parse
fn read_error_tail(path: &Path) -> Result<(usize, Vec<ErrorRecord>)> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((0, Vec::new())),
        Err(e) => return Err(CorpusError::output(path, e)),
    };

    let mut count = 0;
    let mut tail = std::collections::VecDeque::with_capacity(RECENT_ERRORS);
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| CorpusError::output(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        count += 1;

        if let Ok(record) = serde_json::from_str::<ErrorRecord>(&line) {
            if tail.len() == RECENT_ERRORS {
                tail.pop_front();
            }
            tail.push_back(record);
        }
    }

    Ok((count, tail.into_iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let stats = load_statistics(&OutputLayout::new(dir.path())).unwrap();

        assert_eq!(stats.frontier_size, 0);
        assert_eq!(stats.seen_count, 0);
        assert_eq!(stats.error_count, 0);
        assert_eq!(stats.completion_percent(), 0.0);
    }

    #[test]
    fn test_statistics_from_files() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path());
        fs::create_dir_all(layout.json_dir()).unwrap();

        fs::write(
            layout.frontier_path(),
            r#"[{"url":"https://example.edu/b","depth":1,"referrer":"https://example.edu/"}]"#,
        )
        .unwrap();
        fs::write(
            layout.seen_path(),
            "https://example.edu/\nhttps://example.edu/a\nhttps://example.edu/c\n",
        )
        .unwrap();
        fs::write(layout.json_path("h1"), "{}").unwrap();

        let mut errors = String::new();
        for i in 0..7 {
            let record = ErrorRecord::new(&format!("https://example.edu/e{}", i), "404", "HTTP 404", 0);
            errors.push_str(&serde_json::to_string(&record).unwrap());
            errors.push('\n');
        }
        errors.push_str("garbage line\n");
        fs::write(layout.errors_path(), errors).unwrap();

        let stats = load_statistics(&layout).unwrap();
        assert_eq!(stats.frontier_size, 1);
        assert_eq!(stats.seen_count, 3);
        assert_eq!(stats.stored_records, 1);
        assert_eq!(stats.error_count, 8);
        assert_eq!(stats.recent_errors.len(), RECENT_ERRORS);
        assert_eq!(stats.recent_errors[4].url, "https://example.edu/e6");
        assert_eq!(stats.completion_percent(), 75.0);
    }

    #[test]
    fn test_corrupt_frontier_is_error() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path());
        fs::write(layout.frontier_path(), "{not json").unwrap();

        assert!(load_statistics(&layout).is_err());
    }
}
