//! Output module for the on-disk corpus
//!
//! This module handles:
//! - The directory layout under `BASE_DIR`
//! - Record types serialized to JSON and JSONL
//! - Append-only / create-only writers for pages, records and logs
//! - Status statistics read back from the output (`--stats`)

mod records;
pub mod stats;
mod writer;

pub use records::{html_key, AssetRecord, ErrorRecord, MappingRecord, PageRecord};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use writer::{write_atomic, OutputWriter};

use std::path::{Path, PathBuf};

/// Paths of every file the crawler owns under `BASE_DIR`
///
/// ```text
/// BASE_DIR/
/// ├── pages/<md5(url)>.html
/// ├── json/<sha256(clean_text)>.json
/// ├── mapping.jsonl
/// ├── assets.jsonl
/// ├── errors.jsonl
/// ├── frontier.json
/// └── seen.txt
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    base_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.base_dir.join("pages")
    }

    pub fn json_dir(&self) -> PathBuf {
        self.base_dir.join("json")
    }

    /// `pages/<html_key>.html`
    pub fn html_path(&self, html_key: &str) -> PathBuf {
        self.pages_dir().join(format!("{}.html", html_key))
    }

    /// `json/<content_hash>.json`
    pub fn json_path(&self, content_hash: &str) -> PathBuf {
        self.json_dir().join(format!("{}.json", content_hash))
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.base_dir.join("mapping.jsonl")
    }

    pub fn assets_path(&self) -> PathBuf {
        self.base_dir.join("assets.jsonl")
    }

    pub fn errors_path(&self) -> PathBuf {
        self.base_dir.join("errors.jsonl")
    }

    pub fn frontier_path(&self) -> PathBuf {
        self.base_dir.join("frontier.json")
    }

    pub fn seen_path(&self) -> PathBuf {
        self.base_dir.join("seen.txt")
    }

    /// Content hashes of every stored page record (`json/*.json` stems)
    ///
    /// A missing `json/` directory yields an empty list.
    pub fn stored_content_hashes(&self) -> std::io::Result<Vec<String>> {
        let entries = match std::fs::read_dir(self.json_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut hashes = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if !stem.starts_with('.') {
                    hashes.push(stem.to_string());
                }
            }
        }
        hashes.sort();
        Ok(hashes)
    }
}
