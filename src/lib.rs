//! Site-Corpus: a polite single-domain corpus crawler
//!
//! This crate crawls one web domain breadth-first and writes a deduplicated,
//! metadata-rich corpus (raw HTML, per-page JSON records and append-only JSONL
//! logs) that downstream text-retrieval pipelines can consume. Crawls are
//! resumable through an atomically written checkpoint.

pub mod config;
pub mod crawler;
pub mod output;
pub mod politeness;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Corpus operations
///
/// Only conditions that must abort a crawl surface as this error. Per-URL
/// failures are reported as values by the component that observed them.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Checkpoint error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error for {path}: {source}")]
    Output {
        path: String,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CorpusError {
    /// Wraps an IO failure on an output path
    pub fn output(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Output {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Site-Corpus operations
pub type Result<T> = std::result::Result<T, CorpusError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOutcome, CrawlSession};
pub use state::{CrawlState, DedupStore, SessionState};
pub use url::{canonicalize, extract_domain, matches_domain};
