//! Checkpoint store trait and error types

use crate::state::CrawlState;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while saving or loading a checkpoint
///
/// Any of these during a save is fatal for the session: continuing without a
/// durable checkpoint risks duplicate work on resume.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt checkpoint file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for checkpoint operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable snapshot of the frontier and seen sets
///
/// Implementations must make each save atomic: after a crash a later `load`
/// sees either the previous checkpoint or the new one, never a partial file.
pub trait CheckpointStore {
    /// Persists the frontier and seen-URL set of `state`
    fn save(&self, state: &CrawlState) -> StorageResult<()>;

    /// Restores a crawl state for `domain`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(CrawlState))` - A checkpoint was found and restored
    /// * `Ok(None)` - No checkpoint exists; start fresh from the seed
    /// * `Err(StorageError)` - A checkpoint exists but cannot be read
    fn load(&self, domain: &str) -> StorageResult<Option<CrawlState>>;
}
