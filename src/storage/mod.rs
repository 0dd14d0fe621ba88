//! Storage module for crawl checkpoints
//!
//! This module persists and restores the frontier and seen sets so that an
//! interrupted crawl resumes where it stopped without refetching anything.

mod checkpoint;
mod traits;

pub use checkpoint::FileCheckpoint;
pub use traits::{CheckpointStore, StorageError, StorageResult};
