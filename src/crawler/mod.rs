//! Crawler module: the per-URL pipeline and the session that drives it
//!
//! This module contains the core crawling logic, including:
//! - The breadth-first frontier of pending URLs
//! - HTTP fetching with redirect handling and retry logic
//! - Content extraction (metadata, clean text, links, assets)
//! - The crawl session loop and its outcome

mod fetcher;
mod frontier;
mod processor;
mod session;

pub use fetcher::{
    build_http_client, is_html_content_type, FetchOutcome, FetchReport, FetchedPage, Fetcher,
    NetworkFailureKind,
};
pub use frontier::{Frontier, FrontierEntry};
pub use processor::{
    content_hash, AssetLink, AssetType, BoilerplateStripper, ContentProcessor, ProcessError,
    ProcessedPage, TextExtractor,
};
pub use session::{CrawlOutcome, CrawlSession, InterruptReason};

use crate::config::Config;
use tokio::sync::watch;

/// Runs a complete crawl with the given configuration
///
/// Restores the checkpoint under `BASE_DIR` unless `fresh` is set, then runs
/// the session until it completes, hits the page cap, or `shutdown` turns
/// true.
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - The session ran and saved its final checkpoint
/// * `Err(CorpusError)` - The session could not be started
pub async fn crawl(
    config: Config,
    fresh: bool,
    shutdown: watch::Receiver<bool>,
) -> crate::Result<CrawlOutcome> {
    let mut session = CrawlSession::new(config, fresh)?;
    Ok(session.run(shutdown).await)
}
