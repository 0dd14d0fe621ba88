//! Crawl session - the loop that drives one crawl from start to exit
//!
//! The session owns the crawl state and every component. One cycle is:
//! dequeue, robots check, fetch, process, write output, mark seen, enqueue
//! discovered links, and every `checkpoint_interval` pages a checkpoint.
//!
//! Whatever ends the loop (empty frontier, page cap, signal or fatal error),
//! the session passes through a final checkpoint save before it terminates.

use crate::config::Config;
use crate::crawler::{
    build_http_client, ContentProcessor, FetchOutcome, FetchedPage, Fetcher, FrontierEntry,
};
use crate::output::{
    html_key, AssetRecord, ErrorRecord, MappingRecord, OutputLayout, OutputWriter, PageRecord,
};
use crate::politeness::PolitenessController;
use crate::state::{CrawlState, SessionState};
use crate::storage::{CheckpointStore, FileCheckpoint};
use crate::url::{canonicalize, in_scope};
use crate::Result;
use chrono::Utc;
use std::fmt;
use std::time::Instant;
use tokio::sync::watch;
use url::Url;

/// Processed pages between progress log lines
const PROGRESS_INTERVAL: u64 = 10;

/// What processing one frontier entry produced
#[derive(Debug, Default)]
struct Handled {
    /// Links discovered on the page, not yet filtered
    links: Vec<Url>,

    /// Canonical URL the page was finally served from, when it differs
    redirected_to: Option<String>,
}

/// Why a session stopped before the frontier emptied or the cap was hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterruptReason {
    /// Ctrl-C or SIGTERM
    Signal,

    /// Unrecoverable output or checkpoint failure
    Fatal(String),
}

/// How a crawl session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The frontier emptied
    Complete,

    /// The page cap was hit
    LimitReached,

    /// The loop was stopped from outside or by a fatal error
    Interrupted(InterruptReason),
}

impl CrawlOutcome {
    /// Process exit code for the scheduling wrapper
    ///
    /// | Outcome | Code |
    /// |---------|------|
    /// | Complete, LimitReached | 0 |
    /// | Interrupted by signal | 130 |
    /// | Interrupted by fatal error | 1 |
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Complete | Self::LimitReached => 0,
            Self::Interrupted(InterruptReason::Signal) => 130,
            Self::Interrupted(InterruptReason::Fatal(_)) => 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }

    /// Terminal session state corresponding to this outcome
    pub fn session_state(&self) -> SessionState {
        match self {
            Self::Complete => SessionState::Complete,
            Self::LimitReached => SessionState::LimitReached,
            Self::Interrupted(_) => SessionState::Interrupted,
        }
    }

    fn fatal(error: impl fmt::Display) -> Self {
        Self::Interrupted(InterruptReason::Fatal(error.to_string()))
    }
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted(InterruptReason::Signal) => write!(f, "INTERRUPTED (signal)"),
            Self::Interrupted(InterruptReason::Fatal(e)) => write!(f, "INTERRUPTED ({})", e),
            other => write!(f, "{}", other.session_state()),
        }
    }
}

/// One crawl of one domain
pub struct CrawlSession {
    config: Config,
    fetcher: Fetcher,
    politeness: PolitenessController,
    processor: ContentProcessor,
    writer: OutputWriter,
    checkpoint: Box<dyn CheckpointStore + Send + Sync>,
    state: CrawlState,
    session_state: SessionState,

    /// Pages processed by this process, excluding restored ones
    processed: u64,
}

impl CrawlSession {
    /// Creates a session, restoring the checkpoint under `BASE_DIR` if present
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `fresh` - Ignore any existing checkpoint and start from the seed
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSession)` - Ready to run, in state `INIT`
    /// * `Err(CorpusError)` - Output directory unwritable, checkpoint
    ///   unreadable, or HTTP client setup failed
    pub fn new(config: Config, fresh: bool) -> Result<Self> {
        let layout = OutputLayout::new(&config.output.base_dir);
        let checkpoint = FileCheckpoint::new(layout.clone());
        let writer = OutputWriter::open(layout)?;

        let domain = config.crawler.domain.as_str();
        let restored = if fresh {
            tracing::info!("Fresh crawl requested, ignoring any checkpoint");
            None
        } else {
            checkpoint.load(domain)?
        };

        let state = match restored {
            Some(state) => {
                tracing::info!(
                    "Resuming crawl of {}: {} pages already fetched, {} pending",
                    domain,
                    state.pages_fetched(),
                    state.frontier.len()
                );
                state
            }
            None => {
                let seed = Url::parse(&config.crawler.seed_url)?;
                tracing::info!("Starting crawl of {} from {}", domain, seed);
                CrawlState::seeded(domain, &seed)
            }
        };

        let client = build_http_client(&config.politeness)?;
        let fetcher = Fetcher::new(client, domain, config.politeness.max_redirects);
        let politeness = PolitenessController::new(&config);

        Ok(Self {
            config,
            fetcher,
            politeness,
            processor: ContentProcessor::new(),
            writer,
            checkpoint: Box::new(checkpoint),
            state,
            session_state: SessionState::Init,
            processed: 0,
        })
    }

    /// Replaces the content processor, e.g. to plug in another text extractor
    pub fn with_processor(mut self, processor: ContentProcessor) -> Self {
        self.processor = processor;
        self
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    /// Runs the crawl loop until it completes, hits the cap or is interrupted
    ///
    /// `shutdown` is polled between cycles; once it holds `true` the loop
    /// stops before dequeuing another URL. The final checkpoint is saved
    /// before this returns, whatever the outcome.
    pub async fn run(&mut self, shutdown: watch::Receiver<bool>) -> CrawlOutcome {
        if *shutdown.borrow() {
            return self.finish(CrawlOutcome::Interrupted(InterruptReason::Signal));
        }

        self.transition(SessionState::Running);
        let outcome = self.crawl_loop(&shutdown).await;
        self.finish(outcome)
    }

    async fn crawl_loop(&mut self, shutdown: &watch::Receiver<bool>) -> CrawlOutcome {
        let cap = self.config.crawler.page_cap();
        let checkpoint_interval = self.config.crawler.checkpoint_interval.max(1);
        let started = Instant::now();

        loop {
            if *shutdown.borrow() {
                tracing::info!("Shutdown requested, stopping between cycles");
                return CrawlOutcome::Interrupted(InterruptReason::Signal);
            }

            if self.state.cap_reached(cap) {
                tracing::info!("Page cap of {} reached", self.config.crawler.max_pages);
                return CrawlOutcome::LimitReached;
            }

            let Some(entry) = self.state.frontier.dequeue() else {
                tracing::info!("Frontier is empty, crawl complete");
                return CrawlOutcome::Complete;
            };

            let url = match Url::parse(&entry.url) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Dropping unparsable frontier entry {}: {}", entry.url, e);
                    continue;
                }
            };

            // Covers the seed and restored entries; discovered links are
            // checked before they are queued.
            if !self.politeness.is_allowed(self.fetcher.client(), &url).await {
                tracing::info!("Skipping {} (disallowed by robots.txt)", entry.url);
                continue;
            }

            tracing::debug!("Fetching {} (depth {})", entry.url, entry.depth);
            let handled = match self.process_entry(&entry, &url).await {
                Ok(handled) => handled,
                Err(e) => {
                    tracing::error!("Fatal error while processing {}: {}", entry.url, e);
                    self.state.requeue(entry);
                    return CrawlOutcome::fatal(e);
                }
            };

            self.state.record_fetched(&entry.url);
            if let Some(target) = handled.redirected_to {
                if !self.state.cap_reached(cap) && self.state.record_redirect_target(&target) {
                    tracing::debug!("Marked redirect target {} as fetched", target);
                }
            }
            self.enqueue_links(&entry, handled.links).await;
            self.processed += 1;

            if self.processed % PROGRESS_INTERVAL == 0 {
                let rate = self.processed as f64 / started.elapsed().as_secs_f64().max(f64::EPSILON);
                tracing::info!(
                    "Progress: {} pages fetched, {} in frontier, {} seen, {:.2} pages/sec",
                    self.state.pages_fetched(),
                    self.state.frontier.len(),
                    self.state.dedup.seen_url_count(),
                    rate
                );
            }

            if self.processed % checkpoint_interval == 0 {
                if let Err(e) = self.checkpoint.save(&self.state) {
                    tracing::error!("Periodic checkpoint failed: {}", e);
                    return CrawlOutcome::fatal(e);
                }
            }
        }
    }

    /// Fetches one URL and writes everything it produces
    ///
    /// Per-URL failures are logged and yield no links. Only output failures
    /// are returned as errors; the caller then leaves the URL unseen.
    ///
    /// A page whose redirect target was already fetched is not stored again.
    ///
    /// # Returns
    ///
    /// * `Ok(Handled)` - Discovered links and the redirect target, if any
    /// * `Err(CorpusError)` - Output could not be written
    async fn process_entry(&mut self, entry: &FrontierEntry, url: &Url) -> Result<Handled> {
        let report = self.fetcher.fetch_with_retry(url, &mut self.politeness).await;

        match report.outcome {
            FetchOutcome::Success(page) => {
                let redirected_to = canonicalize(&page.final_url)
                    .ok()
                    .map(|target| target.to_string())
                    .filter(|target| *target != entry.url);

                if let Some(target) = &redirected_to {
                    if self.state.dedup.is_seen_url(target) {
                        tracing::debug!("Skipping {}: redirects to fetched {}", entry.url, target);
                        return Ok(Handled::default());
                    }
                }

                let links = self.store_page(entry, page)?;
                Ok(Handled { links, redirected_to })
            }
            FetchOutcome::NonHtml { content_type } => {
                tracing::debug!("Skipping {}: non-HTML content type '{}'", entry.url, content_type);
                Ok(Handled::default())
            }
            FetchOutcome::Redirect { location } => {
                tracing::debug!("Skipping {}: redirects off-domain to {}", entry.url, location);
                Ok(Handled::default())
            }
            FetchOutcome::Disallowed { location } => {
                tracing::info!(
                    "Skipping {}: redirects to {} (disallowed by robots.txt)",
                    entry.url,
                    location
                );
                Ok(Handled::default())
            }
            failure => {
                tracing::warn!(
                    "Failed to fetch {} after {} retries: {}",
                    entry.url,
                    report.retries,
                    failure
                );
                self.writer.append_error(&ErrorRecord::new(
                    &entry.url,
                    failure.kind(),
                    failure.to_string(),
                    report.retries,
                ))?;
                Ok(Handled::default())
            }
        }
    }

    /// Extracts a fetched page and writes its HTML, record, mapping and assets
    fn store_page(&mut self, entry: &FrontierEntry, page: FetchedPage) -> Result<Vec<Url>> {
        let processed = match self.processor.process(&page.body, &page.final_url) {
            Ok(processed) => processed,
            Err(e) => {
                tracing::warn!("Failed to process {}: {}", entry.url, e);
                self.writer
                    .append_error(&ErrorRecord::new(&entry.url, "parse", e.to_string(), 0))?;
                return Ok(Vec::new());
            }
        };

        let html_key = html_key(&entry.url);
        self.writer.write_html(&html_key, &page.body)?;

        let json_key = processed.content_hash.clone();
        if self.state.dedup.is_seen_content(&json_key) {
            tracing::debug!("{} duplicates stored content {}", entry.url, json_key);
        } else {
            let record = PageRecord {
                url: entry.url.clone(),
                html_key: html_key.clone(),
                json_key: json_key.clone(),
                title: processed.title.clone(),
                h1: processed.h1.clone(),
                meta_description: processed.meta_description.clone(),
                language: processed.language.clone(),
                status: page.status,
                content_type: page.content_type.clone(),
                etag: page.etag.clone(),
                last_modified: page.last_modified.clone(),
                outbound_links: processed.links.iter().map(Url::to_string).collect(),
                asset_links: processed.assets.iter().map(|a| a.url.to_string()).collect(),
                clean_text: processed.clean_text.clone(),
                fetched_at: Utc::now(),
            };
            self.writer.write_page_record(&record)?;
            self.state.dedup.mark_seen_content(&json_key);
        }

        self.writer.append_mapping(&MappingRecord {
            url: entry.url.clone(),
            html_key,
            json_key,
            title: processed.title.clone(),
        })?;

        for asset in &processed.assets {
            self.writer.append_asset(&AssetRecord {
                source_url: entry.url.clone(),
                asset_url: asset.url.to_string(),
                asset_type: asset.asset_type,
            })?;
        }

        tracing::debug!(
            "Stored {}: {} links, {} assets",
            entry.url,
            processed.links.len(),
            processed.assets.len()
        );

        Ok(processed.links)
    }

    /// Queues in-domain, robots-allowed links one level deeper than `entry`
    async fn enqueue_links(&mut self, entry: &FrontierEntry, links: Vec<Url>) {
        let depth = entry.depth + 1;
        let mut queued = 0usize;

        for link in links {
            if !in_scope(&link, self.state.frontier.domain()) {
                continue;
            }

            if !self.politeness.is_allowed(self.fetcher.client(), &link).await {
                tracing::debug!("Not queuing {} (disallowed by robots.txt)", link);
                continue;
            }

            if self
                .state
                .frontier
                .enqueue(&link, depth, Some(&entry.url), &self.state.dedup)
            {
                queued += 1;
            }
        }

        if queued > 0 {
            tracing::debug!("Queued {} new URLs from {}", queued, entry.url);
        }
    }

    /// Moves through the terminal state and the final checkpoint save
    fn finish(&mut self, outcome: CrawlOutcome) -> CrawlOutcome {
        self.transition(outcome.session_state());
        self.transition(SessionState::CheckpointSave);

        let outcome = match self.checkpoint.save(&self.state) {
            Ok(()) => outcome,
            Err(e) => {
                tracing::error!("Final checkpoint failed: {}", e);
                match outcome {
                    CrawlOutcome::Interrupted(InterruptReason::Fatal(_)) => outcome,
                    _ => CrawlOutcome::fatal(e),
                }
            }
        };

        self.transition(SessionState::Terminated);
        tracing::info!(
            "Crawl ended {}: {} pages fetched ({} this run), {} pending",
            outcome,
            self.state.pages_fetched(),
            self.processed,
            self.state.frontier.len()
        );
        outcome
    }

    fn transition(&mut self, next: SessionState) {
        if !self.session_state.can_transition_to(next) {
            tracing::warn!("Unexpected session transition {} -> {}", self.session_state, next);
        }
        tracing::debug!("Session state {} -> {}", self.session_state, next);
        self.session_state = next;
    }
}
