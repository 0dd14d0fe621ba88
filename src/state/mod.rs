//! Crawl state tracking
//!
//! This module holds the state a crawl session owns: the dedup store, the
//! combined crawl state (frontier, seen sets, page counter) and the session
//! lifecycle.

mod crawl_state;
mod dedup;
mod session_state;

pub use crawl_state::CrawlState;
pub use dedup::DedupStore;
pub use session_state::SessionState;
