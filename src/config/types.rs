use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Site-Corpus
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub politeness: PolitenessConfig,
    pub output: OutputConfig,
}

/// What to crawl and how far
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// URL the breadth-first traversal starts from (`SEED_URL`)
    pub seed_url: String,

    /// Bare hostname to stay within, or `*.host` to include subdomains (`DOMAIN`)
    pub domain: String,

    /// Maximum number of URLs to fetch; 0 means unlimited (`MAX_PAGES`)
    pub max_pages: u64,

    /// Whether robots.txt disallow rules and crawl delays apply (`RESPECT_ROBOTS`)
    pub respect_robots: bool,

    /// Processed pages between periodic checkpoints (`CHECKPOINT_INTERVAL`)
    pub checkpoint_interval: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed_url: String::new(),
            domain: String::new(),
            max_pages: 0,
            respect_robots: true,
            checkpoint_interval: 50,
        }
    }
}

impl CrawlerConfig {
    /// Returns the page cap, or None when the crawl is unlimited
    pub fn page_cap(&self) -> Option<u64> {
        (self.max_pages > 0).then_some(self.max_pages)
    }
}

/// Request identity, pacing and retry behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PolitenessConfig {
    /// User-Agent header sent with every request (`USER_AGENT`)
    pub user_agent: String,

    /// Minimum delay between the end of one request and the start of the next (`RATE_LIMIT_SECONDS`)
    pub rate_limit_seconds: f64,

    /// Per-attempt request timeout in seconds (`TIMEOUT`)
    pub timeout: u64,

    /// Retries after the first attempt for transient failures (`MAX_RETRIES`)
    pub max_retries: u32,

    /// Base of the exponential backoff (`BACKOFF_BASE_SECONDS`)
    pub backoff_base_seconds: f64,

    /// Upper bound for a single backoff delay (`BACKOFF_MAX_SECONDS`)
    pub backoff_max_seconds: f64,

    /// Longest redirect chain followed for one URL (`MAX_REDIRECTS`)
    pub max_redirects: u32,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("site-corpus/{}", env!("CARGO_PKG_VERSION")),
            rate_limit_seconds: 1.0,
            timeout: 10,
            max_retries: 3,
            backoff_base_seconds: 1.0,
            backoff_max_seconds: 60.0,
            max_redirects: 10,
        }
    }
}

impl PolitenessConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_secs_f64(self.rate_limit_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs_f64(self.backoff_base_seconds)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs_f64(self.backoff_max_seconds)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Filesystem root for pages, records, logs and checkpoint (`BASE_DIR`)
    pub base_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("crawl_data"),
        }
    }
}
