//! Configuration module for Site-Corpus
//!
//! Settings come from built-in defaults, an optional TOML file and the process
//! environment (highest precedence). The result is validated once at startup
//! and shared by reference with every component.
//!
//! # Example
//!
//! ```no_run
//! use site_corpus::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Some(Path::new("corpus.toml"))).unwrap();
//! println!("Crawling {} from {}", config.crawler.domain, config.crawler.seed_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, PolitenessConfig};

// Re-export parser functions
pub use parser::{apply_env_overrides, config_fingerprint, load_config, parse_config_str};
pub use validation::validate;
