//! URL handling module for Site-Corpus
//!
//! This module provides the canonical form used as the URL dedup key, host
//! extraction and the domain-scope check applied before anything is queued.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::extract_domain;
pub use matcher::matches_domain;
pub use normalize::{canonicalize, canonicalize_str};

use url::Url;

/// Returns true if `url` is http(s) and its host belongs to the configured domain
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_corpus::url::in_scope;
///
/// let url = Url::parse("https://example.edu/a").unwrap();
/// assert!(in_scope(&url, "example.edu"));
///
/// let url = Url::parse("https://other.example.edu/a").unwrap();
/// assert!(!in_scope(&url, "example.edu"));
/// assert!(in_scope(&url, "*.example.edu"));
/// ```
pub fn in_scope(url: &Url, domain: &str) -> bool {
    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }

    extract_domain(url)
        .map(|host| matches_domain(domain, &host))
        .unwrap_or(false)
}
