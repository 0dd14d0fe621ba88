//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching
//! robots.txt files. Fetch failures never stop a crawl: a missing or
//! unreachable robots.txt is treated as allowing everything.

mod cache;
mod parser;

pub use cache::{origin_key, CachedRobots, RobotsCache};
pub use parser::{product_token, ParsedRobots};

use reqwest::header::LOCATION;
use reqwest::Client;
use std::collections::HashSet;
use url::Url;

/// Redirect hops followed for a robots.txt request (RFC 9309 asks for at least five)
const MAX_ROBOTS_REDIRECTS: usize = 5;

/// Fetches and parses robots.txt for the origin of `url`
///
/// | Response | Result |
/// |----------|--------|
/// | 2xx | Parsed body |
/// | 3xx | Followed, up to five hops |
/// | 4xx | Allow all (no robots.txt) |
/// | 5xx | Allow all, with a warning |
/// | Network error | Allow all, with a warning |
///
/// The client follows no redirects itself; hops are followed here as long
/// as they stay on http(s) and on the same host. A chain that is too long,
/// loops or leaves the host counts as a missing file.
///
/// # Arguments
///
/// * `client` - HTTP client carrying our user agent
/// * `url` - Any URL on the origin whose robots.txt is wanted
pub async fn fetch_robots(client: &Client, url: &Url) -> ParsedRobots {
    let mut robots_url = url.clone();
    robots_url.set_path("/robots.txt");
    robots_url.set_query(None);
    robots_url.set_fragment(None);

    let origin = robots_url.clone();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(robots_url.as_str().to_string());

    for _ in 0..=MAX_ROBOTS_REDIRECTS {
        tracing::debug!("Fetching {}", robots_url);

        let response = match client.get(robots_url.as_str()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Could not fetch {}: {}; allowing all paths", robots_url, e);
                return ParsedRobots::allow_all();
            }
        };

        let status = response.status();
        if status.is_redirection() {
            let target = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|location| robots_url.join(location.trim()).ok());

            match target {
                Some(target) if same_host(&origin, &target) && visited.insert(target.to_string()) => {
                    tracing::debug!("{} redirects to {}", robots_url, target);
                    robots_url = target;
                    continue;
                }
                _ => {
                    tracing::debug!(
                        "{} returned {} with no followable target; allowing all paths",
                        robots_url,
                        status
                    );
                    return ParsedRobots::allow_all();
                }
            }
        }

        if status.is_server_error() {
            tracing::warn!("{} returned {}; allowing all paths", robots_url, status);
            return ParsedRobots::allow_all();
        }
        if !status.is_success() {
            tracing::debug!("{} returned {}; allowing all paths", robots_url, status);
            return ParsedRobots::allow_all();
        }

        return match response.text().await {
            Ok(body) => ParsedRobots::from_content(&body),
            Err(e) => {
                tracing::warn!("Could not read {}: {}; allowing all paths", robots_url, e);
                ParsedRobots::allow_all()
            }
        };
    }

    tracing::debug!(
        "More than {} redirects for {}; allowing all paths",
        MAX_ROBOTS_REDIRECTS,
        origin
    );
    ParsedRobots::allow_all()
}

/// A redirect may switch scheme (http to https) but must keep the host
fn same_host(origin: &Url, target: &Url) -> bool {
    matches!(target.scheme(), "http" | "https")
        && target
            .host_str()
            .zip(origin.host_str())
            .map_or(false, |(a, b)| a.eq_ignore_ascii_case(b))
}
