//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for page content, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - Manual redirect handling (bounded chain, loop detection, domain and
//!   robots.txt checks on every hop)
//! - Content-Type validation against an HTML allow-list
//! - Outcome classification and the retry loop for transient failures

use crate::config::PolitenessConfig;
use crate::politeness::{parse_retry_after, PolitenessController};
use crate::url::in_scope;
use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, ETAG, LAST_MODIFIED, LOCATION, RETRY_AFTER};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use url::Url;

/// MIME types accepted as HTML pages
const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// A successfully fetched HTML response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,

    /// URL the body was served from, after redirects
    pub final_url: Url,

    /// Content-Type header value
    pub content_type: String,

    /// ETag header value, if any
    pub etag: Option<String>,

    /// Last-Modified header value, if any
    pub last_modified: Option<String>,

    /// Raw response body
    pub body: Vec<u8>,
}

/// Kind of network-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailureKind {
    /// The request or body read exceeded the timeout
    Timeout,

    /// DNS resolution or connection establishment failed
    Connect,

    /// The connection broke mid-request or mid-body
    Reset,

    /// Anything else (invalid response, decoding failure, ...)
    Other,
}

impl NetworkFailureKind {
    /// Returns true for failures that a later attempt may not hit
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Reset => "reset",
            Self::Other => "network",
        }
    }

    fn classify(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect
        } else if error.is_request() || error.is_body() {
            Self::Reset
        } else {
            Self::Other
        }
    }
}

/// Classified result of fetching one URL
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// HTML page ready for the content processor
    Success(FetchedPage),

    /// The URL redirects outside the crawl domain; not followed
    Redirect {
        /// Absolute redirect target
        location: String,
    },

    /// Redirect loop, over-long chain, or redirect without a target
    RedirectError {
        detail: String,
    },

    /// An in-domain redirect leads to a path robots.txt disallows; not followed
    Disallowed {
        location: String,
    },

    /// HTTP 4xx (never retried)
    ClientError {
        status: u16,
    },

    /// HTTP 5xx
    ServerError {
        status: u16,
        /// Delay requested through `Retry-After`
        retry_after: Option<Duration>,
    },

    /// Response is not HTML; skipped, not an error
    NonHtml {
        content_type: String,
    },

    /// No usable HTTP response
    NetworkFailure {
        kind: NetworkFailureKind,
        detail: String,
    },
}

impl FetchOutcome {
    /// Returns true if the outcome is transient and worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ServerError { .. } => true,
            Self::NetworkFailure { kind, .. } => kind.is_transient(),
            _ => false,
        }
    }

    /// Delay the server asked for, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::ServerError { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Short label used as the `kind` of an error record
    pub fn kind(&self) -> String {
        match self {
            Self::Success(page) => page.status.to_string(),
            Self::Redirect { .. } => "offsite_redirect".to_string(),
            Self::RedirectError { .. } => "redirect".to_string(),
            Self::Disallowed { .. } => "robots".to_string(),
            Self::ClientError { status } | Self::ServerError { status, .. } => status.to_string(),
            Self::NonHtml { .. } => "non_html".to_string(),
            Self::NetworkFailure { kind, .. } => kind.as_str().to_string(),
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(page) => write!(f, "HTTP {} ({})", page.status, page.content_type),
            Self::Redirect { location } => write!(f, "redirects off-domain to {}", location),
            Self::RedirectError { detail } => write!(f, "{}", detail),
            Self::Disallowed { location } => {
                write!(f, "redirects to {}, disallowed by robots.txt", location)
            }
            Self::ClientError { status } => write!(f, "HTTP {}", status),
            Self::ServerError { status, .. } => write!(f, "HTTP {}", status),
            Self::NonHtml { content_type } => write!(f, "non-HTML content type '{}'", content_type),
            Self::NetworkFailure { kind, detail } => write!(f, "{} failure: {}", kind.as_str(), detail),
        }
    }
}

/// Final outcome of a fetch plus the number of retries it took
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub outcome: FetchOutcome,
    pub retries: u32,
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are disabled on the client and handled by [`Fetcher`], so each
/// hop is paced and checked against the crawl domain.
///
/// # Example
///
/// ```no_run
/// use site_corpus::config::PolitenessConfig;
/// use site_corpus::crawler::build_http_client;
///
/// let client = build_http_client(&PolitenessConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &PolitenessConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.request_timeout())
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues page requests for one crawl domain
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    domain: String,
    max_redirects: u32,
}

impl Fetcher {
    /// Creates a fetcher restricted to `domain`
    pub fn new(client: Client, domain: &str, max_redirects: u32) -> Self {
        Self {
            client,
            domain: domain.to_lowercase(),
            max_redirects,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetches a URL, retrying transient failures per the retry policy
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 5xx | Retry with backoff, or `Retry-After` verbatim |
    /// | Timeout / connect / reset | Retry with backoff |
    /// | HTTP 4xx (including 429) | Immediate, never retried |
    /// | Redirect loop or chain too long | Immediate |
    /// | Redirect into a disallowed path | Immediate |
    ///
    /// Every attempt, and every redirect hop within an attempt, waits on the
    /// session's rate limiter.
    pub async fn fetch_with_retry(
        &self,
        url: &Url,
        politeness: &mut PolitenessController,
    ) -> FetchReport {
        let policy = politeness.retry_policy();
        let mut retries = 0;

        loop {
            let outcome = self.fetch(url, politeness).await;

            if !outcome.is_retryable() || !policy.should_retry(retries) {
                return FetchReport { outcome, retries };
            }

            let delay = policy.delay(retries, outcome.retry_after());
            retries += 1;
            tracing::warn!(
                "Transient failure for {} ({}); retry {}/{} in {:?}",
                url,
                outcome,
                retries,
                policy.max_retries(),
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Performs one attempt: follows in-domain redirects and classifies the result
    ///
    /// Loops are detected on the exact request URL, so `/docs` redirecting
    /// to `/docs/` is followed even though both share a canonical form.
    pub async fn fetch(&self, url: &Url, politeness: &mut PolitenessController) -> FetchOutcome {
        let mut current = url.clone();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(current.as_str().to_string());
        let mut hops = 0u32;

        loop {
            politeness.limiter_mut().wait().await;
            let result = self.client.get(current.as_str()).send().await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    politeness.limiter_mut().mark_completed();
                    return FetchOutcome::NetworkFailure {
                        kind: NetworkFailureKind::classify(&e),
                        detail: e.to_string(),
                    };
                }
            };

            let status = response.status();

            if status.is_redirection() {
                politeness.limiter_mut().mark_completed();

                let Some(target) = redirect_target(&response, &current) else {
                    return FetchOutcome::RedirectError {
                        detail: format!("HTTP {} without a usable Location header", status),
                    };
                };

                if !in_scope(&target, &self.domain) {
                    return FetchOutcome::Redirect {
                        location: target.to_string(),
                    };
                }

                if !visited.insert(target.as_str().to_string()) {
                    return FetchOutcome::RedirectError {
                        detail: format!("redirect loop at {}", target),
                    };
                }

                hops += 1;
                if hops > self.max_redirects {
                    return FetchOutcome::RedirectError {
                        detail: format!("more than {} redirects", self.max_redirects),
                    };
                }

                if !politeness.is_allowed(&self.client, &target).await {
                    return FetchOutcome::Disallowed {
                        location: target.to_string(),
                    };
                }

                tracing::debug!("Following redirect {} -> {}", current, target);
                current = target;
                continue;
            }

            let outcome = classify_response(response, status, current).await;
            politeness.limiter_mut().mark_completed();
            return outcome;
        }
    }
}

/// Classifies a non-redirect response, reading the body only for HTML
async fn classify_response(response: Response, status: StatusCode, final_url: Url) -> FetchOutcome {
    if status.is_server_error() {
        let retry_after = header_str(&response, RETRY_AFTER)
            .and_then(|value| parse_retry_after(&value, Utc::now()));
        return FetchOutcome::ServerError {
            status: status.as_u16(),
            retry_after,
        };
    }

    if !status.is_success() {
        return FetchOutcome::ClientError {
            status: status.as_u16(),
        };
    }

    let content_type = header_str(&response, CONTENT_TYPE).unwrap_or_default();
    if !is_html_content_type(&content_type) {
        return FetchOutcome::NonHtml { content_type };
    }

    let etag = header_str(&response, ETAG);
    let last_modified = header_str(&response, LAST_MODIFIED);

    match response.bytes().await {
        Ok(body) => FetchOutcome::Success(FetchedPage {
            status: status.as_u16(),
            final_url,
            content_type,
            etag,
            last_modified,
            body: body.to_vec(),
        }),
        Err(e) => FetchOutcome::NetworkFailure {
            kind: NetworkFailureKind::classify(&e),
            detail: e.to_string(),
        },
    }
}

/// Returns true if the Content-Type names an allowed HTML type
pub fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    HTML_CONTENT_TYPES.contains(&mime.as_str())
}

fn redirect_target(response: &Response, current: &Url) -> Option<Url> {
    let location = header_str(response, LOCATION)?;
    current.join(location.trim()).ok()
}

fn header_str(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
