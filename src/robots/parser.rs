//! Robots.txt parser implementation
//!
//! Allow/disallow matching is delegated to the robotstxt crate. Crawl-delay,
//! which that crate does not expose, is parsed here.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
///
/// This is a wrapper around the robotstxt crate's matcher, providing a
/// simplified interface for checking if URLs are allowed.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Whether to allow all (true = allow all, false = parse content)
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used when robots.txt is missing or cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Returns the raw robots.txt content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Checks if a URL is allowed for the given product token
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL or path to check (e.g., "/page.html")
    /// * `agent` - Product token of our user agent (see [`product_token`])
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn is_allowed(&self, url: &str, agent: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, agent, url)
    }

    /// Gets the crawl delay for a specific product token
    ///
    /// A group naming the agent takes precedence over the `*` group.
    /// Consecutive `User-agent` lines share one group; the first rule line
    /// after them closes the list of agents.
    ///
    /// # Returns
    ///
    /// * `Some(f64)` - The crawl delay in seconds
    /// * `None` - If no crawl delay applies
    pub fn crawl_delay(&self, agent: &str) -> Option<f64> {
        if self.allow_all || self.content.is_empty() {
            return None;
        }

        let agent = agent.to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut in_agent_lines = false;
        let mut delay_for_wildcard: Option<f64> = None;
        let mut delay_for_agent: Option<f64> = None;

        for line in self.content.lines() {
            // Strip comments
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                if !in_agent_lines {
                    group_agents.clear();
                    in_agent_lines = true;
                }
                group_agents.push(value.to_lowercase());
                continue;
            }

            in_agent_lines = false;

            if key == "crawl-delay" {
                let Ok(delay) = value.parse::<f64>() else {
                    continue;
                };
                if !delay.is_finite() || delay < 0.0 {
                    continue;
                }

                if group_agents.iter().any(|ua| *ua == agent) {
                    delay_for_agent.get_or_insert(delay);
                } else if group_agents.iter().any(|ua| ua == "*") {
                    delay_for_wildcard.get_or_insert(delay);
                }
            }
        }

        delay_for_agent.or(delay_for_wildcard)
    }
}

/// Extracts the robots.txt product token from a user agent string
///
/// The token is the leading run of letters, `-` and `_`, e.g. `site-corpus`
/// for `site-corpus/1.0 (+https://example.edu/bot)`.
pub fn product_token(user_agent: &str) -> &str {
    let trimmed = user_agent.trim_start();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_alphabetic() || c == '-' || c == '_'))
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}
