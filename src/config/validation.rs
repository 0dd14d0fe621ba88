use crate::config::types::{Config, CrawlerConfig, OutputConfig, PolitenessConfig};
use crate::url::matches_domain;
use crate::ConfigError;
use std::time::Duration;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_politeness_config(&config.politeness)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the seed, domain and crawl limits
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.seed_url.is_empty() {
        return Err(ConfigError::Missing("SEED_URL"));
    }

    let seed = Url::parse(&config.seed_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", config.seed_url, e)))?;

    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' must use http or https",
            config.seed_url
        )));
    }

    validate_domain_pattern(&config.domain)?;

    let seed_host = seed
        .host_str()
        .map(str::to_lowercase)
        .ok_or_else(|| ConfigError::InvalidUrl(format!("Seed URL '{}' has no host", config.seed_url)))?;

    if !matches_domain(&config.domain, &seed_host) {
        return Err(ConfigError::Validation(format!(
            "Seed URL host '{}' does not belong to domain '{}'",
            seed_host, config.domain
        )));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(
            "checkpoint_interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent, pacing and retry settings
fn validate_politeness_config(config: &PolitenessConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    // Must be usable as an HTTP header value
    if config.user_agent.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(format!(
            "user_agent contains control characters: {:?}",
            config.user_agent
        )));
    }

    validate_seconds("rate_limit_seconds", config.rate_limit_seconds)?;
    validate_seconds("backoff_base_seconds", config.backoff_base_seconds)?;
    validate_seconds("backoff_max_seconds", config.backoff_max_seconds)?;

    if config.backoff_max_seconds < config.backoff_base_seconds {
        return Err(ConfigError::Validation(format!(
            "backoff_max_seconds ({}) must be >= backoff_base_seconds ({})",
            config.backoff_max_seconds, config.backoff_base_seconds
        )));
    }

    if config.timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout must be >= 1 second, got {}",
            config.timeout
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.base_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "base_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// A duration in seconds must be finite and non-negative
fn validate_seconds(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} must be a finite number >= 0, got {}",
            name, value
        )));
    }
    Duration::try_from_secs_f64(value).map_err(|e| {
        ConfigError::Validation(format!("{} is out of range ({}), got {}", name, e, value))
    })?;
    Ok(())
}

/// Validates a domain pattern (a bare host, or `*.host` to include subdomains)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::Missing("DOMAIN"));
    }

    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)
    } else {
        validate_domain_string(pattern)
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must be a bare hostname (no scheme, port or path)",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
