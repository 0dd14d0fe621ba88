use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Loads, merges and validates the configuration
///
/// Precedence, lowest to highest: built-in defaults, the TOML file at `path`
/// (if any), then environment variables such as `SEED_URL` or `MAX_PAGES`.
///
/// # Arguments
///
/// * `path` - Optional path to a TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to read, parse, or validate the configuration
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config_str(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config, std::env::vars())?;
    finalize(&mut config);
    validate(&config)?;

    Ok(config)
}

/// Parses TOML configuration content without validating it
///
/// Unknown sections or keys are rejected.
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Applies recognized environment variables on top of `config`
///
/// Variables that are not Site-Corpus settings are ignored. A recognized
/// variable with a malformed value is an error.
pub fn apply_env_overrides<I, K, V>(config: &mut Config, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (key, value) in vars {
        let key = key.as_ref();
        let value = value.as_ref().trim();

        match key {
            "USER_AGENT" => config.politeness.user_agent = value.to_string(),
            "SEED_URL" => config.crawler.seed_url = value.to_string(),
            "DOMAIN" => config.crawler.domain = value.to_string(),
            "MAX_PAGES" => config.crawler.max_pages = parse_number(key, value)?,
            "RATE_LIMIT_SECONDS" => {
                config.politeness.rate_limit_seconds = parse_number(key, value)?
            }
            "TIMEOUT" => config.politeness.timeout = parse_number(key, value)?,
            "BASE_DIR" => config.output.base_dir = PathBuf::from(value),
            "RESPECT_ROBOTS" => config.crawler.respect_robots = parse_bool(key, value)?,
            "CHECKPOINT_INTERVAL" => {
                config.crawler.checkpoint_interval = parse_number(key, value)?
            }
            "MAX_RETRIES" => config.politeness.max_retries = parse_number(key, value)?,
            "BACKOFF_BASE_SECONDS" => {
                config.politeness.backoff_base_seconds = parse_number(key, value)?
            }
            "BACKOFF_MAX_SECONDS" => {
                config.politeness.backoff_max_seconds = parse_number(key, value)?
            }
            "MAX_REDIRECTS" => config.politeness.max_redirects = parse_number(key, value)?,
            _ => {}
        }
    }

    Ok(())
}

/// Fills derived settings: lowercases the domain and defaults it to the seed host
fn finalize(config: &mut Config) {
    let domain = config.crawler.domain.trim().to_lowercase();
    config.crawler.domain = if domain.is_empty() {
        url::Url::parse(&config.crawler.seed_url)
            .ok()
            .and_then(|seed| seed.host_str().map(str::to_lowercase))
            .unwrap_or_default()
    } else {
        domain
    };
}

/// Computes a SHA-256 fingerprint of the effective configuration
///
/// Logged at startup so that output produced by different runs can be
/// correlated with the settings that produced it.
pub fn config_fingerprint(config: &Config) -> String {
    let rendered = toml::to_string(config).unwrap_or_else(|_| format!("{:?}", config));
    let mut hasher = Sha256::new();
    hasher.update(rendered.as_bytes());
    hex::encode(hasher.finalize())
}

fn parse_number<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{}': {}", value, e),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{}' is not a boolean", value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_full_toml() {
        let config = parse_config_str(
            r#"
[crawler]
seed-url = "https://example.edu/"
domain = "example.edu"
max-pages = 25
respect-robots = false
checkpoint-interval = 5

[politeness]
user-agent = "TestCrawler/1.0"
rate-limit-seconds = 0.5
timeout = 20

[output]
base-dir = "/tmp/corpus"
"#,
        )
        .unwrap();

        assert_eq!(config.crawler.seed_url, "https://example.edu/");
        assert_eq!(config.crawler.max_pages, 25);
        assert!(!config.crawler.respect_robots);
        assert_eq!(config.politeness.rate_limit_seconds, 0.5);
        assert_eq!(config.politeness.max_retries, 3);
        assert_eq!(config.output.base_dir, PathBuf::from("/tmp/corpus"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = parse_config_str("[crawler]\nseed-url = \"https://a.com/\"\nmax-depth = 3\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(parse_config_str("this is not valid TOML {{{").is_err());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = parse_config_str("[crawler]\nmax-pages = 10\n").unwrap();
        apply_env_overrides(
            &mut config,
            env(&[
                ("MAX_PAGES", "2"),
                ("SEED_URL", "https://example.edu/"),
                ("RESPECT_ROBOTS", "no"),
                ("RATE_LIMIT_SECONDS", "0"),
                ("PATH", "/usr/bin"),
            ]),
        )
        .unwrap();

        assert_eq!(config.crawler.max_pages, 2);
        assert_eq!(config.crawler.seed_url, "https://example.edu/");
        assert!(!config.crawler.respect_robots);
        assert_eq!(config.politeness.rate_limit_seconds, 0.0);
    }

    #[test]
    fn test_malformed_env_value_fails() {
        let mut config = Config::default();
        let result = apply_env_overrides(&mut config, env(&[("MAX_PAGES", "lots")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let result = apply_env_overrides(&mut config, env(&[("RESPECT_ROBOTS", "maybe")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let result = apply_env_overrides(&mut config, env(&[("MAX_PAGES", "-1")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_env_duration_fails_validation() {
        let mut config = Config::default();
        config.crawler.seed_url = "https://example.edu/".to_string();
        apply_env_overrides(&mut config, env(&[("RATE_LIMIT_SECONDS", "1e30")])).unwrap();
        finalize(&mut config);

        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_domain_defaults_to_seed_host() {
        let mut config = Config::default();
        config.crawler.seed_url = "https://Example.EDU/start".to_string();
        finalize(&mut config);
        assert_eq!(config.crawler.domain, "example.edu");
    }

    #[test]
    fn test_load_config_from_file() {
        let file = create_temp_config(
            "[crawler]\nseed-url = \"https://example.edu/\"\ndomain = \"Example.edu\"\n",
        );
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.crawler.domain, "example.edu");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Some(Path::new("/nonexistent/corpus.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let mut config = Config::default();
        config.crawler.seed_url = "https://example.edu/".to_string();

        let first = config_fingerprint(&config);
        assert_eq!(first, config_fingerprint(&config));
        assert_eq!(first.len(), 64);

        config.crawler.max_pages = 9;
        assert_ne!(first, config_fingerprint(&config));
    }
}
