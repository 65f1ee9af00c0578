//! Startup configuration
//!
//! Two sources:
//! - environment variables (after `.env` is loaded), see `Config::from_env`
//! - the 8-line values file, see `Config::from_values_file`, for the
//!   credentials; the remaining settings still come from the environment
//!
//! Environment variables:
//! - `COLLECTION_SLUG` (required), `CONTRACT_ADDRESS` (resolved at startup if unset)
//! - `TUMBLR_CONSUMER_KEY`, `TUMBLR_CONSUMER_SECRET`, `TUMBLR_OAUTH_TOKEN`,
//!   `TUMBLR_OAUTH_TOKEN_SECRET`, `TUMBLR_BLOG_NAME`, `OPENSEA_API_KEY` (required)
//! - `POST_TAGS` (default: `None`)
//! - `LEDGER_PATH` (default: `{collection}_announced.db`)
//! - `FEED_LIMIT` (default: 10), `FEED_TIMEOUT_SECS` (default: 3),
//!   `PUBLISH_TIMEOUT_SECS` (default: 30)
//! - `OPENSEA_API_URL`, `TUMBLR_API_URL`, `USER_AGENT`
//! - `BACKOFF_POSTED_SECS` (5), `BACKOFF_NO_NEWS_SECS` (5),
//!   `BACKOFF_PUBLISH_ERROR_SECS` (15), `BACKOFF_FEED_UNAVAILABLE_SECS` (30)

use crate::blog::{self, OAuthCredentials};
use crate::marketplace;
use crate::pipeline::pacing::Pacing;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const VALUES_FILE_LINES: usize = 8;
pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_LINE_CHARS: usize = 120;
pub const DEFAULT_USER_AGENT: &str = "salecaster/0.1";

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
    ValuesFile(String),
    Io(std::io::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
            ConfigError::ValuesFile(msg) => write!(f, "Invalid values file: {}", msg),
            ConfigError::Io(e) => write!(f, "Could not read configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub collection_slug: String,
    pub contract_address: Option<String>,
    /// As configured, each starting with `#`
    pub tags: Vec<String>,
    pub credentials: OAuthCredentials,
    pub blog_name: String,
    pub opensea_api_key: String,
    pub ledger_path: String,
    pub feed_limit: usize,
    pub feed_timeout: Duration,
    pub publish_timeout: Duration,
    pub opensea_api_url: String,
    pub tumblr_api_url: String,
    pub user_agent: String,
    pub pacing: Pacing,
}

/// The values that identify the bot and its accounts
struct Identity {
    tags: Vec<String>,
    collection_slug: String,
    credentials: OAuthCredentials,
    opensea_api_key: String,
    blog_name: String,
}

/// Parse the tag line: `None` for no tags, otherwise up to 10
/// whitespace-separated `#tags` in fewer than 120 characters.
pub fn parse_tags(line: &str) -> Result<Vec<String>, ConfigError> {
    let line = line.trim();
    if line == "None" {
        return Ok(Vec::new());
    }
    if line.is_empty() {
        return Err(ConfigError::InvalidValue("tags field is empty".to_string()));
    }
    if line.chars().count() >= MAX_TAG_LINE_CHARS {
        return Err(ConfigError::InvalidValue(
            "too many characters in tags".to_string(),
        ));
    }

    let tags: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    if tags.len() > MAX_TAGS {
        return Err(ConfigError::InvalidValue(format!(
            "too many tags ({} > {})",
            tags.len(),
            MAX_TAGS
        )));
    }
    if let Some(bad) = tags.iter().find(|tag| !tag.starts_with('#')) {
        return Err(ConfigError::InvalidValue(format!(
            "every tag must start with '#', got {:?}",
            bad
        )));
    }

    Ok(tags)
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Invalid {} '{}', defaulting to {}", key, raw, default);
                default
            }
        },
    }
}

impl Config {
    /// Load everything from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load everything through `lookup` (env-style key -> value)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tags_line = lookup("POST_TAGS").unwrap_or_else(|| "None".to_string());

        let identity = Identity {
            tags: parse_tags(&tags_line)?,
            collection_slug: required(&lookup, "COLLECTION_SLUG")?,
            credentials: OAuthCredentials {
                consumer_key: required(&lookup, "TUMBLR_CONSUMER_KEY")?,
                consumer_secret: required(&lookup, "TUMBLR_CONSUMER_SECRET")?,
                token: required(&lookup, "TUMBLR_OAUTH_TOKEN")?,
                token_secret: required(&lookup, "TUMBLR_OAUTH_TOKEN_SECRET")?,
            },
            opensea_api_key: required(&lookup, "OPENSEA_API_KEY")?,
            blog_name: required(&lookup, "TUMBLR_BLOG_NAME")?,
        };

        Self::assemble(identity, &lookup)
    }

    /// Credentials from the values file, other settings from the environment
    pub fn from_values_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_values_file_with(path, |key| env::var(key).ok())
    }

    /// Values file layout, one field per line:
    /// tags, collection slug, consumer key, consumer secret, oauth token,
    /// oauth token secret, marketplace API key, blog name.
    pub fn from_values_file_with<F>(path: impl AsRef<Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();

        let is_txt = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if !is_txt {
            return Err(ConfigError::ValuesFile(format!(
                "{} must be a .txt file",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let lines: Vec<&str> = content.lines().map(str::trim).collect();
        if lines.len() != VALUES_FILE_LINES {
            return Err(ConfigError::ValuesFile(format!(
                "expected {} lines, found {}",
                VALUES_FILE_LINES,
                lines.len()
            )));
        }

        let field = |index: usize, name: &str| -> Result<String, ConfigError> {
            let value = lines[index];
            if value.is_empty() {
                Err(ConfigError::ValuesFile(format!("line {} ({}) is empty", index + 1, name)))
            } else {
                Ok(value.to_string())
            }
        };

        let identity = Identity {
            tags: parse_tags(lines[0])?,
            collection_slug: field(1, "collection")?,
            credentials: OAuthCredentials {
                consumer_key: field(2, "consumer key")?,
                consumer_secret: field(3, "consumer secret")?,
                token: field(4, "oauth token")?,
                token_secret: field(5, "oauth token secret")?,
            },
            opensea_api_key: field(6, "marketplace API key")?,
            blog_name: field(7, "blog name")?,
        };

        Self::assemble(identity, &lookup)
    }

    fn assemble<F>(identity: Identity, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let contract_address = lookup("CONTRACT_ADDRESS")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let ledger_path = lookup("LEDGER_PATH")
            .unwrap_or_else(|| format!("{}_announced.db", identity.collection_slug));

        let pacing = Pacing {
            posted: Duration::from_secs(parse_or(lookup, "BACKOFF_POSTED_SECS", 5u64)),
            no_news: Duration::from_secs(parse_or(lookup, "BACKOFF_NO_NEWS_SECS", 5u64)),
            publish_error: Duration::from_secs(parse_or(lookup, "BACKOFF_PUBLISH_ERROR_SECS", 15u64)),
            feed_unavailable: Duration::from_secs(parse_or(
                lookup,
                "BACKOFF_FEED_UNAVAILABLE_SECS",
                30u64,
            )),
        };

        let config = Self {
            collection_slug: identity.collection_slug,
            contract_address,
            tags: identity.tags,
            credentials: identity.credentials,
            blog_name: identity.blog_name,
            opensea_api_key: identity.opensea_api_key,
            ledger_path,
            feed_limit: parse_or(lookup, "FEED_LIMIT", 10usize),
            feed_timeout: Duration::from_secs(parse_or(lookup, "FEED_TIMEOUT_SECS", 3u64)),
            publish_timeout: Duration::from_secs(parse_or(lookup, "PUBLISH_TIMEOUT_SECS", 30u64)),
            opensea_api_url: lookup("OPENSEA_API_URL")
                .unwrap_or_else(|| marketplace::opensea::DEFAULT_BASE_URL.to_string()),
            tumblr_api_url: lookup("TUMBLR_API_URL")
                .unwrap_or_else(|| blog::tumblr::DEFAULT_BASE_URL.to_string()),
            user_agent: lookup("USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            pacing,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed_limit == 0 {
            return Err(ConfigError::InvalidValue("FEED_LIMIT must be at least 1".to_string()));
        }
        if self.feed_timeout.is_zero() || self.publish_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "request timeouts must be at least 1 second".to_string(),
            ));
        }
        for url in [&self.opensea_api_url, &self.tumblr_api_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue(format!(
                    "API URL must start with http:// or https://, got {}",
                    url
                )));
            }
        }
        self.pacing
            .validate()
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    /// Tags as the platform expects them, without the leading `#`
    pub fn post_tags(&self) -> Vec<String> {
        self.tags
            .iter()
            .map(|tag| tag.trim_start_matches('#').to_string())
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("COLLECTION_SLUG", "cool-cats"),
            ("TUMBLR_CONSUMER_KEY", "ck"),
            ("TUMBLR_CONSUMER_SECRET", "cs"),
            ("TUMBLR_OAUTH_TOKEN", "tok"),
            ("TUMBLR_OAUTH_TOKEN_SECRET", "toks"),
            ("TUMBLR_BLOG_NAME", "coolcatsales"),
            ("OPENSEA_API_KEY", "os-key"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_default_config() {
        let config = load(&base_env()).unwrap();

        assert_eq!(config.collection_slug, "cool-cats");
        assert_eq!(config.contract_address, None);
        assert!(config.tags.is_empty());
        assert_eq!(config.ledger_path, "cool-cats_announced.db");
        assert_eq!(config.feed_limit, 10);
        assert_eq!(config.feed_timeout, Duration::from_secs(3));
        assert_eq!(config.pacing, Pacing::default());
        assert_eq!(config.opensea_api_url, "https://api.opensea.io/api/v1");
    }

    #[test]
    fn test_custom_config() {
        let mut env = base_env();
        env.insert("POST_TAGS", "#nft #coolcats");
        env.insert("CONTRACT_ADDRESS", "0x1a92");
        env.insert("LEDGER_PATH", "/tmp/ledger.db");
        env.insert("FEED_LIMIT", "20");
        env.insert("BACKOFF_FEED_UNAVAILABLE_SECS", "120");

        let config = load(&env).unwrap();

        assert_eq!(config.tags, vec!["#nft", "#coolcats"]);
        assert_eq!(config.post_tags(), vec!["nft", "coolcats"]);
        assert_eq!(config.contract_address.as_deref(), Some("0x1a92"));
        assert_eq!(config.ledger_path, "/tmp/ledger.db");
        assert_eq!(config.feed_limit, 20);
        assert_eq!(config.pacing.feed_unavailable, Duration::from_secs(120));
    }

    #[test]
    fn test_missing_required_variable() {
        let mut env = base_env();
        env.remove("OPENSEA_API_KEY");

        match load(&env) {
            Err(ConfigError::MissingVariable(var)) => assert_eq!(var, "OPENSEA_API_KEY"),
            other => panic!("expected missing variable, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_number_falls_back_to_default() {
        let mut env = base_env();
        env.insert("FEED_LIMIT", "lots");

        assert_eq!(load(&env).unwrap().feed_limit, 10);
    }

    #[test]
    fn test_inverted_backoff_rejected() {
        let mut env = base_env();
        env.insert("BACKOFF_PUBLISH_ERROR_SECS", "60");

        assert!(matches!(load(&env), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_tag_rules() {
        assert_eq!(parse_tags("None").unwrap(), Vec::<String>::new());
        assert_eq!(parse_tags(" #a #b ").unwrap(), vec!["#a", "#b"]);
        assert!(parse_tags("").is_err());
        assert!(parse_tags("#a b").is_err());
        assert!(parse_tags("#1 #2 #3 #4 #5 #6 #7 #8 #9 #10 #11").is_err());

        let long = format!("#{}", "x".repeat(MAX_TAG_LINE_CHARS));
        assert!(parse_tags(&long).is_err());
    }

    #[test]
    fn test_values_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("values.txt");
        std::fs::write(
            &path,
            "#nft #cats\ncool-cats\nck\ncs\ntok\ntoks\nos-key\ncoolcatsales\n",
        )
        .unwrap();

        let config = Config::from_values_file_with(&path, |_| None).unwrap();

        assert_eq!(config.tags, vec!["#nft", "#cats"]);
        assert_eq!(config.collection_slug, "cool-cats");
        assert_eq!(config.credentials.token_secret, "toks");
        assert_eq!(config.opensea_api_key, "os-key");
        assert_eq!(config.blog_name, "coolcatsales");
    }

    #[test]
    fn test_values_file_preconditions() {
        let dir = tempdir().unwrap();

        let wrong_ext = dir.path().join("values.cfg");
        std::fs::write(&wrong_ext, "None\na\nb\nc\nd\ne\nf\ng\n").unwrap();
        assert!(matches!(
            Config::from_values_file_with(&wrong_ext, |_| None),
            Err(ConfigError::ValuesFile(_))
        ));

        let short = dir.path().join("short.txt");
        std::fs::write(&short, "None\ncool-cats\n").unwrap();
        assert!(matches!(
            Config::from_values_file_with(&short, |_| None),
            Err(ConfigError::ValuesFile(_))
        ));

        let missing = dir.path().join("missing.txt");
        assert!(matches!(
            Config::from_values_file_with(&missing, |_| None),
            Err(ConfigError::Io(_))
        ));
    }
}
