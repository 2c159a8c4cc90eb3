//! Configuration module for feedsync.

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::feed::scheduler::parse_cron_expression;
use crate::{FeedSyncError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/feedsync.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/feedsync.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// How the scheduler decides when to refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RefetchMechanism {
    /// Fixed interval timer.
    #[default]
    Interval,
    /// Cron expression.
    Cron,
}

impl FromStr for RefetchMechanism {
    type Err = FeedSyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "interval" => Ok(RefetchMechanism::Interval),
            "cron" => Ok(RefetchMechanism::Cron),
            other => Err(FeedSyncError::Config(format!(
                "unknown refetch mechanism: {other}"
            ))),
        }
    }
}

impl fmt::Display for RefetchMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefetchMechanism::Interval => write!(f, "interval"),
            RefetchMechanism::Cron => write!(f, "cron"),
        }
    }
}

/// Refetch scheduling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RefetchConfig {
    /// Interval between scheduled runs in milliseconds.
    #[serde(default = "default_refetch_interval")]
    pub interval_ms: u64,
    /// Scheduling mechanism.
    #[serde(default)]
    pub mechanism: RefetchMechanism,
    /// Cron expression used in cron mode.
    #[serde(default = "default_cron_expression")]
    pub cron_expression: String,
    /// Upper bound on a single feed fetch in milliseconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,
}

fn default_refetch_interval() -> u64 {
    300_000
}

fn default_cron_expression() -> String {
    "*/5 * * * *".to_string()
}

fn default_fetch_timeout() -> u64 {
    15_000
}

impl Default for RefetchConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_refetch_interval(),
            mechanism: RefetchMechanism::default(),
            cron_expression: default_cron_expression(),
            fetch_timeout_ms: default_fetch_timeout(),
        }
    }
}

impl RefetchConfig {
    /// Interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Per-feed fetch timeout as a `Duration`.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// HTTP fetcher configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum accepted feed body size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
}

fn default_user_agent() -> String {
    "feedsync/0.1 (+feed reader)".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Refetch scheduling.
    #[serde(default)]
    pub refetch: RefetchConfig,
    /// HTTP fetcher.
    #[serde(default)]
    pub fetcher: FetcherConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedSyncError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file, or the defaults if the file is missing.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedSyncError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `REFETCH_INTERVAL`: interval in milliseconds
    /// - `REFETCH_MECHANISM`: `interval` or `cron`
    /// - `REFETCH_TIMEOUT`: per-feed fetch timeout in milliseconds
    /// - `DATABASE_PATH`: SQLite database path
    /// - `LOG_LEVEL`: log level
    ///
    /// Unparseable values are left unapplied and reported in the returned list,
    /// since logging is usually not initialized yet at this point.
    pub fn apply_env_overrides(&mut self) -> Vec<String> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();

        if let Some(value) = lookup("REFETCH_INTERVAL") {
            match value.trim().parse::<u64>() {
                Ok(ms) => self.refetch.interval_ms = ms,
                Err(_) => warnings.push(format!("ignoring invalid REFETCH_INTERVAL: {value}")),
            }
        }

        if let Some(value) = lookup("REFETCH_MECHANISM") {
            match value.parse::<RefetchMechanism>() {
                Ok(mechanism) => self.refetch.mechanism = mechanism,
                Err(e) => warnings.push(format!("ignoring REFETCH_MECHANISM: {e}")),
            }
        }

        if let Some(value) = lookup("REFETCH_TIMEOUT") {
            match value.trim().parse::<u64>() {
                Ok(ms) => self.refetch.fetch_timeout_ms = ms,
                Err(_) => warnings.push(format!("ignoring invalid REFETCH_TIMEOUT: {value}")),
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }

        warnings
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The refetch interval or fetch timeout is zero
    /// - Cron mode is selected with an invalid cron expression
    pub fn validate(&self) -> Result<()> {
        if self.refetch.interval_ms == 0 {
            return Err(FeedSyncError::Config(
                "refetch interval must be greater than zero".to_string(),
            ));
        }
        if self.refetch.fetch_timeout_ms == 0 {
            return Err(FeedSyncError::Config(
                "fetch timeout must be greater than zero".to_string(),
            ));
        }
        if self.refetch.mechanism == RefetchMechanism::Cron {
            parse_cron_expression(&self.refetch.cron_expression)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.database.path, "data/feedsync.db");

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/feedsync.log");

        assert_eq!(config.refetch.interval_ms, 300_000);
        assert_eq!(config.refetch.mechanism, RefetchMechanism::Interval);
        assert_eq!(config.refetch.cron_expression, "*/5 * * * *");
        assert_eq!(config.refetch.fetch_timeout_ms, 15_000);
        assert_eq!(config.refetch.interval(), Duration::from_secs(300));
        assert_eq!(config.refetch.fetch_timeout(), Duration::from_secs(15));

        assert_eq!(config.fetcher.max_redirects, 5);
        assert_eq!(config.fetcher.max_feed_size_bytes, 5 * 1024 * 1024);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[database]
path = "/tmp/feeds.db"

[refetch]
mechanism = "cron"
fetch_timeout_ms = 5000
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.database.path, "/tmp/feeds.db");
        assert_eq!(config.refetch.mechanism, RefetchMechanism::Cron);
        assert_eq!(config.refetch.fetch_timeout_ms, 5000);
        // Unspecified values fall back to defaults
        assert_eq!(config.refetch.interval_ms, 300_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.refetch.interval_ms, 300_000);
    }

    #[test]
    fn test_parse_invalid_mechanism() {
        let toml = r#"
[refetch]
mechanism = "hourly"
"#;
        let result = Config::parse(toml);
        assert!(matches!(result, Err(FeedSyncError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[refetch]\ninterval_ms = 60000\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.refetch.interval_ms, 60_000);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/feedsync.toml");
        assert!(matches!(result, Err(FeedSyncError::Io(_))));

        let config = Config::load_or_default("/nonexistent/feedsync.toml").unwrap();
        assert_eq!(config.database.path, "data/feedsync.db");
    }

    #[test]
    fn test_mechanism_from_str() {
        assert_eq!(
            "interval".parse::<RefetchMechanism>().unwrap(),
            RefetchMechanism::Interval
        );
        assert_eq!(
            " CRON ".parse::<RefetchMechanism>().unwrap(),
            RefetchMechanism::Cron
        );
        assert!("weekly".parse::<RefetchMechanism>().is_err());
        assert_eq!(RefetchMechanism::Cron.to_string(), "cron");
    }

    #[test]
    fn test_apply_overrides() {
        let env: HashMap<&str, &str> = [
            ("REFETCH_INTERVAL", "1000"),
            ("REFETCH_MECHANISM", "cron"),
            ("REFETCH_TIMEOUT", "250"),
            ("DATABASE_PATH", "other.db"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        let warnings = config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert!(warnings.is_empty());
        assert_eq!(config.refetch.interval_ms, 1000);
        assert_eq!(config.refetch.mechanism, RefetchMechanism::Cron);
        assert_eq!(config.refetch.fetch_timeout_ms, 250);
        assert_eq!(config.database.path, "other.db");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_apply_overrides_invalid_values() {
        let env: HashMap<&str, &str> = [
            ("REFETCH_INTERVAL", "five minutes"),
            ("REFETCH_MECHANISM", "sometimes"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        let warnings = config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(warnings.len(), 2);
        assert_eq!(config.refetch.interval_ms, 300_000);
        assert_eq!(config.refetch.mechanism, RefetchMechanism::Interval);
    }

    #[test]
    fn test_validate_zero_values() {
        let mut config = Config::default();
        config.refetch.interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.refetch.fetch_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_cron_expression() {
        let mut config = Config::default();
        config.refetch.mechanism = RefetchMechanism::Cron;
        assert!(config.validate().is_ok());

        config.refetch.cron_expression = "not a cron".to_string();
        assert!(config.validate().is_err());

        // Bad expressions are only checked when cron mode is active
        config.refetch.mechanism = RefetchMechanism::Interval;
        assert!(config.validate().is_ok());
    }
}
