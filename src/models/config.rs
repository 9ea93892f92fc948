//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::OrgSelectors;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and source-site settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Listing markup selectors
    #[serde(default)]
    pub selectors: OrgSelectors,

    /// SQLite file locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Which organizations a run refreshes
    #[serde(default)]
    pub run: RunConfig,

    /// Log level and destination
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        if self.source.page_size == 0 {
            return Err(AppError::validation("source.page_size must be > 0"));
        }
        if self.source.max_pages == 0 {
            return Err(AppError::validation("source.max_pages must be > 0"));
        }
        url::Url::parse(&self.source.base_url).map_err(|e| {
            AppError::validation(format!(
                "source.base_url '{}' is not a URL: {e}",
                self.source.base_url
            ))
        })?;
        if self.storage.database.trim().is_empty() {
            return Err(AppError::validation("storage.database is empty"));
        }
        for (key, selector) in self.selectors.entries() {
            scraper::Selector::parse(selector)
                .map_err(|e| {
                    AppError::selector(format!("selectors.{key}: {selector}"), format!("{e:?}"))
                })?;
        }
        Ok(())
    }

    /// Seed symbols, trimmed and upper-cased, empties dropped.
    pub fn seed_symbols(&self) -> Vec<String> {
        self.run
            .seed
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// HTTP client and source-site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Site root; API endpoints and relative links resolve against it
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between organizations (and listing pages) in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Cells per listing page
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Upper bound on listing pages walked per sort method
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Listing sort orders walked by discovery
    #[serde(default = "defaults::sort_methods")]
    pub sort_methods: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            page_size: defaults::page_size(),
            max_pages: defaults::max_pages(),
            sort_methods: defaults::sort_methods(),
        }
    }
}

/// SQLite file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Snapshot database file
    #[serde(default = "defaults::database")]
    pub database: String,

    /// Separate history database file; history lives in `database` when unset
    #[serde(default)]
    pub history_database: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: defaults::database(),
            history_database: None,
        }
    }
}

/// Selection of organizations refreshed by a run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunConfig {
    /// Only refresh organizations not seen for this many hours (0 = all)
    #[serde(default)]
    pub stale_after_hours: u64,

    /// Symbols tracked even before they are in the store
    #[serde(default)]
    pub seed: Vec<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level filter
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Append-only log file; stderr when unset
    #[serde(default = "defaults::log_file")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            file: defaults::log_file(),
        }
    }
}

mod defaults {
    // Source defaults
    pub fn base_url() -> String {
        "https://robertsspaceindustries.com".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; orgwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        500
    }
    pub fn page_size() -> u32 {
        12
    }
    pub fn max_pages() -> u32 {
        400
    }
    pub fn sort_methods() -> Vec<String> {
        [
            "created_desc",
            "created_asc",
            "size_desc",
            "size_asc",
            "active_desc",
            "active_asc",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    // Storage defaults
    pub fn database() -> String {
        "data/organizations.db".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
    pub fn log_file() -> Option<String> {
        Some("data/orgwatch.log".into())
    }
}
