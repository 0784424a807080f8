//! Resolver configuration with sensible defaults.
//!
//! [`MatchConfig`] controls where the catalog lives, how politely it is
//! scraped, and how the batch is scheduled. The defaults are tuned for a
//! catalog that blocks bursty clients.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Hard ceiling on candidates kept per query.
pub const MAX_CANDIDATES: usize = 10;

/// Shortest allowed delay between task submissions.
pub const MIN_STAGGER_DELAY_MS: u64 = 1_000;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Configuration for a resolve run.
///
/// Use [`Default::default()`] for production defaults, or load overrides from
/// TOML; every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Catalog origin, e.g. `https://pharmeasy.in`.
    pub catalog_base_url: String,
    /// Path of the search endpoint.
    pub search_path: String,
    /// Query parameter that carries the search string.
    pub search_param: String,
    /// Path prefix of product pages, joined with a product slug.
    pub product_path: String,
    /// Maximum catalog requests per second across all workers.
    pub catalog_calls_per_second: f64,
    /// Maximum assisted-extraction calls per second.
    pub assisted_calls_per_second: f64,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_seconds: u64,
    /// Attempts per fetch, including the first.
    pub max_attempts: u32,
    /// Base delay before retrying a failed attempt.
    pub retry_base_delay_ms: u64,
    /// Upper bound of the random jitter added to every retry delay.
    pub retry_max_jitter_ms: u64,
    /// Fixed wait after a 429 response.
    pub rate_limited_delay_ms: u64,
    /// Upper bound on concurrent pipelines.
    pub max_workers: usize,
    /// Delay between task submissions, at least [`MIN_STAGGER_DELAY_MS`].
    pub stagger_delay_ms: u64,
    /// Deadline for one fetch → extract → score pipeline.
    pub task_timeout_seconds: u64,
    /// Candidates kept per query (1..=10).
    pub max_candidates: usize,
    /// Characters kept from the head of a page for fallback parsing.
    pub truncate_head_chars: usize,
    /// Characters kept from the middle of a page for fallback parsing.
    pub truncate_middle_chars: usize,
    /// Custom User-Agent. If `None`, rotates through built-in browser profiles.
    pub user_agent: Option<String>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            catalog_base_url: "https://pharmeasy.in".into(),
            search_path: "/search/all".into(),
            search_param: "name".into(),
            product_path: "/online-medicine-order".into(),
            catalog_calls_per_second: 0.5,
            assisted_calls_per_second: 5.0,
            request_timeout_seconds: 20,
            max_attempts: 3,
            retry_base_delay_ms: 1_000,
            retry_max_jitter_ms: 1_500,
            rate_limited_delay_ms: 10_000,
            max_workers: 5,
            stagger_delay_ms: 1_000,
            task_timeout_seconds: 120,
            max_candidates: MAX_CANDIDATES,
            truncate_head_chars: 15_000,
            truncate_middle_chars: 15_000,
            user_agent: None,
        }
    }
}

impl MatchConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Validates this configuration, returning an error if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.base_url()?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::Invalid(
                "catalog_base_url must be an absolute http(s) URL".into(),
            ));
        }
        if self.search_param.is_empty() {
            return Err(ConfigError::Invalid("search_param must not be empty".into()));
        }
        if !(self.catalog_calls_per_second.is_finite() && self.catalog_calls_per_second > 0.0) {
            return Err(ConfigError::Invalid(
                "catalog_calls_per_second must be greater than 0".into(),
            ));
        }
        if !(self.assisted_calls_per_second.is_finite() && self.assisted_calls_per_second > 0.0) {
            return Err(ConfigError::Invalid(
                "assisted_calls_per_second must be greater than 0".into(),
            ));
        }
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be greater than 0".into(),
            ));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "max_workers must be greater than 0".into(),
            ));
        }
        if self.stagger_delay_ms < MIN_STAGGER_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "stagger_delay_ms must be at least {MIN_STAGGER_DELAY_MS}"
            )));
        }
        if self.task_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "task_timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.max_candidates == 0 || self.max_candidates > MAX_CANDIDATES {
            return Err(ConfigError::Invalid(format!(
                "max_candidates must be between 1 and {MAX_CANDIDATES}"
            )));
        }
        if self.truncate_head_chars == 0 {
            return Err(ConfigError::Invalid(
                "truncate_head_chars must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Parsed catalog origin.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.catalog_base_url)
            .map_err(|e| ConfigError::Invalid(format!("catalog_base_url: {e}")))
    }

    /// Search URL for a raw query string.
    ///
    /// The query is percent-encoded, so the same input always yields the
    /// same link.
    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}{}?{}={}",
            self.catalog_base_url.trim_end_matches('/'),
            self.search_path,
            self.search_param,
            urlencoding::encode(query.trim())
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn stagger_delay(&self) -> Duration {
        Duration::from_millis(self.stagger_delay_ms)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_seconds)
    }
}
