//! Catalog fetching.
//!
//! [`CatalogFetcher`] is a pure content-retrieval boundary: it turns a search
//! string into the raw body of the catalog's search page and knows nothing
//! about products.

mod backoff;
mod headers;

pub use backoff::*;
pub use headers::*;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::config::MatchConfig;
use crate::rate_limit::RateLimiter;

/// Fetch errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("blocked by catalog (HTTP {status})")]
    Blocked { status: u16 },

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("HTTP client error: {0}")]
    Client(String),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Source of raw search-page content for a query.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the search page for `query`.
    async fn fetch(&self, query: &str) -> FetchResult<String>;
}

/// HTTP fetcher for the catalog search endpoint.
pub struct CatalogFetcher {
    client: reqwest::Client,
    config: MatchConfig,
    limiter: Arc<RateLimiter>,
    headers: HeaderRotation,
    policy: RetryPolicy,
}

impl CatalogFetcher {
    /// Build a fetcher with its own catalog rate limiter.
    pub fn new(config: MatchConfig) -> FetchResult<Self> {
        let limiter = Arc::new(RateLimiter::new(config.catalog_calls_per_second));
        Self::with_limiter(config, limiter)
    }

    /// Build a fetcher that shares an existing catalog limiter.
    pub fn with_limiter(config: MatchConfig, limiter: Arc<RateLimiter>) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Client(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            headers: HeaderRotation::new(config.user_agent.clone()),
            policy: RetryPolicy::from_config(&config),
            limiter,
            config,
        })
    }

    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The limiter gating every attempt.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Profile that the next attempt will use.
    pub fn current_profile(&self) -> &'static BrowserProfile {
        self.headers.current()
    }

    /// One GET against the search endpoint.
    ///
    /// Returns the body on 2xx, or the error class to retry with.
    async fn attempt(&self, url: &str) -> Result<String, (FetchError, Option<ErrorClass>)> {
        let response = self
            .client
            .get(url)
            .headers(self.headers.headers())
            .send()
            .await
            .map_err(|e| {
                (
                    FetchError::Network(format!("catalog request failed: {e}")),
                    Some(ErrorClass::Network),
                )
            })?;

        let status = response.status();
        if status.is_success() {
            return response.text().await.map_err(|e| {
                (
                    FetchError::Network(format!("catalog response read failed: {e}")),
                    Some(ErrorClass::Network),
                )
            });
        }

        match status {
            StatusCode::TOO_MANY_REQUESTS => Err((
                FetchError::Blocked {
                    status: status.as_u16(),
                },
                Some(ErrorClass::RateLimited),
            )),
            StatusCode::FORBIDDEN => Err((
                FetchError::Blocked {
                    status: status.as_u16(),
                },
                Some(ErrorClass::Blocked),
            )),
            _ => Err((FetchError::Status(status.as_u16()), None)),
        }
    }
}

#[async_trait]
impl CatalogSource for CatalogFetcher {
    async fn fetch(&self, query: &str) -> FetchResult<String> {
        let url = self.config.search_url(query);
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.limiter.wait_if_needed().await;
            tracing::debug!(attempt, url = %url, "fetching catalog search page");

            let (err, class) = match self.attempt(&url).await {
                Ok(body) => {
                    tracing::debug!(attempt, bytes = body.len(), "catalog response received");
                    return Ok(body);
                }
                Err(failure) => failure,
            };

            let Some(class) = class else {
                tracing::warn!(error = %err, "catalog returned non-retryable status");
                return Err(err);
            };
            if !self.policy.should_retry(attempt) {
                tracing::warn!(attempt, error = %err, "catalog fetch retries exhausted");
                return Err(err);
            }

            if class == ErrorClass::Blocked {
                let profile = self.headers.rotate();
                tracing::warn!(attempt, user_agent = profile.user_agent, "blocked, rotating header profile");
            }

            let delay = self.policy.delay(attempt, class, &mut rand::thread_rng());
            tracing::warn!(
                attempt,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "catalog fetch failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_builds_with_default_config() {
        let fetcher = CatalogFetcher::new(MatchConfig::default());
        assert!(fetcher.is_ok());
    }

    #[test]
    fn test_fetch_error_display() {
        assert_eq!(
            FetchError::Blocked { status: 403 }.to_string(),
            "blocked by catalog (HTTP 403)"
        );
        assert_eq!(FetchError::Status(404).to_string(), "unexpected HTTP status 404");
    }

    #[test]
    fn test_fetcher_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CatalogFetcher>();
    }
}
