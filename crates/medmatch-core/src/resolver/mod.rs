//! Batch resolver for medication queries.
//!
//! Pipeline per query: Search term → Fetch → Extract → Rank → MatchResult
//!
//! Queries run concurrently on a bounded pool with staggered submission.
//! Output order always equals input order, and every query gets a result.

mod normalizer;
mod scorer;

pub use normalizer::*;
pub use scorer::*;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::{ConfigError, MatchConfig};
use crate::extract::ProductExtractor;
use crate::fetch::{CatalogFetcher, CatalogSource, FetchError};
use crate::models::{CandidateProduct, MatchResult, MatchStatus, MedicationQuery};

/// Resolver errors.
///
/// Only `InvalidQuery` and `Config` reach callers of [`Resolver::resolve`];
/// the rest become degraded results.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Invalid query at index {index}: {reason}")]
    InvalidQuery { index: usize, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Pipeline exceeded its {}s deadline", .0.as_secs())]
    TaskTimeout(Duration),

    #[error("Pipeline task failed: {0}")]
    TaskPanicked(String),
}

pub type ResolverResult<T> = Result<T, ResolverError>;

impl ResolverError {
    /// Status recorded for a query whose pipeline ended in this error.
    pub fn status(&self) -> MatchStatus {
        match self {
            ResolverError::TaskTimeout(_) => MatchStatus::Timeout,
            _ => MatchStatus::FetchFailed,
        }
    }
}

/// Main resolver that coordinates the full pipeline.
#[derive(Clone)]
pub struct Resolver {
    config: Arc<MatchConfig>,
    source: Arc<dyn CatalogSource>,
    extractor: Arc<ProductExtractor>,
    ranker: Arc<dyn CandidateRanker>,
    normalizer: Arc<Normalizer>,
}

impl Resolver {
    /// Resolver over the live catalog, with heuristic fallback parsing and
    /// deterministic ranking.
    pub fn with_defaults(config: MatchConfig) -> ResolverResult<Self> {
        config.validate()?;
        let fetcher = CatalogFetcher::new(config.clone())?;
        Self::new(config, Arc::new(fetcher))
    }

    /// Resolver over a custom content source.
    pub fn new(config: MatchConfig, source: Arc<dyn CatalogSource>) -> ResolverResult<Self> {
        config.validate()?;
        let extractor = ProductExtractor::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            source,
            extractor: Arc::new(extractor),
            ranker: Arc::new(MatchScorer::new()),
            normalizer: Arc::new(Normalizer::new()),
        })
    }

    /// Replace the product extractor.
    pub fn with_extractor(mut self, extractor: ProductExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Replace the candidate ranker.
    pub fn with_ranker(mut self, ranker: Arc<dyn CandidateRanker>) -> Self {
        self.ranker = ranker;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Search string sent to the catalog.
    ///
    /// Name, plus the strength token and the form when the name does not
    /// already mention them. Scoring still uses the original query.
    pub fn search_term(&self, query: &MedicationQuery) -> String {
        let name = query.name.trim();
        let lower_name = name.to_lowercase();
        let compact_name: String = lower_name.split_whitespace().collect();
        let mut parts = vec![name.to_string()];

        if let Some(strength) = self.normalizer.parse_strength(query.strength_str()) {
            let token = strength.token();
            if !compact_name.contains(token) {
                parts.push(token.to_string());
            }
        }

        let form = query.form_str().trim();
        if !form.is_empty() && !lower_name.contains(&form.to_lowercase()) {
            parts.push(form.to_string());
        }

        parts.join(" ")
    }

    /// Catalog search link for the original query name.
    pub fn fallback_url(&self, query: &MedicationQuery) -> String {
        self.config.search_url(&query.name)
    }

    /// Resolve a batch of queries.
    ///
    /// Returns exactly one result per query, in input order. Fails only when
    /// a query has an empty name, before any network work starts.
    pub async fn resolve(&self, queries: &[MedicationQuery]) -> ResolverResult<Vec<MatchResult>> {
        if let Some(index) = queries.iter().position(|q| !q.is_valid()) {
            return Err(ResolverError::InvalidQuery {
                index,
                reason: "medication name is empty".into(),
            });
        }
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.config.max_workers.min(queries.len());
        let permits = Arc::new(Semaphore::new(workers));
        let stagger = self.config.stagger_delay();
        let deadline = self.config.task_timeout();
        tracing::info!(queries = queries.len(), workers, "resolving batch");

        let mut handles = Vec::with_capacity(queries.len());
        for (index, query) in queries.iter().enumerate() {
            if index > 0 && !stagger.is_zero() {
                tokio::time::sleep(stagger).await;
            }

            let this = self.clone();
            let permits = Arc::clone(&permits);
            let query = query.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        let err = ResolverError::TaskPanicked(e.to_string());
                        return this.fallback(&query, this.search_term(&query), &err);
                    }
                };
                match tokio::time::timeout(deadline, this.run(&query)).await {
                    Ok(result) => result,
                    Err(_) => {
                        let err = ResolverError::TaskTimeout(deadline);
                        tracing::warn!(index, error = %err, "pipeline timed out");
                        this.fallback(&query, this.search_term(&query), &err)
                    }
                }
            }));
        }

        let mut results = Vec::with_capacity(queries.len());
        for (index, handle) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let err = ResolverError::TaskPanicked(e.to_string());
                    tracing::warn!(index, error = %err, "pipeline task failed");
                    let query = &queries[index];
                    self.fallback(query, self.search_term(query), &err)
                }
            };
            results.push(result);
        }

        let matched = results
            .iter()
            .filter(|r| r.status == MatchStatus::Matched)
            .count();
        tracing::info!(queries = results.len(), matched, "batch resolved");
        Ok(results)
    }

    /// Run fetch → extract → rank for one query, without a deadline.
    pub async fn resolve_one(&self, query: &MedicationQuery) -> MatchResult {
        self.run(query).await
    }

    async fn run(&self, query: &MedicationQuery) -> MatchResult {
        let search_term = self.search_term(query);
        tracing::debug!(search_term = %search_term, "fetching candidates");

        let content = match self.source.fetch(&search_term).await {
            Ok(content) => content,
            Err(e) => {
                let err = ResolverError::from(e);
                tracing::warn!(error = %err, "catalog fetch failed");
                return self.fallback(query, search_term, &err);
            }
        };

        let candidates = self.extractor.extract(&content).await;
        if candidates.is_empty() {
            tracing::debug!(search_term = %search_term, "no candidates extracted");
            return MatchResult::degraded(
                query.clone(),
                search_term,
                candidates,
                MatchStatus::NoCandidatesFound,
                self.fallback_url(query),
                "No products could be extracted from the catalog page",
            );
        }

        let outcome = self.ranker.rank(query, &candidates).await;
        match outcome.selected {
            Some(selected) if candidates.contains(&selected) => {
                tracing::debug!(
                    selected = %selected.name,
                    confidence = outcome.confidence,
                    "candidate selected"
                );
                let mut result = MatchResult::matched(
                    query.clone(),
                    search_term,
                    candidates,
                    selected,
                    outcome.confidence,
                    outcome.breakdown,
                );
                if let Some(note) = outcome.note {
                    result.reason = format!("{}. {}", result.reason, note);
                }
                result
            }
            _ => MatchResult::degraded(
                query.clone(),
                search_term,
                candidates,
                MatchStatus::NoCandidatesFound,
                self.fallback_url(query),
                "No candidate could be selected",
            ),
        }
    }

    fn fallback(
        &self,
        query: &MedicationQuery,
        search_term: String,
        err: &ResolverError,
    ) -> MatchResult {
        MatchResult::degraded(
            query.clone(),
            search_term,
            Vec::<CandidateProduct>::new(),
            err.status(),
            self.fallback_url(query),
            err.to_string(),
        )
    }
}
