//! MedMatch Core Library
//!
//! Resolves prescribed medications to purchasable pharmacy-catalog listings,
//! with an explainable confidence score for every pick.
//!
//! # Architecture
//!
//! ```text
//!  [MedicationQuery; N]
//!          │
//!          ▼
//!      Resolver ── bounded pool, staggered submission, per-task deadline
//!          │
//!          ├──► CatalogFetcher ◄── RateLimiter (catalog)
//!          │      retry/backoff, header rotation
//!          │
//!          ├──► ProductExtractor
//!          │      A: embedded JSON  →  B: heuristic / assisted parser
//!          │
//!          └──► CandidateRanker (MatchScorer by default)
//!                 exact name 40 · strength 30 · similarity 20 · category 10
//!          │
//!          ▼
//!   [MatchResult; N]  (same order, fallback search link when unmatched)
//! ```
//!
//! # Core Principle
//!
//! **Every query gets a result.** Network failures, empty pages and timeouts
//! produce degraded results with a catalog search link; they never fail the
//! batch.
//!
//! # Modules
//!
//! - [`config`]: Tunable configuration with TOML loading
//! - [`rate_limit`]: Minimum-interval limiter shared by concurrent tasks
//! - [`fetch`]: Catalog fetcher with retry policy and header rotation
//! - [`extract`]: Structured-data and fallback product extraction
//! - [`resolver`]: Normalizer, scorer and batch orchestration
//! - [`models`]: Domain types (MedicationQuery, CandidateProduct, MatchResult)

pub mod config;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod rate_limit;
pub mod resolver;

// Re-export commonly used types
pub use config::{ConfigError, MatchConfig};
pub use extract::{ExtractError, HeuristicParser, ProductExtractor, ProductParser};
pub use fetch::{CatalogFetcher, CatalogSource, FetchError, RetryPolicy};
pub use models::{
    CandidateProduct, ConfidenceBand, MatchResult, MatchStatus, MedicationQuery, ScoreBreakdown,
};
pub use rate_limit::RateLimiter;
pub use resolver::{CandidateRanker, MatchScorer, RankOutcome, Resolver, ResolverError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MedMatchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

impl From<ConfigError> for MedMatchError {
    fn from(e: ConfigError) -> Self {
        MedMatchError::ConfigError(e.to_string())
    }
}

impl From<ResolverError> for MedMatchError {
    fn from(e: ResolverError) -> Self {
        let message = e.to_string();
        match e {
            ResolverError::InvalidQuery { .. } => MedMatchError::InvalidInput(message),
            ResolverError::Config(inner) => inner.into(),
            _ => MedMatchError::NetworkError(message),
        }
    }
}

impl From<serde_json::Error> for MedMatchError {
    fn from(e: serde_json::Error) -> Self {
        MedMatchError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for MedMatchError {
    fn from(e: std::io::Error) -> Self {
        MedMatchError::RuntimeError(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Create a resolver for the live catalog.
///
/// `config_toml` overrides defaults; pass `None` for production defaults.
#[uniffi::export]
pub fn open_resolver(config_toml: Option<String>) -> Result<Arc<MedMatchCore>, MedMatchError> {
    let config = match config_toml {
        Some(raw) => MatchConfig::from_toml_str(&raw)?,
        None => MatchConfig::default(),
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let resolver = Resolver::with_defaults(config)?;
    Ok(Arc::new(MedMatchCore { runtime, resolver }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Resolver handle for FFI hosts. Calls block on an owned runtime.
#[derive(uniffi::Object)]
pub struct MedMatchCore {
    runtime: tokio::runtime::Runtime,
    resolver: Resolver,
}

#[uniffi::export]
impl MedMatchCore {
    /// Resolve a batch of medications; one result per query, same order.
    pub fn resolve_medications(
        &self,
        queries: Vec<FfiMedicationQuery>,
    ) -> Result<Vec<FfiMatchResult>, MedMatchError> {
        let queries: Vec<MedicationQuery> = queries.into_iter().map(Into::into).collect();
        let results = self.runtime.block_on(self.resolver.resolve(&queries))?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    /// Score a candidate list offline, without touching the catalog.
    pub fn score_candidates(
        &self,
        query: FfiMedicationQuery,
        candidates: Vec<FfiCandidateProduct>,
    ) -> FfiRankOutcome {
        let query: MedicationQuery = query.into();
        let candidates: Vec<CandidateProduct> = candidates.into_iter().map(Into::into).collect();
        MatchScorer::new().score(&query, &candidates).into()
    }

    /// Catalog search link for a medication name.
    pub fn fallback_url(&self, name: String) -> String {
        self.resolver.fallback_url(&MedicationQuery::new(name))
    }

    /// Search string the resolver would send for a query.
    pub fn search_term(&self, query: FfiMedicationQuery) -> String {
        self.resolver.search_term(&query.into())
    }

    /// Resolve a batch given as JSON; returns results as JSON.
    pub fn resolve_json(&self, queries_json: String) -> Result<String, MedMatchError> {
        let queries: Vec<MedicationQuery> = serde_json::from_str(&queries_json)?;
        let results = self.runtime.block_on(self.resolver.resolve(&queries))?;
        Ok(serde_json::to_string(&results)?)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe medication query.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicationQuery {
    pub name: String,
    pub strength: Option<String>,
    pub form: Option<String>,
    pub instructions: Option<String>,
}

impl From<FfiMedicationQuery> for MedicationQuery {
    fn from(q: FfiMedicationQuery) -> Self {
        MedicationQuery {
            name: q.name,
            strength: q.strength,
            form: q.form,
            instructions: q.instructions,
        }
    }
}

impl From<MedicationQuery> for FfiMedicationQuery {
    fn from(q: MedicationQuery) -> Self {
        Self {
            name: q.name,
            strength: q.strength,
            form: q.form,
            instructions: q.instructions,
        }
    }
}

/// FFI-safe catalog listing.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCandidateProduct {
    pub name: String,
    pub url: String,
}

impl From<FfiCandidateProduct> for CandidateProduct {
    fn from(p: FfiCandidateProduct) -> Self {
        CandidateProduct::new(p.name, p.url)
    }
}

impl From<CandidateProduct> for FfiCandidateProduct {
    fn from(p: CandidateProduct) -> Self {
        Self {
            name: p.name,
            url: p.url,
        }
    }
}

/// FFI-safe score breakdown.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiScoreBreakdown {
    pub exact_name: u8,
    pub strength: u8,
    pub name_similarity: u8,
    pub category: u8,
    pub total: u8,
}

impl From<ScoreBreakdown> for FfiScoreBreakdown {
    fn from(b: ScoreBreakdown) -> Self {
        Self {
            exact_name: b.exact_name,
            strength: b.strength,
            name_similarity: b.name_similarity,
            category: b.category,
            total: b.total(),
        }
    }
}

/// FFI-safe match status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiMatchStatus {
    Matched,
    NoCandidatesFound,
    FetchFailed,
    Timeout,
}

impl From<MatchStatus> for FfiMatchStatus {
    fn from(status: MatchStatus) -> Self {
        match status {
            MatchStatus::Matched => FfiMatchStatus::Matched,
            MatchStatus::NoCandidatesFound => FfiMatchStatus::NoCandidatesFound,
            MatchStatus::FetchFailed => FfiMatchStatus::FetchFailed,
            MatchStatus::Timeout => FfiMatchStatus::Timeout,
        }
    }
}

/// FFI-safe confidence band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiConfidenceBand {
    High,
    Medium,
    Low,
}

impl From<ConfidenceBand> for FfiConfidenceBand {
    fn from(band: ConfidenceBand) -> Self {
        match band {
            ConfidenceBand::High => FfiConfidenceBand::High,
            ConfidenceBand::Medium => FfiConfidenceBand::Medium,
            ConfidenceBand::Low => FfiConfidenceBand::Low,
        }
    }
}

/// FFI-safe match result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMatchResult {
    pub query: FfiMedicationQuery,
    pub search_term: String,
    pub candidates: Vec<FfiCandidateProduct>,
    pub selected: Option<FfiCandidateProduct>,
    pub confidence: u8,
    pub band: FfiConfidenceBand,
    pub breakdown: Option<FfiScoreBreakdown>,
    pub status: FfiMatchStatus,
    pub fallback_url: Option<String>,
    pub reason: String,
    pub resolved_at: String,
}

impl From<MatchResult> for FfiMatchResult {
    fn from(r: MatchResult) -> Self {
        Self {
            band: r.band().into(),
            query: r.query.into(),
            search_term: r.search_term,
            candidates: r.candidates.into_iter().map(Into::into).collect(),
            selected: r.selected.map(Into::into),
            confidence: r.confidence,
            breakdown: r.breakdown.map(Into::into),
            status: r.status.into(),
            fallback_url: r.fallback_url,
            reason: r.reason,
            resolved_at: r.resolved_at,
        }
    }
}

/// FFI-safe scoring outcome.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRankOutcome {
    pub selected: Option<FfiCandidateProduct>,
    pub breakdown: FfiScoreBreakdown,
    pub confidence: u8,
}

impl From<RankOutcome> for FfiRankOutcome {
    fn from(o: RankOutcome) -> Self {
        Self {
            selected: o.selected.map(Into::into),
            breakdown: o.breakdown.into(),
            confidence: o.confidence,
        }
    }
}
