//! Match resolution models produced by the resolver.

use serde::{Deserialize, Serialize};

use super::{CandidateProduct, MedicationQuery};

/// Upper bound of the exact-name component.
pub const EXACT_NAME_MAX: u8 = 40;
/// Upper bound of the strength component.
pub const STRENGTH_MAX: u8 = 30;
/// Upper bound of the name-similarity component.
pub const NAME_SIMILARITY_MAX: u8 = 20;
/// Upper bound of the category component.
pub const CATEGORY_MAX: u8 = 10;

/// Breakdown of how a candidate was scored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ScoreBreakdown {
    /// Normalized name containment / overlap (0 - 40)
    pub exact_name: u8,
    /// Strength agreement (0 - 30)
    pub strength: u8,
    /// Word-set similarity of the names (0 - 20)
    pub name_similarity: u8,
    /// Shared form / packaging vocabulary (0 - 10)
    pub category: u8,
}

impl ScoreBreakdown {
    /// Sum of all components (0 - 100).
    pub fn total(&self) -> u8 {
        self.exact_name + self.strength + self.name_similarity + self.category
    }

    /// Whether every component is within its documented bound.
    pub fn is_within_bounds(&self) -> bool {
        self.exact_name <= EXACT_NAME_MAX
            && self.strength <= STRENGTH_MAX
            && self.name_similarity <= NAME_SIMILARITY_MAX
            && self.category <= CATEGORY_MAX
    }

    /// Render the breakdown as a short reason fragment.
    pub fn explain(&self) -> String {
        format!(
            "exact name {}/{}, strength {}/{}, similarity {}/{}, category {}/{}",
            self.exact_name,
            EXACT_NAME_MAX,
            self.strength,
            STRENGTH_MAX,
            self.name_similarity,
            NAME_SIMILARITY_MAX,
            self.category,
            CATEGORY_MAX
        )
    }
}

/// Outcome of resolving one query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MatchStatus {
    /// A candidate was selected
    Matched,
    /// The catalog answered but no listing could be extracted
    NoCandidatesFound,
    /// The catalog could not be fetched (or the task failed)
    FetchFailed,
    /// The pipeline exceeded its deadline
    Timeout,
}

/// Coarse confidence level for report badges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    /// Band for a 0-100 confidence.
    pub fn from_confidence(confidence: u8) -> Self {
        match confidence {
            75..=u8::MAX => ConfidenceBand::High,
            50..=74 => ConfidenceBand::Medium,
            _ => ConfidenceBand::Low,
        }
    }
}

/// Result for one medication query.
///
/// Built once by the resolver and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    /// The query exactly as supplied
    pub query: MedicationQuery,
    /// Search string actually sent to the catalog
    pub search_term: String,
    /// Listings extracted for the query (at most 10)
    pub candidates: Vec<CandidateProduct>,
    /// Selected listing; always an element of `candidates`
    pub selected: Option<CandidateProduct>,
    /// Confidence (0 - 100)
    pub confidence: u8,
    /// Breakdown of the selected candidate's score
    pub breakdown: Option<ScoreBreakdown>,
    /// Outcome
    pub status: MatchStatus,
    /// Catalog search link for manual lookup, set whenever nothing was selected
    pub fallback_url: Option<String>,
    /// Human-readable explanation
    pub reason: String,
    /// RFC 3339 timestamp of when the result was produced
    pub resolved_at: String,
}

impl MatchResult {
    /// Build a matched result.
    pub fn matched(
        query: MedicationQuery,
        search_term: String,
        candidates: Vec<CandidateProduct>,
        selected: CandidateProduct,
        confidence: u8,
        breakdown: ScoreBreakdown,
    ) -> Self {
        let reason = format!(
            "Selected '{}' ({}; confidence {})",
            selected.name,
            breakdown.explain(),
            confidence
        );
        Self {
            query,
            search_term,
            candidates,
            selected: Some(selected),
            confidence: confidence.min(100),
            breakdown: Some(breakdown),
            status: MatchStatus::Matched,
            fallback_url: None,
            reason,
            resolved_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Build a degraded result carrying a fallback search link.
    pub fn degraded(
        query: MedicationQuery,
        search_term: String,
        candidates: Vec<CandidateProduct>,
        status: MatchStatus,
        fallback_url: String,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            query,
            search_term,
            candidates,
            selected: None,
            confidence: 0,
            breakdown: None,
            status,
            fallback_url: Some(fallback_url),
            reason: reason.into(),
            resolved_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Link a report should point at: the selected listing or the fallback search.
    pub fn link(&self) -> Option<&str> {
        self.selected
            .as_ref()
            .map(|p| p.url.as_str())
            .or(self.fallback_url.as_deref())
    }

    /// Badge level for the confidence.
    pub fn band(&self) -> ConfidenceBand {
        ConfidenceBand::from_confidence(self.confidence)
    }

    /// Check if this result needs a human to pick the listing.
    pub fn needs_review(&self) -> bool {
        self.status != MatchStatus::Matched || self.band() == ConfidenceBand::Low
    }
}
