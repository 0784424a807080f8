//! Candidate selection using multi-factor scoring.
//!
//! Scoring weights (priority order is load-bearing, values are tunable):
//! - Exact name (normalized containment or positional overlap): 40
//! - Strength agreement: 30
//! - Word-set name similarity: 20
//! - Shared form / packaging vocabulary: 10

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{CandidateProduct, MedicationQuery, ScoreBreakdown, NAME_SIMILARITY_MAX};

use super::normalizer::Normalizer;

/// Exact-name points when one normalized name contains the other.
pub const EXACT_CONTAINMENT_POINTS: u8 = 40;
/// Exact-name points when positional overlap exceeds [`OVERLAP_THRESHOLD`].
pub const EXACT_OVERLAP_POINTS: u8 = 30;
/// Fraction of matching positions over the shorter name.
pub const OVERLAP_THRESHOLD: f64 = 0.8;

/// Strength points for numerically equal strengths.
pub const STRENGTH_EQUAL_POINTS: u8 = 30;
/// Strength points within [`STRENGTH_CLOSE_RATIO`].
pub const STRENGTH_CLOSE_POINTS: u8 = 20;
/// Strength points within [`STRENGTH_NEAR_RATIO`].
pub const STRENGTH_NEAR_POINTS: u8 = 10;
/// Strength points when only the candidate names a strength.
pub const STRENGTH_CANDIDATE_ONLY_POINTS: u8 = 15;
pub const STRENGTH_CLOSE_RATIO: f64 = 0.10;
pub const STRENGTH_NEAR_RATIO: f64 = 0.50;

/// Category points for a shared form word.
pub const FORM_POINTS: u8 = 5;
/// Category points for a shared packaging word.
pub const PACKAGING_POINTS: u8 = 5;

/// Confidence floor when the exact-name component is at containment level.
pub const CONTAINMENT_CONFIDENCE_FLOOR: u8 = 85;
/// Confidence floor when the exact-name component is at overlap level.
pub const OVERLAP_CONFIDENCE_FLOOR: u8 = 75;

/// Strengths closer than this are equal.
const STRENGTH_EPSILON: f64 = 1e-9;

/// Selection made by a ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankOutcome {
    /// Chosen candidate; `None` only when there were no candidates
    pub selected: Option<CandidateProduct>,
    /// Deterministic breakdown of the chosen candidate
    pub breakdown: ScoreBreakdown,
    /// Confidence (0 - 100)
    pub confidence: u8,
    /// Extra explanation from the ranker, if it has one
    pub note: Option<String>,
}

impl RankOutcome {
    /// Outcome for an empty candidate list.
    pub fn empty() -> Self {
        Self {
            selected: None,
            breakdown: ScoreBreakdown::default(),
            confidence: 0,
            note: None,
        }
    }
}

/// Chooses the best candidate for a query.
#[async_trait]
pub trait CandidateRanker: Send + Sync {
    /// Rank `candidates` and pick one. Never fails; an empty list yields
    /// [`RankOutcome::empty`].
    async fn rank(&self, query: &MedicationQuery, candidates: &[CandidateProduct]) -> RankOutcome;
}

/// Deterministic four-factor scorer.
#[derive(Default)]
pub struct MatchScorer {
    normalizer: Normalizer,
}

impl MatchScorer {
    /// Create a new scorer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Score every candidate and pick the highest total.
    ///
    /// Ties go to the first listed candidate.
    pub fn score(&self, query: &MedicationQuery, candidates: &[CandidateProduct]) -> RankOutcome {
        let mut best: Option<(&CandidateProduct, ScoreBreakdown)> = None;

        for candidate in candidates {
            let breakdown = self.score_candidate(query, candidate);
            tracing::trace!(
                candidate = %candidate.name,
                total = breakdown.total(),
                "scored candidate"
            );
            let beats_best = best.map_or(true, |(_, top)| breakdown.total() > top.total());
            if beats_best {
                best = Some((candidate, breakdown));
            }
        }

        match best {
            Some((candidate, breakdown)) => RankOutcome {
                selected: Some(candidate.clone()),
                confidence: confidence_for(&breakdown),
                breakdown,
                note: None,
            },
            None => RankOutcome::empty(),
        }
    }

    /// Score a single candidate against the query.
    pub fn score_candidate(
        &self,
        query: &MedicationQuery,
        candidate: &CandidateProduct,
    ) -> ScoreBreakdown {
        ScoreBreakdown {
            exact_name: self.score_exact_name(&query.name, &candidate.name),
            strength: self.score_strength(query.strength_str(), &candidate.name),
            name_similarity: self.score_similarity(&query.name, &candidate.name),
            category: self.score_category(&query.combined_text(), &candidate.name),
        }
    }

    /// Exact name (0, 30 or 40).
    fn score_exact_name(&self, query_name: &str, candidate_name: &str) -> u8 {
        let q = self.normalizer.exact_key(query_name);
        let c = self.normalizer.exact_key(candidate_name);
        if q.is_empty() || c.is_empty() {
            return 0;
        }

        if c.contains(&q) || q.contains(&c) {
            return EXACT_CONTAINMENT_POINTS;
        }

        if positional_overlap(&q, &c) > OVERLAP_THRESHOLD {
            EXACT_OVERLAP_POINTS
        } else {
            0
        }
    }

    /// Strength agreement (0 - 30).
    fn score_strength(&self, query_strength: &str, candidate_name: &str) -> u8 {
        let query = self.normalizer.parse_strength(query_strength);
        let candidate = self.normalizer.parse_strength(candidate_name);

        match (query, candidate) {
            (Some(q), Some(c)) => {
                let (qv, qu) = self.normalizer.canonicalize(&q);
                let (cv, cu) = self.normalizer.canonicalize(&c);
                if qu != cu {
                    return 0;
                }
                let larger = qv.max(cv);
                if (qv - cv).abs() <= STRENGTH_EPSILON {
                    STRENGTH_EQUAL_POINTS
                } else if larger <= 0.0 {
                    0
                } else {
                    let relative = (qv - cv).abs() / larger;
                    if relative <= STRENGTH_CLOSE_RATIO {
                        STRENGTH_CLOSE_POINTS
                    } else if relative <= STRENGTH_NEAR_RATIO {
                        STRENGTH_NEAR_POINTS
                    } else {
                        0
                    }
                }
            }
            (None, Some(_)) => STRENGTH_CANDIDATE_ONLY_POINTS,
            _ => 0,
        }
    }

    /// Word-set Jaccard similarity scaled to 0 - 20.
    fn score_similarity(&self, query_name: &str, candidate_name: &str) -> u8 {
        let q = self.normalizer.word_set(query_name);
        let c = self.normalizer.word_set(candidate_name);
        let union = q.union(&c).count();
        if union == 0 {
            return 0;
        }
        let shared = q.intersection(&c).count();
        let jaccard = shared as f64 / union as f64;
        (jaccard * NAME_SIMILARITY_MAX as f64).round() as u8
    }

    /// Shared form (5) and packaging (5) vocabulary.
    fn score_category(&self, query_text: &str, candidate_name: &str) -> u8 {
        let shares = |query_hits: Vec<&str>, candidate_hits: Vec<&str>| {
            query_hits.iter().any(|w| candidate_hits.contains(w))
        };

        let mut points = 0;
        if shares(
            self.normalizer.forms_in(query_text),
            self.normalizer.forms_in(candidate_name),
        ) {
            points += FORM_POINTS;
        }
        if shares(
            self.normalizer.packaging_in(query_text),
            self.normalizer.packaging_in(candidate_name),
        ) {
            points += PACKAGING_POINTS;
        }
        points
    }
}

#[async_trait]
impl CandidateRanker for MatchScorer {
    async fn rank(&self, query: &MedicationQuery, candidates: &[CandidateProduct]) -> RankOutcome {
        self.score(query, candidates)
    }
}

/// Confidence for a breakdown: the total, floored for strong name matches.
pub fn confidence_for(breakdown: &ScoreBreakdown) -> u8 {
    let total = breakdown.total();
    let floored = if breakdown.exact_name >= EXACT_CONTAINMENT_POINTS {
        total.max(CONTAINMENT_CONFIDENCE_FLOOR)
    } else if breakdown.exact_name >= EXACT_OVERLAP_POINTS {
        total.max(OVERLAP_CONFIDENCE_FLOOR)
    } else {
        total
    };
    floored.min(100)
}

/// Fraction of equal characters at equal positions, over the shorter string.
fn positional_overlap(a: &str, b: &str) -> f64 {
    let shorter = a.len().min(b.len());
    if shorter == 0 {
        return 0.0;
    }
    let same = a
        .bytes()
        .zip(b.bytes())
        .filter(|(x, y)| x == y)
        .count();
    same as f64 / shorter as f64
}
