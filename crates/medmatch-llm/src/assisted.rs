//! Model-assisted parser and ranker.
//!
//! Both plug into the core pipeline through its traits. Calls to one
//! completion endpoint go through a single [`RateLimiter`]; build the pair
//! with [`assisted_pair`] or hand both the same limiter.

use std::sync::Arc;

use async_trait::async_trait;
use medmatch_core::extract::{ExtractError, ExtractResult, ProductParser};
use medmatch_core::models::{CandidateProduct, MedicationQuery};
use medmatch_core::resolver::{confidence_for, CandidateRanker, MatchScorer, RankOutcome};
use medmatch_core::{MatchConfig, RateLimiter};
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::backend::CompletionBackend;
use crate::extraction::{parse_product_list, parse_selection, AssistError, AssistResult};
use crate::prompts::{build_extraction_messages, build_selection_messages};

/// Minimum similarity for mapping a returned name back to a candidate.
const NAME_MATCH_THRESHOLD: f64 = 0.85;

/// Fallback parser asking a completion backend for the listings.
pub struct AssistedParser {
    backend: Arc<dyn CompletionBackend>,
    limiter: Arc<RateLimiter>,
    include_examples: bool,
}

/// Parser and ranker over one backend, sharing a limiter set to
/// `assisted_calls_per_second`.
pub fn assisted_pair(
    backend: Arc<dyn CompletionBackend>,
    config: &MatchConfig,
) -> (AssistedParser, AssistedRanker) {
    let limiter = Arc::new(RateLimiter::new(config.assisted_calls_per_second));
    (
        AssistedParser::with_limiter(Arc::clone(&backend), Arc::clone(&limiter)),
        AssistedRanker::with_limiter(backend, limiter),
    )
}

impl AssistedParser {
    /// Parser gated by `limiter`, usually shared with an [`AssistedRanker`].
    pub fn with_limiter(backend: Arc<dyn CompletionBackend>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            backend,
            limiter,
            include_examples: true,
        }
    }

    /// Leave the few-shot examples out of the prompt.
    pub fn without_examples(mut self) -> Self {
        self.include_examples = false;
        self
    }
}

#[async_trait]
impl ProductParser for AssistedParser {
    async fn parse(&self, content: &str) -> ExtractResult<Vec<CandidateProduct>> {
        self.limiter.wait_if_needed().await;

        let messages = build_extraction_messages(content, self.include_examples);
        let reply = self
            .backend
            .complete(&messages)
            .await
            .map_err(|e| ExtractError::Backend(e.to_string()))?;
        let products = parse_product_list(&reply).map_err(|e| ExtractError::Parse(e.to_string()))?;

        tracing::debug!(count = products.len(), "assisted extraction parsed");
        Ok(products
            .into_iter()
            .map(|p| CandidateProduct::new(p.name, p.url))
            .collect())
    }

    fn name(&self) -> &'static str {
        "assisted"
    }
}

/// Ranker letting a completion backend choose, with deterministic scoring
/// as both the reported breakdown and the fallback.
pub struct AssistedRanker {
    backend: Arc<dyn CompletionBackend>,
    limiter: Arc<RateLimiter>,
    scorer: MatchScorer,
    diagnoses: Vec<String>,
}

impl AssistedRanker {
    pub fn with_limiter(backend: Arc<dyn CompletionBackend>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            backend,
            limiter,
            scorer: MatchScorer::new(),
            diagnoses: Vec::new(),
        }
    }

    /// Clinical context passed along with every selection request.
    pub fn with_diagnoses(mut self, diagnoses: Vec<String>) -> Self {
        self.diagnoses = diagnoses;
        self
    }

    async fn select(
        &self,
        query: &MedicationQuery,
        candidates: &[CandidateProduct],
    ) -> AssistResult<(usize, Option<String>)> {
        self.limiter.wait_if_needed().await;

        let messages = build_selection_messages(query, candidates, &self.diagnoses);
        let reply = self.backend.complete(&messages).await?;
        let selection = parse_selection(&reply)?;

        let index = selection
            .selected_index
            .filter(|&i| i < candidates.len())
            .or_else(|| {
                selection
                    .selected_name
                    .as_deref()
                    .and_then(|name| closest_candidate(name, candidates))
            })
            .ok_or_else(|| {
                AssistError::InvalidFormat("selection does not name a listed candidate".into())
            })?;

        let note = match (selection.reasoning, selection.confidence_score) {
            (Some(reasoning), Some(score)) => {
                Some(format!("{} (model confidence {:.0})", reasoning.trim(), score))
            }
            (Some(reasoning), None) => Some(reasoning.trim().to_string()),
            (None, Some(score)) => Some(format!("model confidence {:.0}", score)),
            (None, None) => None,
        };
        Ok((index, note))
    }
}

#[async_trait]
impl CandidateRanker for AssistedRanker {
    async fn rank(&self, query: &MedicationQuery, candidates: &[CandidateProduct]) -> RankOutcome {
        if candidates.is_empty() {
            return RankOutcome::empty();
        }

        match self.select(query, candidates).await {
            Ok((index, note)) => {
                let selected = &candidates[index];
                let breakdown = self.scorer.score_candidate(query, selected);
                RankOutcome {
                    selected: Some(selected.clone()),
                    confidence: confidence_for(&breakdown),
                    breakdown,
                    note,
                }
            }
            Err(e) => {
                tracing::warn!(query = %query.name, error = %e, "assisted selection failed, scoring");
                self.scorer.score(query, candidates)
            }
        }
    }
}

/// Index of the candidate whose name best matches `name`, if close enough.
fn closest_candidate(name: &str, candidates: &[CandidateProduct]) -> Option<usize> {
    let target = name.trim().to_lowercase();
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, fuzzy_match(&target, &c.name.to_lowercase())))
        .filter(|&(_, score)| score >= NAME_MATCH_THRESHOLD)
        .fold(None, |best: Option<(usize, f64)>, (i, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((i, score)),
        })
        .map(|(i, _)| i)
}

/// Jaro-Winkler weighted with normalized Levenshtein.
fn fuzzy_match(a: &str, b: &str) -> f64 {
    jaro_winkler(a, b) * 0.6 + normalized_levenshtein(a, b) * 0.4
}
