//! Property tests for the match scorer.

use medmatch_core::models::{CandidateProduct, MedicationQuery};
use medmatch_core::resolver::{confidence_for, MatchScorer};
use proptest::prelude::*;

fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Rantac".to_string()),
        Just("Cifran CT".to_string()),
        Just("CifranCT".to_string()),
        Just("Dolo".to_string()),
        "[A-Za-z .-]{1,20}",
    ]
}

fn strength_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        (1u32..2000, prop_oneof![Just("mg"), Just("ml"), Just("mcg"), Just("g")])
            .prop_map(|(v, u)| Some(format!("{v}{u}"))),
        "[a-z0-9 ]{0,8}".prop_map(Some),
    ]
}

fn query_strategy() -> impl Strategy<Value = MedicationQuery> {
    (
        name_strategy(),
        strength_strategy(),
        proptest::option::of(prop_oneof![Just("tablet"), Just("syrup"), Just("capsule")]),
    )
        .prop_map(|(name, strength, form)| MedicationQuery {
            name,
            strength,
            form: form.map(String::from),
            instructions: None,
        })
}

fn candidates_strategy() -> impl Strategy<Value = Vec<CandidateProduct>> {
    proptest::collection::vec("[A-Za-z0-9 .]{0,40}", 0..10).prop_map(|names| {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| CandidateProduct::new(name, format!("https://catalog.test/p/{i}")))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_scores_within_bounds(query in query_strategy(), candidates in candidates_strategy()) {
        let scorer = MatchScorer::new();
        let outcome = scorer.score(&query, &candidates);

        prop_assert!(outcome.confidence <= 100);
        prop_assert!(outcome.breakdown.is_within_bounds());
        for candidate in &candidates {
            prop_assert!(scorer.score_candidate(&query, candidate).is_within_bounds());
        }
    }

    #[test]
    fn prop_selected_is_a_candidate(query in query_strategy(), candidates in candidates_strategy()) {
        let outcome = MatchScorer::new().score(&query, &candidates);

        match outcome.selected {
            Some(ref selected) => prop_assert!(candidates.contains(selected)),
            None => prop_assert!(candidates.is_empty()),
        }
    }

    #[test]
    fn prop_score_is_deterministic(query in query_strategy(), candidates in candidates_strategy()) {
        let scorer = MatchScorer::new();
        prop_assert_eq!(scorer.score(&query, &candidates), scorer.score(&query, &candidates));
    }

    #[test]
    fn prop_selected_has_max_total(query in query_strategy(), candidates in candidates_strategy()) {
        let scorer = MatchScorer::new();
        let outcome = scorer.score(&query, &candidates);

        for candidate in &candidates {
            prop_assert!(scorer.score_candidate(&query, candidate).total() <= outcome.breakdown.total());
        }
        prop_assert_eq!(outcome.confidence, if candidates.is_empty() { 0 } else { confidence_for(&outcome.breakdown) });
    }

    #[test]
    fn prop_exact_name_floor(name in "[A-Za-z]{3,12}", suffix in "[A-Za-z0-9 ]{0,20}") {
        let query = MedicationQuery::new(name.clone());
        let candidate = CandidateProduct::new(format!("{name} {suffix}"), "https://catalog.test/p");
        let outcome = MatchScorer::new().score(&query, &[candidate]);

        prop_assert_eq!(outcome.breakdown.exact_name, 40);
        prop_assert!(outcome.confidence >= 85);
    }
}
