//! Golden tests for the match scorer.
//!
//! These tests pin the breakdown for known catalog listings.

use medmatch_core::models::{CandidateProduct, MedicationQuery};
use medmatch_core::resolver::MatchScorer;

/// Test case from golden file.
struct GoldenCase {
    id: &'static str,
    name: &'static str,
    strength: Option<&'static str>,
    form: Option<&'static str>,
    candidates: &'static [&'static str],
    expected_selected: Option<&'static str>,
    expected_exact_name: u8,
    expected_strength: u8,
    min_confidence: u8,
}

fn get_golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            id: "rantac-exact",
            name: "Rantac",
            strength: Some("150mg"),
            form: Some("tablet"),
            candidates: &["Rantac 150mg Strip Of 30 Tablets"],
            expected_selected: Some("Rantac 150mg Strip Of 30 Tablets"),
            expected_exact_name: 40,
            expected_strength: 30,
            min_confidence: 85,
        },
        GoldenCase {
            id: "cifranct-punctuation",
            name: "CifranCT",
            strength: None,
            form: None,
            candidates: &["Cifran C.T. 500mg Strip Of 10 Tablets"],
            expected_selected: Some("Cifran C.T. 500mg Strip Of 10 Tablets"),
            expected_exact_name: 40,
            expected_strength: 15,
            min_confidence: 85,
        },
        GoldenCase {
            id: "cifranct-strength-picks-500",
            name: "Cifran CT",
            strength: Some("500mg"),
            form: Some("tablet"),
            candidates: &[
                "Cifran CT 250mg Strip Of 6 Tablets",
                "Amoxicillin 500mg Capsules",
                "Cifran CT 500mg Strip Of 10 Tablets",
                "Cifran-CT 500mg Tablets",
            ],
            expected_selected: Some("Cifran CT 500mg Strip Of 10 Tablets"),
            expected_exact_name: 40,
            expected_strength: 30,
            min_confidence: 85,
        },
        GoldenCase {
            id: "unrelated-listing",
            name: "Rantac",
            strength: Some("150mg"),
            form: None,
            candidates: &["Amoxicillin 500mg Capsules"],
            expected_selected: Some("Amoxicillin 500mg Capsules"),
            expected_exact_name: 0,
            expected_strength: 0,
            min_confidence: 0,
        },
        GoldenCase {
            id: "no-candidates",
            name: "Rantac",
            strength: Some("150mg"),
            form: Some("tablet"),
            candidates: &[],
            expected_selected: None,
            expected_exact_name: 0,
            expected_strength: 0,
            min_confidence: 0,
        },
    ]
}

fn build_query(case: &GoldenCase) -> MedicationQuery {
    MedicationQuery {
        name: case.name.into(),
        strength: case.strength.map(String::from),
        form: case.form.map(String::from),
        instructions: None,
    }
}

fn build_candidates(case: &GoldenCase) -> Vec<CandidateProduct> {
    case.candidates
        .iter()
        .enumerate()
        .map(|(i, name)| {
            CandidateProduct::new(*name, format!("https://pharmeasy.in/online-medicine-order/p-{i}"))
        })
        .collect()
}

#[test]
fn test_golden_cases() {
    let scorer = MatchScorer::new();

    for case in get_golden_cases() {
        let query = build_query(&case);
        let candidates = build_candidates(&case);
        let outcome = scorer.score(&query, &candidates);

        assert_eq!(
            outcome.selected.as_ref().map(|p| p.name.as_str()),
            case.expected_selected,
            "Case {}: selection mismatch",
            case.id
        );
        assert_eq!(
            outcome.breakdown.exact_name, case.expected_exact_name,
            "Case {}: exact name mismatch",
            case.id
        );
        assert_eq!(
            outcome.breakdown.strength, case.expected_strength,
            "Case {}: strength mismatch",
            case.id
        );
        assert!(
            outcome.confidence >= case.min_confidence,
            "Case {}: confidence {} below {}",
            case.id,
            outcome.confidence,
            case.min_confidence
        );
        assert!(outcome.confidence <= 100, "Case {}: confidence above 100", case.id);
        assert!(
            outcome.breakdown.is_within_bounds(),
            "Case {}: breakdown out of bounds",
            case.id
        );
    }
}

#[test]
fn test_empty_candidates_zero() {
    let scorer = MatchScorer::new();
    let outcome = scorer.score(&MedicationQuery::new("Rantac"), &[]);

    assert!(outcome.selected.is_none());
    assert_eq!(outcome.confidence, 0);
    assert_eq!(outcome.breakdown.total(), 0);
}

#[test]
fn test_priority_order() {
    let scorer = MatchScorer::new();
    let query = MedicationQuery::new("Rantac").with_strength("150mg");

    // Name agreement outranks strength agreement.
    let by_name = CandidateProduct::new("Rantac 300mg", "https://pharmeasy.in/a");
    let by_strength = CandidateProduct::new("Zinetac 150mg", "https://pharmeasy.in/b");
    let outcome = scorer.score(&query, &[by_strength, by_name.clone()]);

    assert_eq!(outcome.selected, Some(by_name));
}

#[test]
fn test_ties_prefer_first_listed() {
    let scorer = MatchScorer::new();
    let query = MedicationQuery::new("Cifran CT").with_strength("500mg");
    let first = CandidateProduct::new("Cifran CT 500mg", "https://pharmeasy.in/first");
    let second = CandidateProduct::new("Cifran CT 500mg", "https://pharmeasy.in/second");

    for _ in 0..5 {
        let outcome = scorer.score(&query, &[first.clone(), second.clone()]);
        assert_eq!(outcome.selected.as_ref(), Some(&first));
    }
}
