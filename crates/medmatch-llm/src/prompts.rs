//! Prompts for assisted product extraction and selection.
//!
//! Both prompts ask for strict JSON; the parsers in [`crate::extraction`]
//! still tolerate prose and code fences around it.

use medmatch_core::models::{CandidateProduct, MedicationQuery};

use crate::backend::ChatMessage;

/// System prompt for product extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a pharmacy catalog assistant that reads search result pages and lists the products shown.

For every product listing on the page, extract:
- name: The full product title as displayed (brand, strength, pack size)
- url: The link to the product page (relative links are fine)

Ignore navigation links, banners, articles, lab tests and "search more" links.
Return at most 10 products, in the order they appear on the page.

Output JSON with a "products" array. Output nothing else."#;

/// User prompt for extraction.
pub fn make_extraction_prompt(content: &str) -> String {
    format!(
        r#"Extract the product listings from this pharmacy search result page:

{}

Return a JSON object with a "products" array. Each product should have:
- name: Product title
- url: Product page link"#,
        content
    )
}

/// Example page snippets with the expected extraction.
pub const FEW_SHOT_EXAMPLES: &[(&str, &str)] = &[
    (
        r#"<div class="ProductCard"><a href="/online-medicine-order/rantac-150mg-strip-of-30-tablets-1234"><h1>Rantac 150mg Strip Of 30 Tablets</h1></a></div><a href="/health-care">Healthcare</a>"#,
        r#"{"products":[{"name":"Rantac 150mg Strip Of 30 Tablets","url":"/online-medicine-order/rantac-150mg-strip-of-30-tablets-1234"}]}"#,
    ),
    (
        r#"<a href="/offers">Offers</a><p>No medicines found for "xyzzy"</p>"#,
        r#"{"products":[]}"#,
    ),
];

/// System prompt for product selection.
pub const SELECTION_SYSTEM_PROMPT: &str = r#"You are a clinical pharmacist matching a prescribed medication to pharmacy catalog listings.

Judge, in this order of importance:
1. Exact name: the brand or generic name matches, ignoring spacing and punctuation ("CifranCT" = "Cifran C.T." = "Cifran-CT")
2. Strength: the listing's strength equals the prescribed strength
3. Name similarity: overall closeness of the names
4. Form and packaging: tablet, syrup, capsule, strip, bottle, etc.

Output a JSON object with:
- selected_index: index of the best listing (0-based)
- confidence_score: 0-100
- reasoning: one or two sentences

Output nothing else."#;

/// User prompt for selection.
pub fn make_selection_prompt(
    query: &MedicationQuery,
    candidates: &[CandidateProduct],
    diagnoses: &[String],
) -> String {
    let mut prompt = String::new();
    prompt.push_str("Prescribed medication:\n");
    prompt.push_str(&format!("- name: {}\n", query.name));
    if let Some(ref strength) = query.strength {
        prompt.push_str(&format!("- strength: {}\n", strength));
    }
    if let Some(ref form) = query.form {
        prompt.push_str(&format!("- form: {}\n", form));
    }
    if let Some(ref instructions) = query.instructions {
        prompt.push_str(&format!("- instructions: {}\n", instructions));
    }
    if !diagnoses.is_empty() {
        prompt.push_str(&format!("- diagnoses: {}\n", diagnoses.join(", ")));
    }

    prompt.push_str("\nCatalog listings:\n");
    for (i, candidate) in candidates.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i, candidate.name));
    }
    prompt.push_str("\nPick the listing that best matches the prescription.");
    prompt
}

/// Chat messages for an extraction request.
pub fn build_extraction_messages(content: &str, include_examples: bool) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(EXTRACTION_SYSTEM_PROMPT)];

    if include_examples {
        for (input, output) in FEW_SHOT_EXAMPLES {
            messages.push(ChatMessage::user(make_extraction_prompt(input)));
            messages.push(ChatMessage::assistant(*output));
        }
    }

    messages.push(ChatMessage::user(make_extraction_prompt(content)));
    messages
}

/// Chat messages for a selection request.
pub fn build_selection_messages(
    query: &MedicationQuery,
    candidates: &[CandidateProduct],
    diagnoses: &[String],
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SELECTION_SYSTEM_PROMPT),
        ChatMessage::user(make_selection_prompt(query, candidates, diagnoses)),
    ]
}
