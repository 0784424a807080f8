//! Text normalization for catalog matching.
//!
//! Handles:
//! - Exact-name keys (alphabetic only, case-folded)
//! - Strength parsing with unit canonicalization (mcg→mg, g→mg, cc→ml)
//! - Form and packaging vocabulary lookup
//! - Word sets for token similarity

use std::collections::{BTreeSet, HashMap};

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// First number adjacent to a dosage unit, e.g. `150mg`, `2.5 ML`, `40 IU`.
    static ref STRENGTH_RE: Regex =
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(mcg|mg|ml|g|units?|iu)\b")
            .expect("strength pattern is valid");
}

/// Drug form vocabulary.
pub const FORM_VOCAB: &[&str] = &[
    "tablet",
    "syrup",
    "capsule",
    "injection",
    "cream",
    "ointment",
    "drops",
    "gel",
    "powder",
    "solution",
];

/// Packaging vocabulary.
pub const PACKAGING_VOCAB: &[&str] = &[
    "strip", "bottle", "vial", "tube", "box", "sachet", "ampoule",
];

/// A parsed strength such as `500mg`.
#[derive(Debug, Clone, PartialEq)]
pub struct Strength {
    /// Numeric value in `unit`
    pub value: f64,
    /// Unit as written, lower-cased (`unit` is folded into `units`)
    pub unit: String,
    /// Number and unit exactly as written, without the space between them
    written: String,
}

impl Strength {
    /// Compact token for search strings, e.g. `150mg` or `0.50ml`.
    ///
    /// Keeps the number as written, so `0.50mg` stays `0.50mg`.
    pub fn token(&self) -> &str {
        &self.written
    }
}

/// Normalizer for medication names and listing titles.
pub struct Normalizer {
    /// Unit conversions: unit → (canonical_unit, multiplier)
    unit_conversions: HashMap<String, (String, f64)>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Create a new normalizer with default unit mappings.
    pub fn new() -> Self {
        Self {
            unit_conversions: Self::default_unit_conversions(),
        }
    }

    /// Exact-name key: ASCII letters only, lower-cased.
    ///
    /// `"Cifran C.T. 500mg"` and `"CifranCT"` both start with `"cifranct"`.
    pub fn exact_key(&self, text: &str) -> String {
        text.chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }

    /// First strength token in `text`, if any.
    pub fn parse_strength(&self, text: &str) -> Option<Strength> {
        let caps = STRENGTH_RE.captures(text)?;
        let number = caps.get(1)?.as_str();
        let value: f64 = number.parse().ok()?;
        let written_unit = caps.get(2)?.as_str().to_lowercase();
        let written = format!("{number}{written_unit}");
        let unit = if written_unit == "unit" {
            "units".to_string()
        } else {
            written_unit
        };
        Some(Strength { value, unit, written })
    }

    /// Convert a strength to its canonical unit.
    pub fn canonicalize(&self, strength: &Strength) -> (f64, String) {
        match self.unit_conversions.get(&strength.unit) {
            Some((unit, multiplier)) => (strength.value * multiplier, unit.clone()),
            None => (strength.value, strength.unit.clone()),
        }
    }

    /// Lower-cased whitespace word set.
    pub fn word_set(&self, text: &str) -> BTreeSet<String> {
        text.split_whitespace().map(str::to_lowercase).collect()
    }

    /// Form words found in `text` (substring, case-insensitive).
    pub fn forms_in(&self, text: &str) -> Vec<&'static str> {
        vocab_hits(FORM_VOCAB, text)
    }

    /// Packaging words found in `text` (substring, case-insensitive).
    pub fn packaging_in(&self, text: &str) -> Vec<&'static str> {
        vocab_hits(PACKAGING_VOCAB, text)
    }

    /// Add a custom unit conversion.
    pub fn add_unit_conversion(&mut self, from: &str, to: &str, multiplier: f64) {
        self.unit_conversions
            .insert(from.to_lowercase(), (to.to_lowercase(), multiplier));
    }

    /// Default unit conversions.
    fn default_unit_conversions() -> HashMap<String, (String, f64)> {
        let mut map = HashMap::new();

        // Mass
        map.insert("mcg".into(), ("mg".into(), 0.001));
        map.insert("g".into(), ("mg".into(), 1000.0));
        map.insert("mg".into(), ("mg".into(), 1.0));

        // Volume
        map.insert("ml".into(), ("ml".into(), 1.0));
        map.insert("cc".into(), ("ml".into(), 1.0));

        // Activity
        map.insert("iu".into(), ("units".into(), 1.0));
        map.insert("units".into(), ("units".into(), 1.0));

        map
    }
}

fn vocab_hits(vocab: &[&'static str], text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    vocab
        .iter()
        .copied()
        .filter(|word| lower.contains(word))
        .collect()
}
