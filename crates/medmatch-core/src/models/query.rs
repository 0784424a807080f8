//! Medication query model.

use serde::{Deserialize, Serialize};

/// A prescribed medication as extracted upstream from a clinical document.
///
/// Read-only once constructed. Optional fields that are absent are treated
/// as empty strings everywhere in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MedicationQuery {
    /// Medication name (brand or generic), required and non-empty
    pub name: String,
    /// Strength as written (e.g., "150mg", "5 mg/ml")
    #[serde(default)]
    pub strength: Option<String>,
    /// Dosage form (e.g., "tablet", "syrup")
    #[serde(default)]
    pub form: Option<String>,
    /// Free-text administration instructions
    #[serde(default)]
    pub instructions: Option<String>,
}

impl MedicationQuery {
    /// Create a query with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the strength.
    pub fn with_strength(mut self, strength: impl Into<String>) -> Self {
        self.strength = Some(strength.into());
        self
    }

    /// Set the dosage form.
    pub fn with_form(mut self, form: impl Into<String>) -> Self {
        self.form = Some(form.into());
        self
    }

    /// Set the instructions.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Strength, or "" when unknown.
    pub fn strength_str(&self) -> &str {
        self.strength.as_deref().unwrap_or("")
    }

    /// Form, or "" when unknown.
    pub fn form_str(&self) -> &str {
        self.form.as_deref().unwrap_or("")
    }

    /// Instructions, or "" when unknown.
    pub fn instructions_str(&self) -> &str {
        self.instructions.as_deref().unwrap_or("")
    }

    /// Name + form + instructions, space separated.
    ///
    /// Category matching runs against this text rather than the name alone,
    /// since the form usually only lives in the `form` field.
    pub fn combined_text(&self) -> String {
        [self.name.as_str(), self.form_str(), self.instructions_str()]
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether the query carries a usable name.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_text_includes_form_and_instructions() {
        let query = MedicationQuery::new("Rantac")
            .with_strength("150mg")
            .with_form("tablet")
            .with_instructions("twice daily after meals");

        assert_eq!(
            query.combined_text(),
            "Rantac tablet twice daily after meals"
        );
    }

    #[test]
    fn test_combined_text_skips_missing_fields() {
        let query = MedicationQuery::new("Pan 40");
        assert_eq!(query.combined_text(), "Pan 40");
        assert_eq!(query.strength_str(), "");
        assert_eq!(query.form_str(), "");
    }

    #[test]
    fn test_blank_name_is_invalid() {
        assert!(!MedicationQuery::new("").is_valid());
        assert!(!MedicationQuery::new("   ").is_valid());
        assert!(MedicationQuery::new("Dolo").is_valid());
    }

    #[test]
    fn test_deserialize_with_missing_optionals() {
        let query: MedicationQuery = serde_json::from_str(r#"{"name":"Dolo 650"}"#).unwrap();
        assert_eq!(query.name, "Dolo 650");
        assert!(query.strength.is_none());
        assert!(query.form.is_none());
        assert!(query.instructions.is_none());
    }
}
