//! Catalog listing models.

use serde::{Deserialize, Serialize};

/// A listing found on the pharmacy catalog for a query.
///
/// `url` is always absolute once a product leaves the extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CandidateProduct {
    /// Display name as shown by the catalog
    pub name: String,
    /// Absolute product page URL
    pub url: String,
}

impl CandidateProduct {
    /// Create a new candidate.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}
