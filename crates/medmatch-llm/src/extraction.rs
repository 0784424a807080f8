//! Parsing model output into products and selections.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Assisted-layer errors.
#[derive(Error, Debug)]
pub enum AssistError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("Completion backend error: {0}")]
    Backend(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

pub type AssistResult<T> = Result<T, AssistError>;

/// Product list as returned by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductList {
    #[serde(default)]
    pub products: Vec<RawProduct>,
}

/// One product as returned by the model. Fields may be missing or blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// Selection as returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionAnalysis {
    #[serde(default)]
    pub selected_index: Option<usize>,
    #[serde(default)]
    pub selected_name: Option<String>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Parse a product list from model output.
///
/// Accepts `{"products": [...]}` or a bare array, optionally wrapped in a
/// code fence or surrounded by prose.
pub fn parse_product_list(output: &str) -> AssistResult<Vec<RawProduct>> {
    let json = json_slice(output)?;
    if json.starts_with('[') {
        let products: Vec<RawProduct> = serde_json::from_str(json)?;
        return Ok(products);
    }
    let list: ProductList = serde_json::from_str(json)?;
    Ok(list.products)
}

/// Parse a selection object from model output.
pub fn parse_selection(output: &str) -> AssistResult<SelectionAnalysis> {
    let json = json_slice(output)?;
    if !json.starts_with('{') {
        return Err(AssistError::InvalidFormat(
            "Expected a JSON object for the selection".into(),
        ));
    }
    Ok(serde_json::from_str(json)?)
}

/// Outermost JSON object or array in `output`.
fn json_slice(output: &str) -> AssistResult<&str> {
    let start = output
        .find(|c| c == '{' || c == '[')
        .ok_or_else(|| AssistError::InvalidFormat("No JSON found in response".into()))?;

    let close = if output[start..].starts_with('{') { '}' } else { ']' };
    let end = output.rfind(close).ok_or_else(|| {
        AssistError::InvalidFormat(format!("No closing '{close}' found in response"))
    })?;
    if end < start {
        return Err(AssistError::InvalidFormat("Unbalanced JSON in response".into()));
    }

    Ok(&output[start..=end])
}
