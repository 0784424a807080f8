//! Product extraction from raw catalog pages.
//!
//! Strategy A reads structured JSON embedded in the page. Strategy B hands a
//! truncated copy of the page to a pluggable [`ProductParser`]. The first
//! strategy that yields anything wins; an empty list is a valid outcome.

mod heuristic;
mod structured;

pub use heuristic::*;
pub use structured::*;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::config::{ConfigError, MatchConfig, MAX_CANDIDATES};
use crate::models::CandidateProduct;

/// Parser errors. The extractor logs these and carries on with nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("parser backend error: {0}")]
    Backend(String),
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// Fallback parser turning page content into candidates.
///
/// Returned URLs may be relative; names and URLs may be empty. The extractor
/// cleans both up.
#[async_trait]
pub trait ProductParser: Send + Sync {
    async fn parse(&self, content: &str) -> ExtractResult<Vec<CandidateProduct>>;

    /// Short label for logs.
    fn name(&self) -> &'static str {
        "parser"
    }
}

/// Two-strategy product extractor.
pub struct ProductExtractor {
    base: Url,
    base_str: String,
    product_path: String,
    max_candidates: usize,
    head_chars: usize,
    middle_chars: usize,
    parser: Arc<dyn ProductParser>,
}

impl ProductExtractor {
    /// Extractor with the [`HeuristicParser`] fallback.
    pub fn new(config: &MatchConfig) -> Result<Self, ConfigError> {
        let parser = Arc::new(HeuristicParser::new(config.product_path.clone()));
        Self::with_parser(config, parser)
    }

    /// Extractor with a custom fallback parser.
    pub fn with_parser(
        config: &MatchConfig,
        parser: Arc<dyn ProductParser>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            base: config.base_url()?,
            base_str: config.catalog_base_url.trim_end_matches('/').to_string(),
            product_path: config.product_path.trim_end_matches('/').to_string(),
            max_candidates: config.max_candidates.min(MAX_CANDIDATES),
            head_chars: config.truncate_head_chars,
            middle_chars: config.truncate_middle_chars,
            parser,
        })
    }

    /// Extract up to `max_candidates` products from `content`.
    pub async fn extract(&self, content: &str) -> Vec<CandidateProduct> {
        let structured = self.extract_structured(content);
        if !structured.is_empty() {
            tracing::debug!(count = structured.len(), "structured data yielded products");
            return structured;
        }

        let truncated = truncate_content(content, self.head_chars, self.middle_chars);
        match self.parser.parse(&truncated).await {
            Ok(raw) => {
                let products = self.finish(raw);
                tracing::debug!(
                    parser = self.parser.name(),
                    count = products.len(),
                    "fallback parser yielded products"
                );
                products
            }
            Err(e) => {
                tracing::warn!(parser = self.parser.name(), error = %e, "fallback parser failed");
                Vec::new()
            }
        }
    }

    /// Strategy A only.
    pub fn extract_structured(&self, content: &str) -> Vec<CandidateProduct> {
        // Over-collect so duplicates do not starve the cap.
        let limit = self.max_candidates * 4;
        let records = match find_product_records(content, &self.product_path, limit) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "structured extraction failed");
                return Vec::new();
            }
        };

        let raw = records
            .into_iter()
            .map(|record| {
                let url = match record.link {
                    ProductLink::Slug(slug) => self.slug_url(&slug),
                    ProductLink::Url(url) => url,
                };
                CandidateProduct::new(record.name, url)
            })
            .collect();
        self.finish(raw)
    }

    /// Product page URL for a slug.
    pub fn slug_url(&self, slug: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_str,
            self.product_path,
            slug.trim_matches('/')
        )
    }

    /// Make `href` absolute against the catalog base.
    ///
    /// Returns `None` for anything that is not an http(s) link.
    pub fn absolute_url(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        let url = match Url::parse(href) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => self.base.join(href).ok()?,
            Err(_) => return None,
        };
        match url.scheme() {
            "http" | "https" => Some(url.to_string()),
            _ => None,
        }
    }

    /// Normalize URLs, drop incomplete and duplicate entries, cap.
    fn finish(&self, raw: Vec<CandidateProduct>) -> Vec<CandidateProduct> {
        let mut seen = HashSet::new();
        raw.into_iter()
            .filter_map(|product| {
                let name = product.name.trim();
                if name.is_empty() {
                    return None;
                }
                let url = self.absolute_url(&product.url)?;
                Some(CandidateProduct::new(name, url))
            })
            .filter(|product| seen.insert(product.url.clone()))
            .take(self.max_candidates)
            .collect()
    }
}

/// Path of an http(s) `href`, resolved against a placeholder origin when
/// relative.
pub(crate) fn href_path(href: &str) -> Option<String> {
    let origin = Url::parse("http://catalog.invalid/").ok()?;
    let url = origin.join(href.trim()).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url.path().to_string()),
        _ => None,
    }
}

/// Whether `href` names a page below `prefix`, with at least one path
/// segment after it. The prefix itself does not count.
pub(crate) fn is_under_path(href: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/').to_lowercase();
    if prefix.is_empty() {
        return false;
    }
    href_path(href)
        .map(|path| path.to_lowercase())
        .and_then(|path| {
            path.strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .map(|rest| !rest.trim_matches('/').is_empty())
        })
        .unwrap_or(false)
}

/// Bound `content` to a head slice plus a slice from its middle.
///
/// Slices are cut on `char` boundaries. Content that already fits is
/// returned whole.
pub fn truncate_content(content: &str, head_chars: usize, middle_chars: usize) -> String {
    let total = content.chars().count();
    if total <= head_chars + middle_chars {
        return content.to_string();
    }

    let head: String = content.chars().take(head_chars).collect();
    if middle_chars == 0 {
        return head;
    }

    let middle_start = (total / 2).saturating_sub(middle_chars / 2).max(head_chars);
    let middle: String = content.chars().skip(middle_start).take(middle_chars).collect();

    format!("{head}\n...\n{middle}")
}
