//! Structured-data strategy: product records embedded as JSON in the page.
//!
//! Catalog pages ship their listing state in `<script>` blocks
//! (`__NEXT_DATA__`, `application/json`, `application/ld+json`). The walk
//! visits values in document order and stops descending once an object
//! qualifies as a product.
//!
//! A record linked by slug always qualifies. A record linked by `url` only
//! qualifies when its `@type` is a product type or its URL lies below the
//! product path, and never when it points at the site root. This keeps
//! `Organization`/`WebSite` blocks and navigation entries out.

use scraper::{Html, Selector};
use serde_json::{Map, Value};

use super::{href_path, is_under_path, ExtractError, ExtractResult};

const SCRIPT_SELECTOR: &str = r#"script#__NEXT_DATA__, script[type="application/json"], script[type="application/ld+json"]"#;

/// Keys carrying a product's display name, in preference order.
const NAME_KEYS: &[&str] = &["name", "productName", "displayName"];
/// Keys carrying a slug, in preference order.
const SLUG_KEYS: &[&str] = &["slug", "urlKey", "productSlug"];
/// Key carrying a full or site-relative URL.
const URL_KEY: &str = "url";
/// Schema.org types that describe a listed product.
const PRODUCT_TYPES: &[&str] = &["Product", "IndividualProduct", "Drug", "ListItem"];

/// How a structured record points at its product page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductLink {
    /// Bare slug, joined under the product path
    Slug(String),
    /// Absolute or site-relative URL
    Url(String),
}

/// Name and link of a product found in structured data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub name: String,
    pub link: ProductLink,
}

/// Collect product records from every embedded JSON block.
///
/// Blocks that fail to parse are skipped. Stops once `limit` records have
/// been found.
pub fn find_product_records(
    html: &str,
    product_path: &str,
    limit: usize,
) -> ExtractResult<Vec<ProductRecord>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(SCRIPT_SELECTOR)
        .map_err(|e| ExtractError::Parse(format!("invalid script selector: {e:?}")))?;

    let mut records = Vec::new();
    for element in document.select(&selector) {
        let text = element.text().collect::<String>();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(text) {
            Ok(value) => walk(&value, product_path, &mut records, limit),
            Err(e) => tracing::debug!(error = %e, "skipping unparsable JSON block"),
        }
        if records.len() >= limit {
            break;
        }
    }
    Ok(records)
}

fn walk(value: &Value, product_path: &str, records: &mut Vec<ProductRecord>, limit: usize) {
    if records.len() >= limit {
        return;
    }
    match value {
        Value::Object(map) => {
            if let Some(record) = as_product(map, product_path) {
                records.push(record);
                return;
            }
            for child in map.values() {
                walk(child, product_path, records, limit);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, product_path, records, limit);
            }
        }
        _ => {}
    }
}

fn as_product(map: &Map<String, Value>, product_path: &str) -> Option<ProductRecord> {
    let name = first_string(map, NAME_KEYS)?;
    if let Some(slug) = first_string(map, SLUG_KEYS) {
        return Some(ProductRecord { name, link: ProductLink::Slug(slug) });
    }

    let url = first_string(map, &[URL_KEY])?;
    let is_root = href_path(&url).map_or(true, |path| path.trim_matches('/').is_empty());
    if is_root || !(has_product_type(map) || is_under_path(&url, product_path)) {
        return None;
    }
    Some(ProductRecord { name, link: ProductLink::Url(url) })
}

/// `@type` names a product, as a string or inside an array.
fn has_product_type(map: &Map<String, Value>) -> bool {
    let is_product = |v: &Value| v.as_str().map_or(false, |t| PRODUCT_TYPES.contains(&t));
    match map.get("@type") {
        Some(Value::Array(types)) => types.iter().any(is_product),
        Some(t) => is_product(t),
        None => false,
    }
}

fn first_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
