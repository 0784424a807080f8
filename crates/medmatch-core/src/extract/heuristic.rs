//! Deterministic fallback parser: scan anchors that look like product links.

use std::collections::HashSet;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::models::CandidateProduct;

use super::{is_under_path, ExtractError, ExtractResult, ProductParser};

/// Generic path prefixes of product pages, besides the configured one.
const PRODUCT_PREFIXES: &[&str] = &["/product", "/products", "/medicine", "/medicines"];

/// Anchor-scanning [`ProductParser`].
///
/// Returned URLs are as written in the page; the extractor makes them
/// absolute.
#[derive(Debug, Clone)]
pub struct HeuristicParser {
    product_path: String,
}

impl HeuristicParser {
    pub fn new(product_path: impl Into<String>) -> Self {
        Self {
            product_path: product_path.into(),
        }
    }

    /// A link one or more segments below a product prefix. Category roots,
    /// fragments and non-http schemes do not count.
    fn looks_like_product(&self, href: &str) -> bool {
        is_under_path(href, &self.product_path)
            || PRODUCT_PREFIXES.iter().any(|prefix| is_under_path(href, prefix))
    }

    /// Parse anchors out of `html`.
    pub fn parse_html(&self, html: &str) -> ExtractResult<Vec<CandidateProduct>> {
        let document = Html::parse_document(html);
        let anchor_sel = Selector::parse("a[href]")
            .map_err(|e| ExtractError::Parse(format!("invalid anchor selector: {e:?}")))?;
        let img_sel = Selector::parse("img[alt]")
            .map_err(|e| ExtractError::Parse(format!("invalid image selector: {e:?}")))?;

        let mut seen = HashSet::new();
        let mut products = Vec::new();

        for anchor in document.select(&anchor_sel) {
            let href = match anchor.value().attr("href") {
                Some(h) => h.trim(),
                None => continue,
            };
            if href.is_empty() || !self.looks_like_product(href) {
                continue;
            }

            let name = match link_name(&anchor, &img_sel) {
                Some(n) => n,
                None => continue,
            };
            if !seen.insert(href.to_string()) {
                continue;
            }
            products.push(CandidateProduct::new(name, href));
        }

        tracing::debug!(count = products.len(), "heuristic parser found product links");
        Ok(products)
    }
}

/// Link text, else `title`, else the first image's `alt`.
fn link_name(anchor: &ElementRef<'_>, img_sel: &Selector) -> Option<String> {
    let text = collapse_whitespace(&anchor.text().collect::<String>());
    if !text.is_empty() {
        return Some(text);
    }

    if let Some(title) = anchor.value().attr("title") {
        let title = collapse_whitespace(title);
        if !title.is_empty() {
            return Some(title);
        }
    }

    anchor
        .select(img_sel)
        .filter_map(|img| img.value().attr("alt"))
        .map(collapse_whitespace)
        .find(|alt| !alt.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl ProductParser for HeuristicParser {
    async fn parse(&self, content: &str) -> ExtractResult<Vec<CandidateProduct>> {
        self.parse_html(content)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> HeuristicParser {
        HeuristicParser::new("/online-medicine-order")
    }

    #[test]
    fn test_product_links_with_text() {
        let html = r#"
            <a href="/">Home</a>
            <a href="/online-medicine-order/cifran-ct-500mg-123">
                Cifran CT 500mg
                Strip Of 10 Tablets
            </a>
            <a href="/search/all?name=cifran">More results</a>
        "#;

        let products = parser().parse_html(html).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Cifran CT 500mg Strip Of 10 Tablets");
        assert_eq!(products[0].url, "/online-medicine-order/cifran-ct-500mg-123");
    }

    #[test]
    fn test_name_from_title_and_alt() {
        let html = r#"
            <a href="/online-medicine-order/rantac-150" title="Rantac 150mg Tablet"></a>
            <a href="https://cdn.example.com/product/rantac-300"><img src="x.png" alt="Rantac 300mg Tablet"></a>
        "#;

        let products = parser().parse_html(html).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Rantac 150mg Tablet");
        assert_eq!(products[1].name, "Rantac 300mg Tablet");
    }

    #[test]
    fn test_nameless_and_duplicate_links_dropped() {
        let html = r#"
            <a href="/online-medicine-order/a"><img src="a.png"></a>
            <a href="/online-medicine-order/b">B Tablet</a>
            <a href="/online-medicine-order/b">B Tablet again</a>
            <a href="javascript:void(0)">medicine</a>
        "#;

        let products = parser().parse_html(html).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "B Tablet");
    }

    #[tokio::test]
    async fn test_parser_trait() {
        let products = parser()
            .parse(r#"<a href="/medicine/dolo-650">Dolo 650</a>"#)
            .await
            .unwrap();
        assert_eq!(products.len(), 1);
    }

    #[test]
    fn test_category_roots_and_nav_skipped() {
        let html = r#"
            <a href="/online-medicine-order">Medicines</a>
            <a href="/online-medicine-order/">All medicines</a>
            <a href="/medicine-offers">Medicine offers</a>
            <a href="/blog/medicine-storage-tips">Storing medicine</a>
            <a href="/online-medicine-order/rantac-150mg-1234">Rantac 150mg Tablet</a>
        "#;

        let products = parser().parse_html(html).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Rantac 150mg Tablet");
    }
}
