//! Batch resolver tests with in-memory catalog sources.
//!
//! Time is paused, so stagger delays and deadlines elapse instantly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use medmatch_core::fetch::{CatalogSource, FetchError, FetchResult};
use medmatch_core::models::{MatchStatus, MedicationQuery};
use medmatch_core::resolver::{Resolver, ResolverError};
use medmatch_core::MatchConfig;

/// What the fake catalog does for a search term.
#[derive(Clone)]
enum Behavior {
    Page(String),
    Fail(FetchError),
    Hang,
    Panic,
}

/// In-memory catalog keyed by search term.
struct FakeCatalog {
    pages: HashMap<String, Behavior>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeCatalog {
    fn new(pages: Vec<(&str, Behavior)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(term, behavior)| (term.to_string(), behavior))
                .collect(),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn fetch(&self, query: &str) -> FetchResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        // Hold the slot long enough for other tasks to overlap.
        tokio::time::sleep(Duration::from_secs(3)).await;
        let behavior = self
            .pages
            .get(query)
            .cloned()
            .unwrap_or_else(|| Behavior::Page(String::new()));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match behavior {
            Behavior::Page(html) => Ok(html),
            Behavior::Fail(e) => Err(e),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
            Behavior::Panic => panic!("catalog exploded"),
        }
    }
}

fn listing_page(products: &[(&str, &str)]) -> String {
    let items: Vec<String> = products
        .iter()
        .map(|(name, slug)| format!(r#"{{"name":"{name}","slug":"{slug}"}}"#))
        .collect();
    format!(
        r#"<html><body><script id="__NEXT_DATA__" type="application/json">{{"props":{{"products":[{}]}}}}</script></body></html>"#,
        items.join(",")
    )
}

fn test_config() -> MatchConfig {
    MatchConfig {
        catalog_base_url: "https://catalog.test".into(),
        ..Default::default()
    }
}

fn resolver(catalog: Arc<FakeCatalog>) -> Resolver {
    Resolver::new(test_config(), catalog).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_results_keep_input_order() {
    let catalog = Arc::new(FakeCatalog::new(vec![
        (
            "Rantac 150mg tablet",
            Behavior::Page(listing_page(&[("Rantac 150mg Strip Of 30 Tablets", "rantac-150")])),
        ),
        (
            "CifranCT",
            Behavior::Page(listing_page(&[
                ("Cifran CT 250mg Strip Of 6 Tablets", "cifran-ct-250"),
                ("Cifran C.T. 500mg Strip Of 10 Tablets", "cifran-ct-500"),
            ])),
        ),
        (
            "Dolo 650mg",
            Behavior::Page(listing_page(&[("Dolo 650 Tablet", "dolo-650")])),
        ),
    ]));

    let queries = vec![
        MedicationQuery::new("Rantac")
            .with_strength("150mg")
            .with_form("tablet"),
        MedicationQuery::new("CifranCT"),
        MedicationQuery::new("Dolo").with_strength("650mg"),
    ];

    let results = resolver(catalog).resolve(&queries).await.unwrap();

    assert_eq!(results.len(), queries.len());
    for (query, result) in queries.iter().zip(&results) {
        assert_eq!(&result.query, query);
        assert_eq!(result.status, MatchStatus::Matched);
        let selected = result.selected.as_ref().unwrap();
        assert!(result.candidates.contains(selected));
        assert!(result.fallback_url.is_none());
    }

    let rantac = results[0].selected.as_ref().unwrap();
    assert_eq!(rantac.url, "https://catalog.test/online-medicine-order/rantac-150");
    assert!(results[0].confidence >= 85);
    assert_eq!(results[0].search_term, "Rantac 150mg tablet");
    assert_eq!(results[1].breakdown.unwrap().exact_name, 40);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_gets_fallback_url() {
    let catalog = Arc::new(FakeCatalog::new(vec![(
        "Rantac 150mg",
        Behavior::Fail(FetchError::Blocked { status: 403 }),
    )]));

    let queries = vec![MedicationQuery::new("Rantac").with_strength("150mg")];
    let results = resolver(catalog).resolve(&queries).await.unwrap();

    let result = &results[0];
    assert_eq!(result.status, MatchStatus::FetchFailed);
    assert!(result.selected.is_none());
    assert_eq!(result.confidence, 0);
    assert_eq!(
        result.fallback_url.as_deref(),
        Some("https://catalog.test/search/all?name=Rantac")
    );
    assert!(result.reason.contains("403"));
}

#[tokio::test(start_paused = true)]
async fn test_empty_page_is_no_candidates() {
    let catalog = Arc::new(FakeCatalog::new(vec![(
        "Unobtainium",
        Behavior::Page("<html><body>No results</body></html>".into()),
    )]));

    let results = resolver(catalog)
        .resolve(&[MedicationQuery::new("Unobtainium")])
        .await
        .unwrap();

    assert_eq!(results[0].status, MatchStatus::NoCandidatesFound);
    assert!(results[0].candidates.is_empty());
    assert!(results[0].fallback_url.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_hanging_task_times_out_alone() {
    let catalog = Arc::new(FakeCatalog::new(vec![
        ("Slowmed", Behavior::Hang),
        (
            "Rantac",
            Behavior::Page(listing_page(&[("Rantac 150mg Tablet", "rantac-150")])),
        ),
    ]));

    let queries = vec![MedicationQuery::new("Slowmed"), MedicationQuery::new("Rantac")];
    let results = resolver(catalog).resolve(&queries).await.unwrap();

    assert_eq!(results[0].status, MatchStatus::Timeout);
    assert!(results[0].selected.is_none());
    assert_eq!(
        results[0].fallback_url.as_deref(),
        Some("https://catalog.test/search/all?name=Slowmed")
    );
    assert_eq!(results[1].status, MatchStatus::Matched);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_task_becomes_fetch_failed() {
    let catalog = Arc::new(FakeCatalog::new(vec![
        ("Boom", Behavior::Panic),
        (
            "Rantac",
            Behavior::Page(listing_page(&[("Rantac 150mg Tablet", "rantac-150")])),
        ),
    ]));

    let queries = vec![MedicationQuery::new("Rantac"), MedicationQuery::new("Boom")];
    let results = resolver(catalog).resolve(&queries).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status, MatchStatus::Matched);
    assert_eq!(results[1].status, MatchStatus::FetchFailed);
    assert_eq!(results[1].query.name, "Boom");
    assert!(results[1].fallback_url.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_pool_bounds_concurrency() {
    let catalog = Arc::new(FakeCatalog::new(vec![]));
    let config = MatchConfig {
        max_workers: 2,
        stagger_delay_ms: 1_000,
        ..test_config()
    };
    let resolver = Resolver::new(config, catalog.clone()).unwrap();

    let queries: Vec<_> = (0..6)
        .map(|i| MedicationQuery::new(format!("Med{i}")))
        .collect();
    let results = resolver.resolve(&queries).await.unwrap();

    assert_eq!(results.len(), 6);
    assert_eq!(catalog.calls.load(Ordering::SeqCst), 6);
    assert_eq!(catalog.peak_in_flight.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_short_stagger_rejected_at_construction() {
    let config = MatchConfig {
        stagger_delay_ms: 0,
        ..test_config()
    };
    let err = Resolver::new(config, Arc::new(FakeCatalog::new(vec![]))).err().unwrap();
    assert!(matches!(err, ResolverError::Config(_)));
}

#[tokio::test(start_paused = true)]
async fn test_submissions_are_staggered() {
    let catalog = Arc::new(FakeCatalog::new(vec![]));
    let queries: Vec<_> = (0..4)
        .map(|i| MedicationQuery::new(format!("Med{i}")))
        .collect();

    let start = tokio::time::Instant::now();
    resolver(catalog).resolve(&queries).await.unwrap();

    // Three 1s stagger gaps, then the last fetch takes 3s.
    assert!(start.elapsed() >= Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_query_stops_before_fetching() {
    let catalog = Arc::new(FakeCatalog::new(vec![]));
    let queries = vec![MedicationQuery::new("Rantac"), MedicationQuery::new("")];

    let err = resolver(catalog.clone()).resolve(&queries).await.unwrap_err();

    assert!(matches!(err, ResolverError::InvalidQuery { index: 1, .. }));
    assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
}
