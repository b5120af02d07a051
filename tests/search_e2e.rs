//! End-to-end searches over the standard inventory: real extractor,
//! detector, gazetteer, and caches; scripted external providers only.

mod util;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use airea_search::classify::{self, RawAssistedParse};
use airea_search::config::{EngineConfig, ParseConfig};
use airea_search::engine::{EngineError, SearchEngine};
use airea_search::extract;
use airea_search::geocode::providers::{
    AssistedParser, AssistedPlace, GeocodingProvider, ProviderError, ProviderHit,
};
use airea_search::model::{
    CountFilter, ListingIntent, PropertyKind, SearchQuery, SortOrder, TravelMode,
};
use airea_search::normalize::{QueryFlaw, normalize_query};
use airea_search::store::InMemoryPropertyStore;
use airea_search::usage::TracingUsageLogger;

struct CountingGeocoder {
    target: String,
    hit: Option<ProviderHit>,
    calls: AtomicUsize,
}

impl CountingGeocoder {
    fn idle() -> Self {
        Self {
            target: String::new(),
            hit: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn with(query: &str, lat: f64, lng: f64, confidence: f64) -> Self {
        Self {
            target: query.to_string(),
            hit: Some(ProviderHit {
                latitude: lat,
                longitude: lng,
                display_name: query.to_string(),
                confidence,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeocodingProvider for CountingGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<ProviderHit>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if query == self.target {
            Ok(self.hit.clone())
        } else {
            Ok(None)
        }
    }

    fn name(&self) -> &'static str {
        "geocode-primary"
    }
}

#[derive(Default)]
struct CountingParser {
    calls: AtomicUsize,
}

impl CountingParser {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssistedParser for CountingParser {
    async fn parse_query(&self, _query: &str) -> Result<Option<RawAssistedParse>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }

    async fn resolve_place(&self, _name: &str) -> Result<Option<AssistedPlace>, ProviderError> {
        Ok(None)
    }
}

fn engine_over_inventory(
    primary: Option<Arc<dyn GeocodingProvider>>,
    assist: Option<Arc<dyn AssistedParser>>,
) -> SearchEngine {
    SearchEngine::from_parts(
        EngineConfig::default(),
        Arc::new(InMemoryPropertyStore::new(util::inventory())),
        None,
        primary,
        None,
        assist,
        Arc::new(TracingUsageLogger),
    )
}

#[tokio::test]
async fn fully_specified_sale_query_resolves_and_filters() {
    let engine = engine_over_inventory(None, None);
    let query = SearchQuery::new(
        "3 bedroom condo under RM500000 in Mont Kiara",
        ListingIntent::Sale,
        SortOrder::Relevance,
    );

    let outcome = engine.process_search(&query).await.unwrap();

    let filters = &outcome.filters_used;
    assert!(filters.kinds.contains(&PropertyKind::Condominium));
    assert_eq!(filters.bedrooms, Some(CountFilter::Exactly(3)));
    assert_eq!(filters.max_price, Some(500_000.0));
    let location = filters.location.as_ref().expect("location resolved");
    assert_eq!(location.name, "Mont Kiara");
    assert_eq!(location.coordinates(), Some((3.1727, 101.6509)));

    assert_eq!(outcome.count, 1);
    assert_eq!(outcome.properties[0].title, "Kiara Designer Suites");
}

#[test]
fn fully_specified_query_parses_confidently_without_escalation() {
    let normalized = normalize_query("3 bedroom condo under RM500000 in Mont Kiara");
    let ex = extract::extract(&normalized);
    let decision = classify::classify(&ex, &normalized, &ParseConfig::default());

    assert!(decision.confidence >= 0.85, "got {}", decision.confidence);
    assert_eq!(decision.route, classify::ParseRoute::Lexical);
}

#[tokio::test]
async fn cheap_rent_near_klcc_gets_ceiling_and_driving_radius() {
    let engine = engine_over_inventory(None, None);
    let query = SearchQuery::new(
        "cheap apartment near KLCC",
        ListingIntent::Rent,
        SortOrder::Relevance,
    );

    let outcome = engine.process_search(&query).await.unwrap();

    assert_eq!(outcome.filters_used.max_price, Some(3_000.0));
    let prox = outcome
        .filters_used
        .proximity
        .as_ref()
        .expect("proximity filter built");
    assert_eq!(prox.anchor, "KLCC");
    assert_eq!((prox.latitude, prox.longitude), (3.1579, 101.7123));
    assert_eq!(prox.radius_km, 7.5);
    assert_eq!(prox.mode, TravelMode::Driving);

    // Parkview is in radius but over the ceiling; Bayu Tasik is affordable
    // but thirteen kilometres out.
    assert_eq!(outcome.count, 1);
    assert_eq!(outcome.properties[0].title, "Vista Damai");
}

#[tokio::test]
async fn roi_investor_query_stays_fully_offline() {
    let geocoder = Arc::new(CountingGeocoder::idle());
    let parser = Arc::new(CountingParser::default());
    let engine = engine_over_inventory(Some(geocoder.clone()), Some(parser.clone()));
    let query = SearchQuery::new("Shop with ROI 4.5%", ListingIntent::Rent, SortOrder::Relevance);

    let outcome = engine.process_search(&query).await.unwrap();

    assert_eq!(geocoder.calls(), 0);
    assert_eq!(parser.calls(), 0);
    assert_eq!(outcome.filters_used.intent, ListingIntent::Sale);
    assert_eq!(outcome.filters_used.min_roi, Some(4.5));
    assert_eq!(outcome.count, 1);
    assert_eq!(outcome.properties[0].title, "Cendana Shop Lot");

    // Filter echo keeps the marketplace wire shape.
    let value = serde_json::to_value(&outcome.filters_used).unwrap();
    assert_eq!(value["listingType"], "sale");
    assert_eq!(value["minROI"], 4.5);
    assert_eq!(value["propertyTypes"][0], "shop-lot");
}

#[tokio::test]
async fn gibberish_is_refused_before_any_work() {
    let geocoder = Arc::new(CountingGeocoder::idle());
    let parser = Arc::new(CountingParser::default());
    let engine = engine_over_inventory(Some(geocoder.clone()), Some(parser.clone()));
    let query = SearchQuery::new("jhszugjaka", ListingIntent::Rent, SortOrder::Relevance);

    let err = engine.process_search(&query).await.unwrap_err();

    let message = err.to_string();
    assert!(matches!(
        err,
        EngineError::InvalidQuery(QueryFlaw::Nonsense)
    ));
    assert_eq!(message, "invalid query: query does not look like language");
    assert_eq!(geocoder.calls(), 0);
    assert_eq!(parser.calls(), 0);
}

#[tokio::test]
async fn identical_queries_reuse_the_first_answer() {
    let capture = util::LogCapture::new();
    let _guard = capture.install();

    let primary = Arc::new(CountingGeocoder::with("taman maluri", 3.1298, 101.7285, 0.86));
    let engine = engine_over_inventory(Some(primary.clone()), None);
    let query = SearchQuery::new(
        "condo in taman maluri",
        ListingIntent::Rent,
        SortOrder::Relevance,
    );

    let first = engine.process_search(&query).await.unwrap();
    let second = engine.process_search(&query).await.unwrap();

    assert_eq!(primary.calls(), 1);
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
    assert_eq!(first.count, 1);
    assert_eq!(first.properties[0].title, "Maluri Vista");
    capture.assert_contains("results cache hit");
}

#[tokio::test]
async fn malay_phrasing_runs_the_full_pipeline() {
    let engine = engine_over_inventory(None, None);
    let query = SearchQuery::new(
        "kondo 3 bilik dekat KLCC",
        ListingIntent::Rent,
        SortOrder::Relevance,
    );

    let outcome = engine.process_search(&query).await.unwrap();

    let filters = &outcome.filters_used;
    assert!(filters.kinds.contains(&PropertyKind::Condominium));
    assert_eq!(filters.bedrooms, Some(CountFilter::Exactly(3)));
    let prox = filters.proximity.as_ref().expect("proximity filter built");
    assert_eq!(prox.anchor, "KLCC");

    assert_eq!(outcome.count, 1);
    assert_eq!(outcome.properties[0].title, "The Stonor");
}

#[tokio::test]
async fn suggest_completes_titles_on_the_active_tab() {
    let engine = engine_over_inventory(None, None);

    let suggestions = engine.suggest("vista", ListingIntent::Rent).await.unwrap();

    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].title, "Vista Damai");
}
