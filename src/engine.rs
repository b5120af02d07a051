//! Top-level search pipeline.
//!
//! [`SearchEngine::process_search`] is the single entry point. One search
//! walks, in order:
//!
//! 1. results-cache short-circuit
//! 2. validity gate
//! 3. lexical extraction
//! 4. parse-route classification, with an optional assisted parse
//! 5. location detection and waterfall resolution
//! 6. proximity matching, when the query asked for nearness and an anchor
//!    resolved
//! 7. the property store query
//! 8. ordering, truncation, and the results-cache write
//!
//! External trouble never aborts a search: a failed assisted parse falls
//! back to the lexical filter set, an unresolved location degrades to a text
//! filter, and provider errors inside the resolver just advance its ladder.
//! The one deliberate empty result is a query whose named location the
//! resolver is confident does not exist while nothing else constrains the
//! search; answering that with a broad scan would be worse than answering
//! with nothing.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{CacheStore, RequestMemo};
use crate::classify::{self, ParseRoute};
use crate::config::{EngineConfig, ProximityConfig};
use crate::extract::{self, Extraction};
use crate::geocode::providers::{
    AssistedParser, GeocodingProvider, HttpAssistedParser, HttpGeocoder, ProviderError,
};
use crate::geocode::store::{GeocodeStore, StoreError};
use crate::geocode::Resolver;
use crate::location::{self, gazetteer};
use crate::model::{
    ListingIntent, LocationRef, Property, ProximityFilter, SearchOutcome, SearchQuery, SortOrder,
    StructuredFilters, TransportKind,
};
use crate::normalize::{self, QueryFlaw};
use crate::proximity::{self, ProximityQuery};
use crate::store::PropertyStore;
use crate::suggest::{self, Suggestion};
use crate::usage::{TracingUsageLogger, UsageEvent, UsageLogger};

/// Notional per-call cost of an assisted parse in USD.
const ASSIST_PARSE_COST: f64 = 0.01;

/// Why the engine could not be built.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("provider setup failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("durable geocode cache setup failed: {0}")]
    GeocodeCache(#[from] StoreError),
}

/// Search-time failures surfaced to the request handler.
///
/// Provider and resolution problems are absorbed inside the pipeline and
/// never appear here; only a refused query and a failing property backend do.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] QueryFlaw),
    #[error("property store failed: {0}")]
    Store(#[from] anyhow::Error),
}

/// The search engine. Built once per process and shared across requests.
pub struct SearchEngine {
    cfg: EngineConfig,
    caches: CacheStore,
    resolver: Resolver,
    parser: Option<Arc<dyn AssistedParser>>,
    store: Arc<dyn PropertyStore>,
    usage: Arc<dyn UsageLogger>,
}

impl SearchEngine {
    /// Build a production engine: HTTP providers from config, the durable
    /// geocode cache at the configured or platform-default path, and a
    /// tracing usage sink.
    pub fn new(cfg: EngineConfig, store: Arc<dyn PropertyStore>) -> Result<Self, SetupError> {
        let primary =
            HttpGeocoder::primary(&cfg.geocode)?.map(|g| Arc::new(g) as Arc<dyn GeocodingProvider>);
        let secondary = HttpGeocoder::secondary(&cfg.geocode)?
            .map(|g| Arc::new(g) as Arc<dyn GeocodingProvider>);
        let assist = HttpAssistedParser::from_config(&cfg.geocode)?
            .map(|p| Arc::new(p) as Arc<dyn AssistedParser>);
        let db_path = cfg
            .geocode
            .db_path
            .clone()
            .or_else(EngineConfig::default_db_path);
        let durable = match db_path {
            Some(path) => Some(GeocodeStore::open(&path)?),
            None => None,
        };
        Ok(Self::from_parts(
            cfg,
            store,
            durable,
            primary,
            secondary,
            assist,
            Arc::new(TracingUsageLogger),
        ))
    }

    /// Wire an engine from explicit parts. Tests inject scripted providers
    /// and usage sinks here.
    pub fn from_parts(
        cfg: EngineConfig,
        store: Arc<dyn PropertyStore>,
        durable: Option<GeocodeStore>,
        primary: Option<Arc<dyn GeocodingProvider>>,
        secondary: Option<Arc<dyn GeocodingProvider>>,
        assist: Option<Arc<dyn AssistedParser>>,
        usage: Arc<dyn UsageLogger>,
    ) -> Self {
        let caches = CacheStore::new(&cfg.cache);
        let resolver = Resolver::new(
            cfg.geocode.clone(),
            durable,
            primary,
            secondary,
            assist.clone(),
            usage.clone(),
        );
        Self {
            cfg,
            caches,
            resolver,
            parser: assist,
            store,
            usage,
        }
    }

    /// Run one search end to end.
    pub async fn process_search(&self, query: &SearchQuery) -> Result<SearchOutcome, EngineError> {
        let normalized = normalize::normalize_query(&query.raw);
        let folded = gazetteer::fold_aliases(&normalize::expand_numeric_shorthand(&normalized));
        let results_key = CacheStore::results_key(&folded, query.intent, query.sort);

        if let Some(outcome) = self.caches.results().get(&results_key) {
            self.usage.log(UsageEvent::cache_hit("results"));
            debug!(key = %results_key, "results cache hit");
            return Ok(outcome);
        }

        normalize::validate_query(&normalized)?;

        let ex = extract::extract(&normalized);
        let decision = classify::classify(&ex, &normalized, &self.cfg.parse);
        debug!(
            route = ?decision.route,
            confidence = decision.confidence,
            complexity = decision.complexity,
            "parse route decided"
        );

        let mut filters = match decision.route {
            ParseRoute::Assisted => {
                self.assisted_filters(&ex, &normalized, &folded, query.intent)
                    .await
            }
            ParseRoute::Lexical => classify::build_filters(&ex, query.intent, &self.cfg.parse),
        };
        if let Some(transit) = &mut filters.transit
            && transit.stations.is_empty()
        {
            transit.stations = network_station_names(&transit.networks);
        }

        let mut memo = RequestMemo::new();
        self.resolve_location(&mut filters, &normalized, &mut memo)
            .await;

        let location_unresolved = filters
            .location
            .as_ref()
            .is_some_and(|l| l.coordinates().is_none());
        if location_unresolved && !has_substituting_filters(&filters) {
            debug!("named location is confidently unknown and nothing else constrains; empty result");
            let outcome = SearchOutcome {
                properties: Vec::new(),
                count: 0,
                filters_used: filters,
                query: query.raw.clone(),
            };
            self.caches.results().put(results_key, outcome.clone());
            return Ok(outcome);
        }

        filters.proximity = build_proximity(&ex, filters.location.as_ref(), &self.cfg.proximity);
        let proximity_ranked = filters.proximity.is_some();

        let mut properties = match filters.proximity.clone() {
            Some(prox) => self.proximity_results(&filters, &prox).await?,
            None => self.plain_results(&filters, &normalized).await?,
        };

        order_results(&mut properties, query.sort, proximity_ranked, now_unix());
        properties.truncate(self.cfg.result_limit);

        let outcome = SearchOutcome {
            count: properties.len(),
            properties,
            filters_used: filters,
            query: query.raw.clone(),
        };
        debug!(count = outcome.count, "search complete");
        self.caches.results().put(results_key, outcome.clone());
        Ok(outcome)
    }

    /// Title autocomplete over the current inventory of the given tab.
    pub async fn suggest(
        &self,
        prefix: &str,
        intent: ListingIntent,
    ) -> Result<Vec<Suggestion>, EngineError> {
        let filters = StructuredFilters::for_intent(intent);
        let listings = self.store.get_properties(&filters).await?;
        Ok(suggest::suggest(prefix, &listings))
    }

    /// Run the assisted route: serve the parse from cache when possible,
    /// otherwise call the parser. Any failure falls back to the lexical
    /// filter set.
    async fn assisted_filters(
        &self,
        ex: &Extraction,
        normalized: &str,
        folded: &str,
        intent: ListingIntent,
    ) -> StructuredFilters {
        let Some(parser) = &self.parser else {
            return classify::build_filters(ex, intent, &self.cfg.parse);
        };

        if let Some(raw) = self.caches.parse().get(folded) {
            self.usage.log(UsageEvent::cache_hit("assist-parse"));
            return classify::absorb(ex, &raw, intent, &self.cfg.parse, normalized);
        }

        let expanded = normalize::expand_numeric_shorthand(normalized);
        let start = Instant::now();
        let outcome = parser.parse_query(&expanded).await;
        self.usage.log(UsageEvent::provider_call(
            "assist-parse",
            start.elapsed(),
            outcome.is_ok(),
            ASSIST_PARSE_COST,
        ));
        match outcome {
            Ok(Some(raw)) => {
                let raw = raw.sanitized();
                self.caches.parse().put(folded, raw.clone());
                classify::absorb(ex, &raw, intent, &self.cfg.parse, normalized)
            }
            Ok(None) => {
                debug!("assisted parser returned nothing; using lexical filters");
                classify::build_filters(ex, intent, &self.cfg.parse)
            }
            Err(err) => {
                warn!(%err, "assisted parse failed; using lexical filters");
                classify::build_filters(ex, intent, &self.cfg.parse)
            }
        }
    }

    /// Detect the query's location and resolve it, rewriting
    /// `filters.location` with the canonical name and coordinates on
    /// success. Candidates are tried in rank order; when detection found
    /// nothing internal, the extracted location text gets one external
    /// attempt.
    async fn resolve_location(
        &self,
        filters: &mut StructuredFilters,
        normalized: &str,
        memo: &mut RequestMemo,
    ) {
        let detection = location::detect(normalized);

        for candidate in &detection.candidates {
            if let Some(hit) = self
                .resolver
                .resolve(
                    &candidate.name,
                    candidate.parent.as_deref(),
                    &self.caches,
                    memo,
                )
                .await
            {
                filters.location = Some(LocationRef::resolved(
                    candidate.name.clone(),
                    hit.latitude,
                    hit.longitude,
                ));
                return;
            }
        }

        if detection.external_allowed
            && let Some(location) = filters.location.clone()
        {
            if let Some(hit) = self
                .resolver
                .resolve(&location.name, None, &self.caches, memo)
                .await
            {
                filters.location = Some(LocationRef::resolved(
                    location.name,
                    hit.latitude,
                    hit.longitude,
                ));
                return;
            }
            debug!(name = %location.name, "location stays unresolved; treated as text");
        }
    }

    /// Store query for the proximity path. The matcher owns the location
    /// constraint, so the store must not also apply it as text or the
    /// radius arm would only ever see address matches.
    async fn proximity_results(
        &self,
        filters: &StructuredFilters,
        prox: &ProximityFilter,
    ) -> Result<Vec<Property>, EngineError> {
        let mut store_filters = filters.clone();
        store_filters.location = None;
        store_filters.proximity = None;

        let mut candidates = self.store.get_properties(&store_filters).await?;
        candidates.truncate(self.cfg.result_limit);

        let station_names = filters
            .transit
            .as_ref()
            .map(|t| t.stations.clone())
            .unwrap_or_default();
        let query = ProximityQuery {
            latitude: prox.latitude,
            longitude: prox.longitude,
            radius_km: prox.radius_km,
            label: &prox.anchor,
            station_names: &station_names,
        };
        let matches = proximity::rank_by_proximity(candidates, &query, &self.cfg.proximity, now_unix());
        Ok(matches.into_iter().map(|m| m.property).collect())
    }

    /// Store query for the non-proximity path. An unresolved location is
    /// informational text rather than a structured constraint, and a query
    /// that produced no filters at all falls back to free-text matching so
    /// bare building names still find their listings.
    async fn plain_results(
        &self,
        filters: &StructuredFilters,
        normalized: &str,
    ) -> Result<Vec<Property>, EngineError> {
        if let Some(location) = &filters.location
            && location.coordinates().is_none()
        {
            let mut store_filters = filters.clone();
            store_filters.location = None;
            return Ok(self
                .store
                .search_properties(&location.name, &store_filters)
                .await?);
        }
        if filters.is_unconstrained() {
            return Ok(self.store.search_properties(normalized, filters).await?);
        }
        Ok(self.store.get_properties(filters).await?)
    }
}

/// Whether the query carried any proximity language at all.
fn wants_proximity(ex: &Extraction) -> bool {
    ex.near_signal
        || ex.time_budget_minutes.is_some()
        || ex.max_distance_km.is_some()
        || !ex.transit.is_empty()
}

/// Filters specific enough to stand in for a failed location: type, price,
/// room counts, ROI, amenities.
fn has_substituting_filters(filters: &StructuredFilters) -> bool {
    !filters.kinds.is_empty()
        || filters.min_price.is_some()
        || filters.max_price.is_some()
        || filters.bedrooms.is_some()
        || filters.bathrooms.is_some()
        || filters.has_roi_bound()
        || !filters.amenities.is_empty()
}

/// A proximity filter exists only when the query asked for nearness and an
/// anchor actually resolved.
fn build_proximity(
    ex: &Extraction,
    location: Option<&LocationRef>,
    cfg: &ProximityConfig,
) -> Option<ProximityFilter> {
    if !wants_proximity(ex) {
        return None;
    }
    let location = location?;
    let (latitude, longitude) = location.coordinates()?;
    let mode = ex.travel_mode.unwrap_or_default();
    let radius_km =
        proximity::effective_radius_km(ex.max_distance_km, ex.time_budget_minutes, mode, cfg);
    Some(ProximityFilter {
        anchor: location.name.clone(),
        latitude,
        longitude,
        radius_km,
        mode,
        minutes: ex.time_budget_minutes,
    })
}

/// Curated station names on the given networks, for the matcher's
/// station-text arm and the filters echo.
fn network_station_names(networks: &[TransportKind]) -> Vec<String> {
    gazetteer::stations()
        .filter(|s| {
            let lower = s.name.to_lowercase();
            networks.iter().any(|n| lower.starts_with(n.as_str()))
        })
        .map(|s| s.name.to_string())
        .collect()
}

/// Order results for the envelope. Proximity output arrives pre-ranked and
/// only an explicit price or recency directive overrides it.
fn order_results(properties: &mut [Property], sort: SortOrder, proximity_ranked: bool, now: i64) {
    match sort {
        SortOrder::PriceAsc => properties.sort_by(|a, b| {
            a.price
                .partial_cmp(&b.price)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortOrder::PriceDesc => properties.sort_by(|a, b| {
            b.price
                .partial_cmp(&a.price)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortOrder::Newest => {
            properties.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)))
        }
        SortOrder::Relevance if !proximity_ranked => {
            properties.sort_by(|a, b| {
                b.is_featured_at(now)
                    .cmp(&a.is_featured_at(now))
                    .then_with(|| b.created_at.cmp(&a.created_at))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        SortOrder::Relevance => {}
    }
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
