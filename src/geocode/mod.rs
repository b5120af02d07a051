//! Waterfall place resolution.
//!
//! [`Resolver::resolve`] turns one location name into coordinates by walking
//! an ordered ladder of sources, cheapest first:
//!
//! 1. Durable cache, high-confidence rows only
//! 2. Request memo, then the in-process cache
//! 3. Internal gazetteer, exact
//! 4. Primary external provider
//! 5. Internal gazetteer, fuzzy
//! 6. Secondary external provider
//! 7. Secondary provider with appended context
//! 8. Assisted resolution, in-country only
//!
//! The first acceptable hit wins and is written back to both cache tiers. A
//! provider error is logged and the ladder advances; it never fails the
//! search. Exhausting every step records a negative answer in the request
//! memo only, so the same name can retry in a later search. Every external
//! coordinate must pass the [`bounds`] validator before it is believed.

pub mod bounds;
pub mod providers;
pub mod store;

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::cache::{CacheStore, RequestMemo};
use crate::config::GeocodeConfig;
use crate::location::gazetteer;
use crate::model::{GeocodeResult, GeocodeSource};
use crate::normalize::normalize_query;
use crate::usage::{UsageEvent, UsageLogger};

use providers::{AssistedParser, GeocodingProvider, ProviderHit};
use store::GeocodeStore;

/// Notional per-call cost of a forward-geocoding request in USD.
const GEOCODE_CALL_COST: f64 = 0.002;
/// Notional per-call cost of an assisted resolution in USD.
const ASSIST_CALL_COST: f64 = 0.01;

const FUZZY_PREFIX_CONFIDENCE: f64 = 0.75;
const FUZZY_PARTIAL_CONFIDENCE: f64 = 0.65;
/// Keys shorter than this never fuzzy-match; short fragments are too
/// ambiguous and real abbreviations resolve through aliases instead.
const FUZZY_MIN_KEY_CHARS: usize = 4;

/// The waterfall resolver. Built once and reused across searches.
pub struct Resolver {
    cfg: GeocodeConfig,
    durable: Option<GeocodeStore>,
    primary: Option<Arc<dyn GeocodingProvider>>,
    secondary: Option<Arc<dyn GeocodingProvider>>,
    assist: Option<Arc<dyn AssistedParser>>,
    usage: Arc<dyn UsageLogger>,
}

impl Resolver {
    pub fn new(
        cfg: GeocodeConfig,
        durable: Option<GeocodeStore>,
        primary: Option<Arc<dyn GeocodingProvider>>,
        secondary: Option<Arc<dyn GeocodingProvider>>,
        assist: Option<Arc<dyn AssistedParser>>,
        usage: Arc<dyn UsageLogger>,
    ) -> Self {
        Self {
            cfg,
            durable,
            primary,
            secondary,
            assist,
            usage,
        }
    }

    /// Shared cache key for one location name. Folding aliases keeps "pj"
    /// and "petaling jaya" on the same row.
    pub fn cache_key(name: &str) -> String {
        gazetteer::fold_aliases(&normalize_query(name))
    }

    /// Resolve one location name to coordinates.
    ///
    /// `context` is an optional containing city from the detector, used by
    /// the contextual retry step. Returns `None` only after every step has
    /// been exhausted or disabled.
    pub async fn resolve(
        &self,
        name: &str,
        context: Option<&str>,
        caches: &CacheStore,
        memo: &mut RequestMemo,
    ) -> Option<GeocodeResult> {
        let key = Self::cache_key(name);
        if key.is_empty() {
            return None;
        }

        // 1. Durable rows below the confidence floor are left in place but
        //    never served; a later step re-resolves and overwrites them.
        if let Some(store) = &self.durable {
            match store.get(&key) {
                Ok(Some(hit)) if hit.confidence >= self.cfg.durable_min_confidence => {
                    self.usage.log(UsageEvent::cache_hit("geocode-durable"));
                    memo.record_geocode(&key, Some(hit.clone()));
                    return Some(hit);
                }
                Ok(_) => {}
                Err(err) => warn!(%err, "durable geocode cache read failed"),
            }
        }

        // 2. Memo first, then the shared in-process tier. A remembered miss
        //    is final within this request unless the name is a major
        //    landmark, which always re-attempts.
        if let Some(remembered) = memo.geocode_lookup(&key) {
            match remembered {
                Some(hit) => {
                    self.usage.log(UsageEvent::cache_hit("geocode-memo"));
                    return Some(hit);
                }
                None if !gazetteer::is_major_landmark(&key) => return None,
                None => {}
            }
        }
        if let Some(hit) = caches.geocode().get(&key) {
            self.usage.log(UsageEvent::cache_hit("geocode-memory"));
            let hit = GeocodeResult {
                source: GeocodeSource::MemoryCache,
                ..hit
            };
            memo.record_geocode(&key, Some(hit.clone()));
            return Some(hit);
        }

        // 3. Exact gazetteer match.
        if let Some(place) = gazetteer::lookup(&key) {
            let hit = GeocodeResult {
                latitude: place.lat,
                longitude: place.lng,
                name: place.name.to_string(),
                source: GeocodeSource::Internal,
                confidence: self.cfg.internal_confidence,
            };
            return Some(self.finish(&key, hit, caches, memo));
        }

        // 4. Primary provider.
        if let Some(provider) = &self.primary
            && let Some(hit) = self.call_geocoder(provider.as_ref(), &key).await
        {
            let hit = provider_result(&hit, GeocodeSource::Primary);
            return Some(self.finish(&key, hit, caches, memo));
        }

        // 5. Fuzzy gazetteer match.
        if let Some(hit) = fuzzy_internal(&key) {
            return Some(self.finish(&key, hit, caches, memo));
        }

        // 6. Secondary provider, plain query.
        if let Some(provider) = &self.secondary {
            if let Some(hit) = self.call_geocoder(provider.as_ref(), &key).await
                && hit.confidence >= self.cfg.secondary_min_confidence
            {
                let hit = provider_result(&hit, GeocodeSource::Secondary);
                return Some(self.finish(&key, hit, caches, memo));
            }

            // 7. Secondary provider again with geographic context appended,
            //    accepted at a lower bar.
            let augmented = augment(&key, context);
            if let Some(hit) = self.call_geocoder(provider.as_ref(), &augmented).await
                && hit.confidence >= self.cfg.contextual_min_confidence
            {
                let hit = provider_result(&hit, GeocodeSource::Contextual);
                return Some(self.finish(&key, hit, caches, memo));
            }
        }

        // 8. Assisted resolution.
        if let Some(assist) = &self.assist
            && let Some(hit) = self.call_assist(assist.as_ref(), &key).await
        {
            return Some(self.finish(&key, hit, caches, memo));
        }

        debug!(key, "no resolver step produced coordinates");
        memo.record_geocode(&key, None);
        None
    }

    /// One timed, logged provider call. Errors and out-of-bounds answers
    /// both come back as `None` so the caller just moves on.
    async fn call_geocoder(
        &self,
        provider: &dyn GeocodingProvider,
        query: &str,
    ) -> Option<ProviderHit> {
        let start = Instant::now();
        let outcome = provider.geocode(query).await;
        self.usage.log(UsageEvent::provider_call(
            provider.name(),
            start.elapsed(),
            outcome.is_ok(),
            GEOCODE_CALL_COST,
        ));
        match outcome {
            Ok(Some(hit)) => {
                if bounds::plausible(hit.latitude, hit.longitude) {
                    Some(hit)
                } else {
                    warn!(
                        provider = provider.name(),
                        query,
                        lat = hit.latitude,
                        lng = hit.longitude,
                        "discarding implausible coordinates"
                    );
                    None
                }
            }
            Ok(None) => None,
            Err(err) => {
                warn!(provider = provider.name(), query, %err, "geocode provider failed");
                None
            }
        }
    }

    async fn call_assist(&self, assist: &dyn AssistedParser, key: &str) -> Option<GeocodeResult> {
        let start = Instant::now();
        let outcome = assist.resolve_place(key).await;
        self.usage.log(UsageEvent::provider_call(
            "assist-resolve",
            start.elapsed(),
            outcome.is_ok(),
            ASSIST_CALL_COST,
        ));
        match outcome {
            Ok(Some(place)) => {
                if place.confidence < self.cfg.assist_min_confidence {
                    debug!(key, confidence = place.confidence, "assisted hit below gate");
                    return None;
                }
                if !bounds::plausible(place.latitude, place.longitude) {
                    warn!(
                        key,
                        lat = place.latitude,
                        lng = place.longitude,
                        "assisted resolution outside the country"
                    );
                    return None;
                }
                Some(GeocodeResult {
                    latitude: place.latitude,
                    longitude: place.longitude,
                    name: place.name,
                    source: GeocodeSource::Assisted,
                    confidence: place.confidence,
                })
            }
            Ok(None) => None,
            Err(err) => {
                warn!(key, %err, "assisted resolution failed");
                None
            }
        }
    }

    /// Write one fresh hit through to both cache tiers and the memo.
    fn finish(
        &self,
        key: &str,
        hit: GeocodeResult,
        caches: &CacheStore,
        memo: &mut RequestMemo,
    ) -> GeocodeResult {
        if let Some(store) = &self.durable
            && let Err(err) = store.put(key, &hit)
        {
            warn!(key, %err, "durable geocode cache write failed");
        }
        caches.geocode().put(key, hit.clone());
        memo.record_geocode(key, Some(hit.clone()));
        debug!(
            key,
            source = hit.source.as_str(),
            confidence = hit.confidence,
            "resolved location"
        );
        hit
    }
}

fn provider_result(hit: &ProviderHit, source: GeocodeSource) -> GeocodeResult {
    GeocodeResult {
        latitude: hit.latitude,
        longitude: hit.longitude,
        name: hit.display_name.clone(),
        source,
        confidence: hit.confidence,
    }
}

/// Query string for the contextual retry: the detected parent city when
/// known, always pinned to the country.
fn augment(key: &str, context: Option<&str>) -> String {
    match context {
        Some(city) if !city.trim().is_empty() => format!("{key}, {city}, Malaysia"),
        _ => format!("{key}, Malaysia"),
    }
}

/// Substring scan over the gazetteer, prefix grade above mid-string grade.
/// Table order breaks ties, which ranks cities ahead of smaller places.
fn fuzzy_internal(key: &str) -> Option<GeocodeResult> {
    if key.chars().count() < FUZZY_MIN_KEY_CHARS {
        return None;
    }
    let mut best: Option<(f64, &gazetteer::Place)> = None;
    for place in gazetteer::places() {
        let lower = place.name.to_lowercase();
        let grade = if lower.starts_with(key) || key.starts_with(&lower) {
            FUZZY_PREFIX_CONFIDENCE
        } else if lower.contains(key) || key.contains(&lower) {
            FUZZY_PARTIAL_CONFIDENCE
        } else {
            continue;
        };
        if best.is_none_or(|(current, _)| grade > current) {
            best = Some((grade, place));
        }
    }
    best.map(|(confidence, place)| GeocodeResult {
        latitude: place.lat,
        longitude: place.lng,
        name: place.name.to_string(),
        source: GeocodeSource::FuzzyInternal,
        confidence,
    })
}
