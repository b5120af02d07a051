//! Layered caches with per-kind TTLs.
//!
//! One [`CacheStore`] is shared by everything in a process; a fresh
//! [`RequestMemo`] is created at the start of every top-level search and
//! dropped at the end, so per-request scratch state can never leak into an
//! unrelated search. Negative geocode answers are recorded only in the memo,
//! never in the shared tiers, so a failed lookup can always be retried later
//! as data improves.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::classify::RawAssistedParse;
use crate::config::CacheConfig;
use crate::model::{GeocodeResult, ListingIntent, SearchOutcome, SortOrder};

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// LRU map where every read past the TTL is treated as absent and purged.
pub struct TtlCache<V> {
    inner: Mutex<LruCache<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Read with an explicit clock, so expiry is testable without sleeping.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut inner = self.inner.lock();
        let expired = match inner.get(key) {
            Some(entry) => {
                if now.duration_since(entry.stored_at) < self.ttl {
                    return Some(entry.value.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            inner.pop(key);
        }
        None
    }

    pub fn put(&self, key: impl Into<String>, value: V) {
        self.put_at(key, value, Instant::now());
    }

    pub fn put_at(&self, key: impl Into<String>, value: V, now: Instant) {
        self.inner.lock().put(key.into(), Entry { value, stored_at: now });
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The three process-wide cache tiers.
pub struct CacheStore {
    parse: TtlCache<RawAssistedParse>,
    results: TtlCache<SearchOutcome>,
    geocode: TtlCache<GeocodeResult>,
}

impl CacheStore {
    pub fn new(cfg: &CacheConfig) -> Self {
        Self {
            parse: TtlCache::new(cfg.parse_capacity, Duration::from_secs(cfg.parse_ttl_secs)),
            results: TtlCache::new(
                cfg.results_capacity,
                Duration::from_secs(cfg.results_ttl_secs),
            ),
            geocode: TtlCache::new(
                cfg.geocode_capacity,
                Duration::from_secs(cfg.geocode_ttl_secs),
            ),
        }
    }

    /// Assisted-parse responses, keyed by folded query text (tab-neutral).
    pub fn parse(&self) -> &TtlCache<RawAssistedParse> {
        &self.parse
    }

    /// Full ranked outcomes, keyed by [`CacheStore::results_key`].
    pub fn results(&self) -> &TtlCache<SearchOutcome> {
        &self.results
    }

    /// Positive geocode hits, keyed by normalized place text.
    pub fn geocode(&self) -> &TtlCache<GeocodeResult> {
        &self.geocode
    }

    /// Results are tab- and sort-sensitive even when the text is identical.
    pub fn results_key(folded_query: &str, intent: ListingIntent, sort: SortOrder) -> String {
        format!("{}:{}:{folded_query}", intent.as_str(), sort.as_str())
    }
}

/// Scratch state for exactly one top-level search invocation.
///
/// Holds sub-work already done during this search, including negative geocode
/// outcomes, so a single search never repeats an identical lookup. Dropped
/// when the search returns.
#[derive(Debug, Default)]
pub struct RequestMemo {
    geocode: HashMap<String, Option<GeocodeResult>>,
}

impl RequestMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outer `None` means the lookup was never attempted this request; inner
    /// `None` is a remembered miss.
    pub fn geocode_lookup(&self, key: &str) -> Option<Option<GeocodeResult>> {
        self.geocode.get(key).cloned()
    }

    pub fn record_geocode(&mut self, key: impl Into<String>, result: Option<GeocodeResult>) {
        self.geocode.insert(key.into(), result);
    }

    pub fn clear(&mut self) {
        self.geocode.clear();
    }
}
