//! Engine configuration.
//!
//! Every knob has a compiled-in default and an `AIREA_`-prefixed environment
//! override picked up through [`from_env`](EngineConfig::from_env). Values
//! that fail to parse are ignored rather than erroring, so a bad override
//! degrades to the default instead of taking the search path down.

use std::path::PathBuf;

/// TTLs and capacities for the cache layers.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Assisted-parse cache TTL in seconds (default: 24h).
    pub parse_ttl_secs: u64,
    /// Results cache TTL in seconds (default: 8h).
    pub results_ttl_secs: u64,
    /// In-process geocode cache TTL in seconds (default: 48h).
    pub geocode_ttl_secs: u64,
    /// Assisted-parse cache entry capacity (default: 4096).
    pub parse_capacity: usize,
    /// Results cache entry capacity (default: 1024).
    pub results_capacity: usize,
    /// In-process geocode cache entry capacity (default: 2048).
    pub geocode_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            parse_ttl_secs: 24 * 60 * 60,
            results_ttl_secs: 8 * 60 * 60,
            geocode_ttl_secs: 48 * 60 * 60,
            parse_capacity: 4096,
            results_capacity: 1024,
            geocode_capacity: 2048,
        }
    }
}

/// External resolution endpoints and confidence gates.
#[derive(Debug, Clone)]
pub struct GeocodeConfig {
    /// Primary provider endpoint; `None` disables the step.
    pub primary_url: Option<String>,
    /// Secondary provider endpoint; `None` disables the step.
    pub secondary_url: Option<String>,
    /// Assisted-resolution endpoint; `None` disables both LLM steps.
    pub assist_url: Option<String>,
    /// Bearer token for the assisted-resolution endpoint.
    pub assist_api_key: Option<String>,
    /// Per-request timeout for provider calls in milliseconds (default: 5000).
    pub request_timeout_ms: u64,
    /// Minimum confidence to persist a hit durably (default: 0.8).
    pub durable_min_confidence: f64,
    /// Confidence assigned to internal-database hits (default: 0.9).
    pub internal_confidence: f64,
    /// Minimum confidence to accept a secondary-provider hit (default: 0.6).
    pub secondary_min_confidence: f64,
    /// Minimum confidence to accept a context-recovery hit (default: 0.5).
    pub contextual_min_confidence: f64,
    /// Minimum confidence to accept an assisted-resolution hit (default: 0.7).
    pub assist_min_confidence: f64,
    /// Durable cache database path; `None` uses the platform data dir.
    pub db_path: Option<PathBuf>,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            primary_url: None,
            secondary_url: None,
            assist_url: None,
            assist_api_key: None,
            request_timeout_ms: 5000,
            durable_min_confidence: 0.8,
            internal_confidence: 0.9,
            secondary_min_confidence: 0.6,
            contextual_min_confidence: 0.5,
            assist_min_confidence: 0.7,
            db_path: None,
        }
    }
}

/// Travel-speed model behind time-based proximity queries.
#[derive(Debug, Clone)]
pub struct ProximityConfig {
    /// Assumed driving speed in km/h (default: 30).
    pub driving_kmh: f64,
    /// Assumed cycling speed in km/h (default: 15).
    pub cycling_kmh: f64,
    /// Assumed walking speed in km/h (default: 5).
    pub walking_kmh: f64,
    /// Hard cap on any computed radius in km (default: 10).
    pub max_radius_km: f64,
    /// Travel time assumed when the query gives none (default: 15 min).
    pub default_minutes: u32,
    /// Max properties admitted per identical-coordinate cluster (default: 5).
    pub cluster_cap: usize,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            driving_kmh: 30.0,
            cycling_kmh: 15.0,
            walking_kmh: 5.0,
            max_radius_km: 10.0,
            default_minutes: 15,
            cluster_cap: 5,
        }
    }
}

/// Escalation gates shared by extraction and classification.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// Escalate below this confidence when type and price anchors were both
    /// found (default: 0.4).
    pub escalate_below_anchored: f64,
    /// Escalate below this confidence otherwise (default: 0.6).
    pub escalate_below: f64,
    /// Escalate at or above this complexity score (default: 2).
    pub complexity_threshold: u32,
    /// Implied price ceiling for "cheap" rental queries in RM (default: 3000).
    pub cheap_rent_ceiling: f64,
    /// Implied price ceiling for "cheap" sale queries in RM (default: 500000).
    pub cheap_sale_ceiling: f64,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            escalate_below_anchored: 0.4,
            escalate_below: 0.6,
            complexity_threshold: 2,
            cheap_rent_ceiling: 3000.0,
            cheap_sale_ceiling: 500_000.0,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub geocode: GeocodeConfig,
    pub proximity: ProximityConfig,
    pub parse: ParseConfig,
    /// Max candidates fetched from the store per query (default: 50).
    pub result_limit: usize,
}

impl EngineConfig {
    /// Load config from environment variables, starting from defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(val) = dotenvy::var("AIREA_PARSE_TTL_SECS")
            && let Ok(secs) = val.parse()
        {
            cfg.cache.parse_ttl_secs = secs;
        }

        if let Ok(val) = dotenvy::var("AIREA_RESULTS_TTL_SECS")
            && let Ok(secs) = val.parse()
        {
            cfg.cache.results_ttl_secs = secs;
        }

        if let Ok(val) = dotenvy::var("AIREA_GEOCODE_TTL_SECS")
            && let Ok(secs) = val.parse()
        {
            cfg.cache.geocode_ttl_secs = secs;
        }

        if let Ok(val) = dotenvy::var("AIREA_PRIMARY_GEOCODER_URL") {
            cfg.geocode.primary_url = Some(val);
        }

        if let Ok(val) = dotenvy::var("AIREA_SECONDARY_GEOCODER_URL") {
            cfg.geocode.secondary_url = Some(val);
        }

        if let Ok(val) = dotenvy::var("AIREA_ASSIST_URL") {
            cfg.geocode.assist_url = Some(val);
        }

        if let Ok(val) = dotenvy::var("AIREA_ASSIST_API_KEY") {
            cfg.geocode.assist_api_key = Some(val);
        }

        if let Ok(val) = dotenvy::var("AIREA_GEOCODE_TIMEOUT_MS")
            && let Ok(ms) = val.parse()
        {
            cfg.geocode.request_timeout_ms = ms;
        }

        if let Ok(val) = dotenvy::var("AIREA_GEOCODE_DB") {
            cfg.geocode.db_path = Some(PathBuf::from(val));
        }

        if let Ok(val) = dotenvy::var("AIREA_MAX_RADIUS_KM")
            && let Ok(km) = val.parse()
        {
            cfg.proximity.max_radius_km = km;
        }

        if let Ok(val) = dotenvy::var("AIREA_RESULT_LIMIT")
            && let Ok(limit) = val.parse()
        {
            cfg.result_limit = limit;
        }

        cfg
    }

    /// Default location of the durable geocode cache.
    pub fn default_db_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("my", "airea", "airea-search")
            .map(|dirs| dirs.data_dir().join("geocode.db"))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            geocode: GeocodeConfig::default(),
            proximity: ProximityConfig::default(),
            parse: ParseConfig::default(),
            result_limit: 50,
        }
    }
}
