//! External resolution providers.
//!
//! Two trait families sit behind the resolver waterfall: [`GeocodingProvider`]
//! turns a place string into coordinates, and [`AssistedParser`] is the
//! model-backed endpoint consulted for hard queries and last-resort place
//! resolution. Both are constructor-injected, so tests swap in scripted fakes
//! without touching the waterfall logic, and a missing endpoint URL simply
//! disables its steps.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::RawAssistedParse;
use crate::config::GeocodeConfig;

/// Error from one provider call.
///
/// The resolver never surfaces these to the caller; a failed step logs and
/// advances the waterfall.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned HTTP {0}")]
    Status(u16),
}

/// One positive geocoding answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderHit {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
    pub confidence: f64,
}

#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// Resolve one place string. `Ok(None)` is a clean miss, not an error.
    async fn geocode(&self, query: &str) -> Result<Option<ProviderHit>, ProviderError>;

    /// Label used in usage events and logs.
    fn name(&self) -> &'static str;
}

/// A place resolution from the assisted endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistedPlace {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub confidence: f64,
}

#[async_trait]
pub trait AssistedParser: Send + Sync {
    /// Parse a full natural-language query into raw structured fields.
    async fn parse_query(&self, query: &str) -> Result<Option<RawAssistedParse>, ProviderError>;

    /// Last-resort resolution of a single place name.
    async fn resolve_place(&self, name: &str) -> Result<Option<AssistedPlace>, ProviderError>;
}

// -------------------------------------------------------------------------
// HTTP geocoder
// -------------------------------------------------------------------------

/// Row shape returned by nominatim-style search endpoints. Coordinates come
/// back as strings; `importance` is the endpoint's own relevance score.
#[derive(Debug, Deserialize)]
struct SearchRow {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    importance: Option<f64>,
}

/// Confidence assumed when the endpoint reports no importance score.
const DEFAULT_IMPORTANCE: f64 = 0.7;

fn row_to_hit(row: &SearchRow) -> Option<ProviderHit> {
    let (Ok(latitude), Ok(longitude)) = (row.lat.parse::<f64>(), row.lon.parse::<f64>()) else {
        return None;
    };
    Some(ProviderHit {
        latitude,
        longitude,
        display_name: row.display_name.clone(),
        confidence: row.importance.unwrap_or(DEFAULT_IMPORTANCE).clamp(0.0, 1.0),
    })
}

/// Forward geocoder over a nominatim-style HTTP search endpoint.
pub struct HttpGeocoder {
    client: Client,
    base_url: String,
    label: &'static str,
}

impl HttpGeocoder {
    fn new(base_url: String, label: &'static str, timeout_ms: u64) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(concat!("airea-search/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            label,
        })
    }

    /// Primary endpoint from config; `Ok(None)` when unconfigured.
    pub fn primary(cfg: &GeocodeConfig) -> Result<Option<Self>, ProviderError> {
        cfg.primary_url
            .as_ref()
            .map(|url| Self::new(url.clone(), "geocode-primary", cfg.request_timeout_ms))
            .transpose()
    }

    /// Secondary endpoint from config; `Ok(None)` when unconfigured.
    pub fn secondary(cfg: &GeocodeConfig) -> Result<Option<Self>, ProviderError> {
        cfg.secondary_url
            .as_ref()
            .map(|url| Self::new(url.clone(), "geocode-secondary", cfg.request_timeout_ms))
            .transpose()
    }
}

#[async_trait]
impl GeocodingProvider for HttpGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<ProviderHit>, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("countrycodes", "my"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let rows = response.json::<Vec<SearchRow>>().await?;
        Ok(rows.first().and_then(row_to_hit))
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

// -------------------------------------------------------------------------
// HTTP assisted parser
// -------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ParseRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Serialize)]
struct ResolveRequest<'a> {
    name: &'a str,
    country: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    found: bool,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Assisted query parsing and place resolution over HTTP.
///
/// Speaks to a single base URL with `/parse` and `/resolve` routes, sending
/// a bearer token when one is configured.
pub struct HttpAssistedParser {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpAssistedParser {
    /// Build from config; `Ok(None)` when no assist endpoint is set.
    pub fn from_config(cfg: &GeocodeConfig) -> Result<Option<Self>, ProviderError> {
        let Some(url) = cfg.assist_url.as_ref() else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .user_agent(concat!("airea-search/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Some(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            api_key: cfg.assist_api_key.clone(),
        }))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(format!("{}/{path}", self.base_url));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}

#[async_trait]
impl AssistedParser for HttpAssistedParser {
    async fn parse_query(&self, query: &str) -> Result<Option<RawAssistedParse>, ProviderError> {
        let response = self.post("parse").json(&ParseRequest { query }).send().await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        Ok(Some(response.json::<RawAssistedParse>().await?))
    }

    async fn resolve_place(&self, name: &str) -> Result<Option<AssistedPlace>, ProviderError> {
        let response = self
            .post("resolve")
            .json(&ResolveRequest {
                name,
                country: "MY",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let body = response.json::<ResolveResponse>().await?;
        if !body.found {
            return Ok(None);
        }
        let (Some(latitude), Some(longitude)) = (body.latitude, body.longitude) else {
            return Ok(None);
        };
        Ok(Some(AssistedPlace {
            name: body.name.unwrap_or_else(|| name.to_string()),
            latitude,
            longitude,
            confidence: body.confidence.unwrap_or(DEFAULT_IMPORTANCE).clamp(0.0, 1.0),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_row_maps_string_coordinates() {
        let row: SearchRow = serde_json::from_str(
            r#"{"lat":"3.1579","lon":"101.7123","display_name":"KLCC, Kuala Lumpur","importance":0.86}"#,
        )
        .unwrap();
        let hit = row_to_hit(&row).expect("parseable row");
        assert_eq!(hit.latitude, 3.1579);
        assert_eq!(hit.longitude, 101.7123);
        assert_eq!(hit.display_name, "KLCC, Kuala Lumpur");
        assert_eq!(hit.confidence, 0.86);
    }

    #[test]
    fn search_row_without_importance_gets_default_confidence() {
        let row: SearchRow = serde_json::from_str(
            r#"{"lat":"3.07","lon":"101.60","display_name":"Bandar Sunway"}"#,
        )
        .unwrap();
        let hit = row_to_hit(&row).expect("parseable row");
        assert_eq!(hit.confidence, DEFAULT_IMPORTANCE);
    }

    #[test]
    fn unparseable_coordinates_are_a_miss_not_a_panic() {
        let row: SearchRow = serde_json::from_str(
            r#"{"lat":"north","lon":"101.60","display_name":"nowhere"}"#,
        )
        .unwrap();
        assert!(row_to_hit(&row).is_none());
    }

    #[test]
    fn importance_outside_unit_range_is_clamped() {
        let row: SearchRow = serde_json::from_str(
            r#"{"lat":"3.0","lon":"101.0","display_name":"x","importance":1.7}"#,
        )
        .unwrap();
        assert_eq!(row_to_hit(&row).unwrap().confidence, 1.0);
    }

    #[test]
    fn parse_request_serializes_bare_query() {
        let body = serde_json::to_value(ParseRequest { query: "condo kl" }).unwrap();
        assert_eq!(body, serde_json::json!({"query": "condo kl"}));
    }

    #[test]
    fn resolve_request_pins_country() {
        let body = serde_json::to_value(ResolveRequest {
            name: "taman universiti",
            country: "MY",
        })
        .unwrap();
        assert_eq!(body["country"], "MY");
    }

    #[test]
    fn resolve_response_not_found_is_a_miss() {
        let body: ResolveResponse = serde_json::from_str(r#"{"found":false}"#).unwrap();
        assert!(!body.found);
        assert!(body.latitude.is_none());
    }

    #[test]
    fn resolve_response_full_body_round_trips() {
        let body: ResolveResponse = serde_json::from_str(
            r#"{"found":true,"name":"Taman Universiti, Skudai","latitude":1.5396,"longitude":103.6280,"confidence":0.82}"#,
        )
        .unwrap();
        assert!(body.found);
        assert_eq!(body.name.as_deref(), Some("Taman Universiti, Skudai"));
        assert_eq!(body.confidence, Some(0.82));
    }
}
