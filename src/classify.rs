//! Parse-route classification and assisted-parse absorption.
//!
//! The lexical extractor is free; the assisted parser costs a network call.
//! [`classify`] decides per query whether the lexical pass suffices. When the
//! assisted route runs, its raw response is sanitized once
//! ([`RawAssistedParse::sanitized`]), cached, and merged into the lexical
//! findings by [`absorb`]: lexical wins where both found a value, and the
//! request's listing intent always overrides anything parsed from text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ParseConfig;
use crate::extract::Extraction;
use crate::lexicon::contains_keyword;
use crate::model::{
    CountFilter, ListingIntent, LocationRef, LotPosition, PropertyCondition, PropertyKind,
    StructuredFilters, TransitFilter,
};

/// Which parser the query goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseRoute {
    /// Lexical extraction alone is good enough.
    Lexical,
    /// Escalate to the assisted parser.
    Assisted,
}

/// Routing decision with the inputs that produced it, for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseDecision {
    pub route: ParseRoute,
    pub confidence: f64,
    pub complexity: u32,
}

const WITHIN_WORDS: &[&str] = &["within", "dalam lingkungan"];

/// Decide whether a query needs the assisted parser.
///
/// ROI-plus-type queries never escalate: investor phrasing is formulaic and
/// the lexical pass handles it fully. Condition, lot-position, minimum-count
/// and price-sentiment wording always escalates; those need judgment a
/// keyword pass cannot supply. Otherwise the confidence floor applies, lower
/// when both a property type and a price bound anchored the extraction, and
/// finally a complexity score can force escalation on its own.
pub fn classify(ex: &Extraction, normalized_query: &str, cfg: &ParseConfig) -> ParseDecision {
    let complexity = complexity_score(ex, normalized_query);
    let confidence = ex.confidence;
    let decision = |route| ParseDecision {
        route,
        confidence,
        complexity,
    };

    if ex.has_roi_bound() && !ex.kinds.is_empty() {
        return decision(ParseRoute::Lexical);
    }

    let complex_marker = ex.condition.is_some()
        || ex.lot_position.is_some()
        || ex.minimum_phrasing
        || ex.cheap_signal;
    if complex_marker {
        return decision(ParseRoute::Assisted);
    }

    let anchored = !ex.kinds.is_empty() && ex.has_price_bound();
    let floor = if anchored {
        cfg.escalate_below_anchored
    } else {
        cfg.escalate_below
    };
    if confidence < floor || complexity >= cfg.complexity_threshold {
        return decision(ParseRoute::Assisted);
    }
    decision(ParseRoute::Lexical)
}

fn complexity_score(ex: &Extraction, text: &str) -> u32 {
    let mut score = 0;
    if ex.kinds.len() > 1 {
        score += 1;
    }
    if ex.locations.len() > 1 {
        score += 1;
    }
    if ex.amenities.len() > 2 {
        score += 1;
    }
    let proximity_language = ex.near_signal
        || ex.time_budget_minutes.is_some()
        || WITHIN_WORDS.iter().any(|w| contains_keyword(text, w));
    if proximity_language {
        score += 1;
    }
    score
}

/// Count constraint as the assisted parser reports it: a bare number or an
/// op-shaped object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCount {
    Exact(u32),
    Shaped { op: RawCountOp, value: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawCountOp {
    #[serde(rename = "exactly", alias = "exact", alias = "eq")]
    Exactly,
    #[serde(rename = "atLeast", alias = "at_least", alias = "gte", alias = "min")]
    AtLeast,
}

impl RawCount {
    fn to_filter(self) -> CountFilter {
        match self {
            RawCount::Exact(n) => CountFilter::Exactly(n),
            RawCount::Shaped {
                op: RawCountOp::Exactly,
                value,
            } => CountFilter::Exactly(value),
            RawCount::Shaped {
                op: RawCountOp::AtLeast,
                value,
            } => CountFilter::AtLeast(value),
        }
    }
}

/// Structured response of the assisted parser, as received.
///
/// Unknown fields are ignored and every known field is optional, so a
/// partial or slightly off-spec response still parses. This is the value the
/// parse cache stores; absorption into filters re-runs on every search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAssistedParse {
    pub listing_type: Option<String>,
    pub property_types: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub bedrooms: Option<RawCount>,
    pub bathrooms: Option<RawCount>,
    pub location: Option<String>,
    pub amenities: Vec<String>,
    pub min_square_feet: Option<u32>,
    pub condition: Option<String>,
    pub lot_position: Option<String>,
    #[serde(rename = "minROI")]
    pub min_roi: Option<f64>,
    #[serde(rename = "maxROI")]
    pub max_roi: Option<f64>,
    pub confidence: Option<f64>,
}

impl RawAssistedParse {
    /// Drop nonsense values before the response is cached or absorbed.
    ///
    /// Negative amounts are discarded, an inverted price band is swapped,
    /// blank strings become absent, and confidence is clamped to [0, 1].
    pub fn sanitized(mut self) -> Self {
        self.min_price = self.min_price.filter(|v| v.is_finite() && *v > 0.0);
        self.max_price = self.max_price.filter(|v| v.is_finite() && *v > 0.0);
        if let (Some(lo), Some(hi)) = (self.min_price, self.max_price)
            && lo > hi
        {
            self.min_price = Some(hi);
            self.max_price = Some(lo);
        }
        self.min_roi = self.min_roi.filter(|v| v.is_finite() && *v > 0.0);
        self.max_roi = self.max_roi.filter(|v| v.is_finite() && *v > 0.0);
        self.confidence = self.confidence.map(|c| c.clamp(0.0, 1.0));
        self.location = self
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        self.condition = self
            .condition
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self.lot_position = self
            .lot_position
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        self.property_types.retain(|t| !t.trim().is_empty());
        self.amenities.retain(|a| !a.trim().is_empty());
        self
    }
}

/// Build filters from the lexical extraction alone.
pub fn build_filters(ex: &Extraction, tab: ListingIntent, cfg: &ParseConfig) -> StructuredFilters {
    let mut filters = base_filters(ex, tab);
    finish_filters(&mut filters, ex, cfg);
    filters
}

/// Merge an assisted parse into the lexical extraction.
///
/// Lexical findings keep priority for every concept they matched; the
/// assisted response only fills gaps. A price the assisted parser plausibly
/// mis-scaled (under 500 while the query carried a "k" suffix) is corrected
/// by a factor of 1000 before use.
pub fn absorb(
    ex: &Extraction,
    raw: &RawAssistedParse,
    tab: ListingIntent,
    cfg: &ParseConfig,
    normalized_query: &str,
) -> StructuredFilters {
    let mut filters = base_filters(ex, tab);
    let rescale = k_suffix_present(normalized_query);

    if filters.kinds.is_empty() {
        let mut kinds: Vec<_> = raw
            .property_types
            .iter()
            .filter_map(|t| PropertyKind::parse(t))
            .collect();
        kinds.dedup();
        filters.kinds = kinds;
    }
    if filters.min_price.is_none() {
        filters.min_price = raw.min_price.map(|v| correct_scale(v, rescale));
    }
    if filters.max_price.is_none() {
        filters.max_price = raw.max_price.map(|v| correct_scale(v, rescale));
    }
    if let (Some(lo), Some(hi)) = (filters.min_price, filters.max_price)
        && lo > hi
    {
        filters.min_price = Some(hi);
        filters.max_price = Some(lo);
    }
    if filters.bedrooms.is_none() {
        filters.bedrooms = raw.bedrooms.map(RawCount::to_filter);
    }
    if filters.bathrooms.is_none() {
        filters.bathrooms = raw.bathrooms.map(RawCount::to_filter);
    }
    if filters.location.is_none() {
        filters.location = raw.location.as_deref().map(LocationRef::unresolved);
    }
    for amenity in &raw.amenities {
        let lowered = amenity.to_lowercase();
        if !filters.amenities.contains(&lowered) {
            filters.amenities.push(lowered);
        }
    }
    if filters.min_square_feet.is_none() {
        filters.min_square_feet = raw.min_square_feet;
    }
    if filters.condition.is_none() {
        filters.condition = raw.condition.as_deref().and_then(PropertyCondition::parse);
    }
    if filters.lot_position.is_none() {
        filters.lot_position = raw.lot_position.as_deref().and_then(LotPosition::parse);
    }
    if filters.min_roi.is_none() {
        filters.min_roi = raw.min_roi;
    }
    if filters.max_roi.is_none() {
        filters.max_roi = raw.max_roi;
    }

    finish_filters(&mut filters, ex, cfg);
    filters
}

fn base_filters(ex: &Extraction, tab: ListingIntent) -> StructuredFilters {
    let mut filters = StructuredFilters::for_intent(tab);
    filters.kinds = ex.kinds.clone();
    filters.min_price = ex.min_price;
    filters.max_price = ex.max_price;
    filters.bedrooms = ex.bedrooms.map(|n| shape_count(n, ex.minimum_phrasing));
    filters.bathrooms = ex.bathrooms.map(|n| shape_count(n, ex.minimum_phrasing));
    filters.location = ex.locations.first().map(LocationRef::unresolved);
    filters.amenities = ex.amenities.clone();
    filters.min_square_feet = ex.min_square_feet;
    filters.min_roi = ex.min_roi;
    filters.max_roi = ex.max_roi;
    filters.condition = ex.condition;
    filters.lot_position = ex.lot_position;
    if !ex.transit.is_empty() {
        filters.transit = Some(TransitFilter {
            networks: ex.transit.clone(),
            stations: Vec::new(),
            max_distance_km: ex.max_distance_km,
        });
    }
    filters
}

/// Shared final shaping: ROI forces a sale reading, then "cheap" becomes a
/// ceiling hint if nothing explicit set one.
fn finish_filters(filters: &mut StructuredFilters, ex: &Extraction, cfg: &ParseConfig) {
    // Yield bounds only make sense for purchasable assets.
    if filters.has_roi_bound() {
        filters.intent = ListingIntent::Sale;
    }
    if ex.cheap_signal && filters.max_price.is_none() {
        filters.max_price = Some(match filters.intent {
            ListingIntent::Rent => cfg.cheap_rent_ceiling,
            ListingIntent::Sale => cfg.cheap_sale_ceiling,
        });
    }
}

fn shape_count(n: u32, minimum_phrasing: bool) -> CountFilter {
    if minimum_phrasing {
        CountFilter::AtLeast(n)
    } else {
        CountFilter::Exactly(n)
    }
}

static K_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\dk\b").unwrap());

fn k_suffix_present(normalized_query: &str) -> bool {
    K_SUFFIX.is_match(normalized_query)
}

/// Threshold under which an assisted-parse price with a "k" query reads as
/// thousands that lost their magnitude.
const MIS_SCALE_CEILING: f64 = 500.0;

fn correct_scale(value: f64, query_had_k_suffix: bool) -> f64 {
    if query_had_k_suffix && value < MIS_SCALE_CEILING {
        value * 1000.0
    } else {
        value
    }
}
