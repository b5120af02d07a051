//! Core marketplace entity structs and enums.

use serde::{Deserialize, Serialize};

use super::filters::StructuredFilters;

/// Which marketplace tab a search was issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingIntent {
    Rent,
    Sale,
}

impl ListingIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rent => "rent",
            Self::Sale => "sale",
        }
    }

    /// Strict parse used when absorbing assisted-parser output; synonyms are
    /// the lexicon's job, not this enum's.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rent" => Some(Self::Rent),
            "sale" | "buy" => Some(Self::Sale),
            _ => None,
        }
    }
}

/// Canonical property kinds stored on listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyKind {
    Apartment,
    Condominium,
    ServicedResidence,
    House,
    Townhouse,
    Studio,
    Office,
    RetailSpace,
    Commercial,
    Industrial,
    Land,
    ShopLot,
}

impl PropertyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apartment => "apartment",
            Self::Condominium => "condominium",
            Self::ServicedResidence => "serviced-residence",
            Self::House => "house",
            Self::Townhouse => "townhouse",
            Self::Studio => "studio",
            Self::Office => "office",
            Self::RetailSpace => "retail-space",
            Self::Commercial => "commercial",
            Self::Industrial => "industrial",
            Self::Land => "land",
            Self::ShopLot => "shop-lot",
        }
    }

    /// Tolerant parse for assisted-parser output; unknown values map to `None`
    /// and are dropped by the absorption step.
    pub fn parse(s: &str) -> Option<Self> {
        let folded = s.trim().to_ascii_lowercase().replace('_', "-").replace(' ', "-");
        match folded.as_str() {
            "apartment" | "flat" => Some(Self::Apartment),
            "condominium" | "condo" => Some(Self::Condominium),
            "serviced-residence" | "serviced-apartment" => Some(Self::ServicedResidence),
            "house" | "terrace-house" | "bungalow" | "semi-d" => Some(Self::House),
            "townhouse" => Some(Self::Townhouse),
            "studio" => Some(Self::Studio),
            "office" => Some(Self::Office),
            "retail-space" | "retail" => Some(Self::RetailSpace),
            "commercial" => Some(Self::Commercial),
            "industrial" | "factory" | "warehouse" => Some(Self::Industrial),
            "land" => Some(Self::Land),
            "shop-lot" | "shoplot" | "shop" => Some(Self::ShopLot),
            _ => None,
        }
    }
}

/// Requested result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Newest,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::Newest => "newest",
        }
    }
}

/// Exact-or-minimum count constraint for bedrooms and bathrooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "op", content = "value")]
pub enum CountFilter {
    Exactly(u32),
    AtLeast(u32),
}

impl CountFilter {
    pub fn matches(&self, actual: u32) -> bool {
        match self {
            Self::Exactly(n) => actual == *n,
            Self::AtLeast(n) => actual >= *n,
        }
    }

    pub fn value(&self) -> u32 {
        match self {
            Self::Exactly(n) | Self::AtLeast(n) => *n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyCondition {
    New,
    Renovated,
    WellMaintained,
}

impl PropertyCondition {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "new" | "brand-new" => Some(Self::New),
            "renovated" => Some(Self::Renovated),
            "well-maintained" | "maintained" => Some(Self::WellMaintained),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LotPosition {
    Corner,
    EndLot,
    Intermediate,
}

impl LotPosition {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "corner" | "corner-lot" => Some(Self::Corner),
            "end-lot" | "end" => Some(Self::EndLot),
            "intermediate" | "intermediate-lot" => Some(Self::Intermediate),
            _ => None,
        }
    }
}

/// Travel mode behind a time-based proximity radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
    Cycling,
    Walking,
}

impl TravelMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "driving" | "drive" | "car" => Some(Self::Driving),
            "cycling" | "bicycle" | "bike" => Some(Self::Cycling),
            "walking" | "walk" | "foot" => Some(Self::Walking),
            _ => None,
        }
    }
}

/// Rail and bus networks recognised in transit-proximity queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Mrt,
    Lrt,
    Monorail,
    Ktm,
    Brt,
}

impl TransportKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mrt" => Some(Self::Mrt),
            "lrt" => Some(Self::Lrt),
            "monorail" => Some(Self::Monorail),
            "ktm" | "komuter" => Some(Self::Ktm),
            "brt" => Some(Self::Brt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mrt => "mrt",
            Self::Lrt => "lrt",
            Self::Monorail => "monorail",
            Self::Ktm => "ktm",
            Self::Brt => "brt",
        }
    }
}

/// What kind of place a location candidate names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceKind {
    City,
    Area,
    Landmark,
    Building,
    Station,
}

/// Which detection strategy produced a location candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    Gazetteer,
    Abbreviation,
    Fuzzy,
    External,
}

/// One ranked guess at which place a query refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCandidate {
    pub name: String,
    pub normalized: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub source: LocationSource,
    pub confidence: f64,
    pub kind: PlaceKind,
    /// Containing area or city, when the gazetteer knows the hierarchy.
    #[serde(default)]
    pub parent: Option<String>,
}

impl LocationCandidate {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// Which waterfall step resolved a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeocodeSource {
    DurableCache,
    MemoryCache,
    Internal,
    Primary,
    FuzzyInternal,
    Secondary,
    Contextual,
    Assisted,
}

impl GeocodeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DurableCache => "durable-cache",
            Self::MemoryCache => "memory-cache",
            Self::Internal => "internal",
            Self::Primary => "primary",
            Self::FuzzyInternal => "fuzzy-internal",
            Self::Secondary => "secondary",
            Self::Contextual => "contextual",
            Self::Assisted => "assisted",
        }
    }
}

/// Terminal output of the resolver for one location string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
    /// Resolved display name, which may be fuller than the query text.
    pub name: String,
    pub source: GeocodeSource,
    pub confidence: f64,
}

/// A property listing as surfaced by the [`crate::store::PropertyStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: i64,
    pub title: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub area: Option<String>,
    /// Listed price in RM; monthly for rentals, absolute for sales.
    pub price: f64,
    #[serde(rename = "propertyType")]
    pub kind: PropertyKind,
    #[serde(rename = "listingType")]
    pub intent: ListingIntent,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub square_feet: Option<u32>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Gross rental yield in percent, present on investment-grade listings.
    #[serde(default)]
    pub roi: Option<f64>,
    #[serde(default)]
    pub featured: bool,
    /// Epoch seconds; featured placement lapses past this instant.
    #[serde(default)]
    pub featured_until: Option<i64>,
    /// Listing-copy side channel, e.g. `"350m to MRT Surian"`.
    #[serde(default)]
    pub distance_to_station: Option<String>,
    #[serde(default)]
    pub condition: Option<PropertyCondition>,
    #[serde(default)]
    pub lot_position: Option<LotPosition>,
    pub created_at: i64,
}

impl Property {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Featured placement requires both the flag and an unexpired timestamp.
    pub fn is_featured_at(&self, now: i64) -> bool {
        self.featured && self.featured_until.is_some_and(|until| until > now)
    }
}

/// Immutable search input as received from the request handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub raw: String,
    pub intent: ListingIntent,
    #[serde(default)]
    pub sort: SortOrder,
}

impl SearchQuery {
    pub fn new(raw: impl Into<String>, intent: ListingIntent, sort: SortOrder) -> Self {
        Self {
            raw: raw.into(),
            intent,
            sort,
        }
    }
}

/// Handler-facing search result envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub properties: Vec<Property>,
    pub count: usize,
    pub filters_used: StructuredFilters,
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_kind_parse_folds_aliases() {
        assert_eq!(PropertyKind::parse("Condo"), Some(PropertyKind::Condominium));
        assert_eq!(PropertyKind::parse("retail_space"), Some(PropertyKind::RetailSpace));
        assert_eq!(PropertyKind::parse("Warehouse"), Some(PropertyKind::Industrial));
        assert_eq!(PropertyKind::parse("castle"), None);
    }

    #[test]
    fn count_filter_matches() {
        assert!(CountFilter::Exactly(3).matches(3));
        assert!(!CountFilter::Exactly(3).matches(4));
        assert!(CountFilter::AtLeast(2).matches(5));
        assert!(!CountFilter::AtLeast(2).matches(1));
    }

    #[test]
    fn featured_requires_flag_and_unexpired_timestamp() {
        let mut p = Property {
            id: 1,
            title: "t".into(),
            address: "a".into(),
            city: "c".into(),
            area: None,
            price: 1000.0,
            kind: PropertyKind::Apartment,
            intent: ListingIntent::Rent,
            bedrooms: None,
            bathrooms: None,
            square_feet: None,
            amenities: vec![],
            latitude: None,
            longitude: None,
            roi: None,
            featured: true,
            featured_until: Some(2_000),
            distance_to_station: None,
            condition: None,
            lot_position: None,
            created_at: 0,
        };
        assert!(p.is_featured_at(1_999));
        assert!(!p.is_featured_at(2_000));
        p.featured = false;
        assert!(!p.is_featured_at(1_999));
        p.featured = true;
        p.featured_until = None;
        assert!(!p.is_featured_at(1_999));
    }

    #[test]
    fn property_serde_uses_marketplace_field_names() {
        let p = Property {
            id: 7,
            title: "Vista Kiara".into(),
            address: "Jalan Kiara".into(),
            city: "Kuala Lumpur".into(),
            area: Some("Mont Kiara".into()),
            price: 650_000.0,
            kind: PropertyKind::Condominium,
            intent: ListingIntent::Sale,
            bedrooms: Some(3),
            bathrooms: Some(2),
            square_feet: Some(1_200),
            amenities: vec!["pool".into()],
            latitude: Some(3.17),
            longitude: Some(101.65),
            roi: None,
            featured: false,
            featured_until: None,
            distance_to_station: None,
            condition: None,
            lot_position: None,
            created_at: 0,
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["propertyType"], "condominium");
        assert_eq!(json["listingType"], "sale");
        assert_eq!(json["squareFeet"], 1_200);
    }
}
