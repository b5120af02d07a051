//! Structured filter set produced by query understanding.
//!
//! Every field is optional except the listing intent, which always comes from
//! the marketplace tab the search was issued under. Serialization skips unset
//! fields so the `filtersUsed` envelope only echoes what was actually
//! extracted.

use serde::{Deserialize, Serialize};

use super::types::{
    CountFilter, ListingIntent, LotPosition, PropertyCondition, PropertyKind, TransportKind,
    TravelMode,
};

/// Location constraint attached to a query, before and after resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRef {
    /// Place name as it appeared in (or was canonicalised from) the query.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl LocationRef {
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latitude: None,
            longitude: None,
        }
    }

    pub fn resolved(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            latitude: Some(lat),
            longitude: Some(lng),
        }
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// Transit-proximity constraint: networks, named stations, or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransitFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<TransportKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance_km: Option<f64>,
}

impl TransitFilter {
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty() && self.stations.is_empty()
    }
}

/// Travel-time proximity constraint, resolved to a radius around an anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityFilter {
    /// Anchor place name, used for address-text fallback matching.
    pub anchor: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub mode: TravelMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u32>,
}

/// The full structured filter set a query parses into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredFilters {
    #[serde(rename = "listingType")]
    pub intent: ListingIntent,
    /// Property-type set; a listing matches when its kind is a member.
    #[serde(rename = "propertyTypes", default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<PropertyKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<CountFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<CountFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amenities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_square_feet: Option<u32>,
    #[serde(rename = "minROI", default, skip_serializing_if = "Option::is_none")]
    pub min_roi: Option<f64>,
    #[serde(rename = "maxROI", default, skip_serializing_if = "Option::is_none")]
    pub max_roi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<PropertyCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_position: Option<LotPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transit: Option<TransitFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proximity: Option<ProximityFilter>,
}

impl StructuredFilters {
    /// Empty filter set bound to the tab the search came from.
    pub fn for_intent(intent: ListingIntent) -> Self {
        Self {
            intent,
            kinds: Vec::new(),
            min_price: None,
            max_price: None,
            bedrooms: None,
            bathrooms: None,
            location: None,
            amenities: Vec::new(),
            min_square_feet: None,
            min_roi: None,
            max_roi: None,
            condition: None,
            lot_position: None,
            transit: None,
            proximity: None,
        }
    }

    /// True when nothing beyond the tab intent was extracted.
    pub fn is_unconstrained(&self) -> bool {
        self.kinds.is_empty()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.bedrooms.is_none()
            && self.bathrooms.is_none()
            && self.location.is_none()
            && self.amenities.is_empty()
            && self.min_square_feet.is_none()
            && self.min_roi.is_none()
            && self.max_roi.is_none()
            && self.condition.is_none()
            && self.lot_position.is_none()
            && self.transit.is_none()
            && self.proximity.is_none()
    }

    pub fn has_roi_bound(&self) -> bool {
        self.min_roi.is_some() || self.max_roi.is_some()
    }

    /// Count of populated filter slots, used by complexity scoring.
    pub fn constraint_count(&self) -> usize {
        let mut n = 0;
        n += usize::from(!self.kinds.is_empty());
        n += usize::from(self.min_price.is_some() || self.max_price.is_some());
        n += usize::from(self.bedrooms.is_some());
        n += usize::from(self.bathrooms.is_some());
        n += usize::from(self.location.is_some());
        n += usize::from(!self.amenities.is_empty());
        n += usize::from(self.min_square_feet.is_some());
        n += usize::from(self.has_roi_bound());
        n += usize::from(self.condition.is_some());
        n += usize::from(self.lot_position.is_some());
        n += usize::from(self.transit.is_some());
        n += usize::from(self.proximity.is_some());
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconstrained_reflects_tab_only_filters() {
        let mut f = StructuredFilters::for_intent(ListingIntent::Rent);
        assert!(f.is_unconstrained());
        f.max_price = Some(3_000.0);
        assert!(!f.is_unconstrained());
    }

    #[test]
    fn serialization_skips_unset_fields() {
        let mut f = StructuredFilters::for_intent(ListingIntent::Sale);
        f.kinds = vec![PropertyKind::Condominium];
        f.max_price = Some(500_000.0);
        f.min_roi = Some(4.5);
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["listingType"], "sale");
        assert_eq!(json["propertyTypes"][0], "condominium");
        assert_eq!(json["maxPrice"], 500_000.0);
        assert_eq!(json["minROI"], 4.5);
        assert!(json.get("minPrice").is_none());
        assert!(json.get("bedrooms").is_none());
        assert!(json.get("amenities").is_none());
    }

    #[test]
    fn constraint_count_treats_price_band_as_one_slot() {
        let mut f = StructuredFilters::for_intent(ListingIntent::Sale);
        f.min_price = Some(300_000.0);
        f.max_price = Some(500_000.0);
        f.bedrooms = Some(CountFilter::Exactly(3));
        assert_eq!(f.constraint_count(), 2);
    }
}
