//! Geospatial proximity matching.
//!
//! Given an origin resolved by the geocoder, the matcher builds the final
//! nearby set in four moves:
//!
//! 1. Turn the query's travel budget into an effective radius in km.
//! 2. Collect properties inside the radius by great-circle distance, and
//!    independently, properties whose address text names the place. Either
//!    arm alone would miss listings the other catches.
//! 3. Cap how many properties may share one rounded coordinate, so a batch
//!    of placeholder-geocoded rows cannot flood the radius arm.
//! 4. Union by id and order featured listings first, closest first within
//!    each group.
//!
//! Transit queries add a third arm: the curated "distance to station" text
//! on individual listings, reconciled with the live station-coordinate
//! computation by the same id union.

use crate::config::ProximityConfig;
use crate::model::{Property, TravelMode};

/// Mean Earth radius in km.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Cluster key precision. Six decimals is about 11 cm, so only genuinely
/// identical placeholder coordinates collide.
const CLUSTER_DECIMALS: f64 = 1e6;

/// Great-circle distance between two `(lat, lng)` points in km.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lng1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lng2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

fn speed_kmh(mode: TravelMode, cfg: &ProximityConfig) -> f64 {
    match mode {
        TravelMode::Driving => cfg.driving_kmh,
        TravelMode::Cycling => cfg.cycling_kmh,
        TravelMode::Walking => cfg.walking_kmh,
    }
}

/// Effective search radius in km.
///
/// An explicit distance wins over a time budget; a missing time budget uses
/// the configured default. Everything is capped so a generous budget cannot
/// degenerate into a region-wide scan.
pub fn effective_radius_km(
    max_distance_km: Option<f64>,
    minutes: Option<u32>,
    mode: TravelMode,
    cfg: &ProximityConfig,
) -> f64 {
    let raw = match max_distance_km {
        Some(km) => km,
        None => {
            let minutes = f64::from(minutes.unwrap_or(cfg.default_minutes));
            speed_kmh(mode, cfg) * minutes / 60.0
        }
    };
    raw.min(cfg.max_radius_km)
}

/// One proximity query against an already-filtered candidate list.
pub struct ProximityQuery<'a> {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    /// Resolved display name, matched against address text.
    pub label: &'a str,
    /// Station names whose curated distance-text mentions also qualify.
    pub station_names: &'a [String],
}

/// A property admitted by the matcher, with its computed distance when the
/// listing has coordinates.
#[derive(Debug, Clone)]
pub struct ProximityMatch {
    pub property: Property,
    pub distance_km: Option<f64>,
}

/// Merge the radius, address-text, and station-text arms into one ordered
/// result. `now` is epoch seconds, used to decide live featured placement.
pub fn rank_by_proximity(
    properties: Vec<Property>,
    query: &ProximityQuery<'_>,
    cfg: &ProximityConfig,
    now: i64,
) -> Vec<ProximityMatch> {
    let origin = (query.latitude, query.longitude);
    let label = query.label.to_lowercase();
    let stations: Vec<String> = query
        .station_names
        .iter()
        .map(|s| s.to_lowercase())
        .collect();

    let capped_ids = cluster_capped_ids(&properties, cfg.cluster_cap);

    let mut matches: Vec<ProximityMatch> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for property in properties {
        let distance_km = property.coordinates().map(|at| haversine_km(origin, at));

        let within_radius = distance_km
            .is_some_and(|d| d <= query.radius_km && capped_ids.contains(&property.id));
        let address_names_place =
            !label.is_empty() && property.address.to_lowercase().contains(&label);
        let station_text_match = !stations.is_empty()
            && property.distance_to_station.as_ref().is_some_and(|text| {
                let text = text.to_lowercase();
                stations.iter().any(|station| text.contains(station))
            });

        if (within_radius || address_names_place || station_text_match)
            && seen.insert(property.id)
        {
            matches.push(ProximityMatch {
                property,
                distance_km,
            });
        }
    }

    matches.sort_by(|a, b| {
        let featured_a = a.property.is_featured_at(now);
        let featured_b = b.property.is_featured_at(now);
        featured_b
            .cmp(&featured_a)
            .then_with(|| compare_distance(a.distance_km, b.distance_km))
            .then_with(|| a.property.id.cmp(&b.property.id))
    });
    matches
}

/// Ids that survive the placeholder-coordinate guard: at most `cap` per
/// rounded coordinate, first listed kept.
fn cluster_capped_ids(properties: &[Property], cap: usize) -> std::collections::HashSet<i64> {
    let mut per_cluster: std::collections::HashMap<(i64, i64), usize> =
        std::collections::HashMap::new();
    let mut kept = std::collections::HashSet::new();
    for property in properties {
        let Some((lat, lng)) = property.coordinates() else {
            continue;
        };
        let cluster = (
            (lat * CLUSTER_DECIMALS).round() as i64,
            (lng * CLUSTER_DECIMALS).round() as i64,
        );
        let count = per_cluster.entry(cluster).or_insert(0);
        if *count < cap {
            *count += 1;
            kept.insert(property.id);
        }
    }
    kept
}

/// Known distances ascending; listings without coordinates last.
fn compare_distance(a: Option<f64>, b: Option<f64>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ListingIntent, PropertyKind};

    const KLCC: (f64, f64) = (3.1579, 101.7123);

    fn prop(id: i64, coordinates: Option<(f64, f64)>) -> Property {
        Property {
            id,
            title: format!("Listing {id}"),
            address: format!("Jalan {id}, Kuala Lumpur"),
            city: "Kuala Lumpur".into(),
            area: None,
            price: 2_500.0,
            kind: PropertyKind::Condominium,
            intent: ListingIntent::Rent,
            bedrooms: Some(3),
            bathrooms: Some(2),
            square_feet: Some(1_100),
            amenities: vec![],
            latitude: coordinates.map(|c| c.0),
            longitude: coordinates.map(|c| c.1),
            roi: None,
            featured: false,
            featured_until: None,
            distance_to_station: None,
            condition: None,
            lot_position: None,
            created_at: 0,
        }
    }

    fn query(radius_km: f64) -> ProximityQuery<'static> {
        ProximityQuery {
            latitude: KLCC.0,
            longitude: KLCC.1,
            radius_km,
            label: "KLCC",
            station_names: &[],
        }
    }

    #[test]
    fn haversine_is_symmetric_and_zero_at_identity() {
        let kl = (3.1390, 101.6869);
        let penang = (5.4141, 100.3288);
        assert_eq!(haversine_km(kl, penang), haversine_km(penang, kl));
        assert_eq!(haversine_km(kl, kl), 0.0);
    }

    #[test]
    fn haversine_matches_reference_distances_within_one_percent() {
        // Kuala Lumpur to George Town, straight line.
        let d = haversine_km((3.1390, 101.6869), (5.4141, 100.3288));
        assert!((d - 294.4).abs() / 294.4 < 0.01, "got {d}");
        // KLCC to Sunway Pyramid.
        let d = haversine_km(KLCC, (3.0723, 101.6068));
        assert!((d - 15.1).abs() / 15.1 < 0.01, "got {d}");
    }

    #[test]
    fn radius_follows_mode_speed_and_cap() {
        let cfg = ProximityConfig::default();
        // 15 min driving at 30 km/h.
        assert_eq!(effective_radius_km(None, Some(15), TravelMode::Driving, &cfg), 7.5);
        // Default budget when the query names none.
        assert_eq!(effective_radius_km(None, None, TravelMode::Driving, &cfg), 7.5);
        // 12 min walking at 5 km/h.
        assert_eq!(effective_radius_km(None, Some(12), TravelMode::Walking, &cfg), 1.0);
        // An hour of driving would be 30 km; capped.
        assert_eq!(effective_radius_km(None, Some(60), TravelMode::Driving, &cfg), 10.0);
        // Explicit distances win over time but still cap.
        assert_eq!(effective_radius_km(Some(3.0), Some(60), TravelMode::Driving, &cfg), 3.0);
        assert_eq!(effective_radius_km(Some(25.0), None, TravelMode::Driving, &cfg), 10.0);
    }

    #[test]
    fn radius_arm_admits_inside_and_drops_outside() {
        let cfg = ProximityConfig::default();
        let inside = prop(1, Some((3.1600, 101.7150))); // a few hundred metres
        let outside = prop(2, Some((3.0723, 101.6068))); // Sunway, ~15 km
        let matches = rank_by_proximity(vec![inside, outside], &query(5.0), &cfg, 0);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].property.id, 1);
        assert!(matches[0].distance_km.unwrap() < 1.0);
    }

    #[test]
    fn address_arm_catches_coordless_listings_at_the_place() {
        let cfg = ProximityConfig::default();
        let mut at_place = prop(3, None);
        at_place.address = "Suria KLCC, Jalan Ampang".into();
        let elsewhere = prop(4, None);
        let matches = rank_by_proximity(vec![at_place, elsewhere], &query(5.0), &cfg, 0);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].property.id, 3);
        assert!(matches[0].distance_km.is_none());
    }

    #[test]
    fn union_never_counts_a_property_twice() {
        let cfg = ProximityConfig::default();
        let mut both_arms = prop(5, Some((3.1590, 101.7130)));
        both_arms.address = "Persiaran KLCC".into();
        let matches = rank_by_proximity(vec![both_arms], &query(5.0), &cfg, 0);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn placeholder_coordinate_clusters_are_capped() {
        let cfg = ProximityConfig::default();
        let placeholder = (3.1580, 101.7120);
        let mut properties: Vec<Property> = (1..=7).map(|id| prop(id, Some(placeholder))).collect();
        // Differs at the sixth decimal, so it is its own cluster.
        properties.push(prop(8, Some((3.158_002, 101.7120))));

        let matches = rank_by_proximity(properties, &query(5.0), &cfg, 0);
        let ids: Vec<i64> = matches.iter().map(|m| m.property.id).collect();
        assert_eq!(ids.len(), 6);
        assert!(ids.contains(&8));
        assert!(!ids.contains(&6) && !ids.contains(&7));
    }

    #[test]
    fn live_featured_listings_outrank_closer_ordinary_ones() {
        let cfg = ProximityConfig::default();
        let near = prop(10, Some((3.1585, 101.7125)));
        let mut far_featured = prop(11, Some((3.1800, 101.7400)));
        far_featured.featured = true;
        far_featured.featured_until = Some(10_000);
        let mut far_expired = prop(12, Some((3.1795, 101.7395)));
        far_expired.featured = true;
        far_expired.featured_until = Some(100);

        let matches =
            rank_by_proximity(vec![near, far_featured, far_expired], &query(5.0), &cfg, 5_000);
        let ids: Vec<i64> = matches.iter().map(|m| m.property.id).collect();
        assert_eq!(ids, vec![11, 10, 12]);
    }

    #[test]
    fn within_each_group_closer_comes_first() {
        let cfg = ProximityConfig::default();
        let farther = prop(20, Some((3.1800, 101.7400)));
        let nearer = prop(21, Some((3.1585, 101.7125)));
        let matches = rank_by_proximity(vec![farther, nearer], &query(5.0), &cfg, 0);
        let ids: Vec<i64> = matches.iter().map(|m| m.property.id).collect();
        assert_eq!(ids, vec![21, 20]);
    }

    #[test]
    fn station_text_arm_reconciles_with_live_coordinates() {
        let cfg = ProximityConfig::default();
        let surian = (3.1500, 101.5940);
        let stations = vec!["MRT Surian".to_string()];
        let q = ProximityQuery {
            latitude: surian.0,
            longitude: surian.1,
            radius_km: 2.0,
            label: "MRT Surian",
            station_names: &stations,
        };

        // Curated text only, no coordinates.
        let mut text_only = prop(30, None);
        text_only.distance_to_station = Some("350m to MRT Surian".into());
        // Coordinates near the station and matching text: one entry, not two.
        let mut both = prop(31, Some((3.1510, 101.5950)));
        both.distance_to_station = Some("beside MRT Surian".into());
        // Text names a different station.
        let mut other_line = prop(32, None);
        other_line.distance_to_station = Some("200m to LRT Bangsar".into());

        let matches = rank_by_proximity(vec![text_only, both, other_line], &q, &cfg, 0);
        let ids: Vec<i64> = matches.iter().map(|m| m.property.id).collect();
        assert_eq!(ids, vec![31, 30]);
    }
}
