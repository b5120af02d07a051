//! Geographic plausibility check for resolved coordinates.
//!
//! External providers occasionally return a point in Sumatra, southern
//! Thailand, or the middle of the South China Sea for a Malaysian query.
//! Coordinates must fall inside one of two valid rectangles (Peninsular
//! Malaysia and East Malaysia) and outside the explicit exclusion zones;
//! a coordinate in an exclusion zone is rejected no matter how confident
//! the source claims to be.

/// Axis-aligned lat/lng rectangle, bounds inclusive.
#[derive(Debug, Clone, Copy)]
struct Rect {
    lat_min: f64,
    lat_max: f64,
    lng_min: f64,
    lng_max: f64,
}

impl Rect {
    const fn new(lat_min: f64, lat_max: f64, lng_min: f64, lng_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lng_min,
            lng_max,
        }
    }

    fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max && lng >= self.lng_min && lng <= self.lng_max
    }
}

const PENINSULAR: Rect = Rect::new(1.2, 6.8, 99.5, 104.6);
const EAST_MALAYSIA: Rect = Rect::new(0.8, 7.5, 109.4, 119.4);

/// Open sea between the peninsula and Borneo.
const OPEN_SEA: Rect = Rect::new(1.0, 7.0, 105.0, 109.0);

/// Uninhabited interior: the Taman Negara forest block and the
/// Endau-Rompin forest block. A "resolved" address in either is a
/// provider hallucination.
const INTERIOR_EXCLUSIONS: &[Rect] = &[
    Rect::new(4.3, 4.8, 102.2, 102.9),
    Rect::new(2.4, 2.6, 103.2, 103.5),
];

/// Whether a coordinate is an acceptable resolution target.
pub fn plausible(lat: f64, lng: f64) -> bool {
    if !lat.is_finite() || !lng.is_finite() {
        return false;
    }
    if OPEN_SEA.contains(lat, lng) {
        return false;
    }
    if INTERIOR_EXCLUSIONS.iter().any(|r| r.contains(lat, lng)) {
        return false;
    }
    PENINSULAR.contains(lat, lng) || EAST_MALAYSIA.contains(lat, lng)
}
