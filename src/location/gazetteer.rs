//! Curated table of Malaysian place names with coordinates and hierarchy.
//!
//! This is the internal authority the detector and resolver consult before
//! any external provider: Klang Valley cities and neighbourhoods, the major
//! state capitals, shopping landmarks, and the rail stations that show up in
//! transit queries. Names and aliases are matched case-insensitively against
//! normalized query text.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::model::PlaceKind;

/// One curated place.
#[derive(Debug, Clone, Copy)]
pub struct Place {
    pub name: &'static str,
    pub kind: PlaceKind,
    pub lat: f64,
    pub lng: f64,
    /// Containing city or area, if any.
    pub parent: Option<&'static str>,
    /// Alternate spellings and abbreviations, lowercase.
    pub aliases: &'static [&'static str],
    /// Major landmarks skip negative-cache entries and always re-resolve.
    pub major: bool,
}

pub static PLACES: &[Place] = &[
    // Cities
    Place { name: "Kuala Lumpur", kind: PlaceKind::City, lat: 3.1390, lng: 101.6869, parent: None, aliases: &["kl"], major: false },
    Place { name: "Petaling Jaya", kind: PlaceKind::City, lat: 3.1073, lng: 101.6067, parent: None, aliases: &["pj"], major: false },
    Place { name: "Subang Jaya", kind: PlaceKind::City, lat: 3.0567, lng: 101.5851, parent: None, aliases: &["sj"], major: false },
    Place { name: "Shah Alam", kind: PlaceKind::City, lat: 3.0733, lng: 101.5185, parent: None, aliases: &[], major: false },
    Place { name: "Puchong", kind: PlaceKind::City, lat: 3.0323, lng: 101.6187, parent: None, aliases: &[], major: false },
    Place { name: "Klang", kind: PlaceKind::City, lat: 3.0449, lng: 101.4456, parent: None, aliases: &[], major: false },
    Place { name: "Kajang", kind: PlaceKind::City, lat: 2.9935, lng: 101.7874, parent: None, aliases: &[], major: false },
    Place { name: "Rawang", kind: PlaceKind::City, lat: 3.3213, lng: 101.5767, parent: None, aliases: &[], major: false },
    Place { name: "Cyberjaya", kind: PlaceKind::City, lat: 2.9213, lng: 101.6559, parent: None, aliases: &[], major: false },
    Place { name: "Putrajaya", kind: PlaceKind::City, lat: 2.9264, lng: 101.6964, parent: None, aliases: &[], major: false },
    Place { name: "Seremban", kind: PlaceKind::City, lat: 2.7258, lng: 101.9424, parent: None, aliases: &[], major: false },
    Place { name: "Johor Bahru", kind: PlaceKind::City, lat: 1.4927, lng: 103.7414, parent: None, aliases: &["jb"], major: false },
    Place { name: "George Town", kind: PlaceKind::City, lat: 5.4141, lng: 100.3288, parent: None, aliases: &["penang"], major: false },
    Place { name: "Ipoh", kind: PlaceKind::City, lat: 4.5975, lng: 101.0901, parent: None, aliases: &[], major: false },
    Place { name: "Melaka", kind: PlaceKind::City, lat: 2.1896, lng: 102.2501, parent: None, aliases: &["malacca"], major: false },
    Place { name: "Kota Kinabalu", kind: PlaceKind::City, lat: 5.9804, lng: 116.0735, parent: None, aliases: &["kk"], major: false },
    Place { name: "Kuching", kind: PlaceKind::City, lat: 1.5535, lng: 110.3593, parent: None, aliases: &[], major: false },
    // Klang Valley areas
    Place { name: "Mont Kiara", kind: PlaceKind::Area, lat: 3.1727, lng: 101.6509, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    Place { name: "Bangsar", kind: PlaceKind::Area, lat: 3.1304, lng: 101.6710, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    Place { name: "Bangsar South", kind: PlaceKind::Area, lat: 3.1116, lng: 101.6650, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    Place { name: "Bukit Bintang", kind: PlaceKind::Area, lat: 3.1468, lng: 101.7113, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    Place { name: "Cheras", kind: PlaceKind::Area, lat: 3.0723, lng: 101.7405, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    Place { name: "Ampang", kind: PlaceKind::Area, lat: 3.1500, lng: 101.7620, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    Place { name: "Sentul", kind: PlaceKind::Area, lat: 3.1858, lng: 101.6954, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    Place { name: "Setapak", kind: PlaceKind::Area, lat: 3.1879, lng: 101.7068, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    Place { name: "Kepong", kind: PlaceKind::Area, lat: 3.2088, lng: 101.6348, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    Place { name: "Wangsa Maju", kind: PlaceKind::Area, lat: 3.2050, lng: 101.7314, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    Place { name: "Brickfields", kind: PlaceKind::Area, lat: 3.1286, lng: 101.6847, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    Place { name: "Sri Hartamas", kind: PlaceKind::Area, lat: 3.1630, lng: 101.6510, parent: Some("Kuala Lumpur"), aliases: &["hartamas"], major: false },
    Place { name: "Taman Tun Dr Ismail", kind: PlaceKind::Area, lat: 3.1520, lng: 101.6300, parent: Some("Kuala Lumpur"), aliases: &["ttdi"], major: false },
    Place { name: "Overseas Union Garden", kind: PlaceKind::Area, lat: 3.0786, lng: 101.6730, parent: Some("Kuala Lumpur"), aliases: &["oug", "old klang road"], major: false },
    Place { name: "Taman Desa", kind: PlaceKind::Area, lat: 3.1022, lng: 101.6866, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    Place { name: "Damansara", kind: PlaceKind::Area, lat: 3.1473, lng: 101.6167, parent: Some("Petaling Jaya"), aliases: &[], major: false },
    Place { name: "Kota Damansara", kind: PlaceKind::Area, lat: 3.1503, lng: 101.5940, parent: Some("Petaling Jaya"), aliases: &["kd"], major: false },
    Place { name: "Damansara Heights", kind: PlaceKind::Area, lat: 3.1440, lng: 101.6600, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    Place { name: "Bandar Utama", kind: PlaceKind::Area, lat: 3.1466, lng: 101.6120, parent: Some("Petaling Jaya"), aliases: &["bu"], major: false },
    Place { name: "Mutiara Damansara", kind: PlaceKind::Area, lat: 3.1560, lng: 101.6090, parent: Some("Petaling Jaya"), aliases: &[], major: false },
    Place { name: "Bandar Sunway", kind: PlaceKind::Area, lat: 3.0738, lng: 101.6060, parent: Some("Subang Jaya"), aliases: &["sunway"], major: false },
    Place { name: "USJ", kind: PlaceKind::Area, lat: 3.0443, lng: 101.5810, parent: Some("Subang Jaya"), aliases: &[], major: false },
    Place { name: "Seri Kembangan", kind: PlaceKind::Area, lat: 3.0252, lng: 101.7107, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    Place { name: "Gombak", kind: PlaceKind::Area, lat: 3.2650, lng: 101.7000, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    // Landmarks
    Place { name: "KLCC", kind: PlaceKind::Landmark, lat: 3.1579, lng: 101.7123, parent: Some("Kuala Lumpur"), aliases: &["petronas twin towers", "twin towers"], major: true },
    Place { name: "KL Sentral", kind: PlaceKind::Landmark, lat: 3.1340, lng: 101.6864, parent: Some("Kuala Lumpur"), aliases: &[], major: true },
    Place { name: "KL Tower", kind: PlaceKind::Landmark, lat: 3.1528, lng: 101.7038, parent: Some("Kuala Lumpur"), aliases: &["menara kl"], major: false },
    Place { name: "Mid Valley", kind: PlaceKind::Landmark, lat: 3.1177, lng: 101.6775, parent: Some("Kuala Lumpur"), aliases: &["mid valley megamall", "mv"], major: true },
    Place { name: "Pavilion", kind: PlaceKind::Landmark, lat: 3.1490, lng: 101.7133, parent: Some("Kuala Lumpur"), aliases: &["pavilion kl"], major: true },
    Place { name: "Sunway Pyramid", kind: PlaceKind::Landmark, lat: 3.0723, lng: 101.6068, parent: Some("Subang Jaya"), aliases: &[], major: true },
    Place { name: "1 Utama", kind: PlaceKind::Landmark, lat: 3.1500, lng: 101.6150, parent: Some("Petaling Jaya"), aliases: &["one utama"], major: true },
    Place { name: "Batu Caves", kind: PlaceKind::Landmark, lat: 3.2379, lng: 101.6840, parent: Some("Kuala Lumpur"), aliases: &[], major: true },
    Place { name: "Genting Highlands", kind: PlaceKind::Landmark, lat: 3.4234, lng: 101.7931, parent: None, aliases: &["genting"], major: true },
    Place { name: "KLIA", kind: PlaceKind::Landmark, lat: 2.7456, lng: 101.7099, parent: None, aliases: &[], major: true },
    // Buildings
    Place { name: "Suria KLCC", kind: PlaceKind::Building, lat: 3.1577, lng: 101.7122, parent: Some("KLCC"), aliases: &[], major: false },
    Place { name: "The Troika", kind: PlaceKind::Building, lat: 3.1608, lng: 101.7190, parent: Some("Kuala Lumpur"), aliases: &["troika"], major: false },
    Place { name: "Menara TA One", kind: PlaceKind::Building, lat: 3.1556, lng: 101.7089, parent: Some("Kuala Lumpur"), aliases: &[], major: false },
    // Rail stations
    Place { name: "MRT Surian", kind: PlaceKind::Station, lat: 3.1500, lng: 101.5940, parent: Some("Kota Damansara"), aliases: &["surian"], major: false },
    Place { name: "MRT Sungai Buloh", kind: PlaceKind::Station, lat: 3.2060, lng: 101.5780, parent: Some("Petaling Jaya"), aliases: &["sungai buloh"], major: false },
    Place { name: "MRT Bandar Utama", kind: PlaceKind::Station, lat: 3.1466, lng: 101.6178, parent: Some("Bandar Utama"), aliases: &[], major: false },
    Place { name: "MRT Bukit Bintang", kind: PlaceKind::Station, lat: 3.1461, lng: 101.7115, parent: Some("Bukit Bintang"), aliases: &[], major: false },
    Place { name: "LRT KLCC", kind: PlaceKind::Station, lat: 3.1588, lng: 101.7133, parent: Some("KLCC"), aliases: &[], major: false },
    Place { name: "LRT Bangsar", kind: PlaceKind::Station, lat: 3.1276, lng: 101.6790, parent: Some("Bangsar"), aliases: &[], major: false },
    Place { name: "LRT Kelana Jaya", kind: PlaceKind::Station, lat: 3.1124, lng: 101.6037, parent: Some("Petaling Jaya"), aliases: &["kelana jaya"], major: false },
    Place { name: "KTM Subang Jaya", kind: PlaceKind::Station, lat: 3.0845, lng: 101.5881, parent: Some("Subang Jaya"), aliases: &[], major: false },
    Place { name: "Monorail Bukit Bintang", kind: PlaceKind::Station, lat: 3.1463, lng: 101.7112, parent: Some("Bukit Bintang"), aliases: &[], major: false },
];

/// Lowercased name/alias → index into [`PLACES`].
static INDEX: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    let mut index = HashMap::new();
    for (i, place) in PLACES.iter().enumerate() {
        index.entry(place.name.to_lowercase()).or_insert(i);
        for alias in place.aliases {
            index.entry((*alias).to_string()).or_insert(i);
        }
    }
    index
});

/// Exact lookup by lowercase name or alias.
pub fn lookup(normalized: &str) -> Option<&'static Place> {
    INDEX.get(normalized).map(|&i| &PLACES[i])
}

/// All curated places, for fuzzy scans.
pub fn places() -> &'static [Place] {
    PLACES
}

/// Whether a place name is on the always-re-resolve landmark list.
pub fn is_major_landmark(normalized: &str) -> bool {
    lookup(normalized).is_some_and(|p| p.major)
}

/// Stations only, for transit-proximity resolution.
pub fn stations() -> impl Iterator<Item = &'static Place> {
    PLACES.iter().filter(|p| p.kind == PlaceKind::Station)
}

/// Replace alias phrases with canonical names so spelling variants share
/// cache keys ("pj" and "petaling jaya" must hit the same entry). Windows
/// up to three tokens fold, longest first, so multi-word aliases like
/// "one utama" and "old klang road" unify too.
pub fn fold_aliases(text: &str) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut out: Vec<String> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let mut matched = None;
        for window in (1..=3.min(tokens.len() - i)).rev() {
            let phrase = tokens[i..i + window].join(" ");
            if let Some(place) = lookup(&phrase) {
                matched = Some((place.name.to_lowercase(), window));
                break;
            }
        }
        match matched {
            Some((canonical, window)) => {
                out.push(canonical);
                i += window;
            }
            None => {
                out.push(tokens[i].to_string());
                i += 1;
            }
        }
    }
    out.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_matches_names_and_aliases() {
        let pj = lookup("pj").expect("alias");
        assert_eq!(pj.name, "Petaling Jaya");
        let mk = lookup("mont kiara").expect("name");
        assert_eq!(mk.kind, PlaceKind::Area);
        assert_eq!(mk.parent, Some("Kuala Lumpur"));
        assert!(lookup("atlantis").is_none());
    }

    #[test]
    fn station_coordinates_are_latitude_first() {
        let surian = lookup("mrt surian").expect("station");
        assert!(surian.lat < 10.0, "latitude must be the small component");
        assert!(surian.lng > 100.0);
        assert_eq!((surian.lat, surian.lng), (3.1500, 101.5940));
    }

    #[test]
    fn major_landmark_list_covers_klcc_not_suburbs() {
        assert!(is_major_landmark("klcc"));
        assert!(is_major_landmark("mid valley"));
        assert!(!is_major_landmark("cheras"));
        assert!(!is_major_landmark("mrt surian"));
    }

    #[test]
    fn alias_folding_unifies_cache_spelling() {
        assert_eq!(fold_aliases("condo in pj"), "condo in petaling jaya");
        assert_eq!(fold_aliases("condo in petaling jaya"), "condo in petaling jaya");
        assert_eq!(fold_aliases("ttdi house"), "taman tun dr ismail house");
    }

    #[test]
    fn multi_word_aliases_fold_as_phrases() {
        assert_eq!(fold_aliases("condo near one utama"), "condo near 1 utama");
        assert_eq!(
            fold_aliases("house at old klang road"),
            "house at overseas union garden"
        );
        // Longest window wins: the landmark, not the "sunway" alias inside it.
        assert_eq!(fold_aliases("near sunway pyramid"), "near sunway pyramid");
        // Folded output folds to itself, so cache keys are stable.
        assert_eq!(fold_aliases("condo near 1 utama"), "condo near 1 utama");
    }

    #[test]
    fn every_place_sits_inside_malaysia() {
        for place in places() {
            assert!(
                (0.8..=7.5).contains(&place.lat),
                "{} latitude out of range",
                place.name
            );
            assert!(
                (99.5..=119.4).contains(&place.lng),
                "{} longitude out of range",
                place.name
            );
        }
    }
}
