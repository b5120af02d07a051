//! Lexical extraction of structured signals from free-text queries.
//!
//! Independent matchers run over the normalized query: property kinds,
//! listing intent, numeric price/ROI/count patterns, amenities, slang, and
//! candidate location tokens. Everything found is reported together with a
//! weighted confidence; the classifier decides whether this pass alone is
//! good enough or an assisted parse is needed.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use crate::lexicon::{Lexicon, SPACIOUS_SQFT_HINT, contains_keyword};
use crate::model::{
    ListingIntent, LotPosition, PropertyCondition, PropertyKind, TransportKind, TravelMode,
};
use crate::normalize::expand_numeric_shorthand;

// Confidence weights per concept; property type and price weigh most.
const W_TYPE: f64 = 0.30;
const W_PRICE: f64 = 0.25;
const W_LOCATION: f64 = 0.20;
const W_BEDROOMS: f64 = 0.15;
const W_INTENT: f64 = 0.10;
const BONUS_ROI_WITH_TYPE: f64 = 0.10;
const BONUS_SLANG: f64 = 0.05;

/// Everything the lexical pass found in one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub kinds: Vec<PropertyKind>,
    pub intent: Option<ListingIntent>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_roi: Option<f64>,
    pub max_roi: Option<f64>,
    /// Raw location phrases, in query order; the detector re-ranks them.
    pub locations: Vec<String>,
    pub amenities: Vec<String>,
    pub min_square_feet: Option<u32>,
    pub condition: Option<PropertyCondition>,
    pub lot_position: Option<LotPosition>,
    pub transit: Vec<TransportKind>,
    pub time_budget_minutes: Option<u32>,
    pub travel_mode: Option<TravelMode>,
    pub max_distance_km: Option<f64>,
    pub cheap_signal: bool,
    pub near_signal: bool,
    pub spacious_signal: bool,
    pub minimum_phrasing: bool,
    /// Weighted sum over found concepts, capped at 1.0.
    pub confidence: f64,
}

impl Extraction {
    pub fn has_price_bound(&self) -> bool {
        self.min_price.is_some() || self.max_price.is_some()
    }

    pub fn has_roi_bound(&self) -> bool {
        self.min_roi.is_some() || self.max_roi.is_some()
    }
}

/// Run every matcher over a normalized query.
pub fn extract(normalized_query: &str) -> Extraction {
    let text = expand_numeric_shorthand(normalized_query);
    let lex = Lexicon::global();

    let mut out = Extraction {
        kinds: lex.match_kinds(&text),
        intent: lex.match_intent(&text),
        amenities: lex.match_amenities(&text),
        condition: lex.match_condition(&text),
        lot_position: lex.match_lot_position(&text),
        transit: lex.match_transit(&text),
        cheap_signal: lex.cheap_signal(&text),
        near_signal: lex.near_signal(&text),
        spacious_signal: lex.spacious_signal(&text),
        minimum_phrasing: lex.minimum_phrasing(&text),
        ..Extraction::default()
    };

    // Known place names claim their spans first: a numeric-leading name
    // like "1 utama" must not double as a price or room count below.
    let mut claimed: Vec<Range<usize>> = Vec::new();
    out.locations = claim_known_places(&text, &mut claimed);
    extract_rooms(&text, &mut out, &mut claimed);
    extract_roi(&text, &mut out, &mut claimed);
    extract_prices(&text, &mut out, &mut claimed);
    extract_dimensions(&text, &mut out);
    extract_travel(&text, &mut out);
    phrase_locations(&text, lex, &mut out.locations);

    if out.spacious_signal && out.min_square_feet.is_none() {
        out.min_square_feet = Some(SPACIOUS_SQFT_HINT);
    }

    out.confidence = confidence_of(&out);
    out
}

fn confidence_of(ex: &Extraction) -> f64 {
    let mut score = 0.0;
    if !ex.kinds.is_empty() {
        score += W_TYPE;
    }
    if ex.has_price_bound() {
        score += W_PRICE;
    }
    if !ex.locations.is_empty() {
        score += W_LOCATION;
    }
    if ex.bedrooms.is_some() {
        score += W_BEDROOMS;
    }
    if ex.intent.is_some() {
        score += W_INTENT;
    }
    if ex.has_roi_bound() && !ex.kinds.is_empty() {
        score += BONUS_ROI_WITH_TYPE;
    }
    if ex.cheap_signal || ex.near_signal || ex.spacious_signal {
        score += BONUS_SLANG;
    }
    score.min(1.0)
}

static BATHROOMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*(?:bathrooms?|baths?|bilik\s+air|浴室|卫生间)").unwrap()
});
static BEDROOMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*(?:bedrooms?|beds?|br\b|bilik(?:\s+tidur)?|间卧室|卧室|房间|室|房)").unwrap()
});

fn extract_rooms(text: &str, out: &mut Extraction, claimed: &mut Vec<Range<usize>>) {
    // Bathrooms first: "bilik air" must not be read as a bedroom count.
    if let Some(caps) = BATHROOMS.captures(text) {
        if let Ok(n) = caps[1].parse::<u32>() {
            out.bathrooms = Some(n);
            if let Some(m) = caps.get(0) {
                claimed.push(m.range());
            }
        }
    }
    for caps in BEDROOMS.captures_iter(text) {
        let Some(full) = caps.get(0) else { continue };
        if overlaps(claimed, &full.range()) {
            continue;
        }
        if let Ok(n) = caps[1].parse::<u32>() {
            out.bedrooms = Some(n);
            claimed.push(full.range());
            break;
        }
    }
}

static ROI_MAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:roi|rental yield|yield)\s*(?:below|under|less than|at most)\s*(\d+(?:\.\d+)?)\s*%?")
        .unwrap()
});
static ROI_MIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:roi|rental yield|yield)\s*(?:of\s*)?(?:at least\s*|above\s*|over\s*|minimum\s*)?(\d+(?:\.\d+)?)\s*%?",
    )
    .unwrap()
});
static ROI_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*%\s*(?:roi|rental yield|yield)").unwrap()
});

fn extract_roi(text: &str, out: &mut Extraction, claimed: &mut Vec<Range<usize>>) {
    if let Some(caps) = ROI_MAX.captures(text) {
        if let Ok(v) = caps[1].parse::<f64>() {
            out.max_roi = Some(v);
            if let Some(m) = caps.get(0) {
                claimed.push(m.range());
            }
            return;
        }
    }
    for re in [&*ROI_MIN, &*ROI_PREFIX] {
        if let Some(caps) = re.captures(text) {
            if let Ok(v) = caps[1].parse::<f64>() {
                out.min_roi = Some(v);
                if let Some(m) = caps.get(0) {
                    claimed.push(m.range());
                }
                return;
            }
        }
    }
}

static BETWEEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:between|antara)\s+(?:rm\s*)?(\d+(?:\.\d+)?)\s*(?:and|to|dan|-)\s*(?:rm\s*)?(\d+(?:\.\d+)?)",
    )
    .unwrap()
});
static MAX_PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:under|below|less than|at most|up to|cheaper than|bawah|kurang daripada|maximum|max)\s+(?:rm\s*)?(\d+(?:\.\d+)?)",
    )
    .unwrap()
});
static MIN_PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:above|over|more than|at least|starting from|from|minimum|melebihi|lebih daripada)\s+(?:rm\s*)?(\d+(?:\.\d+)?)",
    )
    .unwrap()
});
static CN_MAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*(?:以下|以内)").unwrap());
static CN_MIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*以上").unwrap());
static BARE_RM: Lazy<Regex> = Lazy::new(|| Regex::new(r"rm\s*(\d+(?:\.\d+)?)").unwrap());

/// Unit words that re-type a number as something other than money.
const NON_PRICE_UNITS: &[&str] = &[
    "bed", "bilik", "bath", "room", "sq", "min", "%", "km", "卧", "房", "室", "间", "浴", "分钟",
];

fn number_is_not_price(text: &str, number_end: usize) -> bool {
    let rest = text[number_end..].trim_start();
    NON_PRICE_UNITS.iter().any(|unit| rest.starts_with(unit))
}

fn extract_prices(text: &str, out: &mut Extraction, claimed: &mut Vec<Range<usize>>) {
    if let Some(caps) = BETWEEN.captures(text) {
        let (lo, hi) = (caps[1].parse::<f64>(), caps[2].parse::<f64>());
        if let (Ok(lo), Ok(hi)) = (lo, hi) {
            out.min_price = Some(lo.min(hi));
            out.max_price = Some(lo.max(hi));
            if let Some(m) = caps.get(0) {
                claimed.push(m.range());
            }
            return;
        }
    }

    for caps in MAX_PRICE.captures_iter(text) {
        let Some(num) = caps.get(1) else { continue };
        let Some(full) = caps.get(0) else { continue };
        if overlaps(claimed, &full.range()) || number_is_not_price(text, num.end()) {
            continue;
        }
        if let Ok(v) = num.as_str().parse::<f64>() {
            out.max_price = Some(v);
            claimed.push(full.range());
            break;
        }
    }
    if out.max_price.is_none() {
        if let Some(caps) = CN_MAX.captures(text) {
            if let Ok(v) = caps[1].parse::<f64>() {
                out.max_price = Some(v);
                if let Some(m) = caps.get(0) {
                    claimed.push(m.range());
                }
            }
        }
    }

    for caps in MIN_PRICE.captures_iter(text) {
        let Some(num) = caps.get(1) else { continue };
        let Some(full) = caps.get(0) else { continue };
        if overlaps(claimed, &full.range()) || number_is_not_price(text, num.end()) {
            continue;
        }
        if let Ok(v) = num.as_str().parse::<f64>() {
            out.min_price = Some(v);
            claimed.push(full.range());
            break;
        }
    }
    if out.min_price.is_none() {
        if let Some(caps) = CN_MIN.captures(text) {
            if let Ok(v) = caps[1].parse::<f64>() {
                out.min_price = Some(v);
                if let Some(m) = caps.get(0) {
                    claimed.push(m.range());
                }
            }
        }
    }

    // A bare currency-marked number with no comparator reads as a ceiling.
    if out.min_price.is_none() && out.max_price.is_none() {
        for caps in BARE_RM.captures_iter(text) {
            let Some(full) = caps.get(0) else { continue };
            if overlaps(claimed, &full.range()) {
                continue;
            }
            if let Ok(v) = caps[1].parse::<f64>() {
                out.max_price = Some(v);
                claimed.push(full.range());
                break;
            }
        }
    }
}

static SQFT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*(?:square feet|sq\.?\s?ft|sqft|kaki persegi)").unwrap()
});
static KM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*km\b").unwrap());

fn extract_dimensions(text: &str, out: &mut Extraction) {
    if let Some(caps) = SQFT.captures(text) {
        if let Ok(v) = caps[1].parse::<u32>() {
            out.min_square_feet = Some(v);
        }
    }
    if let Some(caps) = KM.captures(text) {
        if let Ok(v) = caps[1].parse::<f64>() {
            out.max_distance_km = Some(v);
        }
    }
}

static MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:minutes?|mins?|minit|分钟)").unwrap());

const WALK_WORDS: &[&str] = &["walking", "walk", "jalan kaki", "步行"];
const CYCLE_WORDS: &[&str] = &["cycling", "cycle", "bicycle", "bike", "basikal", "骑车"];
const DRIVE_WORDS: &[&str] = &["driving", "drive", "car", "memandu", "开车"];

fn extract_travel(text: &str, out: &mut Extraction) {
    if let Some(caps) = MINUTES.captures(text) {
        if let Ok(v) = caps[1].parse::<u32>() {
            out.time_budget_minutes = Some(v);
        }
    }
    if WALK_WORDS.iter().any(|w| contains_keyword(text, w)) {
        out.travel_mode = Some(TravelMode::Walking);
    } else if CYCLE_WORDS.iter().any(|w| contains_keyword(text, w)) {
        out.travel_mode = Some(TravelMode::Cycling);
    } else if DRIVE_WORDS.iter().any(|w| contains_keyword(text, w)) {
        out.travel_mode = Some(TravelMode::Driving);
    }
}

/// Prepositions that introduce a place phrase in Latin-script queries.
const PLACE_PREPOSITIONS: &[&str] = &[
    "in", "at", "near", "around", "beside", "di", "dekat", "berhampiran", "berdekatan",
];

/// Suffixes that follow a place name in Han-script queries.
const PLACE_SUFFIXES: &[&str] = &["附近", "靠近", "旁边"];

/// Byte spans of the whitespace-separated tokens, in order.
fn token_spans(text: &str) -> Vec<(Range<usize>, &str)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s..i, &text[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s..text.len(), &text[s..]));
    }
    spans
}

/// Gazetteer names, longest n-gram window first. Every match claims its
/// byte span so the numeric matchers skip it.
fn claim_known_places(text: &str, claimed: &mut Vec<Range<usize>>) -> Vec<String> {
    use crate::location::gazetteer;

    let tokens = token_spans(text);
    let mut found: Vec<String> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let mut advanced = false;
        for window in (1..=3.min(tokens.len() - i)).rev() {
            let phrase = tokens[i..i + window]
                .iter()
                .map(|(_, tok)| *tok)
                .collect::<Vec<_>>()
                .join(" ");
            if gazetteer::lookup(&phrase).is_some() {
                claimed.push(tokens[i].0.start..tokens[i + window - 1].0.end);
                push_unique(&mut found, phrase);
                i += window;
                advanced = true;
                break;
            }
        }
        if !advanced {
            i += 1;
        }
    }
    found
}

/// Preposition-introduced and suffix-marked phrases, appended after the
/// known names; attribute and number tokens excluded.
fn phrase_locations(text: &str, lex: &Lexicon, found: &mut Vec<String>) {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    for (i, tok) in tokens.iter().enumerate() {
        if PLACE_PREPOSITIONS.contains(tok) {
            let phrase: Vec<&str> = tokens[i + 1..]
                .iter()
                .take(3)
                .take_while(|t| is_place_token(lex, t))
                .copied()
                .collect();
            if !phrase.is_empty() {
                push_unique(found, phrase.join(" "));
            }
        }
        for suffix in PLACE_SUFFIXES {
            if let Some(stripped) = tok.strip_suffix(suffix) {
                if !stripped.is_empty() {
                    push_unique(found, stripped.to_string());
                }
            }
        }
        // Tamil postposition: the place precedes the marker.
        if *tok == "அருகில்" && i > 0 && is_place_token(lex, tokens[i - 1]) {
            push_unique(found, tokens[i - 1].to_string());
        }
    }
}

fn push_unique(found: &mut Vec<String>, candidate: String) {
    if !candidate.is_empty() && !found.contains(&candidate) {
        found.push(candidate);
    }
}

fn is_place_token(lex: &Lexicon, token: &str) -> bool {
    if token.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',' || c == '%') {
        return false;
    }
    !lex.is_stopword(token) && !lex.is_attribute_word(token)
}

fn overlaps(claimed: &[Range<usize>], candidate: &Range<usize>) -> bool {
    claimed
        .iter()
        .any(|r| r.start < candidate.end && candidate.start < r.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_query;

    fn run(q: &str) -> Extraction {
        extract(&normalize_query(q))
    }

    #[test]
    fn full_english_query_extracts_all_concepts() {
        let ex = run("3 bedroom condo under RM500000 in Mont Kiara");
        assert_eq!(ex.kinds, vec![PropertyKind::Condominium]);
        assert_eq!(ex.bedrooms, Some(3));
        assert_eq!(ex.max_price, Some(500_000.0));
        assert!(ex.locations.iter().any(|l| l == "mont kiara"));
        assert!(ex.confidence >= 0.85, "got {}", ex.confidence);
    }

    #[test]
    fn cheap_slang_sets_signal_not_price() {
        let ex = run("cheap apartment near KLCC");
        assert_eq!(ex.kinds, vec![PropertyKind::Apartment]);
        assert!(ex.cheap_signal);
        assert!(ex.near_signal);
        assert_eq!(ex.max_price, None);
        assert!(ex.locations.iter().any(|l| l == "klcc"));
    }

    #[test]
    fn roi_percentage_reads_as_minimum_by_default() {
        let ex = run("Shop with ROI 4.5%");
        assert_eq!(ex.kinds, vec![PropertyKind::ShopLot]);
        assert_eq!(ex.min_roi, Some(4.5));
        assert_eq!(ex.max_roi, None);
    }

    #[test]
    fn roi_below_reads_as_maximum() {
        let ex = run("office roi below 6%");
        assert_eq!(ex.max_roi, Some(6.0));
        assert_eq!(ex.min_roi, None);
    }

    #[test]
    fn malay_query_with_k_suffix() {
        let ex = run("apartmen bawah 600k");
        assert_eq!(ex.kinds, vec![PropertyKind::Apartment]);
        assert_eq!(ex.max_price, Some(600_000.0));
    }

    #[test]
    fn malay_room_count_and_near() {
        let ex = run("kondo 3 bilik dekat KLCC");
        assert_eq!(ex.kinds, vec![PropertyKind::Condominium]);
        assert_eq!(ex.bedrooms, Some(3));
        assert!(ex.near_signal);
        assert!(ex.locations.iter().any(|l| l == "klcc"));
    }

    #[test]
    fn chinese_rooms_and_suffix_location() {
        let ex = run("3室公寓 KLCC附近");
        assert_eq!(ex.kinds, vec![PropertyKind::Apartment]);
        assert_eq!(ex.bedrooms, Some(3));
        assert!(ex.locations.iter().any(|l| l == "klcc"));
    }

    #[test]
    fn bathroom_count_does_not_leak_into_bedrooms() {
        let ex = run("rumah 2 bilik air dengan 4 bilik tidur");
        assert_eq!(ex.bathrooms, Some(2));
        assert_eq!(ex.bedrooms, Some(4));
    }

    #[test]
    fn at_least_three_bedrooms_is_not_a_price_floor() {
        let ex = run("house with at least 3 bedrooms");
        assert_eq!(ex.bedrooms, Some(3));
        assert_eq!(ex.min_price, None);
        assert!(ex.minimum_phrasing);
    }

    #[test]
    fn price_band_between() {
        let ex = run("condo between rm300k and rm500k");
        assert_eq!(ex.min_price, Some(300_000.0));
        assert_eq!(ex.max_price, Some(500_000.0));
    }

    #[test]
    fn travel_budget_and_mode() {
        let ex = run("apartment within 10 minutes walk of KLCC");
        assert_eq!(ex.time_budget_minutes, Some(10));
        assert_eq!(ex.travel_mode, Some(TravelMode::Walking));
    }

    #[test]
    fn transit_network_and_station_phrase() {
        let ex = run("condo near MRT Surian under RM3000");
        assert_eq!(ex.transit, vec![TransportKind::Mrt]);
        assert_eq!(ex.max_price, Some(3000.0));
        assert!(ex.locations.iter().any(|l| l == "mrt surian"));
    }

    #[test]
    fn numeric_leading_landmark_is_not_a_price_floor() {
        let ex = run("condo 10 minutes from 1 utama");
        assert!(ex.locations.iter().any(|l| l == "1 utama"));
        assert_eq!(ex.min_price, None);
        assert_eq!(ex.time_budget_minutes, Some(10));
    }

    #[test]
    fn confidence_rises_with_found_concepts() {
        let sparse = run("property");
        let rich = run("3 bedroom condo under rm500000 in mont kiara for sale");
        assert!(rich.confidence > sparse.confidence);
        assert!(rich.confidence <= 1.0);
    }
}
