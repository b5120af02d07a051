//! Multi-strategy place-name detection.
//!
//! Four strategies run in order and their hits are unioned before ranking:
//!
//! 1. exact gazetteer match, including 2- and 3-word n-gram windows
//! 2. abbreviation and sectional-code patterns ("pj", "ss15", "seksyen 7")
//! 3. fuzzy partial match against gazetteer names, prefix hits scored above
//!    mid-string hits
//! 4. external fallback, which the engine only runs when strategies 1-3
//!    found nothing and the validity gate passes again
//!
//! Candidates are filtered (attribute-keyword names, weak external hits),
//! deduplicated on 4-decimal coordinates, ranked by confidence with a
//! cities-first tie-break, and capped at three.

pub mod gazetteer;

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

use crate::lexicon::Lexicon;
use crate::model::{LocationCandidate, LocationSource, PlaceKind};
use crate::normalize::is_gibberish;
use gazetteer::Place;

/// Ranked candidates are capped at this many.
pub const MAX_CANDIDATES: usize = 3;

/// External hits below this confidence are discarded outright.
pub const EXTERNAL_MIN_CONFIDENCE: f64 = 0.6;

const EXACT_CONFIDENCE: f64 = 0.95;
const ALIAS_CONFIDENCE: f64 = 0.9;
const SECTIONAL_CONFIDENCE: f64 = 0.85;
const FUZZY_PREFIX_CONFIDENCE: f64 = 0.75;
const FUZZY_PARTIAL_CONFIDENCE: f64 = 0.65;
const FUZZY_MIN_TOKEN_CHARS: usize = 4;

/// Outcome of the internal detection strategies for one query.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub candidates: Vec<LocationCandidate>,
    /// True when the validity gate passed but nothing internal matched, so
    /// the engine may try external resolution.
    pub external_allowed: bool,
}

impl Detection {
    pub fn best(&self) -> Option<&LocationCandidate> {
        self.candidates.first()
    }

    pub fn confidence(&self) -> f64 {
        self.best().map(|c| c.confidence).unwrap_or(0.0)
    }
}

/// Run the internal strategies over a normalized query.
pub fn detect(text: &str) -> Detection {
    if !passes_gate(text) {
        return Detection::default();
    }

    let tokens = place_tokens(text);
    let mut found: Vec<LocationCandidate> = Vec::new();
    let mut claimed: Vec<bool> = vec![false; tokens.len()];

    scan_gazetteer(&tokens, &mut claimed, &mut found);
    let gazetteer_hits = found.clone();
    scan_sectional_codes(text, &gazetteer_hits, &mut found);
    scan_fuzzy(&tokens, &claimed, &mut found);

    let candidates = finalize(found);
    let external_allowed = candidates.is_empty();
    Detection {
        candidates,
        external_allowed,
    }
}

/// Validity gate, applied before detection and again before the external
/// strategy: refuses short, digit-only, gibberish, and attribute-only input.
pub fn passes_gate(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() < 2 {
        return false;
    }
    let alnum: Vec<char> = trimmed.chars().filter(|c| c.is_alphanumeric()).collect();
    if alnum.is_empty() || alnum.iter().all(char::is_ascii_digit) {
        return false;
    }
    if is_gibberish(trimmed) {
        return false;
    }
    has_place_token(trimmed)
}

static NUMBERISH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:rm)?[\d.,%]+$").unwrap());

/// A pure attribute expression ("office with roi 4.5%") must not trigger
/// expensive lookups; at least one token has to be a plausible place name.
fn has_place_token(text: &str) -> bool {
    let lex = Lexicon::global();
    text.split_whitespace().any(|tok| {
        let tok = strip_place_suffix(tok.trim_matches(|c: char| !c.is_alphanumeric()));
        !tok.is_empty()
            && !NUMBERISH.is_match(tok)
            && !lex.is_stopword(tok)
            && !lex.is_attribute_word(tok)
    })
}

/// Suffixes written directly after a place name in Han-script queries.
const PLACE_SUFFIXES: &[&str] = &["附近", "靠近", "旁边"];

fn strip_place_suffix(token: &str) -> &str {
    for suffix in PLACE_SUFFIXES {
        if let Some(stripped) = token.strip_suffix(suffix) {
            return stripped;
        }
    }
    token
}

fn place_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|tok| {
            strip_place_suffix(tok.trim_matches(|c: char| !c.is_alphanumeric())).to_string()
        })
        .collect()
}

/// Strategy 1 and the alias half of strategy 2: n-gram windows against the
/// gazetteer, longest window first, claiming tokens so shorter windows and
/// the fuzzy pass skip them.
fn scan_gazetteer(tokens: &[String], claimed: &mut [bool], found: &mut Vec<LocationCandidate>) {
    let mut i = 0;
    while i < tokens.len() {
        let mut advanced = false;
        for window in (1..=3.min(tokens.len() - i)).rev() {
            let phrase = tokens[i..i + window].join(" ");
            if let Some(place) = gazetteer::lookup(&phrase) {
                let via_alias = !place.name.eq_ignore_ascii_case(&phrase);
                let (source, confidence) = if via_alias {
                    (LocationSource::Abbreviation, ALIAS_CONFIDENCE)
                } else {
                    (LocationSource::Gazetteer, EXACT_CONFIDENCE)
                };
                found.push(candidate_from_place(place, source, confidence));
                for flag in claimed.iter_mut().skip(i).take(window) {
                    *flag = true;
                }
                i += window;
                advanced = true;
                break;
            }
        }
        if !advanced {
            i += 1;
        }
    }
}

static SECTIONAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(ss|usj|pju)\s?(\d{1,2}[a-z]?)\b").unwrap());
static SEKSYEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:seksyen|section|sek)\s*(\d{1,2})\b").unwrap());

/// Strategy 2, sectional-code half: suburb codes get a synthetic candidate
/// without coordinates; the resolver geocodes "code + parent city" later.
fn scan_sectional_codes(
    text: &str,
    already: &[LocationCandidate],
    found: &mut Vec<LocationCandidate>,
) {
    for caps in SECTIONAL.captures_iter(text) {
        let prefix = &caps[1];
        let number = &caps[2];
        let parent = match prefix {
            "pju" => "Petaling Jaya",
            _ => "Subang Jaya",
        };
        let name = format!("{}{}", prefix.to_uppercase(), number);
        found.push(sectional_candidate(name, parent));
    }
    if let Some(caps) = SEKSYEN.captures(text) {
        // Section numbers are ambiguous without a city; prefer one the
        // gazetteer scan already found.
        let parent = already
            .iter()
            .find(|c| c.kind == PlaceKind::City)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "Shah Alam".to_string());
        let name = format!("Seksyen {}", &caps[1]);
        found.push(sectional_candidate(name, &parent));
    }
}

fn sectional_candidate(name: String, parent: &str) -> LocationCandidate {
    let normalized = format!("{} {}", name.to_lowercase(), parent.to_lowercase());
    LocationCandidate {
        name,
        normalized,
        latitude: None,
        longitude: None,
        source: LocationSource::Abbreviation,
        confidence: SECTIONAL_CONFIDENCE,
        kind: PlaceKind::Area,
        parent: Some(parent.to_string()),
    }
}

/// Strategy 3: unclaimed tokens matched by containment against gazetteer
/// names. A prefix hit outranks a mid-string hit. A token that matches more
/// than one place is ambiguous ("taman", "bukit") and produces nothing;
/// generic Malay place words would otherwise hit half the gazetteer.
fn scan_fuzzy(tokens: &[String], claimed: &[bool], found: &mut Vec<LocationCandidate>) {
    let lex = Lexicon::global();
    for (i, token) in tokens.iter().enumerate() {
        if claimed[i]
            || token.chars().count() < FUZZY_MIN_TOKEN_CHARS
            || NUMBERISH.is_match(token)
            || lex.is_stopword(token)
            || lex.is_attribute_word(token)
        {
            continue;
        }
        let mut hit: Option<(&Place, f64)> = None;
        let mut ambiguous = false;
        for place in gazetteer::places() {
            let name = place.name.to_lowercase();
            if name == *token {
                continue;
            }
            let confidence = if name.starts_with(token.as_str()) {
                FUZZY_PREFIX_CONFIDENCE
            } else if name.contains(token.as_str()) {
                FUZZY_PARTIAL_CONFIDENCE
            } else {
                continue;
            };
            if hit.is_some() {
                ambiguous = true;
                break;
            }
            hit = Some((place, confidence));
        }
        if let Some((place, confidence)) = hit
            && !ambiguous
        {
            found.push(candidate_from_place(place, LocationSource::Fuzzy, confidence));
        }
    }
}

/// Shared post-processing for internal and external candidates: attribute
/// names dropped, weak external hits dropped, 4-decimal coordinate dedupe,
/// confidence-then-priority ordering, top 3.
pub fn finalize(mut candidates: Vec<LocationCandidate>) -> Vec<LocationCandidate> {
    let lex = Lexicon::global();
    candidates.retain(|c| !lex.contains_attribute_word(&c.name.to_lowercase()));
    candidates.retain(|c| {
        c.source != LocationSource::External || c.confidence >= EXTERNAL_MIN_CONFIDENCE
    });

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| priority_rank(a).cmp(&priority_rank(b)))
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut seen_coords: Vec<(i64, i64)> = Vec::new();
    let mut seen_names: Vec<String> = Vec::new();
    candidates.retain(|c| match c.coordinates() {
        Some((lat, lng)) => {
            let key = (
                (lat * 10_000.0).round() as i64,
                (lng * 10_000.0).round() as i64,
            );
            if seen_coords.contains(&key) {
                false
            } else {
                seen_coords.push(key);
                true
            }
        }
        None => {
            if seen_names.contains(&c.normalized) {
                false
            } else {
                seen_names.push(c.normalized.clone());
                true
            }
        }
    });

    candidates.truncate(MAX_CANDIDATES);
    candidates
}

/// Fixed tie-break order: gazetteer cities > areas > landmarks > buildings >
/// stations > anything external.
fn priority_rank(c: &LocationCandidate) -> u8 {
    if c.source == LocationSource::External {
        return PlaceKind::Station as u8 + 1;
    }
    c.kind as u8
}

fn candidate_from_place(
    place: &Place,
    source: LocationSource,
    confidence: f64,
) -> LocationCandidate {
    LocationCandidate {
        name: place.name.to_string(),
        normalized: place.name.to_lowercase(),
        latitude: Some(place.lat),
        longitude: Some(place.lng),
        source,
        confidence,
        kind: place.kind,
        parent: place.parent.map(str::to_string),
    }
}
