//! Typo-tolerant autocomplete over listing titles.
//!
//! Pure function over a caller-supplied listing pool: substring matches are
//! guaranteed a healthy score, everything else competes on string similarity,
//! and the survivors are ordered by a fixed property-kind priority before
//! score. Residential kinds people actually type first come first.

use std::collections::HashMap;

use itertools::Itertools;
use strsim::normalized_levenshtein;

use crate::model::{Property, PropertyKind};

/// Shortest prefix worth completing.
const MIN_PREFIX_CHARS: usize = 2;
/// Candidates scoring below this are noise.
const MIN_SCORE: u32 = 40;
/// Floor applied to any title that literally contains the typed text.
const SUBSTRING_FLOOR: u32 = 70;
const MAX_SUGGESTIONS: usize = 5;

/// One ranked completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub title: String,
    pub kind: PropertyKind,
    /// 0–100 similarity to the typed text.
    pub score: u32,
}

/// Complete `prefix` against the given listings. Under two characters there
/// is nothing to rank, so the answer is empty.
pub fn suggest(prefix: &str, properties: &[Property]) -> Vec<Suggestion> {
    let needle = prefix.trim().to_lowercase();
    if needle.chars().count() < MIN_PREFIX_CHARS {
        return Vec::new();
    }

    // Unique by case-folded title, best score wins.
    let mut best: HashMap<String, Suggestion> = HashMap::new();
    for property in properties {
        let title_lower = property.title.to_lowercase();
        let mut score = (similarity(&needle, &title_lower) * 100.0).round() as u32;
        if title_lower.contains(&needle) {
            score = score.max(SUBSTRING_FLOOR);
        }
        if score < MIN_SCORE {
            continue;
        }
        best.entry(title_lower)
            .and_modify(|existing| {
                if score > existing.score {
                    existing.score = score;
                }
            })
            .or_insert(Suggestion {
                title: property.title.clone(),
                kind: property.kind,
                score,
            });
    }

    best.into_values()
        .sorted_by(|a, b| {
            kind_priority(a.kind)
                .cmp(&kind_priority(b.kind))
                .then(b.score.cmp(&a.score))
                .then_with(|| a.title.cmp(&b.title))
        })
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Best of whole-title, per-word, and word-order-insensitive similarity, so
/// a one-word query still scores well against a long title and a reshuffled
/// phrase is not punished.
fn similarity(needle: &str, title: &str) -> f64 {
    let whole = normalized_levenshtein(needle, title);
    let per_word = title
        .split_whitespace()
        .map(|word| normalized_levenshtein(needle, word))
        .fold(0.0, f64::max);
    let token_sorted = normalized_levenshtein(&sort_tokens(needle), &sort_tokens(title));
    whole.max(per_word).max(token_sorted)
}

fn sort_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn kind_priority(kind: PropertyKind) -> u8 {
    match kind {
        PropertyKind::Apartment => 1,
        PropertyKind::House => 2,
        PropertyKind::Condominium => 3,
        _ => 4,
    }
}
