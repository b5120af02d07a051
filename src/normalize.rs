//! Query text normalization and the input validity gate.
//!
//! Normalization is **critical for cache correctness**: paraphrases of the
//! same query must collapse to the same key, or every spelling variant pays
//! for its own provider calls.
//!
//! # Processing Pipeline
//!
//! 1. **Unicode NFC normalization** - composed and decomposed forms unify
//! 2. **Lowercasing** - Unicode-aware
//! 3. **Whitespace collapsing** - runs become a single space, ends trimmed
//!
//! [`expand_numeric_shorthand`] is applied on top of that for cache keys and
//! assisted-parser input, folding `"2.5k"` and `"500,000"` style spellings
//! into plain integers.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Minimum query length in characters after normalization.
pub const MIN_QUERY_CHARS: usize = 2;

/// Letter-sample size below which the nonsense heuristics stay silent.
const MIN_LETTER_SAMPLE: usize = 5;

/// Vowel share under which a sampled token is considered unpronounceable.
const MIN_VOWEL_RATIO: f64 = 0.2;

/// A consonant run of this length flags a token as nonsense.
const CONSONANT_RUN_LIMIT: usize = 4;

/// Why a raw query was refused before any parsing work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryFlaw {
    #[error("query is empty")]
    Empty,
    #[error("query is too short")]
    TooShort,
    #[error("query does not look like language")]
    Nonsense,
}

/// Canonicalize a raw query for matching and cache keying.
///
/// Deterministic and idempotent: normalizing an already-normalized string is
/// a no-op.
pub fn normalize_query(raw: &str) -> String {
    let composed: String = raw.nfc().collect();
    let lowered = composed.to_lowercase();
    collapse_whitespace(&lowered)
}

/// Fold numeric shorthand into plain integers.
///
/// Handles the spellings seen in real queries: `"2.5k"` → `"2500"`,
/// `"1.2mil"` → `"1200000"`, `"50万"` → `"500000"`, `"500,000"` →
/// `"500000"`. Bare `"m"` is left alone because it reads as metres in this
/// domain (`"500m to mrt"`).
pub fn expand_numeric_shorthand(text: &str) -> String {
    static SEPARATED: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\d{1,3}(?:,\d{3})+").unwrap());
    // No left \b: "rm300k" has no word boundary between the "m" and the "3".
    static THOUSANDS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)k\b").unwrap());
    static MILLIONS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)(?:mil|juta)\b").unwrap());
    static TEN_THOUSANDS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)万").unwrap());

    let no_separators = SEPARATED.replace_all(text, |caps: &regex::Captures<'_>| {
        caps[0].replace(',', "")
    });
    let expanded_k = THOUSANDS.replace_all(&no_separators, |caps: &regex::Captures<'_>| {
        scale_match(&caps[1], 1_000.0)
    });
    let expanded_mil = MILLIONS.replace_all(&expanded_k, |caps: &regex::Captures<'_>| {
        scale_match(&caps[1], 1_000_000.0)
    });
    let expanded_wan = TEN_THOUSANDS.replace_all(&expanded_mil, |caps: &regex::Captures<'_>| {
        scale_match(&caps[1], 10_000.0)
    });
    expanded_wan.into_owned()
}

fn scale_match(digits: &str, factor: f64) -> String {
    match digits.parse::<f64>() {
        Ok(n) => format!("{}", (n * factor).round() as i64),
        Err(_) => digits.to_string(),
    }
}

/// Gate applied to every incoming query before extraction.
///
/// Empty, single-character, symbol-only, and unpronounceable-nonsense input
/// is refused here so that junk never reaches a parser or a paid provider.
pub fn validate_query(normalized: &str) -> Result<(), QueryFlaw> {
    if normalized.is_empty() {
        return Err(QueryFlaw::Empty);
    }
    if normalized.chars().count() < MIN_QUERY_CHARS {
        return Err(QueryFlaw::TooShort);
    }
    if !normalized.chars().any(|c| c.is_alphanumeric()) {
        return Err(QueryFlaw::Nonsense);
    }
    if is_gibberish(normalized) {
        return Err(QueryFlaw::Nonsense);
    }
    Ok(())
}

/// Heuristic nonsense detector for Latin-script input.
///
/// A token is suspicious when it carries at least [`MIN_LETTER_SAMPLE`] ASCII
/// letters and is unpronounceable: vowel ratio under [`MIN_VOWEL_RATIO`] or a
/// consonant run of [`CONSONANT_RUN_LIMIT`]+. The query is nonsense only when
/// *every* letter-bearing token is suspicious, so one odd word inside an
/// otherwise normal query never rejects it. Tokens with non-Latin letters
/// (Chinese, Tamil) are always plausible; the heuristic has no meaning there.
pub fn is_gibberish(text: &str) -> bool {
    let mut saw_letters = false;
    for token in text.split_whitespace() {
        if token.chars().any(|c| c.is_alphabetic() && !c.is_ascii_alphabetic()) {
            return false;
        }
        let letters: Vec<char> = token
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if letters.is_empty() {
            continue;
        }
        saw_letters = true;
        if letters.len() < MIN_LETTER_SAMPLE {
            return false;
        }
        if !token_is_unpronounceable(&letters) {
            return false;
        }
    }
    saw_letters
}

fn token_is_unpronounceable(letters: &[char]) -> bool {
    // 'y' counts as a vowel: Cyberjaya must not look like nonsense.
    fn is_vowel(c: char) -> bool {
        matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
    }

    let vowels = letters.iter().filter(|&&c| is_vowel(c)).count();
    let ratio = vowels as f64 / letters.len() as f64;
    if ratio < MIN_VOWEL_RATIO {
        return true;
    }

    let mut run = 0usize;
    for &c in letters {
        if is_vowel(c) {
            run = 0;
        } else {
            run += 1;
            if run >= CONSONANT_RUN_LIMIT {
                return true;
            }
        }
    }
    false
}

fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_space = true;
    for c in text.chars() {
        if c.is_whitespace() {
            if !prev_space {
                result.push(' ');
                prev_space = true;
            }
        } else {
            result.push(c);
            prev_space = false;
        }
    }
    result.trim_end().to_string()
}
