//! Multi-language keyword tables for query understanding.
//!
//! Every extractor and gate in the crate reads from this one lexicon instead
//! of carrying its own keyword lists, so English, Bahasa Malaysia, Mandarin
//! and Tamil vocabulary stays consistent across property-type, intent,
//! amenity and slang matching.
//!
//! Matching is script-aware: Latin-script keywords match on word boundaries
//! only (so "sa" never fires inside "desa"), while Han and Tamil keywords
//! match on substring containment because those scripts are written without
//! spaces.

use once_cell::sync::Lazy;
use std::ops::Range;

use crate::model::{ListingIntent, LotPosition, PropertyCondition, PropertyKind, TransportKind};

/// Bumped whenever a table changes in a way that affects cached parses.
pub const LEXICON_VERSION: u32 = 3;

/// Square-footage floor implied by "spacious" style wording.
pub const SPACIOUS_SQFT_HINT: u32 = 1000;

static LEXICON: Lazy<Lexicon> = Lazy::new(Lexicon::build);

/// Concept-keyed keyword tables, loaded once per process.
pub struct Lexicon {
    kinds: Vec<(&'static str, PropertyKind)>,
    intents: Vec<(&'static str, ListingIntent)>,
    amenities: Vec<(&'static str, &'static str)>,
    cheap: Vec<&'static str>,
    near: Vec<&'static str>,
    spacious: Vec<&'static str>,
    conditions: Vec<(&'static str, PropertyCondition)>,
    lots: Vec<(&'static str, LotPosition)>,
    minimum_phrases: Vec<&'static str>,
    transit: Vec<(&'static str, TransportKind)>,
    attribute_words: Vec<&'static str>,
    stopwords: Vec<&'static str>,
}

impl Lexicon {
    pub fn global() -> &'static Lexicon {
        &LEXICON
    }

    fn build() -> Self {
        let mut lex = Self {
            kinds: vec![
                // English and common colloquial
                ("serviced residence", PropertyKind::ServicedResidence),
                ("serviced apartment", PropertyKind::ServicedResidence),
                ("terrace house", PropertyKind::Townhouse),
                ("town house", PropertyKind::Townhouse),
                ("townhouse", PropertyKind::Townhouse),
                ("terrace", PropertyKind::Townhouse),
                ("retail space", PropertyKind::RetailSpace),
                ("retail lot", PropertyKind::RetailSpace),
                ("retail", PropertyKind::RetailSpace),
                ("shop lot", PropertyKind::ShopLot),
                ("shoplot", PropertyKind::ShopLot),
                ("shophouse", PropertyKind::ShopLot),
                ("shop", PropertyKind::ShopLot),
                ("condominium", PropertyKind::Condominium),
                ("condo", PropertyKind::Condominium),
                ("penthouse", PropertyKind::Condominium),
                ("apartment", PropertyKind::Apartment),
                ("flat", PropertyKind::Apartment),
                ("studio", PropertyKind::Studio),
                ("bungalow", PropertyKind::House),
                ("semi-d", PropertyKind::House),
                ("landed", PropertyKind::House),
                ("house", PropertyKind::House),
                ("office", PropertyKind::Office),
                ("commercial", PropertyKind::Commercial),
                ("warehouse", PropertyKind::Industrial),
                ("factory", PropertyKind::Industrial),
                ("industrial", PropertyKind::Industrial),
                ("land", PropertyKind::Land),
                // Bahasa Malaysia
                ("kondominium", PropertyKind::Condominium),
                ("kondo", PropertyKind::Condominium),
                ("pangsapuri", PropertyKind::Apartment),
                ("apartmen", PropertyKind::Apartment),
                ("rumah teres", PropertyKind::Townhouse),
                ("teres", PropertyKind::Townhouse),
                ("banglo", PropertyKind::House),
                ("rumah", PropertyKind::House),
                ("kedai", PropertyKind::ShopLot),
                ("pejabat", PropertyKind::Office),
                ("kilang", PropertyKind::Industrial),
                ("gudang", PropertyKind::Industrial),
                ("tanah", PropertyKind::Land),
                // Mandarin
                ("共管公寓", PropertyKind::Condominium),
                ("公寓", PropertyKind::Apartment),
                ("排屋", PropertyKind::Townhouse),
                ("洋房", PropertyKind::House),
                ("房屋", PropertyKind::House),
                ("店屋", PropertyKind::ShopLot),
                ("商铺", PropertyKind::RetailSpace),
                ("办公室", PropertyKind::Office),
                ("工厂", PropertyKind::Industrial),
                ("仓库", PropertyKind::Industrial),
                ("土地", PropertyKind::Land),
                // Tamil
                ("குடியிருப்பு", PropertyKind::Apartment),
                ("அடுக்குமாடி", PropertyKind::Apartment),
                ("வீடு", PropertyKind::House),
                ("கடை", PropertyKind::ShopLot),
                ("அலுவலகம்", PropertyKind::Office),
                ("நிலம்", PropertyKind::Land),
            ],
            intents: vec![
                ("for rent", ListingIntent::Rent),
                ("to rent", ListingIntent::Rent),
                ("rental", ListingIntent::Rent),
                ("rent", ListingIntent::Rent),
                ("untuk disewa", ListingIntent::Rent),
                ("disewa", ListingIntent::Rent),
                ("sewa", ListingIntent::Rent),
                ("出租", ListingIntent::Rent),
                ("租", ListingIntent::Rent),
                ("வாடகை", ListingIntent::Rent),
                ("for sale", ListingIntent::Sale),
                ("sale", ListingIntent::Sale),
                ("buy", ListingIntent::Sale),
                ("purchase", ListingIntent::Sale),
                ("dijual", ListingIntent::Sale),
                ("jual", ListingIntent::Sale),
                ("beli", ListingIntent::Sale),
                ("出售", ListingIntent::Sale),
                ("购买", ListingIntent::Sale),
                ("买", ListingIntent::Sale),
                ("விற்பனை", ListingIntent::Sale),
            ],
            amenities: vec![
                ("swimming pool", "pool"),
                ("pool", "pool"),
                ("kolam renang", "pool"),
                ("kolam", "pool"),
                ("游泳池", "pool"),
                ("泳池", "pool"),
                ("gymnasium", "gym"),
                ("gym", "gym"),
                ("gimnasium", "gym"),
                ("健身房", "gym"),
                ("car park", "parking"),
                ("carpark", "parking"),
                ("parking", "parking"),
                ("tempat letak kereta", "parking"),
                ("停车位", "parking"),
                ("停车", "parking"),
                ("fully furnished", "furnished"),
                ("furnished", "furnished"),
                ("berperabot", "furnished"),
                ("家具", "furnished"),
                ("air conditioning", "air-conditioning"),
                ("air con", "air-conditioning"),
                ("aircond", "air-conditioning"),
                ("空调", "air-conditioning"),
                ("balcony", "balcony"),
                ("balkoni", "balcony"),
                ("阳台", "balcony"),
                ("gated and guarded", "security"),
                ("security", "security"),
                ("guarded", "security"),
                ("gated", "security"),
                ("保安", "security"),
                ("elevator", "lift"),
                ("lift", "lift"),
                ("电梯", "lift"),
                ("playground", "playground"),
                ("wifi", "wifi"),
            ],
            cheap: vec![
                "cheapest", "cheap", "budget", "affordable", "low cost", "murah",
                "bajet", "便宜", "实惠", "廉价", "மலிவான",
            ],
            near: vec![
                "nearby", "near", "close to", "next to", "walking distance",
                "berhampiran", "berdekatan", "dekat", "附近", "靠近", "旁边",
                "அருகில்",
            ],
            spacious: vec![
                "spacious", "big", "large", "luas", "besar", "宽敞", "பெரிய",
            ],
            conditions: vec![
                ("brand new", PropertyCondition::New),
                ("newly built", PropertyCondition::New),
                ("new", PropertyCondition::New),
                ("baru", PropertyCondition::New),
                ("全新", PropertyCondition::New),
                ("renovated", PropertyCondition::Renovated),
                ("diubahsuai", PropertyCondition::Renovated),
                ("翻新", PropertyCondition::Renovated),
                ("well maintained", PropertyCondition::WellMaintained),
                ("well-maintained", PropertyCondition::WellMaintained),
            ],
            lots: vec![
                ("corner lot", LotPosition::Corner),
                ("corner unit", LotPosition::Corner),
                ("corner", LotPosition::Corner),
                ("lot tepi", LotPosition::Corner),
                ("end lot", LotPosition::EndLot),
                ("end unit", LotPosition::EndLot),
                ("intermediate lot", LotPosition::Intermediate),
                ("intermediate", LotPosition::Intermediate),
            ],
            minimum_phrases: vec![
                "at least", "minimum", "min", "or more", "sekurang-kurangnya",
                "sekurang", "至少", "最少",
            ],
            transit: vec![
                ("mrt", TransportKind::Mrt),
                ("捷运", TransportKind::Mrt),
                ("lrt", TransportKind::Lrt),
                ("轻快铁", TransportKind::Lrt),
                ("monorail", TransportKind::Monorail),
                ("单轨", TransportKind::Monorail),
                ("ktm", TransportKind::Ktm),
                ("komuter", TransportKind::Ktm),
                ("brt", TransportKind::Brt),
            ],
            attribute_words: vec![
                "roi", "yield", "price", "prices", "rm", "ringgit", "bedroom",
                "bedrooms", "bathroom", "bathrooms", "bilik", "sqft", "sq",
                "ft", "under", "below", "above", "over", "between", "budget",
                "cheap", "cheapest", "affordable", "murah", "expensive",
                "rent", "rental", "sale", "buy", "sewa", "jual", "beli",
                "month", "monthly", "bulan",
            ],
            stopwords: vec![
                "a", "an", "the", "in", "at", "on", "of", "to", "for", "with",
                "and", "or", "is", "are", "my", "me", "i", "want", "need",
                "looking", "find", "show", "di", "yang", "dengan", "untuk",
                "dan", "saya", "nak", "cari", "ada",
            ],
        };
        // Longest keyword first so phrase entries claim their span before
        // any word they contain.
        lex.kinds.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        lex.intents.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        lex.amenities.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        lex.conditions.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        lex.lots.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        lex
    }

    /// All property kinds named in the text, de-duplicated, span-masked so
    /// "terrace house" yields Townhouse without also firing "house".
    pub fn match_kinds(&self, text: &str) -> Vec<PropertyKind> {
        let mut kinds: Vec<PropertyKind> =
            match_table(text, &self.kinds).into_iter().map(|(k, _)| k).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// First listing-intent keyword found, if any.
    pub fn match_intent(&self, text: &str) -> Option<ListingIntent> {
        match_table(text, &self.intents).into_iter().map(|(i, _)| i).next()
    }

    /// Canonical amenity names mentioned in the text.
    pub fn match_amenities(&self, text: &str) -> Vec<String> {
        let mut names: Vec<String> = match_table(text, &self.amenities)
            .into_iter()
            .map(|(a, _)| a.to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn cheap_signal(&self, text: &str) -> bool {
        self.cheap.iter().any(|kw| contains_keyword(text, kw))
    }

    pub fn near_signal(&self, text: &str) -> bool {
        self.near.iter().any(|kw| contains_keyword(text, kw))
    }

    pub fn spacious_signal(&self, text: &str) -> bool {
        self.spacious.iter().any(|kw| contains_keyword(text, kw))
    }

    pub fn match_condition(&self, text: &str) -> Option<PropertyCondition> {
        match_table(text, &self.conditions).into_iter().map(|(c, _)| c).next()
    }

    pub fn match_lot_position(&self, text: &str) -> Option<LotPosition> {
        match_table(text, &self.lots).into_iter().map(|(l, _)| l).next()
    }

    pub fn minimum_phrasing(&self, text: &str) -> bool {
        self.minimum_phrases.iter().any(|kw| contains_keyword(text, kw))
    }

    /// Transit networks named in the text.
    pub fn match_transit(&self, text: &str) -> Vec<TransportKind> {
        let mut kinds: Vec<TransportKind> = self
            .transit
            .iter()
            .filter(|(kw, _)| contains_keyword(text, kw))
            .map(|&(_, k)| k)
            .collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// Whether a single token is property-attribute vocabulary rather than a
    /// potential place name. Kind, amenity, condition and lot keywords all
    /// count as attributes.
    pub fn is_attribute_word(&self, token: &str) -> bool {
        self.attribute_words.iter().any(|w| *w == token)
            || self.kinds.iter().any(|(w, _)| *w == token)
            || self.amenities.iter().any(|(w, _)| *w == token)
            || self.intents.iter().any(|(w, _)| *w == token)
            || self.conditions.iter().any(|(w, _)| *w == token)
            || self.lots.iter().any(|(w, _)| *w == token)
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.iter().any(|w| *w == token)
    }

    /// True when any attribute keyword occurs inside the text. Used to filter
    /// bad place-name candidates that leaked attribute vocabulary.
    pub fn contains_attribute_word(&self, text: &str) -> bool {
        text.split_whitespace().any(|tok| {
            let tok = tok.trim_matches(|c: char| !c.is_alphanumeric());
            !tok.is_empty() && self.is_attribute_word(tok)
        })
    }
}

/// Script-aware containment check for one keyword.
///
/// ASCII keywords require non-alphanumeric characters (or string ends) on
/// both sides of the hit; non-Latin keywords match anywhere.
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    first_keyword_span(text, keyword).is_some()
}

/// Byte span of the first boundary-respecting occurrence, if any.
pub fn first_keyword_span(text: &str, keyword: &str) -> Option<Range<usize>> {
    if keyword.is_empty() {
        return None;
    }
    let latin = keyword.is_ascii();
    for (start, _) in text.match_indices(keyword) {
        let end = start + keyword.len();
        if !latin || boundary_ok(text, start, end) {
            return Some(start..end);
        }
    }
    None
}

fn boundary_ok(text: &str, start: usize, end: usize) -> bool {
    let before_ok = text[..start]
        .chars()
        .next_back()
        .is_none_or(|c| !c.is_alphanumeric());
    let after_ok = text[end..]
        .chars()
        .next()
        .is_none_or(|c| !c.is_alphanumeric());
    before_ok && after_ok
}

/// Match every entry of a longest-first table against the text, masking out
/// spans already claimed so an entry never fires inside a longer match.
fn match_table<T: Copy>(text: &str, table: &[(&'static str, T)]) -> Vec<(T, Range<usize>)> {
    let mut hits: Vec<(T, Range<usize>)> = Vec::new();
    for (keyword, value) in table {
        let latin = keyword.is_ascii();
        for (start, _) in text.match_indices(keyword) {
            let end = start + keyword.len();
            if latin && !boundary_ok(text, start, end) {
                continue;
            }
            if hits.iter().any(|(_, r)| r.start < end && start < r.end) {
                continue;
            }
            hits.push((*value, start..end));
        }
    }
    hits.sort_by_key(|(_, r)| r.start);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin_keywords_respect_word_boundaries() {
        let lex = Lexicon::global();
        // "sa" style partial-word hits must not fire; "desa" is a place word.
        assert!(!contains_keyword("taman desa", "sa"));
        assert!(contains_keyword("rumah sewa desa", "sewa"));
        // "house" must not fire inside "townhouse"
        assert_eq!(lex.match_kinds("townhouse for sale"), vec![PropertyKind::Townhouse]);
    }

    #[test]
    fn phrase_entries_mask_their_words() {
        let lex = Lexicon::global();
        assert_eq!(lex.match_kinds("terrace house in klang"), vec![PropertyKind::Townhouse]);
        assert_eq!(
            lex.match_kinds("shop lot near pasar"),
            vec![PropertyKind::ShopLot]
        );
    }

    #[test]
    fn non_latin_keywords_match_by_containment() {
        let lex = Lexicon::global();
        assert_eq!(lex.match_kinds("3室公寓 klcc附近"), vec![PropertyKind::Apartment]);
        assert_eq!(lex.match_intent("出租房屋"), Some(ListingIntent::Rent));
        assert_eq!(lex.match_kinds("出租房屋"), vec![PropertyKind::House]);
        assert_eq!(lex.match_kinds("வீடு வாடகை"), vec![PropertyKind::House]);
        assert_eq!(lex.match_intent("வீடு வாடகை"), Some(ListingIntent::Rent));
    }

    #[test]
    fn malay_vocabulary_covers_core_concepts() {
        let lex = Lexicon::global();
        assert_eq!(lex.match_kinds("kondo 3 bilik dekat klcc"), vec![PropertyKind::Condominium]);
        assert!(lex.near_signal("kondo 3 bilik dekat klcc"));
        assert!(lex.cheap_signal("rumah murah dekat sunway"));
        assert_eq!(lex.match_kinds("rumah murah dekat sunway"), vec![PropertyKind::House]);
    }

    #[test]
    fn multiple_kinds_collect_into_a_set() {
        let lex = Lexicon::global();
        let kinds = lex.match_kinds("apartment or condo near lrt");
        assert!(kinds.contains(&PropertyKind::Apartment));
        assert!(kinds.contains(&PropertyKind::Condominium));
        assert_eq!(kinds.len(), 2);
    }

    #[test]
    fn attribute_words_cover_kind_and_amenity_vocabulary() {
        let lex = Lexicon::global();
        assert!(lex.is_attribute_word("roi"));
        assert!(lex.is_attribute_word("shop"));
        assert!(lex.is_attribute_word("pool"));
        assert!(!lex.is_attribute_word("kiara"));
        assert!(lex.contains_attribute_word("cheap roi corner"));
        assert!(!lex.contains_attribute_word("mont kiara"));
    }

    #[test]
    fn transit_and_condition_signals() {
        let lex = Lexicon::global();
        assert_eq!(lex.match_transit("condo near mrt surian"), vec![TransportKind::Mrt]);
        assert_eq!(
            lex.match_condition("newly built condo"),
            Some(PropertyCondition::New)
        );
        assert_eq!(
            lex.match_lot_position("corner lot house"),
            Some(LotPosition::Corner)
        );
        assert!(lex.minimum_phrasing("at least 3 bedrooms"));
    }
}
