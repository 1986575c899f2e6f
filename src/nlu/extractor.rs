//! # Heuristic Keyword and Entity Extractor
//!
//! [`HeuristicExtractor`] is the default [`KeywordExtractor`]. It plays the
//! role of a small tagger with plain string rules:
//!
//! | Output | Rule |
//! |--------|------|
//! | keywords | word tokens longer than 2 chars, stopwords removed, plurals folded, top 5 by frequency |
//! | entities | gazetteer places (multi-word allowed), then capitalised words not at sentence start |
//!
//! Ties in keyword frequency keep the order of first appearance, so the
//! output is fully deterministic.

use std::collections::HashMap;
use std::collections::HashSet;

use regex::Regex;

use super::{Extraction, KeywordExtractor};

/// English function words that never count as keywords.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "to", "of", "in", "on", "for", "with", "at",
    "by", "from", "into", "about", "as", "is", "are", "was", "were", "be", "been", "am", "do",
    "does", "did", "done", "have", "has", "had", "i", "me", "my", "mine", "we", "our", "us",
    "you", "your", "yours", "he", "she", "it", "its", "they", "them", "their", "this", "that",
    "these", "those", "there", "here", "what", "which", "who", "whom", "why", "how", "when",
    "where", "can", "could", "would", "should", "will", "shall", "may", "might", "must", "not",
    "any", "some", "all", "just", "very", "too", "also", "please", "thanks", "thank", "hello",
    "want", "like", "get", "got", "need", "much", "many", "more", "most", "than", "then",
    "now", "yes", "no", "okay", "hey",
];

/// Place names recognised as entities, lowercase.
const PLACES: &[&str] = &[
    "port harcourt", "united kingdom", "united states", "lagos", "abuja", "nigeria", "ibadan",
    "kano", "enugu", "accra", "ghana", "london", "canada",
];

/// Maximum number of keywords returned.
const MAX_KEYWORDS: usize = 5;

/// `true` when `word` (lowercase) is an English stopword.
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Folds simple English plurals: `bundles` → `bundle`, `accessories` → `accessory`.
///
/// Words ending in `ss` or `us` (`dress`, `status`) are left alone.
pub fn fold_plural(word: &str) -> String {
    if word.len() > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Content terms of a free-text query: lowercase, plural-folded, no stopwords,
/// at least three characters, deduplicated in order of appearance.
pub fn content_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2 && !is_stopword(w))
        .map(fold_plural)
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Default rule-based [`KeywordExtractor`].
pub struct HeuristicExtractor {
    /// Word tokens (letters, digits, underscore).
    word_re: Regex,
    /// Capitalised words of three or more letters.
    capitalized_re: Regex,
    /// One word-bounded pattern per gazetteer entry.
    places: Vec<(&'static str, Regex)>,
}

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self {
            word_re: Regex::new(r"\w+").unwrap(),
            capitalized_re: Regex::new(r"\b[A-Z][a-z]{2,}\b").unwrap(),
            places: PLACES
                .iter()
                .map(|place| (*place, Regex::new(&format!(r"(?i)\b{}\b", regex::escape(place))).unwrap()))
                .collect(),
        }
    }

    fn keywords(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        for (position, token) in self.word_re.find_iter(&lower).enumerate() {
            let word = token.as_str();
            if word.chars().count() <= 2 || is_stopword(word) {
                continue;
            }
            let entry = counts.entry(fold_plural(word)).or_insert((0, position));
            entry.0 += 1;
        }

        let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
        // frequency desc, first appearance asc
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
        ranked.into_iter().take(MAX_KEYWORDS).map(|(word, _)| word).collect()
    }

    fn entities(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();

        // ─── 1. Gazetteer places ─────────────────────────────────
        for (place, re) in &self.places {
            if re.is_match(text) && seen.insert(place.to_string()) {
                entities.push(place.to_string());
            }
        }

        // ─── 2. Capitalised words away from sentence starts ──────
        for m in self.capitalized_re.find_iter(text) {
            if starts_sentence(text, m.start()) {
                continue;
            }
            let lower = m.as_str().to_lowercase();
            if is_stopword(&lower) || entities.iter().any(|e| e.contains(&lower)) {
                continue;
            }
            if seen.insert(lower.clone()) {
                entities.push(lower);
            }
        }

        entities
    }
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordExtractor for HeuristicExtractor {
    fn extract(&self, text: &str) -> Extraction {
        if text.trim().is_empty() {
            return Extraction::default();
        }
        Extraction {
            keywords: self.keywords(text),
            entities: self.entities(text),
        }
    }
}

/// `true` when the byte offset `at` begins a sentence.
fn starts_sentence(text: &str, at: usize) -> bool {
    match text[..at].trim_end().chars().last() {
        None => true,
        Some(c) => matches!(c, '.' | '!' | '?'),
    }
}
