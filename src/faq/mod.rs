//! # FAQ Matcher
//!
//! Answers common questions from two tables: a static one compiled into the
//! binary and an optional dynamic one scraped from the shop's FAQ page
//! ([`source`]) and cached with a TTL ([`cache`]).
//!
//! ## Three Tiers per Table
//!
//! ```text
//! query (lowercased, trimmed)
//!   ├── 1. Substring   a known question occurs inside the query
//!   ├── 2. Keyword     a content word of a question is a word of the query
//!   └── 3. Fuzzy       best similarity ≥ threshold (default 0.6)
//! ```
//!
//! The first hit wins within a table. When both tables produce an answer,
//! the one whose questions score higher against the query wins; ties go to
//! the dynamic table, which reflects the live page.
//!
//! Keyword overlap only looks at content words (three letters or more, no
//! stopwords). Matching "you" or "i" would make every message an FAQ hit.

pub mod cache;
pub mod source;

use std::collections::HashSet;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use similar::TextDiff;

use crate::nlu::extractor::is_stopword;
pub use cache::DynamicFaqs;
pub use source::{FaqFetchError, FaqSource, HttpFaqSource};

/// Default fuzzy-match threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// One question/answer pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

impl FaqEntry {
    pub fn new(question: &str, answer: &str) -> Self {
        Self {
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }
}

/// Built-in FAQ table, initialised on first use.
pub fn static_faqs() -> &'static [FaqEntry] {
    static FAQS: OnceLock<Vec<FaqEntry>> = OnceLock::new();
    FAQS.get_or_init(|| {
        [
            (
                "do you ship internationally",
                "Yes, we ship worldwide 🌍! Delivery times depend on your location.",
            ),
            (
                "how long does delivery take",
                "Orders typically take 3–7 business days within Nigeria 🇳🇬 and 7–14 days internationally.",
            ),
            (
                "can i return a product",
                "Absolutely! You can return items within 7 days of delivery if unused and in original packaging.",
            ),
            (
                "do you offer wig customization",
                "Yes 💇🏾‍♀️ — we offer color, cut, and fit customization on most wigs.",
            ),
            (
                "how can i track my order",
                "You can track your order using your order ID on our tracking page.",
            ),
            (
                "what payment methods do you accept",
                "We accept debit cards, bank transfers, and PayPal (for international orders).",
            ),
            (
                "how can i contact customer service",
                "You can reach us via the Contact page or by replying here 💬 — I’ll connect you!",
            ),
        ]
        .iter()
        .map(|(q, a)| FaqEntry::new(q, a))
        .collect()
    })
}

/// Which tier produced a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchTier {
    Substring,
    Keyword,
    Fuzzy,
}

/// A matched answer and how it was found.
#[derive(Clone, Debug, PartialEq)]
pub struct FaqMatch {
    pub question: String,
    pub answer: String,
    pub tier: MatchTier,
    /// Best similarity between the query and any question of the table.
    pub score: f64,
}

/// Sequence-matching ratio in `[0, 1]`: twice the matched characters over
/// the combined length. 1.0 means identical strings.
///
/// Unlike edit distance this does not punish length differences much, so
/// "wigs customisations?" still lands near "do you offer wig customization".
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Runs the three tiers over one table.
pub fn match_entries(entries: &[FaqEntry], query: &str, threshold: f64) -> Option<FaqMatch> {
    let text = query.trim().to_lowercase();
    if text.is_empty() || entries.is_empty() {
        return None;
    }
    let questions: Vec<String> = entries.iter().map(|e| e.question.trim().to_lowercase()).collect();
    let scores: Vec<f64> = questions.iter().map(|q| similarity(&text, q)).collect();
    let table_score = scores.iter().copied().fold(0.0, f64::max);

    let hit = |index: usize, tier: MatchTier| FaqMatch {
        question: entries[index].question.clone(),
        answer: entries[index].answer.clone(),
        tier,
        score: table_score,
    };

    // ─── 1. Substring ────────────────────────────────────────────
    if let Some(i) = questions.iter().position(|q| !q.is_empty() && text.contains(q.as_str())) {
        return Some(hit(i, MatchTier::Substring));
    }

    // ─── 2. Keyword overlap ──────────────────────────────────────
    let words: HashSet<&str> = text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
    if let Some(i) = questions.iter().position(|q| {
        q.split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !is_stopword(w))
            .any(|w| words.contains(w))
    }) {
        return Some(hit(i, MatchTier::Keyword));
    }

    // ─── 3. Fuzzy ────────────────────────────────────────────────
    let (best, best_score) = scores
        .iter()
        .enumerate()
        .fold((0, 0.0), |acc, (i, s)| if *s > acc.1 { (i, *s) } else { acc });
    (best_score >= threshold && best_score > 0.0).then(|| hit(best, MatchTier::Fuzzy))
}

/// FAQ lookup over the static table and an optional dynamic one.
pub struct FaqMatcher {
    threshold: f64,
    fixed: Vec<FaqEntry>,
    dynamic: Option<DynamicFaqs>,
}

impl FaqMatcher {
    /// Matcher over the built-in table only.
    pub fn new(threshold: f64) -> Self {
        Self::with_entries(static_faqs().to_vec(), threshold)
    }

    /// Matcher over a custom static table.
    pub fn with_entries(entries: Vec<FaqEntry>, threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            fixed: entries,
            dynamic: None,
        }
    }

    /// Adds a remotely sourced table.
    pub fn with_dynamic(mut self, dynamic: DynamicFaqs) -> Self {
        self.dynamic = Some(dynamic);
        self
    }

    /// Fetches the dynamic table now so the first visitor does not wait.
    pub fn warm_up(&self) -> usize {
        self.dynamic.as_ref().map(|d| d.entries().len()).unwrap_or(0)
    }

    /// Best answer for `query`, if any.
    pub fn answer(&self, query: &str) -> Option<String> {
        self.best_match(query).map(|m| m.answer)
    }

    /// Best match across both tables, with its provenance.
    pub fn best_match(&self, query: &str) -> Option<FaqMatch> {
        let fixed = match_entries(&self.fixed, query, self.threshold);
        let dynamic = self
            .dynamic
            .as_ref()
            .and_then(|d| match_entries(&d.entries(), query, self.threshold));

        match (fixed, dynamic) {
            (Some(f), Some(d)) => Some(if d.score >= f.score { d } else { f }),
            (f, d) => d.or(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn matcher() -> FaqMatcher {
        FaqMatcher::new(DEFAULT_THRESHOLD)
    }

    struct FixedSource(Vec<FaqEntry>, Arc<AtomicUsize>);

    impl FaqSource for FixedSource {
        fn fetch(&self) -> Result<Vec<FaqEntry>, FaqFetchError> {
            self.1.fetch_add(1, Ordering::SeqCst);
            Ok(self.0.clone())
        }
    }

    struct DownSource;

    impl FaqSource for DownSource {
        fn fetch(&self) -> Result<Vec<FaqEntry>, FaqFetchError> {
            Err(FaqFetchError::Parse("no accordion on page".into()))
        }
    }

    fn dynamic(entries: Vec<FaqEntry>) -> DynamicFaqs {
        DynamicFaqs::new(
            Box::new(FixedSource(entries, Arc::new(AtomicUsize::new(0)))),
            Duration::from_secs(3600),
        )
    }

    // ─── Single table ────────────────────────────────────────────

    #[test]
    fn every_known_question_matches_itself() {
        let m = matcher();
        for entry in static_faqs() {
            assert_eq!(m.answer(&entry.question.to_uppercase()).as_deref(), Some(entry.answer.as_str()));
        }
    }

    #[test]
    fn substring_tier() {
        let hit = match_entries(static_faqs(), "Hello, do you ship internationally?", 0.6).unwrap();
        assert_eq!(hit.tier, MatchTier::Substring);
        assert!(hit.answer.contains("worldwide"));
    }

    #[test]
    fn keyword_tier_uses_content_words_only() {
        let hit = match_entries(static_faqs(), "which payment options", 0.6).unwrap();
        assert_eq!(hit.tier, MatchTier::Keyword);
        assert_eq!(hit.question, "what payment methods do you accept");

        // only stopwords in common with the table
        assert!(match_entries(static_faqs(), "how are you", 0.6).is_none());
    }

    #[test]
    fn fuzzy_tier_catches_typos() {
        let entries = vec![FaqEntry::new("shipping costs", "Shipping is free over ₦50,000.")];
        let hit = match_entries(&entries, "shiping cost", 0.6).unwrap();
        assert_eq!(hit.tier, MatchTier::Fuzzy);
        assert!(hit.score > 0.8);
    }

    #[test]
    fn fuzzy_tier_tolerates_plurals_and_spelling() {
        assert!(similarity("wigs customisations?", "do you offer wig customization") >= 0.6);

        let hit = match_entries(static_faqs(), "wigs customisations?", 0.6).unwrap();
        assert_eq!(hit.tier, MatchTier::Fuzzy);
        assert_eq!(hit.question, "do you offer wig customization");
    }

    #[test]
    fn similarity_bounds() {
        assert_eq!(similarity("store hours", "store hours"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn below_threshold_is_none() {
        assert!(matcher().answer("banana smoothie recipe").is_none());
        assert!(matcher().answer("hi").is_none());
    }

    #[test]
    fn threshold_is_configurable() {
        let entries = vec![FaqEntry::new("shipping costs", "free")];
        assert!(FaqMatcher::with_entries(entries.clone(), 0.95).answer("shiping cost").is_none());
        assert!(FaqMatcher::with_entries(entries, 0.5).answer("shiping cost").is_some());
    }

    #[test]
    fn empty_query_is_none() {
        assert!(matcher().answer("   ").is_none());
    }

    // ─── Static + dynamic ────────────────────────────────────────

    #[test]
    fn closer_dynamic_question_wins() {
        let m = matcher().with_dynamic(dynamic(vec![FaqEntry::new(
            "do you ship internationally to ghana",
            "Yes, Ghana deliveries take 5 days.",
        )]));
        let answer = m.answer("do you ship internationally to ghana").unwrap();
        assert!(answer.contains("Ghana"));
    }

    #[test]
    fn closer_static_question_wins() {
        let m = matcher().with_dynamic(dynamic(vec![FaqEntry::new(
            "are gift cards refundable",
            "Gift cards are not refundable.",
        )]));
        let answer = m.answer("how long does delivery take").unwrap();
        assert!(answer.contains("business days"));
    }

    #[test]
    fn ties_favour_dynamic_table() {
        let m = FaqMatcher::with_entries(vec![FaqEntry::new("store hours", "static")], 0.6)
            .with_dynamic(dynamic(vec![FaqEntry::new("store hours", "dynamic")]));
        assert_eq!(m.answer("store hours").as_deref(), Some("dynamic"));
    }

    #[test]
    fn dynamic_failure_degrades_to_static() {
        let m = matcher().with_dynamic(DynamicFaqs::new(Box::new(DownSource), Duration::from_secs(60)));
        let answer = m.answer("can i return a product").unwrap();
        assert!(answer.contains("7 days"));
        assert!(m.answer("banana smoothie recipe").is_none());
    }
}
