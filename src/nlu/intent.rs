//! # Intent Classifier
//!
//! Maps a message to one of a fixed set of [`Intent`] labels.
//!
//! ## Two Tiers
//!
//! ```text
//! message (lowercased)
//!   ├── 1. Ordered phrase rules, first match wins
//!   │     shipping → return → product → tracking → help → contact
//!   └── 2. Extraction tier (keywords / entities)
//!         order keywords → product keywords → place entities → help keywords
//!         → Fallback
//! ```
//!
//! Rule order matters: "I want to return and track my order" is a
//! [`Intent::FaqReturn`] because the return rule is checked before the
//! tracking rule.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::extractor::HeuristicExtractor;
use super::{Extraction, KeywordExtractor};

/// Coarse classification of a user message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Nothing recognised.
    Fallback,
    /// Shipping and delivery questions.
    FaqShipping,
    /// Returns, refunds and exchanges.
    FaqReturn,
    /// The visitor is looking for products.
    ProductSearch,
    /// The visitor wants the status of an order.
    OrderTracking,
    /// The visitor is stuck and may need a human.
    NeedsHelp,
    /// Explicit request to talk to someone.
    Contact,
    /// A question about a specific place.
    LocationQuery,
}

impl Intent {
    /// Wire label, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Fallback => "fallback",
            Intent::FaqShipping => "faq_shipping",
            Intent::FaqReturn => "faq_return",
            Intent::ProductSearch => "product_search",
            Intent::OrderTracking => "order_tracking",
            Intent::NeedsHelp => "needs_help",
            Intent::Contact => "contact",
            Intent::LocationQuery => "location_query",
        }
    }
}

/// Phrase rules in evaluation order.
const RULES: &[(Intent, &[&str])] = &[
    (Intent::FaqShipping, &["shipping", "delivery", "ship", "courier"]),
    (Intent::FaqReturn, &["return", "refund", "exchange"]),
    (
        Intent::ProductSearch,
        &["buy", "show", "price", "wig", "lace", "extensions", "shop"],
    ),
    (
        Intent::OrderTracking,
        &["track", "order status", "where is my order", "track my order"],
    ),
    (
        Intent::NeedsHelp,
        &["help", "not working", "problem", "stuck", "assist", "issue", "can't", "cannot", "error"],
    ),
    (
        Intent::Contact,
        &["contact", "agent", "representative", "talk to", "support"],
    ),
];

const ORDER_KEYWORDS: &[&str] = &["track", "order", "status"];
const PRODUCT_KEYWORDS: &[&str] = &["buy", "show", "wig", "frontal", "bundle", "curly"];
const HELP_KEYWORDS: &[&str] = &["problem", "help", "assist", "issue", "fix"];
/// Place entities that make a message a [`Intent::LocationQuery`].
const LOCATION_ENTITIES: &[&str] = &["lagos", "abuja", "nigeria"];

/// Deterministic rule-based intent classifier.
pub struct IntentClassifier {
    extractor: Arc<dyn KeywordExtractor>,
}

impl IntentClassifier {
    /// Classifier backed by the default [`HeuristicExtractor`].
    pub fn new() -> Self {
        Self::with_extractor(Arc::new(HeuristicExtractor::new()))
    }

    pub fn with_extractor(extractor: Arc<dyn KeywordExtractor>) -> Self {
        Self { extractor }
    }

    /// Classifies `message`, running the extractor on the text as typed.
    pub fn classify(&self, message: &str) -> Intent {
        if message.trim().is_empty() {
            return Intent::Fallback;
        }
        self.classify_with(message, &self.extractor.extract(message))
    }

    /// Classifies `message` with an extraction the caller already computed.
    pub fn classify_with(&self, message: &str, extraction: &Extraction) -> Intent {
        if message.trim().is_empty() {
            return Intent::Fallback;
        }
        match_rules(&message.to_lowercase()).unwrap_or_else(|| from_extraction(extraction))
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn match_rules(lower: &str) -> Option<Intent> {
    RULES
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|p| lower.contains(p)))
        .map(|(intent, _)| *intent)
}

fn from_extraction(extraction: &Extraction) -> Intent {
    let has_keyword = |set: &[&str]| extraction.keywords.iter().any(|k| set.contains(&k.as_str()));

    if has_keyword(ORDER_KEYWORDS) {
        return Intent::OrderTracking;
    }
    if has_keyword(PRODUCT_KEYWORDS) {
        return Intent::ProductSearch;
    }
    if extraction
        .entities
        .iter()
        .any(|e| LOCATION_ENTITIES.contains(&e.to_lowercase().as_str()))
    {
        return Intent::LocationQuery;
    }
    if has_keyword(HELP_KEYWORDS) {
        return Intent::NeedsHelp;
    }
    Intent::Fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Intent {
        IntentClassifier::new().classify(text)
    }

    // ─── Phrase rules ────────────────────────────────────────────

    #[test]
    fn shipping_questions() {
        assert_eq!(classify("Do you ship internationally?"), Intent::FaqShipping);
        assert_eq!(classify("which courier do you use"), Intent::FaqShipping);
    }

    #[test]
    fn return_rule_precedes_tracking_rule() {
        assert_eq!(classify("I want to return and track my order"), Intent::FaqReturn);
    }

    #[test]
    fn product_and_tracking_rules() {
        assert_eq!(classify("what's the price of this bob"), Intent::ProductSearch);
        assert_eq!(classify("where is my order?"), Intent::OrderTracking);
    }

    #[test]
    fn help_and_contact_rules() {
        assert_eq!(classify("I have a problem, please help"), Intent::NeedsHelp);
        assert_eq!(classify("I can't log in"), Intent::NeedsHelp);
        assert_eq!(classify("let me talk to a representative"), Intent::Contact);
    }

    // ─── Extraction tier ─────────────────────────────────────────

    #[test]
    fn order_keyword_without_phrase() {
        assert_eq!(classify("order 5521 please"), Intent::OrderTracking);
    }

    #[test]
    fn product_keyword_without_phrase() {
        assert_eq!(classify("any curly bundles left?"), Intent::ProductSearch);
    }

    #[test]
    fn location_entity() {
        assert_eq!(classify("any stores in lagos?"), Intent::LocationQuery);
    }

    #[test]
    fn help_keyword_without_phrase() {
        assert_eq!(classify("can you fix my account"), Intent::NeedsHelp);
    }

    #[test]
    fn unknown_and_empty_fall_back() {
        assert_eq!(classify("banana smoothie recipe"), Intent::Fallback);
        assert_eq!(classify(""), Intent::Fallback);
        assert_eq!(classify("   "), Intent::Fallback);
    }

    #[test]
    fn extractor_sees_original_casing() {
        struct Recording(parking_lot::Mutex<Vec<String>>);

        impl KeywordExtractor for Recording {
            fn extract(&self, text: &str) -> Extraction {
                self.0.lock().push(text.to_string());
                Extraction {
                    keywords: Vec::new(),
                    entities: vec!["Abuja".to_string()],
                }
            }
        }

        let recording = Arc::new(Recording(parking_lot::Mutex::new(Vec::new())));
        let classifier = IntentClassifier::with_extractor(recording.clone());
        assert_eq!(classifier.classify("Anything in Abuja?"), Intent::LocationQuery);
        assert_eq!(*recording.0.lock(), ["Anything in Abuja?"]);
    }

    #[test]
    fn classify_agrees_with_precomputed_extraction() {
        let classifier = IntentClassifier::new();
        let extractor = HeuristicExtractor::new();
        for text in ["Any stores in Lagos?", "Order 5521 please", "Curly Bundles", "Can you fix my Account"] {
            assert_eq!(classifier.classify(text), classifier.classify_with(text, &extractor.extract(text)));
        }
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = IntentClassifier::new();
        let text = "Show me something nice for Abuja";
        let first = classifier.classify(text);
        for _ in 0..10 {
            assert_eq!(classifier.classify(text), first);
        }
    }

    #[test]
    fn wire_labels_match_serde() {
        for intent in [Intent::FaqShipping, Intent::NeedsHelp, Intent::LocationQuery] {
            let json = serde_json::to_value(intent).unwrap();
            assert_eq!(json, serde_json::json!(intent.as_str()));
        }
    }
}
