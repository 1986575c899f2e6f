//! # NLU — Lightweight Language Understanding
//!
//! Everything the assistant knows about a message comes from cheap,
//! deterministic heuristics. No model is loaded.
//!
//! ```text
//! raw message
//!   ├── 1. normalize()          NFC, typographic apostrophes, trim
//!   ├── 2. KeywordExtractor     salient keywords + named entities
//!   └── 3. IntentClassifier     ordered keyword rules, then extraction tier
//! ```
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`extractor`] | [`HeuristicExtractor`](extractor::HeuristicExtractor), stopwords, plural folding |
//! | [`intent`] | [`Intent`](intent::Intent) labels and the rule classifier |
//! | [`small_talk`] | Persona replies for greetings, thanks, farewells |

pub mod extractor;
pub mod intent;
pub mod small_talk;

use unicode_normalization::UnicodeNormalization;

/// Keywords and entities pulled out of a message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Up to five salient keywords, lowercased and plural-folded.
    pub keywords: Vec<String>,
    /// Named entities (known places, capitalised names), lowercased.
    pub entities: Vec<String>,
}

/// Replaceable keyword/entity extraction capability.
///
/// The default implementation is
/// [`HeuristicExtractor`](extractor::HeuristicExtractor); a statistical
/// tagger can be plugged in through
/// [`Orchestrator::with_extractor`](crate::orchestrator::Orchestrator::with_extractor).
pub trait KeywordExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Extraction;
}

/// Canonical form of user input used by every matcher.
///
/// Applies NFC normalisation, folds typographic apostrophes to `'` and
/// trims surrounding whitespace. Case is preserved; matchers lowercase on
/// their own.
pub fn normalize(text: &str) -> String {
    let text: String = text.nfc().collect();
    text.replace(['\u{2019}', '\u{2018}'], "'").trim().to_string()
}
