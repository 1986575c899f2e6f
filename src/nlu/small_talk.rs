//! Persona replies for greetings, thanks and farewells.
//!
//! Patterns are matched on word boundaries so "this" never reads as "hi".

use std::sync::OnceLock;

use regex::Regex;

const GREETING: &str = "Hey gorgeous ✨ I’m Luchi — your beauty assistant. How can I make your day better?";
const HOW_ARE_YOU: &str = "Feeling fabulous 💅 Ready to glam up your day?";
const WHO_ARE_YOU: &str = "I’m Luchi, your personal beauty assistant 💖 Here to help you shine.";
const THANKS: &str = "You’re very welcome, love 💫 Always happy to help!";
const FAREWELL: &str = "Goodbye for now 💕 Come back soon for more glam inspo!";

struct Patterns {
    greeting: Regex,
    thanks: Regex,
    farewell: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        greeting: Regex::new(r"\b(hi|hello|hey|good morning|good evening)\b").unwrap(),
        thanks: Regex::new(r"\b(thank|thanks|appreciate)\b").unwrap(),
        farewell: Regex::new(r"\b(bye|goodbye|see you|talk later)\b").unwrap(),
    })
}

/// Returns a persona reply when `text` is small talk.
pub fn reply(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let p = patterns();

    if p.greeting.is_match(&lower) {
        return Some(GREETING);
    }
    if lower.contains("how are you") {
        return Some(HOW_ARE_YOU);
    }
    if lower.contains("who are you") {
        return Some(WHO_ARE_YOU);
    }
    if p.thanks.is_match(&lower) {
        return Some(THANKS);
    }
    if p.farewell.is_match(&lower) {
        return Some(FAREWELL);
    }
    None
}
