//! # Orchestrator — One Chat Turn
//!
//! The [`Orchestrator`] turns `(session_id?, message)` into a reply and an
//! updated session. It owns no state of its own: everything lives in the
//! [`ChatStore`], so one instance serves every session.
//!
//! ## Turn Pipeline
//!
//! ```text
//! message
//!   │
//!   ├── normalize; empty → friendly prompt
//!   ├── resolve session (unknown/invalid id → new session)
//!   ├── try_begin_turn ──── already in flight → Busy (nothing written)
//!   │     └── InFlightGuard clears the flag on every exit path
//!   │
//!   ├── stale? → reset memory and handoff flag
//!   ├── persist user message
//!   ├── extract keywords/entities, classify intent
//!   │
//!   ├── 1. session already handed to a human → "connecting you"
//!   ├── 2. lead-capture dialogue (consent → contact → lead)
//!   ├── 3. product_search / order_tracking collaborators
//!   ├── 4. FAQ matcher (static + dynamic)
//!   └── 5. fallback: continuity → small talk → unsure + UnansweredQuery
//!   │
//!   ├── strip markup from the reply
//!   ├── persist bot message
//!   └── record turn in memory (history capped at 5), save session
//! ```
//!
//! Store failures anywhere in the pipeline become
//! [`TurnOutcome::Unavailable`]; the web layer renders it as an apology.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::{ChatStore, NewUnansweredQuery, Sender, Session, SessionId, StoreError, Topic};
use crate::dialogue::LeadCapture;
use crate::faq::FaqMatcher;
use crate::markup::strip_tags;
use crate::nlu::extractor::HeuristicExtractor;
use crate::nlu::intent::{Intent, IntentClassifier};
use crate::nlu::{normalize, small_talk, KeywordExtractor};
use crate::services::{
    search_products, track_order, LeadNotifier, OrderCard, OrderDirectory, ProductCard, ProductCatalog,
};

pub const EMPTY_PROMPT: &str = "Say something, beautiful 💬";
pub const BUSY_REPLY: &str = "⏳ Hold on a second — I'm still processing your last message!";
pub const UNAVAILABLE_REPLY: &str = "Sorry 😔 I couldn’t process that just now. Please try again in a moment.";

const ALREADY_CONNECTED: &str = "You're already being connected to a human representative 👩🏽‍💻";
const UNSURE: &str = "Hmm 🤔 I’m not sure about that yet.\nWould you like me to connect you with a human from support?";
const MORE_PRODUCTS: &str = "Looking for more similar items? 👗 I can show related products!";
const ORDER_FOLLOW_UP: &str = "No worries 😊 could you share your order number again so I can recheck?";
const SHIPPING_DURATION: &str = "Our shipping usually takes 2–5 working days, depending on location 🚚";
const RETURN_STEPS: &str = "To return an item, just head to your orders page and click 'Request Return' 🔄";

const PRODUCT_FOLLOW_UPS: &[&str] = &["yes", "more", "show", "those", "similar"];
const ORDER_FOLLOW_UPS: &[&str] = &["yes", "still", "update", "where", "arrived"];

/// Knobs the orchestrator takes from configuration.
#[derive(Clone, Debug)]
pub struct OrchestratorSettings {
    /// Idle time after which a session starts over.
    pub session_timeout: chrono::Duration,
    /// Source tag for leads.
    pub lead_source: String,
    /// Link sent along with replies that need a human.
    pub handoff_url: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            session_timeout: chrono::Duration::minutes(30),
            lead_source: "chat-widget".to_string(),
            handoff_url: "/contact/".to_string(),
        }
    }
}

/// A completed turn, serialised as the chat endpoint's response body.
#[derive(Clone, Debug, Serialize)]
pub struct ChatReply {
    pub session_id: SessionId,
    pub reply: String,
    pub products: Vec<ProductCard>,
    pub order: Option<OrderCard>,
    pub requires_human: bool,
    pub handoff_url: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub intent: Intent,
}

/// Result of [`Orchestrator::handle`].
#[derive(Clone, Debug)]
pub enum TurnOutcome {
    Answered(ChatReply),
    /// Blank message; nothing was stored.
    Empty,
    /// Another turn for this session is still running.
    Busy { session_id: SessionId },
    /// Storage failed; the visitor should retry.
    Unavailable,
}

/// Handler output before sanitising and persistence.
struct Turn {
    text: String,
    requires_human: bool,
    topic: Topic,
    products: Vec<ProductCard>,
    order: Option<OrderCard>,
}

impl Turn {
    fn say(text: impl Into<String>, topic: Topic) -> Self {
        Self {
            text: text.into(),
            requires_human: false,
            topic,
            products: Vec::new(),
            order: None,
        }
    }
}

/// Clears the in-flight flag when dropped.
struct InFlightGuard<'a> {
    store: &'a dyn ChatStore,
    session_id: SessionId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.store.end_turn(self.session_id) {
            tracing::error!(session_id = %self.session_id, error = %e, "failed to clear in-flight flag");
        }
    }
}

pub struct Orchestrator {
    store: Arc<dyn ChatStore>,
    extractor: Arc<dyn KeywordExtractor>,
    classifier: IntentClassifier,
    faqs: FaqMatcher,
    catalog: Arc<dyn ProductCatalog>,
    orders: Arc<dyn OrderDirectory>,
    leads: LeadCapture,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ChatStore>,
        faqs: FaqMatcher,
        catalog: Arc<dyn ProductCatalog>,
        orders: Arc<dyn OrderDirectory>,
        notifier: Arc<dyn LeadNotifier>,
        settings: OrchestratorSettings,
    ) -> Self {
        let extractor: Arc<dyn KeywordExtractor> = Arc::new(HeuristicExtractor::new());
        Self {
            leads: LeadCapture::new(store.clone(), notifier, settings.lead_source.clone()),
            classifier: IntentClassifier::with_extractor(extractor.clone()),
            extractor,
            store,
            faqs,
            catalog,
            orders,
            settings,
        }
    }

    /// Swaps the keyword/entity extractor used for classification.
    pub fn with_extractor(mut self, extractor: Arc<dyn KeywordExtractor>) -> Self {
        self.classifier = IntentClassifier::with_extractor(extractor.clone());
        self.extractor = extractor;
        self
    }

    pub fn faqs(&self) -> &FaqMatcher {
        &self.faqs
    }

    /// Handles one incoming message. Never panics on store errors.
    pub fn handle(&self, session_id: Option<&str>, message: &str) -> TurnOutcome {
        let message = normalize(message);
        if message.is_empty() {
            return TurnOutcome::Empty;
        }

        let session = match self.resolve_session(session_id) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "could not load or create session");
                return TurnOutcome::Unavailable;
            }
        };

        match self.store.try_begin_turn(session.id) {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(session_id = %session.id, "turn rejected, previous message still in flight");
                return TurnOutcome::Busy { session_id: session.id };
            }
            Err(e) => {
                tracing::error!(session_id = %session.id, error = %e, "could not claim session");
                return TurnOutcome::Unavailable;
            }
        }
        let _guard = InFlightGuard {
            store: self.store.as_ref(),
            session_id: session.id,
        };

        match self.run_turn(session.id, &message) {
            Ok(reply) => TurnOutcome::Answered(reply),
            Err(e) => {
                tracing::error!(session_id = %session.id, error = %e, "turn failed");
                TurnOutcome::Unavailable
            }
        }
    }

    fn resolve_session(&self, session_id: Option<&str>) -> Result<Session, StoreError> {
        if let Some(id) = session_id.and_then(|raw| raw.trim().parse::<SessionId>().ok()) {
            if let Some(session) = self.store.session(id)? {
                return Ok(session);
            }
        }
        let session = self.store.create_session()?;
        tracing::info!(session_id = %session.id, "new chat session");
        Ok(session)
    }

    fn run_turn(&self, id: SessionId, message: &str) -> Result<ChatReply, StoreError> {
        let now = Utc::now();
        let mut session = self.store.session(id)?.ok_or(StoreError::SessionNotFound(id))?;

        if session.is_stale(now, self.settings.session_timeout) {
            tracing::info!(session_id = %id, "resetting stale session");
            session.reset();
        }

        self.store.append_message(id, Sender::User, message)?;

        let extraction = self.extractor.extract(message);
        let intent = self.classifier.classify_with(message, &extraction);
        tracing::info!(
            session_id = %id,
            intent = intent.as_str(),
            keywords = ?extraction.keywords,
            entities = ?extraction.entities,
            "classified message"
        );

        let turn = self.respond(&mut session, intent, message);
        let reply = strip_tags(&turn.text).trim().to_string();

        if let Err(e) = self.store.append_message(id, Sender::Bot, &reply) {
            tracing::warn!(session_id = %id, error = %e, "failed to persist bot message");
        }

        session.memory.record_turn(message, &reply, intent, turn.topic);
        session.last_active = now;
        self.store.save_session(&session)?;

        Ok(ChatReply {
            session_id: id,
            reply,
            products: turn.products,
            order: turn.order,
            requires_human: turn.requires_human,
            handoff_url: turn.requires_human.then(|| self.settings.handoff_url.clone()),
            timestamp: Utc::now(),
            intent,
        })
    }

    /// Picks the handler for this turn, in priority order.
    fn respond(&self, session: &mut Session, intent: Intent, message: &str) -> Turn {
        let topic = session.memory.topic;

        if session.requires_human {
            return Turn {
                requires_human: true,
                ..Turn::say(ALREADY_CONNECTED, topic)
            };
        }

        if let Some(reply) = self.leads.advance(session, intent, message) {
            return Turn {
                requires_human: reply.requires_human,
                ..Turn::say(reply.text, topic)
            };
        }

        match intent {
            Intent::ProductSearch => {
                let found = search_products(self.catalog.as_ref(), message);
                return Turn {
                    products: found.products,
                    ..Turn::say(found.message, Topic::Shopping)
                };
            }
            Intent::OrderTracking => {
                let lookup = track_order(self.orders.as_ref(), message);
                return Turn {
                    order: lookup.order,
                    ..Turn::say(lookup.message, Topic::Orders)
                };
            }
            _ => {}
        }

        if let Some(answer) = self.faqs.answer(message) {
            let topic = match intent {
                Intent::FaqShipping => Topic::Shipping,
                Intent::FaqReturn => Topic::Returns,
                _ => Topic::Faq,
            };
            return Turn::say(answer, topic);
        }

        self.fallback(session, intent, message)
    }

    fn fallback(&self, session: &Session, intent: Intent, message: &str) -> Turn {
        let lower = message.to_lowercase();
        let words: HashSet<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let any_word = |set: &[&str]| set.iter().any(|w| words.contains(w));
        let memory = &session.memory;

        // ─── Context continuity ──────────────────────────────────
        match memory.last_intent {
            Some(Intent::ProductSearch) if any_word(PRODUCT_FOLLOW_UPS) => {
                return Turn::say(MORE_PRODUCTS, Topic::Shopping);
            }
            Some(Intent::OrderTracking) if any_word(ORDER_FOLLOW_UPS) => {
                return Turn::say(ORDER_FOLLOW_UP, Topic::Orders);
            }
            _ => {}
        }

        // ─── Topic continuity ────────────────────────────────────
        if memory.topic == Topic::Shipping && lower.contains("how long") {
            return Turn::say(SHIPPING_DURATION, Topic::Shipping);
        }
        if memory.topic == Topic::Returns && words.contains("how") {
            return Turn::say(RETURN_STEPS, Topic::Returns);
        }

        // ─── Small talk ──────────────────────────────────────────
        if let Some(reply) = small_talk::reply(message) {
            return Turn::say(reply, Topic::General);
        }

        // ─── Unsure: hand off ────────────────────────────────────
        let record = NewUnansweredQuery {
            session_id: session.id,
            message: message.to_string(),
            detected_intent: intent,
            context: memory.clone(),
            requires_human: true,
        };
        match self.store.record_unanswered(record) {
            Ok(q) => tracing::info!(session_id = %session.id, query_id = q.id, "unanswered query recorded"),
            Err(e) => tracing::error!(session_id = %session.id, error = %e, "failed to record unanswered query"),
        }
        Turn {
            requires_human: true,
            ..Turn::say(UNSURE, Topic::General)
        }
    }
}
