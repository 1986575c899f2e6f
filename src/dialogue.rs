//! # Lead-Capture Dialogue
//!
//! A small per-session state machine that asks for consent, collects an email
//! or phone number and stores a [`Lead`] for the support team.
//!
//! ```text
//!              needs_help
//!   (none) ─────────────────▶ AwaitingConsent ──── no ─────▶ (none)  declined
//!                               │   │    ▲
//!                          yes  │   │    └── anything else (re-prompt)
//!                               ▼   │
//!                     AwaitingContact   contact given ──▶ save lead ──▶ (none)
//!                        │   ▲                              requires_human
//!                        │   └── no contact found (re-prompt)
//!                        └──── contact given ──────────▶ save lead ──▶ (none)
//! ```
//!
//! Sessions written before the staged flow only carry the `prompt_shown`
//! flag. For those, a bare yes moves to `AwaitingContact` and a bare no
//! clears the flag.
//!
//! A lead is saved at most once per contact and source: an existing lead for
//! the same email (case-insensitive), or the same phone when no email was
//! given, is reused instead of inserting a duplicate.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::core::session::DialogueState;
use crate::core::{ChatStore, DialogueStage, Lead, LeadKey, NewLead, Session};
use crate::nlu::intent::Intent;
use crate::services::LeadNotifier;

const CONSENT_PROMPT: &str = "I can have someone reach out to assist you 😊 — can we do that?";
const CONTACT_PROMPT: &str = "Great — please provide your email or phone number so our team can reach you.";
const DECLINED: &str = "No problem! I won’t store any info. Let me know if you change your mind.";
const CONSENT_REPROMPT: &str = "Would you like us to reach out to help you? (Yes / No)";
const INVALID_CONTACT: &str = "That doesn’t look like a valid email or phone number. Could you re-enter it?";
const STAYING: &str = "Alright! I’ll stay with you then 💪";
const SAVE_FAILED: &str = "Oops — something went wrong saving your contact. Try again in a moment, please.";

const AFFIRMATIVE: &[&str] = &["yes", "yeah", "yep", "sure", "ok", "okay", "please", "please do"];
const NEGATIVE: &[&str] = &["no", "nope", "nah", "not now"];
/// The flag-only flow accepts a narrower vocabulary.
const LEGACY_AFFIRMATIVE: &[&str] = &["yes", "yeah", "yep", "sure", "ok", "okay"];
const LEGACY_NEGATIVE: &[&str] = &["no", "nope", "nah"];

/// Reply produced by a dialogue transition.
#[derive(Clone, Debug, PartialEq)]
pub struct DialogueReply {
    pub text: String,
    pub requires_human: bool,
}

impl DialogueReply {
    fn say(text: &str) -> Self {
        Self {
            text: text.to_string(),
            requires_human: false,
        }
    }
}

/// Email and/or phone found in a message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ContactInfo {
    fn key(&self) -> Option<LeadKey> {
        match (&self.email, &self.phone) {
            (Some(email), _) => Some(LeadKey::Email(email.clone())),
            (None, Some(phone)) => Some(LeadKey::Phone(phone.clone())),
            (None, None) => None,
        }
    }
}

fn email_re() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").unwrap())
}

fn phone_re() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"\+?\d{7,15}").unwrap())
}

/// Finds an email (`local@domain.tld`) and a phone number (optional `+`
/// followed by 7–15 digits once whitespace is removed).
///
/// The email is cut out before the phone search so digits inside an address
/// are never read as a phone number.
pub fn extract_contact(message: &str) -> Option<ContactInfo> {
    let email = email_re().find(message);
    let rest = match email {
        Some(m) => format!("{} {}", &message[..m.start()], &message[m.end()..]),
        None => message.to_string(),
    };
    let compact: String = rest.chars().filter(|c| !c.is_whitespace()).collect();

    let info = ContactInfo {
        email: email.map(|m| m.as_str().trim().to_lowercase()),
        phone: phone_re().find(&compact).map(|m| m.as_str().to_string()),
    };
    (info.email.is_some() || info.phone.is_some()).then_some(info)
}

/// Lowercased answer with surrounding whitespace and trailing punctuation removed.
fn bare_answer(message: &str) -> String {
    message
        .trim()
        .trim_end_matches(['.', '!', '?', ','])
        .trim()
        .to_lowercase()
}

enum SaveOutcome {
    Created(Lead),
    Existing(Lead),
    Failed,
}

/// Drives the dialogue and persists leads.
pub struct LeadCapture {
    store: Arc<dyn ChatStore>,
    notifier: Arc<dyn LeadNotifier>,
    source: String,
}

impl LeadCapture {
    pub fn new(store: Arc<dyn ChatStore>, notifier: Arc<dyn LeadNotifier>, source: impl Into<String>) -> Self {
        Self {
            store,
            notifier,
            source: source.into(),
        }
    }

    /// Runs one transition. `None` means the dialogue has nothing to say and
    /// the caller should try its other handlers.
    pub fn advance(&self, session: &mut Session, intent: Intent, message: &str) -> Option<DialogueReply> {
        let answer = bare_answer(message);
        let answer = answer.as_str();
        let prompt_shown = session.memory.dialogue.prompt_shown;

        match session.memory.dialogue.stage {
            None if intent == Intent::NeedsHelp => {
                let dialogue = &mut session.memory.dialogue;
                dialogue.stage = Some(DialogueStage::AwaitingConsent);
                dialogue.prompt_shown = true;
                dialogue.help_request = Some(message.trim().to_string());
                Some(DialogueReply::say(CONSENT_PROMPT))
            }

            Some(DialogueStage::AwaitingConsent) => {
                if AFFIRMATIVE.contains(&answer) {
                    let dialogue = &mut session.memory.dialogue;
                    dialogue.stage = Some(DialogueStage::AwaitingContact);
                    dialogue.prompt_shown = false;
                    Some(DialogueReply::say(CONTACT_PROMPT))
                } else if NEGATIVE.contains(&answer) {
                    session.memory.dialogue = DialogueState::default();
                    Some(DialogueReply::say(DECLINED))
                } else if let Some(contact) = extract_contact(message) {
                    Some(self.submit(session, &contact, message))
                } else {
                    session.memory.dialogue.prompt_shown = true;
                    Some(DialogueReply::say(CONSENT_REPROMPT))
                }
            }

            Some(DialogueStage::AwaitingContact) => match extract_contact(message) {
                Some(contact) => Some(self.submit(session, &contact, message)),
                None => Some(DialogueReply::say(INVALID_CONTACT)),
            },

            None if prompt_shown && LEGACY_AFFIRMATIVE.contains(&answer) => {
                let dialogue = &mut session.memory.dialogue;
                dialogue.stage = Some(DialogueStage::AwaitingContact);
                dialogue.prompt_shown = false;
                Some(DialogueReply::say(CONTACT_PROMPT))
            }

            None if prompt_shown && LEGACY_NEGATIVE.contains(&answer) => {
                session.memory.dialogue.prompt_shown = false;
                Some(DialogueReply::say(STAYING))
            }

            None => None,
        }
    }

    /// Saves (or reuses) the lead and closes the flow.
    fn submit(&self, session: &mut Session, contact: &ContactInfo, message: &str) -> DialogueReply {
        let request = session
            .memory
            .dialogue
            .help_request
            .clone()
            .unwrap_or_else(|| message.trim().to_string());

        let (text, lead) = match self.save_lead(session, contact, &request) {
            SaveOutcome::Failed => return DialogueReply::say(SAVE_FAILED),
            SaveOutcome::Existing(lead) => (
                format!(
                    "Our team already has your contact ({}) 💌 — they’ll follow up soon!",
                    lead.contact_label()
                ),
                lead,
            ),
            SaveOutcome::Created(lead) => {
                let name = if lead.name.is_empty() { "there" } else { lead.name.as_str() };
                (
                    format!("Thanks {name} 💫 Our team will reach out to you soon at {}!", lead.contact_label()),
                    lead,
                )
            }
        };

        let memory = &mut session.memory;
        memory.contact.name = Some(lead.name.clone()).filter(|n| !n.is_empty()).or(memory.contact.name.take());
        memory.contact.email = Some(lead.email.clone()).filter(|e| !e.is_empty());
        memory.contact.phone = Some(lead.phone.clone()).filter(|p| !p.is_empty());
        memory.contact.lead_id = Some(lead.id);
        memory.contact.opt_in = true;
        memory.dialogue = DialogueState::default();
        session.requires_human = true;

        DialogueReply {
            text,
            requires_human: true,
        }
    }

    fn save_lead(&self, session: &Session, contact: &ContactInfo, request: &str) -> SaveOutcome {
        let Some(key) = contact.key() else {
            return SaveOutcome::Failed;
        };

        match self.store.find_lead(&key, &self.source) {
            Ok(Some(existing)) => {
                tracing::info!(session_id = %session.id, lead_id = existing.id, "reusing existing lead");
                return SaveOutcome::Existing(existing);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(session_id = %session.id, error = %e, "lead lookup failed, inserting"),
        }

        let new_lead = NewLead::opted_in(
            session.memory.contact.name.as_deref().unwrap_or(""),
            contact.email.as_deref().unwrap_or(""),
            contact.phone.as_deref().unwrap_or(""),
            request,
            &self.source,
        );
        let lead = match self.store.insert_lead(new_lead) {
            Ok(lead) => lead,
            Err(e) => {
                tracing::error!(session_id = %session.id, error = %e, "failed to save lead");
                return SaveOutcome::Failed;
            }
        };
        tracing::info!(session_id = %session.id, lead_id = lead.id, "lead created");

        if let Err(e) = self.notifier.notify(&lead) {
            tracing::warn!(lead_id = lead.id, error = %e, "lead notification failed");
        }
        SaveOutcome::Created(lead)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use parking_lot::Mutex;

    use super::*;
    use crate::core::store::testing::FlakyStore;
    use crate::core::MemoryStore;
    use crate::services::NotifyError;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<u64>>);

    impl LeadNotifier for Recorder {
        fn notify(&self, lead: &Lead) -> Result<(), NotifyError> {
            self.0.lock().push(lead.id);
            Ok(())
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        notifier: Arc<Recorder>,
        capture: LeadCapture,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(Recorder::default());
        let capture = LeadCapture::new(store.clone(), notifier.clone(), "chat-widget");
        Fixture { store, notifier, capture }
    }

    fn lead_count(store: &MemoryStore) -> usize {
        store.read(|data| data.leads.len())
    }

    fn stage(session: &Session) -> Option<DialogueStage> {
        session.memory.dialogue.stage
    }

    // ─── Contact extraction ──────────────────────────────────────

    #[test]
    fn extracts_email_and_phone() {
        let info = extract_contact("reach me at Jane.Doe@Example.com or +234 801 234 5678").unwrap();
        assert_eq!(info.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(info.phone.as_deref(), Some("+2348012345678"));
    }

    #[test]
    fn digits_inside_email_are_not_a_phone() {
        let info = extract_contact("ada12345678@mail.com").unwrap();
        assert_eq!(info.phone, None);
    }

    #[test]
    fn short_numbers_are_not_contacts() {
        assert_eq!(extract_contact("my order 1234 is late"), None);
        assert_eq!(extract_contact("sure thing"), None);
    }

    // ─── Transitions ─────────────────────────────────────────────

    #[test]
    fn needs_help_opens_the_flow() {
        let f = fixture();
        let mut s = Session::new(Utc::now());
        let reply = f.capture.advance(&mut s, Intent::NeedsHelp, "I have a problem, please help").unwrap();
        assert_eq!(reply.text, CONSENT_PROMPT);
        assert!(!reply.requires_human);
        assert_eq!(stage(&s), Some(DialogueStage::AwaitingConsent));
        assert!(s.memory.dialogue.prompt_shown);
    }

    #[test]
    fn other_intents_without_stage_pass_through() {
        let f = fixture();
        let mut s = Session::new(Utc::now());
        assert_eq!(f.capture.advance(&mut s, Intent::FaqShipping, "do you ship"), None);
        assert_eq!(f.capture.advance(&mut s, Intent::Fallback, "yes"), None);
    }

    #[test]
    fn consent_then_contact_saves_one_lead() {
        let f = fixture();
        let mut s = Session::new(Utc::now());
        f.capture.advance(&mut s, Intent::NeedsHelp, "my wig arrived damaged");

        let reply = f.capture.advance(&mut s, Intent::Fallback, "Yes!").unwrap();
        assert_eq!(reply.text, CONTACT_PROMPT);
        assert_eq!(stage(&s), Some(DialogueStage::AwaitingContact));

        let reply = f.capture.advance(&mut s, Intent::Fallback, "jane@example.com").unwrap();
        assert!(reply.requires_human);
        assert_eq!(reply.text, "Thanks there 💫 Our team will reach out to you soon at jane@example.com!");
        assert_eq!(stage(&s), None);
        assert!(s.requires_human);
        assert!(s.memory.contact.opt_in);

        let leads = f.store.snapshot().leads;
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].email, "jane@example.com");
        assert_eq!(leads[0].message, "my wig arrived damaged");
        assert_eq!(leads[0].source, "chat-widget");
        assert_eq!(*f.notifier.0.lock(), [leads[0].id]);
    }

    #[test]
    fn same_email_from_fresh_session_reuses_lead() {
        let f = fixture();
        for _ in 0..2 {
            let mut s = Session::new(Utc::now());
            s.memory.dialogue.stage = Some(DialogueStage::AwaitingContact);
            let reply = f.capture.advance(&mut s, Intent::Fallback, "JANE@example.com").unwrap();
            assert!(reply.requires_human);
            assert_eq!(stage(&s), None);
        }
        assert_eq!(lead_count(&f.store), 1);
        assert_eq!(f.notifier.0.lock().len(), 1);
    }

    #[test]
    fn existing_lead_reply_references_contact() {
        let f = fixture();
        f.store
            .insert_lead(NewLead::opted_in("Jane", "jane@example.com", "", "hi", "chat-widget"))
            .unwrap();
        let mut s = Session::new(Utc::now());
        s.memory.dialogue.stage = Some(DialogueStage::AwaitingContact);
        let reply = f.capture.advance(&mut s, Intent::Fallback, "jane@example.com").unwrap();
        assert!(reply.text.starts_with("Our team already has your contact (jane@example.com) 💌"));
        assert_eq!(s.memory.contact.name.as_deref(), Some("Jane"));
        assert_eq!(s.memory.contact.lead_id, Some(1));
    }

    #[test]
    fn leads_are_scoped_by_source() {
        let f = fixture();
        f.store
            .insert_lead(NewLead::opted_in("", "jane@example.com", "", "", "newsletter"))
            .unwrap();
        let mut s = Session::new(Utc::now());
        s.memory.dialogue.stage = Some(DialogueStage::AwaitingContact);
        f.capture.advance(&mut s, Intent::Fallback, "jane@example.com");
        assert_eq!(lead_count(&f.store), 2);
    }

    #[test]
    fn phone_only_lead_is_deduplicated_by_phone() {
        let f = fixture();
        for _ in 0..2 {
            let mut s = Session::new(Utc::now());
            s.memory.dialogue.stage = Some(DialogueStage::AwaitingContact);
            f.capture.advance(&mut s, Intent::Fallback, "call 0801 234 5678");
        }
        let leads = f.store.snapshot().leads;
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].phone, "08012345678");
        assert_eq!(leads[0].email, "");
    }

    #[test]
    fn contact_during_consent_skips_the_yes() {
        let f = fixture();
        let mut s = Session::new(Utc::now());
        f.capture.advance(&mut s, Intent::NeedsHelp, "help");
        let reply = f.capture.advance(&mut s, Intent::Fallback, "just email me: a@b.com").unwrap();
        assert!(reply.requires_human);
        assert_eq!(stage(&s), None);
        assert_eq!(lead_count(&f.store), 1);
    }

    #[test]
    fn decline_clears_the_flow() {
        let f = fixture();
        let mut s = Session::new(Utc::now());
        f.capture.advance(&mut s, Intent::NeedsHelp, "help");
        let reply = f.capture.advance(&mut s, Intent::Fallback, "Not now.").unwrap();
        assert_eq!(reply.text, DECLINED);
        assert_eq!(stage(&s), None);
        assert!(!s.memory.dialogue.prompt_shown);
        assert_eq!(lead_count(&f.store), 0);
    }

    #[test]
    fn unclear_consent_reprompts() {
        let f = fixture();
        let mut s = Session::new(Utc::now());
        f.capture.advance(&mut s, Intent::NeedsHelp, "help");
        let reply = f.capture.advance(&mut s, Intent::Fallback, "maybe later?").unwrap();
        assert_eq!(reply.text, CONSENT_REPROMPT);
        assert_eq!(stage(&s), Some(DialogueStage::AwaitingConsent));
        assert!(s.memory.dialogue.prompt_shown);
    }

    #[test]
    fn missing_contact_reprompts() {
        let f = fixture();
        let mut s = Session::new(Utc::now());
        s.memory.dialogue.stage = Some(DialogueStage::AwaitingContact);
        let reply = f.capture.advance(&mut s, Intent::Fallback, "my name is Ada").unwrap();
        assert_eq!(reply.text, INVALID_CONTACT);
        assert_eq!(stage(&s), Some(DialogueStage::AwaitingContact));
    }

    #[test]
    fn legacy_prompt_flag() {
        let f = fixture();
        let mut s = Session::new(Utc::now());
        s.memory.dialogue.prompt_shown = true;
        let reply = f.capture.advance(&mut s, Intent::Fallback, "okay").unwrap();
        assert_eq!(reply.text, CONTACT_PROMPT);
        assert_eq!(stage(&s), Some(DialogueStage::AwaitingContact));

        let mut s = Session::new(Utc::now());
        s.memory.dialogue.prompt_shown = true;
        let reply = f.capture.advance(&mut s, Intent::Fallback, "nah").unwrap();
        assert_eq!(reply.text, STAYING);
        assert!(!s.memory.dialogue.prompt_shown);
    }

    #[test]
    fn failed_save_apologises_and_keeps_stage() {
        let store = Arc::new(FlakyStore::default());
        store.fail_leads.store(true, std::sync::atomic::Ordering::SeqCst);
        let notifier = Arc::new(Recorder::default());
        let capture = LeadCapture::new(store, notifier.clone(), "chat-widget");

        let mut s = Session::new(Utc::now());
        s.memory.dialogue.stage = Some(DialogueStage::AwaitingContact);
        let reply = capture.advance(&mut s, Intent::Fallback, "a@b.com").unwrap();
        assert_eq!(reply.text, SAVE_FAILED);
        assert!(!reply.requires_human);
        assert!(!s.requires_human);
        assert_eq!(stage(&s), Some(DialogueStage::AwaitingContact));
        assert!(notifier.0.lock().is_empty());
    }
}
