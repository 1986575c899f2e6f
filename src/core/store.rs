//! # ChatStore — Session Storage Collaborator
//!
//! The engine never touches a database directly: everything it persists
//! goes through the [`ChatStore`] trait. [`MemoryStore`] is the in-process
//! implementation used by the server; its whole content ([`StoreData`]) is
//! serialisable so [`persistence`](crate::persistence) can snapshot it to
//! disk after each turn.
//!
//! ## In-Flight Guard
//!
//! [`ChatStore::try_begin_turn`] is the advisory per-session lock described
//! by the turn protocol:
//!
//! ```text
//! try_begin_turn(id)
//!   ├── is_processing == true  → Ok(false)  (caller answers "still processing")
//!   └── is_processing == false → set true, Ok(true)
//! ... turn runs ...
//! end_turn(id)                  → is_processing = false (always, via Drop guard)
//! ```
//!
//! In [`MemoryStore`] the check-and-set happens under one write lock, so two
//! overlapping requests for the same session cannot both win.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::lead::{Lead, LeadKey, Message, NewLead, NewUnansweredQuery, Sender, UnansweredQuery};
use super::session::{Session, SessionId};

/// Persistence failures surfaced to the orchestrator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Storage operations the conversational engine depends on.
pub trait ChatStore: Send + Sync {
    /// Loads a session by id.
    fn session(&self, id: SessionId) -> Result<Option<Session>, StoreError>;

    /// Creates and stores a fresh session.
    fn create_session(&self) -> Result<Session, StoreError>;

    /// Overwrites the stored copy of `session`.
    fn save_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Atomically claims the in-flight flag. `Ok(false)` means another turn
    /// for the same session is still running.
    fn try_begin_turn(&self, id: SessionId) -> Result<bool, StoreError>;

    /// Clears the in-flight flag.
    fn end_turn(&self, id: SessionId) -> Result<(), StoreError>;

    fn append_message(&self, session_id: SessionId, sender: Sender, content: &str) -> Result<Message, StoreError>;

    /// Messages of a session in creation order.
    fn messages(&self, session_id: SessionId) -> Result<Vec<Message>, StoreError>;

    /// Most recent lead matching `key` for `source`.
    fn find_lead(&self, key: &LeadKey, source: &str) -> Result<Option<Lead>, StoreError>;

    fn insert_lead(&self, lead: NewLead) -> Result<Lead, StoreError>;

    fn record_unanswered(&self, query: NewUnansweredQuery) -> Result<UnansweredQuery, StoreError>;
}

/// Serialisable content of a [`MemoryStore`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreData {
    pub sessions: HashMap<SessionId, Session>,
    pub messages: Vec<Message>,
    pub leads: Vec<Lead>,
    pub unanswered: Vec<UnansweredQuery>,
    next_message_id: u64,
    next_lead_id: u64,
    next_unanswered_id: u64,
}

impl StoreData {
    fn next_id(counter: &mut u64) -> u64 {
        *counter += 1;
        *counter
    }
}

/// In-process [`ChatStore`] protected by a `RwLock`.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps previously snapshotted data.
    pub fn from_data(data: StoreData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Clone of the current content, for snapshots.
    pub fn snapshot(&self) -> StoreData {
        self.data.read().clone()
    }

    /// Runs `f` with a read lock held, for aggregate queries.
    pub fn read<R>(&self, f: impl FnOnce(&StoreData) -> R) -> R {
        f(&self.data.read())
    }
}

impl ChatStore for MemoryStore {
    fn session(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.data.read().sessions.get(&id).cloned())
    }

    fn create_session(&self) -> Result<Session, StoreError> {
        let session = Session::new(Utc::now());
        self.data.write().sessions.insert(session.id, session.clone());
        Ok(session)
    }

    fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        self.data.write().sessions.insert(session.id, session.clone());
        Ok(())
    }

    fn try_begin_turn(&self, id: SessionId) -> Result<bool, StoreError> {
        let mut data = self.data.write();
        let session = data.sessions.get_mut(&id).ok_or(StoreError::SessionNotFound(id))?;
        if session.memory.is_processing {
            return Ok(false);
        }
        session.memory.is_processing = true;
        Ok(true)
    }

    fn end_turn(&self, id: SessionId) -> Result<(), StoreError> {
        let mut data = self.data.write();
        let session = data.sessions.get_mut(&id).ok_or(StoreError::SessionNotFound(id))?;
        session.memory.is_processing = false;
        Ok(())
    }

    fn append_message(&self, session_id: SessionId, sender: Sender, content: &str) -> Result<Message, StoreError> {
        let mut data = self.data.write();
        if !data.sessions.contains_key(&session_id) {
            return Err(StoreError::SessionNotFound(session_id));
        }
        let message = Message {
            id: StoreData::next_id(&mut data.next_message_id),
            session_id,
            sender,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        data.messages.push(message.clone());
        Ok(message)
    }

    fn messages(&self, session_id: SessionId) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .data
            .read()
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect())
    }

    fn find_lead(&self, key: &LeadKey, source: &str) -> Result<Option<Lead>, StoreError> {
        let data = self.data.read();
        let found = data
            .leads
            .iter()
            .filter(|lead| lead.source == source)
            .filter(|lead| match key {
                LeadKey::Email(email) => lead.email.eq_ignore_ascii_case(email),
                LeadKey::Phone(phone) => !phone.is_empty() && lead.phone == *phone,
            })
            .max_by_key(|lead| (lead.created_at, lead.id))
            .cloned();
        Ok(found)
    }

    fn insert_lead(&self, lead: NewLead) -> Result<Lead, StoreError> {
        let mut data = self.data.write();
        let lead = Lead {
            id: StoreData::next_id(&mut data.next_lead_id),
            name: lead.name,
            email: lead.email,
            phone: lead.phone,
            message: lead.message,
            source: lead.source,
            opt_in: lead.opt_in,
            created_at: Utc::now(),
        };
        data.leads.push(lead.clone());
        Ok(lead)
    }

    fn record_unanswered(&self, query: NewUnansweredQuery) -> Result<UnansweredQuery, StoreError> {
        let mut data = self.data.write();
        let record = UnansweredQuery {
            id: StoreData::next_id(&mut data.next_unanswered_id),
            session_id: query.session_id,
            message: query.message,
            detected_intent: query.detected_intent,
            context: query.context,
            requires_human: query.requires_human,
            created_at: Utc::now(),
        };
        data.unanswered.push(record.clone());
        Ok(record)
    }
}

/// Test double: a [`MemoryStore`] whose individual tables can be switched off.
#[cfg(test)]
pub mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[derive(Default)]
    pub struct FlakyStore {
        pub inner: MemoryStore,
        pub fail_messages: AtomicBool,
        pub fail_leads: AtomicBool,
    }

    impl FlakyStore {
        fn check(flag: &AtomicBool, table: &str) -> Result<(), StoreError> {
            if flag.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable(format!("{table} table locked")));
            }
            Ok(())
        }
    }

    impl ChatStore for FlakyStore {
        fn session(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
            self.inner.session(id)
        }

        fn create_session(&self) -> Result<Session, StoreError> {
            self.inner.create_session()
        }

        fn save_session(&self, session: &Session) -> Result<(), StoreError> {
            self.inner.save_session(session)
        }

        fn try_begin_turn(&self, id: SessionId) -> Result<bool, StoreError> {
            self.inner.try_begin_turn(id)
        }

        fn end_turn(&self, id: SessionId) -> Result<(), StoreError> {
            self.inner.end_turn(id)
        }

        fn append_message(&self, session_id: SessionId, sender: Sender, content: &str) -> Result<Message, StoreError> {
            Self::check(&self.fail_messages, "messages")?;
            self.inner.append_message(session_id, sender, content)
        }

        fn messages(&self, session_id: SessionId) -> Result<Vec<Message>, StoreError> {
            self.inner.messages(session_id)
        }

        fn find_lead(&self, key: &LeadKey, source: &str) -> Result<Option<Lead>, StoreError> {
            Self::check(&self.fail_leads, "leads")?;
            self.inner.find_lead(key, source)
        }

        fn insert_lead(&self, lead: NewLead) -> Result<Lead, StoreError> {
            Self::check(&self.fail_leads, "leads")?;
            self.inner.insert_lead(lead)
        }

        fn record_unanswered(&self, query: NewUnansweredQuery) -> Result<UnansweredQuery, StoreError> {
            self.inner.record_unanswered(query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_turn_is_exclusive() {
        let store = MemoryStore::new();
        let session = store.create_session().unwrap();

        assert!(store.try_begin_turn(session.id).unwrap());
        assert!(!store.try_begin_turn(session.id).unwrap());

        store.end_turn(session.id).unwrap();
        assert!(store.try_begin_turn(session.id).unwrap());
    }

    #[test]
    fn begin_turn_on_unknown_session_fails() {
        let store = MemoryStore::new();
        let err = store.try_begin_turn(SessionId::new_v4()).unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(_)));
    }

    #[test]
    fn messages_are_kept_in_order_per_session() {
        let store = MemoryStore::new();
        let a = store.create_session().unwrap();
        let b = store.create_session().unwrap();
        store.append_message(a.id, Sender::User, "hi").unwrap();
        store.append_message(b.id, Sender::User, "other").unwrap();
        store.append_message(a.id, Sender::Bot, "hello!").unwrap();

        let messages = store.messages(a.id).unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["hi", "hello!"]);
        assert!(messages[0].id < messages[1].id);
    }

    #[test]
    fn lead_lookup_ignores_email_case_and_other_sources() {
        let store = MemoryStore::new();
        store
            .insert_lead(NewLead::opted_in("", "jane@example.com", "", "help", "chat-widget"))
            .unwrap();
        store
            .insert_lead(NewLead::opted_in("", "jane@example.com", "", "help", "newsletter"))
            .unwrap();

        let found = store
            .find_lead(&LeadKey::Email("JANE@Example.com".into()), "chat-widget")
            .unwrap()
            .unwrap();
        assert_eq!(found.source, "chat-widget");
        assert!(store
            .find_lead(&LeadKey::Email("john@example.com".into()), "chat-widget")
            .unwrap()
            .is_none());
    }
}
