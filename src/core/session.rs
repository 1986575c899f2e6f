//! # Session — Per-Visitor Conversation State
//!
//! A [`Session`] is created on the first message of a visitor and carries
//! everything the assistant remembers between turns. The mutable part lives
//! in [`SessionMemory`]: a typed struct with one field per concern, plus an
//! `extra` map that keeps unknown keys from older snapshots intact.
//!
//! ## Memory Layout
//!
//! | Field | Purpose |
//! |-------|---------|
//! | `last_intent` | Intent of the previous turn (context continuity) |
//! | `last_user_message` / `last_bot_reply` | Last exchanged texts |
//! | `topic` | Coarse topic of the conversation ([`Topic`]) |
//! | `recent_history` | Rolling window of at most [`HISTORY_LIMIT`] turns |
//! | `dialogue` | Lead-capture stage and prompt flag ([`DialogueState`]) |
//! | `is_processing` | In-flight flag guarding overlapping turns |
//! | `contact` | Contact details resolved by the lead flow |
//!
//! ## Staleness
//!
//! A session idle for longer than the configured timeout is considered
//! stale: its memory is wiped (the in-flight flag excepted) and the
//! `requires_human` marker is cleared before the next turn is processed.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::nlu::intent::Intent;

/// Opaque session identifier handed back to the chat widget.
pub type SessionId = Uuid;

/// Maximum number of turns kept in [`SessionMemory::recent_history`].
pub const HISTORY_LIMIT: usize = 5;

/// Position inside the consent → contact sub-dialogue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueStage {
    /// The assistant asked whether the team may reach out.
    AwaitingConsent,
    /// The visitor agreed; waiting for an email address or phone number.
    AwaitingContact,
}

/// Coarse conversation topic, used for follow-up questions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    #[default]
    General,
    Shopping,
    Orders,
    Faq,
    Shipping,
    Returns,
}

/// One exchanged turn in the rolling history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub user: String,
    pub bot: String,
    pub intent: Intent,
}

/// Bounded FIFO of the most recent turns.
///
/// Pushing past [`HISTORY_LIMIT`] evicts the oldest turn. Snapshots holding
/// more entries (hand-edited files, older formats) are trimmed on load.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "VecDeque<HistoryTurn>")]
pub struct History(VecDeque<HistoryTurn>);

impl From<VecDeque<HistoryTurn>> for History {
    fn from(mut turns: VecDeque<HistoryTurn>) -> Self {
        while turns.len() > HISTORY_LIMIT {
            turns.pop_front();
        }
        Self(turns)
    }
}

impl History {
    /// Appends a turn, evicting the oldest one when the window is full.
    pub fn push(&mut self, turn: HistoryTurn) {
        if self.0.len() == HISTORY_LIMIT {
            self.0.pop_front();
        }
        self.0.push_back(turn);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Most recent turn, if any.
    pub fn last(&self) -> Option<&HistoryTurn> {
        self.0.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryTurn> {
        self.0.iter()
    }
}

/// State of the lead-capture sub-dialogue.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueState {
    /// Current stage; `None` when no flow is running.
    pub stage: Option<DialogueStage>,
    /// Set while a consent question is waiting for an answer.
    pub prompt_shown: bool,
    /// The message that opened the flow, stored with the lead.
    pub help_request: Option<String>,
}

/// Contact details resolved by the lead flow.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub lead_id: Option<u64>,
    pub opt_in: bool,
}

/// Mutable per-session memory read and written on every turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionMemory {
    pub last_intent: Option<Intent>,
    pub last_user_message: Option<String>,
    pub last_bot_reply: Option<String>,
    pub topic: Topic,
    pub recent_history: History,
    pub dialogue: DialogueState,
    pub is_processing: bool,
    pub contact: ContactDetails,
    /// Keys this version does not know about, kept for forward compatibility.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SessionMemory {
    /// Records a completed turn and the fields derived from it.
    pub fn record_turn(&mut self, user: &str, bot: &str, intent: Intent, topic: Topic) {
        self.recent_history.push(HistoryTurn {
            user: user.to_string(),
            bot: bot.to_string(),
            intent,
        });
        self.last_user_message = Some(user.to_string());
        self.last_bot_reply = Some(bot.to_string());
        self.last_intent = Some(intent);
        self.topic = topic;
    }
}

/// A visitor's chat session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    #[serde(default)]
    pub memory: SessionMemory,
    /// Set once the visitor has been handed to the support team.
    #[serde(default)]
    pub requires_human: bool,
    /// Free-form metadata (user agent, utm tags, ...).
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Session {
    /// Creates an empty session active at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            last_active: now,
            memory: SessionMemory::default(),
            requires_human: false,
            meta: serde_json::Map::new(),
        }
    }

    /// `true` when the session has been idle for longer than `timeout`.
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.last_active > timeout
    }

    /// Wipes the memory and the handoff marker of a stale session.
    ///
    /// The in-flight flag survives: the turn that triggered the reset is
    /// still running and owns it.
    pub fn reset(&mut self) {
        let in_flight = self.memory.is_processing;
        self.memory = SessionMemory {
            is_processing: in_flight,
            ..SessionMemory::default()
        };
        self.requires_human = false;
    }
}
