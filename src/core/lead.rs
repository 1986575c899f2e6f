//! # Leads, Messages and Unanswered Queries
//!
//! Records written by the assistant besides the session itself. All of them
//! are append-only from the engine's point of view.
//!
//! A [`NewLead`] applies the field limits of the lead table on construction,
//! so callers never have to remember them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::{SessionId, SessionMemory};
use crate::nlu::intent::Intent;

const NAME_MAX: usize = 120;
const EMAIL_MAX: usize = 254;
const PHONE_MAX: usize = 30;
const MESSAGE_MAX: usize = 2000;

/// Author of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
    System,
}

/// A single immutable chat message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub session_id: SessionId,
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Opt-in contact record captured for human follow-up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub source: String,
    pub opt_in: bool,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Email if present, phone otherwise. Used in replies and notices.
    pub fn contact_label(&self) -> &str {
        if self.email.is_empty() {
            &self.phone
        } else {
            &self.email
        }
    }
}

/// Lead fields before an id and timestamp are assigned.
#[derive(Clone, Debug, PartialEq)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub source: String,
    pub opt_in: bool,
}

impl NewLead {
    /// Builds an opted-in lead, truncating every field to its column limit.
    pub fn opted_in(name: &str, email: &str, phone: &str, message: &str, source: &str) -> Self {
        Self {
            name: truncate(name.trim(), NAME_MAX),
            email: truncate(&email.trim().to_lowercase(), EMAIL_MAX),
            phone: truncate(phone.trim(), PHONE_MAX),
            message: truncate(message.trim(), MESSAGE_MAX),
            source: source.to_string(),
            opt_in: true,
        }
    }
}

/// Key used to find an existing lead before inserting a new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeadKey {
    /// Case-insensitive email match.
    Email(String),
    /// Exact phone match, used when no email was given.
    Phone(String),
}

/// Audit record written whenever the fallback path fires.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnansweredQuery {
    pub id: u64,
    pub session_id: SessionId,
    pub message: String,
    pub detected_intent: Intent,
    pub context: SessionMemory,
    pub requires_human: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields of an [`UnansweredQuery`] before it is stored.
#[derive(Clone, Debug, PartialEq)]
pub struct NewUnansweredQuery {
    pub session_id: SessionId,
    pub message: String,
    pub detected_intent: Intent,
    pub context: SessionMemory,
    pub requires_human: bool,
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
