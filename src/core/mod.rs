//! # Core — Domain Types of the Assistant
//!
//! - [`Session`] / [`SessionMemory`] — per-visitor conversation state
//! - [`Message`], [`Lead`], [`UnansweredQuery`] — records written during a turn
//! - [`ChatStore`] / [`MemoryStore`] — the storage seam used by the engine

pub mod lead;
pub mod session;
pub mod store;

pub use lead::{Lead, LeadKey, Message, NewLead, NewUnansweredQuery, Sender, UnansweredQuery};
pub use session::{DialogueStage, Session, SessionId, SessionMemory, Topic};
pub use store::{ChatStore, MemoryStore, StoreData, StoreError};
