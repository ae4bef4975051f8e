//! Core data models for the relay bot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Identifiers =================
//

/// Opaque key of one chat's history. Telegram chat ids are integers,
/// other transports may use strings, so it is kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric form, for stores keyed by a bigint column
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

//
// ================= History =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Role implied by position in an untagged legacy history
    pub fn from_parity(index: usize) -> Self {
        if index % 2 == 0 {
            Role::User
        } else {
            Role::Model
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored message of a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Stored element as found in the `history` column. Older rows hold
/// plain strings whose role is implied by position.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Tagged(HistoryEntry),
    Legacy(String),
}

/// Decode a stored `history` JSON value. `null` decodes to an empty history.
pub fn decode_history(value: serde_json::Value) -> crate::Result<Vec<HistoryEntry>> {
    if value.is_null() {
        return Ok(Vec::new());
    }

    let stored: Vec<StoredEntry> = serde_json::from_value(value)?;

    Ok(stored
        .into_iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            StoredEntry::Tagged(entry) => entry,
            StoredEntry::Legacy(text) => HistoryEntry {
                role: Role::from_parity(i),
                text,
            },
        })
        .collect())
}

/// One user message plus the reply it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

impl Turn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

//
// ================= Transport =================
//

/// A text message received from the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: ConversationId,
    pub text: String,
    pub message_id: Option<i64>,
}

impl InboundMessage {
    pub fn new(chat_id: impl Into<ConversationId>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            message_id: None,
        }
    }
}

//
// ================= Persistence =================
//

/// Row shape of the `chat_history` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub chat_id: ConversationId,
    pub history: Vec<HistoryEntry>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new(chat_id: ConversationId, history: Vec<HistoryEntry>) -> Self {
        Self {
            chat_id,
            history,
            updated_at: Utc::now(),
        }
    }
}
