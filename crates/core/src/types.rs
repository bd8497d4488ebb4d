//! Chat turn and memory note value objects.
//!
//! These are the only records the system persists. Both are append-only:
//! no update or delete operation exists anywhere in the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The model's reply
    Assistant,
}

impl Role {
    /// Wire/database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse the database representation back into a role.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message exchanged in a session, immutable once written.
///
/// Turns are ordered by `created_at` within a session; the storage
/// backend guarantees the timestamp is strictly later than every
/// earlier write for the same session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Caller-supplied session identity
    pub session_id: String,

    /// Who sent this turn
    pub role: Role,

    /// The text content
    pub content: String,

    /// When the backend recorded this turn
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(
        session_id: impl Into<String>,
        role: Role,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            role,
            content: content.into(),
            created_at,
        }
    }
}

/// A long-term fact attached to a session, distinct from chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNote {
    /// Caller-supplied session identity
    pub session_id: String,

    /// The remembered text
    pub note: String,

    /// When the backend recorded this note
    pub created_at: DateTime<Utc>,
}

impl MemoryNote {
    pub fn new(
        session_id: impl Into<String>,
        note: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            note: note.into(),
            created_at,
        }
    }
}
