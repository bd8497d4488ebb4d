//! Effective-context assembly: persona + notes, and the history window.
//!
//! Everything here is a pure function of current storage state; the
//! only caching is whatever the storage layer itself does.

use std::sync::Arc;

use chrono::Utc;

use bia_core::error::StorageError;
use bia_core::storage::{DEFAULT_NOTE_LIMIT, Storage};
use bia_core::types::{ChatTurn, Role};

/// Literal separator between the persona and the rendered notes.
pub const MEMORY_SEPARATOR: &str = "\n\n=== MEMORY (persistent notes) ===";

/// Builds the per-request instruction text and history window for a
/// session.
#[derive(Clone)]
pub struct SessionMemory {
    storage: Arc<dyn Storage>,
    base_prompt: String,
}

impl SessionMemory {
    pub fn new(storage: Arc<dyn Storage>, base_prompt: impl Into<String>) -> Self {
        Self {
            storage,
            base_prompt: base_prompt.into(),
        }
    }

    /// The instruction text for one request: the base persona, then (if
    /// any notes exist) the literal separator and one `- note` bullet
    /// per retained note, oldest first. With zero notes this is exactly
    /// the base persona text.
    pub async fn build_instructions(&self, session_id: &str) -> Result<String, StorageError> {
        let notes = self
            .storage
            .fetch_notes(session_id, DEFAULT_NOTE_LIMIT)
            .await?;

        if notes.is_empty() {
            return Ok(self.base_prompt.clone());
        }

        let mut instructions = self.base_prompt.clone();
        instructions.push_str(MEMORY_SEPARATOR);
        for note in &notes {
            instructions.push_str("\n- ");
            instructions.push_str(&note.note);
        }
        Ok(instructions)
    }

    /// The last `max_history` turns, oldest first. `max_history` counts
    /// RAW TURNS (one user or assistant message each), not exchange
    /// pairs. If the window comes back empty, a single-turn history
    /// holding only the just-submitted user message is synthesized so
    /// the remote call always receives non-empty input.
    pub async fn build_history(
        &self,
        session_id: &str,
        max_history: i64,
        just_sent: &str,
    ) -> Result<Vec<ChatTurn>, StorageError> {
        let turns = self.storage.fetch_turns(session_id, max_history).await?;

        if turns.is_empty() {
            return Ok(vec![ChatTurn::new(
                session_id,
                Role::User,
                just_sent,
                Utc::now(),
            )]);
        }

        Ok(turns)
    }
}
