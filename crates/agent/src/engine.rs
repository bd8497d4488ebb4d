//! Per-message orchestration.
//!
//! One pass per message, no retries: command parsing, user-turn
//! persistence, context assembly, the completion call, assistant-turn
//! persistence. If the upstream call fails after the user turn has been
//! written, the turn stays; the next request simply sees it in history.

use std::sync::Arc;

use tracing::{debug, info, warn};

use bia_core::error::{Error, StorageError};
use bia_core::provider::Provider;
use bia_core::storage::Storage;
use bia_core::types::Role;

use crate::session::SessionMemory;

/// Command prefix that stores a long-term note instead of chatting.
pub const REMEMBER_PREFIX: &str = "/remember";

/// Fixed acknowledgment after a note is stored.
pub const REMEMBER_ACK: &str = "Noted. It's in the book now.";

/// Fixed reply when `/remember` carries no note text.
pub const REMEMBER_EMPTY: &str = "Tell me what to remember after /remember.";

/// Fixed reply when the model returns blank output.
pub const BLANK_FALLBACK: &str = "got a blank response, try again";

/// Drives a single chat exchange against a storage backend and an
/// upstream provider.
pub struct ChatEngine {
    storage: Arc<dyn Storage>,
    provider: Arc<dyn Provider>,
    memory: SessionMemory,
    model: String,
}

impl ChatEngine {
    pub fn new(
        storage: Arc<dyn Storage>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        base_prompt: impl Into<String>,
    ) -> Self {
        let memory = SessionMemory::new(Arc::clone(&storage), base_prompt);
        Self {
            storage,
            provider,
            memory,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Handle one user message and return the reply text.
    ///
    /// `max_history` counts raw turns (one user or assistant message
    /// each) in the window sent upstream.
    pub async fn handle_message(
        &self,
        session_id: &str,
        message: &str,
        max_history: i64,
    ) -> Result<String, Error> {
        let session_id = session_id.trim();
        let message = message.trim();

        if let Some(note) = parse_remember(message) {
            return self.remember(session_id, note).await;
        }

        self.storage
            .append_turn(session_id, Role::User, message)
            .await
            .map_err(self.unavailable_warn())?;

        let instructions = self.memory.build_instructions(session_id).await?;
        let history = self
            .memory
            .build_history(session_id, max_history, message)
            .await?;

        debug!(
            session_id,
            turns = history.len(),
            model = %self.model,
            "dispatching completion"
        );

        let output = self
            .provider
            .complete(&self.model, &instructions, &history)
            .await
            .map_err(Error::upstream)?;

        let reply = if output.trim().is_empty() {
            BLANK_FALLBACK.to_string()
        } else {
            output
        };

        self.storage
            .append_turn(session_id, Role::Assistant, &reply)
            .await
            .map_err(self.unavailable_warn())?;

        Ok(reply)
    }

    async fn remember(&self, session_id: &str, note: &str) -> Result<String, Error> {
        if note.is_empty() {
            return Ok(REMEMBER_EMPTY.to_string());
        }
        self.storage
            .append_note(session_id, note)
            .await
            .map_err(self.unavailable_warn())?;
        info!(session_id, "memory note stored");
        Ok(REMEMBER_ACK.to_string())
    }

    fn unavailable_warn(&self) -> impl FnOnce(StorageError) -> Error + '_ {
        move |e| {
            warn!(backend = self.storage.name(), error = %e, "storage write failed");
            Error::Storage(e)
        }
    }
}

/// Parse a `/remember` command. Returns the note text (leading `:`
/// stripped, trimmed) when the message starts with the prefix, even
/// with nothing after it; `None` for ordinary chat messages.
pub fn parse_remember(message: &str) -> Option<&str> {
    let head = message.get(..REMEMBER_PREFIX.len())?;
    if !head.eq_ignore_ascii_case(REMEMBER_PREFIX) {
        return None;
    }
    let rest = &message[REMEMBER_PREFIX.len()..];
    // "/remembering" is a word, not a command.
    if !rest.is_empty() && !rest.starts_with([' ', ':']) {
        return None;
    }
    Some(rest.trim_start_matches(':').trim())
}
