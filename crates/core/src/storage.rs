//! Storage trait — append-only chat history and memory notes per session.
//!
//! Two implementations exist (volatile in-memory, persistent Postgres);
//! the front ends only ever see `Arc<dyn Storage>`, chosen once at
//! process start and never switched per request.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{ChatTurn, MemoryNote, Role};

/// Default window of notes pulled into the instruction text.
pub const DEFAULT_NOTE_LIMIT: i64 = 50;

/// The core storage trait.
///
/// Sessions are opaque caller-supplied strings with no registration
/// step: the first append implicitly creates one, and fetches against
/// an unknown session return empty sequences, never an error.
#[async_trait]
pub trait Storage: Send + Sync {
    /// The backend name (e.g., "in_memory", "postgres").
    fn name(&self) -> &str;

    /// Append one chat turn. The assigned creation timestamp is
    /// strictly later than every earlier write for the same session.
    async fn append_turn(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> std::result::Result<(), StorageError>;

    /// Fetch up to `limit` most recent turns, ordered oldest→newest.
    /// `limit <= 0` yields an empty result.
    async fn fetch_turns(
        &self,
        session_id: &str,
        limit: i64,
    ) -> std::result::Result<Vec<ChatTurn>, StorageError>;

    /// Append one memory note, monotonic timestamp per session.
    async fn append_note(
        &self,
        session_id: &str,
        note: &str,
    ) -> std::result::Result<(), StorageError>;

    /// Fetch up to `limit` most recent notes, ordered oldest→newest
    /// within the returned window. `limit <= 0` yields an empty result.
    async fn fetch_notes(
        &self,
        session_id: &str,
        limit: i64,
    ) -> std::result::Result<Vec<MemoryNote>, StorageError>;
}
