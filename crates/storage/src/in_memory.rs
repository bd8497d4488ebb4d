//! In-memory backend — the volatile fallback when no DATABASE_URL is set.
//!
//! Data lives for the process lifetime only. All appends go through the
//! process-wide write lock, so concurrent writes to the same session
//! are serialized rather than racing.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use bia_core::error::StorageError;
use bia_core::storage::Storage;
use bia_core::types::{ChatTurn, MemoryNote, Role};

#[derive(Default)]
struct SessionData {
    turns: Vec<ChatTurn>,
    notes: Vec<MemoryNote>,
    /// Latest timestamp handed out for this session. Appends in the
    /// same clock tick get bumped past it so ordering stays strict.
    last_stamp: Option<DateTime<Utc>>,
}

impl SessionData {
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_stamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_stamp = Some(now);
        now
    }
}

/// Volatile storage backend: a process-wide mapping from session id to
/// its turn and note lists.
pub struct InMemoryStore {
    sessions: RwLock<HashMap<String, SessionData>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Take the most recent `limit` items from `items` and return them
/// oldest-first. `limit <= 0` yields nothing.
fn tail<T: Clone>(items: &[T], limit: i64) -> Vec<T> {
    if limit <= 0 {
        return Vec::new();
    }
    let keep = (limit as usize).min(items.len());
    items[items.len() - keep..].to_vec()
}

#[async_trait]
impl Storage for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append_turn(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        let data = sessions.entry(session_id.to_string()).or_default();
        let stamp = data.next_stamp();
        data.turns
            .push(ChatTurn::new(session_id, role, content, stamp));
        Ok(())
    }

    async fn fetch_turns(
        &self,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatTurn>, StorageError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .map(|data| tail(&data.turns, limit))
            .unwrap_or_default())
    }

    async fn append_note(&self, session_id: &str, note: &str) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        let data = sessions.entry(session_id.to_string()).or_default();
        let stamp = data.next_stamp();
        data.notes.push(MemoryNote::new(session_id, note, stamp));
        Ok(())
    }

    async fn fetch_notes(
        &self,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<MemoryNote>, StorageError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .map(|data| tail(&data.notes, limit))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_then_fetch_preserves_order() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store
                .append_turn("s1", Role::User, &format!("msg {i}"))
                .await
                .unwrap();
        }

        let turns = store.fetch_turns("s1", 5).await.unwrap();
        assert_eq!(turns.len(), 5);
        for (i, turn) in turns.iter().enumerate() {
            assert_eq!(turn.content, format!("msg {i}"));
        }
    }

    #[tokio::test]
    async fn fetch_smaller_window_returns_most_recent_oldest_first() {
        let store = InMemoryStore::new();
        for i in 0..6 {
            store
                .append_turn("s1", Role::User, &format!("msg {i}"))
                .await
                .unwrap();
        }

        let turns = store.fetch_turns("s1", 2).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "msg 4");
        assert_eq!(turns[1].content, "msg 5");
    }

    #[tokio::test]
    async fn unknown_session_is_empty_not_error() {
        let store = InMemoryStore::new();
        assert!(store.fetch_turns("ghost", 10).await.unwrap().is_empty());
        assert!(store.fetch_notes("ghost", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_or_negative_limit_yields_nothing() {
        let store = InMemoryStore::new();
        store.append_turn("s1", Role::User, "hello").await.unwrap();

        assert!(store.fetch_turns("s1", 0).await.unwrap().is_empty());
        assert!(store.fetch_turns("s1", -3).await.unwrap().is_empty());
        store.append_note("s1", "fact").await.unwrap();
        assert!(store.fetch_notes("s1", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn timestamps_are_strictly_monotonic_per_session() {
        let store = InMemoryStore::new();
        for _ in 0..50 {
            store.append_turn("s1", Role::User, "tick").await.unwrap();
        }

        let turns = store.fetch_turns("s1", 50).await.unwrap();
        for pair in turns.windows(2) {
            assert!(pair[0].created_at < pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn notes_are_returned_oldest_first() {
        let store = InMemoryStore::new();
        store.append_note("s1", "first").await.unwrap();
        store.append_note("s1", "second").await.unwrap();
        store.append_note("s1", "third").await.unwrap();

        let notes = store.fetch_notes("s1", 50).await.unwrap();
        let texts: Vec<&str> = notes.iter().map(|n| n.note.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = InMemoryStore::new();
        store.append_turn("a", Role::User, "for a").await.unwrap();
        store.append_turn("b", Role::User, "for b").await.unwrap();

        let a = store.fetch_turns("a", 10).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].content, "for a");
        let b = store.fetch_turns("b", 10).await.unwrap();
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].content, "for b");
    }

    #[tokio::test]
    async fn concurrent_same_session_appends_all_land() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_turn("shared", Role::User, &format!("m{i}"))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let turns = store.fetch_turns("shared", 100).await.unwrap();
        assert_eq!(turns.len(), 20);
        // Whatever the interleaving, stored order must match timestamps.
        for pair in turns.windows(2) {
            assert!(pair[0].created_at < pair[1].created_at);
        }
    }
}
