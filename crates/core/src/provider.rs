//! Provider trait — the abstraction over the upstream completion API.
//!
//! A Provider takes assembled instructions plus a history window and
//! returns the model's reply text. The orchestrator calls `complete()`
//! without knowing which provider is behind it, which also keeps the
//! engine testable with a stub.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::ChatTurn;

/// The completion provider trait.
///
/// The call is synchronous from the orchestrator's point of view: no
/// streaming, no cancellation, no retry at this layer. Callers needing
/// bounded latency impose an external timeout.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Send instructions + history and get the reply text back.
    ///
    /// `history` is oldest-first and never empty: the orchestrator
    /// synthesizes a single-turn history when a session has none.
    async fn complete(
        &self,
        model: &str,
        instructions: &str,
        history: &[ChatTurn],
    ) -> std::result::Result<String, ProviderError>;

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
