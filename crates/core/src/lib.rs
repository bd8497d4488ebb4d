//! Core domain types and traits for Bia.
//!
//! Everything the front ends share lives here: the chat/turn value
//! objects, the [`Storage`] trait both backends implement, the
//! [`Provider`] trait for the upstream completion API, and the error
//! taxonomy.

pub mod error;
pub mod provider;
pub mod storage;
pub mod types;

pub use error::{AuthError, Error, ProviderError, Result, StorageError};
pub use provider::Provider;
pub use storage::Storage;
pub use types::{ChatTurn, MemoryNote, Role};
