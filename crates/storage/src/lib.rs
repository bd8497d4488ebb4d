//! Storage backend implementations for Bia.
//!
//! Exactly two variants exist: [`InMemoryStore`] (volatile, process
//! lifetime) and [`PostgresStore`] (durable, behind the `postgres`
//! feature). Selection is a single configuration decision at process
//! start; there is no per-request switching and no fallback between
//! the two once the process is running.

pub mod in_memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
