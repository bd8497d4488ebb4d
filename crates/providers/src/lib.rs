//! Upstream completion provider implementations for Bia.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
