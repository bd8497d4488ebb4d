//! Session memory assembly and per-message orchestration for Bia.
//!
//! [`SessionMemory`] turns stored notes and turns into the effective
//! context for one request; [`ChatEngine`] runs the single-pass control
//! flow around it: command parsing, turn persistence, the upstream
//! completion call, and error surfacing.

pub mod engine;
pub mod session;

pub use engine::ChatEngine;
pub use session::SessionMemory;
