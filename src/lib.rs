//! Streaming analysis engine for instrument practice: adaptive onset
//! detection, autocorrelation pitch estimation, and note-level accuracy
//! scoring against a reference excerpt, one independent session per
//! stream.

pub mod analysis;
pub mod error;
pub mod excerpt;
pub mod notes;
pub mod parser;
pub mod pitch;
pub mod scoring;
pub mod session;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;

pub use error::EngineError;
pub use session::{CommandReply, PerformanceSession, SessionReport};
