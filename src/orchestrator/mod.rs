//! Run orchestration: construction, scheduling, reporting.
//!
//! See `engine.rs` for the implementation.

pub mod engine;

pub use engine::{CancelToken, LpReport, Orchestrator, RunReport};
