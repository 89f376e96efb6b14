//! Event shapes and their wire encoding.

pub mod types;
pub mod wire;

pub use types::SimEvent;
