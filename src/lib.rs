//! PHOLD benchmark core: a partitioned-conservative discrete-event
//! scheduler running the classical Fujimoto synthetic workload.
//!
//! # Architecture
//!
//! - **core**: virtual time and binary-tree index arithmetic
//! - **rng**: per-LP deterministic random streams
//! - **events**: event shapes and their wire encoding
//! - **models**: configuration, logical processes, links, statistics
//! - **scheduler**: pending queues, the coordination board, partition workers
//! - **collective**: out-of-band init broadcast and complete reduction
//! - **orchestrator**: the run controller and its report
//!
//! # Critical Invariants
//!
//! 1. Per-partition dispatch is totally ordered by `(arrival, sequence)`
//! 2. All randomness is deterministic, seeded per LP
//! 3. Cross-partition events never arrive behind a local clock; if one
//!    does, the run faults rather than continuing on corrupt state

// Module declarations
pub mod collective;
pub mod core;
pub mod error;
pub mod events;
pub mod models;
pub mod orchestrator;
pub mod rng;
pub mod scheduler;

// Re-exports for convenience
pub use crate::core::time::SimTime;
pub use crate::core::tree::BinaryTree;
pub use error::SimError;
pub use events::{wire, SimEvent};
pub use models::{
    config::{ConfigEcho, SimConfig, SimConfigBuilder},
    link::{EventEmitter, Link},
    lp::LogicalProcess,
    stats::{DelayHistogram, LpStats},
};
pub use orchestrator::{CancelToken, LpReport, Orchestrator, RunReport};
pub use rng::LpRng;
pub use scheduler::{PendingQueue, PartitionState};
