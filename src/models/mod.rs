//! Domain types: configuration, logical processes, links, statistics.

pub mod config;
pub mod link;
pub mod lp;
pub mod stats;

pub use config::{ConfigEcho, SimConfig, SimConfigBuilder};
pub use link::{EventEmitter, Link};
pub use lp::{CompleteForward, LogicalProcess};
pub use stats::{DelayHistogram, LpStats};
