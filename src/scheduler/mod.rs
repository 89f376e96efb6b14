//! The conservative event scheduler: queues, the coordination board,
//! and partition workers.

pub mod board;
pub mod partition;
pub mod queue;

pub use board::SyncBoard;
pub use partition::{Envelope, Partition, PartitionMap, PartitionState};
pub use queue::{PendingEvent, PendingQueue};
