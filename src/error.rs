//! Error taxonomy for the simulation core.
//!
//! Fatal errors abort the run: the worker that detects one publishes it
//! through the coordination board and peers transition to `Terminated`.
//! The one non-fatal condition (grand send/recv mismatch) is not an error
//! at all; it is reported on the [`RunReport`](crate::orchestrator::RunReport).

use thiserror::Error;

use crate::core::time::SimTime;

/// Errors that can abort a simulation run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Configuration parameter out of range. Surfaced before any
    /// scheduling begins.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// An event was observed with an arrival time behind the partition's
    /// local virtual time. Under a conservative protocol this is a
    /// programming bug, not a recoverable condition.
    #[error(
        "causality violation in partition {partition}: \
         event from LP {src} arrives at {arrival} behind local clock {lvt}"
    )]
    CausalityViolation {
        partition: usize,
        src: u64,
        arrival: SimTime,
        lvt: SimTime,
    },

    /// Unexpected early, late, or wrong-variant message during the init
    /// broadcast or the complete reduction.
    #[error("collective protocol violation: {0}")]
    CollectiveProtocolViolation(String),

    /// Setup could not schedule any event arriving before the stop time
    /// within its retry budget. Distinguishable from a normal empty run.
    #[error("LP {lp}: no event before stop time after {attempts} extra setup draws")]
    StopReachedWithoutLiveEvent { lp: u64, attempts: u32 },

    /// A frame received over an inter-partition channel failed to decode.
    #[error("malformed event frame: {0}")]
    MalformedFrame(String),
}

impl SimError {
    /// Process exit code for this error when surfaced through a CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            SimError::ConfigInvalid(_) => 1,
            SimError::StopReachedWithoutLiveEvent { .. } => 1,
            SimError::CausalityViolation { .. } => 2,
            SimError::CollectiveProtocolViolation(_) => 3,
            SimError::MalformedFrame(_) => 3,
        }
    }
}
