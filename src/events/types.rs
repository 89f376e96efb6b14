//! Event types exchanged between logical processes.
//!
//! Three shapes cover the whole protocol: the workload event itself, and
//! the two out-of-band collective events. The scheduler treats all of
//! them as opaque cargo; only the LP handlers and the collective drivers
//! look inside.

use serde::{Deserialize, Serialize};

use crate::core::time::SimTime;

/// A simulation event.
///
/// Events are constructed by the sending LP, owned by a pending queue
/// (or an inter-partition channel) while in flight, and consumed by the
/// receiving handler. No event outlives its delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    /// The workload event. Carries its send time for debugging and
    /// validation, plus an opaque payload whose size is fixed by
    /// configuration.
    Phold {
        send_time: SimTime,
        payload: Vec<u8>,
    },

    /// Spanning-tree initialization event, sent parent to child.
    Init { sender: u64 },

    /// Completion event, sent child to parent, carrying the subtree's
    /// event totals.
    Complete { send_total: u64, recv_total: u64 },
}

impl SimEvent {
    /// Wire tag for this variant.
    pub fn tag(&self) -> u8 {
        match self {
            SimEvent::Phold { .. } => 0,
            SimEvent::Init { .. } => 1,
            SimEvent::Complete { .. } => 2,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            SimEvent::Phold { .. } => "Phold",
            SimEvent::Init { .. } => "Init",
            SimEvent::Complete { .. } => "Complete",
        }
    }
}
