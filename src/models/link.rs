//! Directed, latency-carrying channels between logical processes.
//!
//! A link connects one LP to one other LP (or to itself). Cross-LP links
//! carry the global lookahead as latency; self links carry none, and the
//! caller includes the lookahead in the delay argument itself. Either
//! way, `send` guarantees delivery at `now + latency + delay` under the
//! scheduling invariants of the conservative protocol.

use crate::core::time::SimTime;
use crate::events::SimEvent;

/// Destination seam for link sends.
///
/// Implemented by the partition (local enqueue or channel send) and by
/// test fixtures that just collect what was emitted.
pub trait EventEmitter {
    /// Accept an event addressed to `dst`, arriving at `arrival`.
    fn emit(&mut self, dst: u64, arrival: SimTime, event: SimEvent);
}

/// A directed link from one LP to another.
#[derive(Debug, Clone)]
pub struct Link {
    src: u64,
    dst: u64,
    latency: SimTime,
}

impl Link {
    /// Create a link. Self links (src == dst) must carry zero latency.
    pub fn new(src: u64, dst: u64, latency: SimTime) -> Self {
        assert!(
            src != dst || latency == SimTime::ZERO,
            "self links carry no latency"
        );
        Self { src, dst, latency }
    }

    pub fn src(&self) -> u64 {
        self.src
    }

    pub fn dst(&self) -> u64 {
        self.dst
    }

    pub fn latency(&self) -> SimTime {
        self.latency
    }

    /// Whether this link connects an LP to itself.
    pub fn is_self(&self) -> bool {
        self.src == self.dst
    }

    /// Schedule `event` for arrival at `now + latency + delay`.
    pub fn send(&self, now: SimTime, delay: SimTime, event: SimEvent, out: &mut dyn EventEmitter) {
        let arrival = now + self.latency + delay;
        out.emit(self.dst, arrival, event);
    }
}
