//! The logical process: per-LP behavior for the synthetic workload.
//!
//! Each LP owns a deterministic random stream, one outgoing link per
//! peer (plus a self link), and its statistics. During scheduling it
//! does exactly one thing: consume an event and, if the stop time has
//! not been reached, produce the next one. Outside virtual time it
//! participates in the two tree collectives.
//!
//! # Event generation
//!
//! One generated event costs up to three draws, in fixed order: the
//! remote-or-not coin, the destination (remote path only), and the
//! exponential delay. The total delay is always `minimum + exponential`;
//! on cross-LP links the lookahead rides as link latency, on the self
//! link it is folded into the delay argument.

use tracing::trace;

use crate::core::time::SimTime;
use crate::core::tree::BinaryTree;
use crate::error::SimError;
use crate::events::SimEvent;
use crate::models::config::SimConfig;
use crate::models::link::{EventEmitter, Link};
use crate::models::stats::LpStats;
use crate::rng::LpRng;

/// Extra draws setup may spend producing an event that arrives before
/// the stop time, before the run is declared degenerate.
const SETUP_RETRY_BUDGET: u32 = 1000;

/// Outcome of one complete-reduction phase step at one LP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteForward {
    /// Parent to forward to; `None` at the root, which emits the grand
    /// totals instead.
    pub to: Option<u64>,
    pub send_total: u64,
    pub recv_total: u64,
}

/// One logical process.
pub struct LogicalProcess {
    id: u64,
    number: u64,
    remote: f64,
    average_secs: f64,
    fixed_delay: Option<SimTime>,
    minimum: SimTime,
    stop: SimTime,
    initial_events: u64,
    buffer_bytes: usize,
    verbosity: u32,
    links: Vec<Link>,
    rng: LpRng,
    stats: LpStats,
    init_seen: bool,
    released: bool,
}

impl LogicalProcess {
    /// Construct an LP from the run configuration and its outgoing
    /// links, indexed by peer id (index == own id is the self link).
    /// No events are scheduled yet.
    pub fn new(config: &SimConfig, id: u64, links: Vec<Link>) -> Self {
        assert_eq!(links.len() as u64, config.number, "one link per peer");
        assert!(links[id as usize].is_self(), "link at own index must be the self link");
        Self {
            id,
            number: config.number,
            remote: config.remote,
            average_secs: config.average,
            fixed_delay: config.fixed_delay.map(SimTime::from_secs_f64),
            minimum: config.minimum_time(),
            stop: config.stop_time(),
            initial_events: config.events,
            buffer_bytes: config.buffer_bytes,
            verbosity: config.verbosity,
            links,
            rng: LpRng::for_lp(id),
            stats: LpStats::new(config.delays_out),
            init_seen: false,
            released: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn stats(&self) -> &LpStats {
        &self.stats
    }

    pub fn send_count(&self) -> u64 {
        self.stats.send_count
    }

    pub fn recv_count(&self) -> u64 {
        self.stats.recv_count
    }

    /// Whether this LP has released its do-not-end token.
    pub fn released(&self) -> bool {
        self.released
    }

    /// Whether the init broadcast reached this LP.
    pub fn init_seen(&self) -> bool {
        self.init_seen
    }

    /// Whether per-event tracing is enabled for this run.
    pub(crate) fn traced(&self) -> bool {
        self.verbosity >= 2
    }

    /// Emit the initial event population at virtual time zero.
    ///
    /// At least one emitted event must arrive before the stop time, or
    /// the scheduler would have nothing to do; if the configured count
    /// produces none, extra draws are spent until one is live or the
    /// retry budget runs out.
    pub fn setup(&mut self, out: &mut dyn EventEmitter) -> Result<(), SimError> {
        let mut live = 0u64;
        for _ in 0..self.initial_events {
            if self.send_event(SimTime::ZERO, out) < self.stop {
                live += 1;
            }
        }

        let mut attempts = 0u32;
        while live == 0 {
            if attempts >= SETUP_RETRY_BUDGET {
                return Err(SimError::StopReachedWithoutLiveEvent {
                    lp: self.id,
                    attempts,
                });
            }
            attempts += 1;
            if self.send_event(SimTime::ZERO, out) < self.stop {
                live = 1;
            }
        }
        if self.traced() {
            trace!(lp = self.id, events = self.initial_events, attempts, "setup complete");
        }
        Ok(())
    }

    /// Handle one workload event delivered at virtual time `now`.
    ///
    /// Before the stop time: count the receive and emit a successor.
    /// At or after it: release the do-not-end token. Returns whether
    /// this call released the token.
    pub fn handle_event(
        &mut self,
        event: SimEvent,
        from: u64,
        now: SimTime,
        out: &mut dyn EventEmitter,
    ) -> Result<bool, SimError> {
        match event {
            SimEvent::Phold { send_time, .. } => {
                if self.traced() {
                    trace!(lp = self.id, %now, from, %send_time, "handling event");
                }
                // The event is consumed here; send_time was only ever
                // carried for debugging.
            }
            other => {
                return Err(SimError::CollectiveProtocolViolation(format!(
                    "{} event from LP {} delivered inside virtual time to LP {}",
                    other.kind(),
                    from,
                    self.id
                )));
            }
        }

        if now < self.stop {
            self.stats.add_recv();
            self.send_event(now, out);
            Ok(false)
        } else if !self.released {
            self.released = true;
            if self.traced() {
                trace!(lp = self.id, %now, "stop time reached, releasing token");
            }
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Draw and emit one event; returns its arrival time.
    ///
    /// Statistics count the send (and its delay) only when the arrival
    /// is before the stop time, so the counters reflect
    /// receivable-by-stop events only.
    fn send_event(&mut self, now: SimTime, out: &mut dyn EventEmitter) -> SimTime {
        let rem = self.rng.remote_coin();
        let dst = if rem < self.remote {
            self.rng.destination(self.number, self.id)
        } else {
            self.id
        };

        // The fixed-delay debug mode skips the delay draw entirely.
        let delay = match self.fixed_delay {
            Some(fixed) => fixed,
            None => SimTime::from_secs_f64(self.rng.delay_secs(self.average_secs)),
        };
        let delay_total = delay + self.minimum;
        let arrival = now + delay_total;

        let event = SimEvent::Phold {
            send_time: now,
            payload: vec![0u8; self.buffer_bytes],
        };

        let link = &self.links[dst as usize];
        if link.is_self() {
            // Self links carry no latency; the lookahead rides in the
            // delay argument instead.
            link.send(now, delay_total, event, out);
        } else {
            link.send(now, delay, event, out);
        }

        if arrival < self.stop {
            self.stats.add_send();
            self.stats.add_delay(delay_total);
        }
        if self.traced() {
            trace!(lp = self.id, dst, %arrival, "sent event");
        }
        arrival
    }

    // ========================================================================
    // Out-of-band collective phases
    // ========================================================================

    /// One phase step of the init broadcast.
    ///
    /// At the phase matching this LP's tree depth it consumes exactly
    /// one Init from its parent (the root initiates instead) and
    /// returns the children to forward to. At any other phase a
    /// delivered message is a protocol violation.
    pub fn broadcast_phase(
        &mut self,
        phase: u32,
        incoming: Option<&SimEvent>,
    ) -> Result<Vec<u64>, SimError> {
        let my_depth = BinaryTree::depth(self.id);

        if my_depth != phase {
            if let Some(event) = incoming {
                let timing = if my_depth > phase { "early" } else { "late" };
                return Err(SimError::CollectiveProtocolViolation(format!(
                    "LP {} at depth {} received {} {} message in broadcast phase {}",
                    self.id,
                    my_depth,
                    timing,
                    event.kind(),
                    phase
                )));
            }
            return Ok(Vec::new());
        }

        if self.id == 0 {
            if let Some(event) = incoming {
                return Err(SimError::CollectiveProtocolViolation(format!(
                    "root received unexpected {} message during broadcast",
                    event.kind()
                )));
            }
        } else {
            let parent = BinaryTree::parent(self.id);
            match incoming {
                Some(SimEvent::Init { sender }) if *sender == parent => {}
                Some(SimEvent::Init { sender }) => {
                    return Err(SimError::CollectiveProtocolViolation(format!(
                        "LP {} expected init from parent {}, got sender {}",
                        self.id, parent, sender
                    )));
                }
                Some(other) => {
                    return Err(SimError::CollectiveProtocolViolation(format!(
                        "LP {} expected an init message, got {}",
                        self.id,
                        other.kind()
                    )));
                }
                None => {
                    return Err(SimError::CollectiveProtocolViolation(format!(
                        "LP {} missed its init message in phase {}",
                        self.id, phase
                    )));
                }
            }
        }

        self.init_seen = true;
        let (left, right) = BinaryTree::children(self.id);
        Ok([left, right]
            .into_iter()
            .filter(|&child| child < self.number)
            .collect())
    }

    /// One phase step of the complete reduction.
    ///
    /// The effective phase runs the tree bottom-up: at
    /// `max_depth - phase == depth(id)` the LP consumes one Complete
    /// from each valid child, folds in its own counters, and forwards
    /// the subtotal to its parent (the root reports instead).
    pub fn complete_phase(
        &self,
        phase: u32,
        max_depth: u32,
        incoming: &[(u64, SimEvent)],
    ) -> Result<Option<CompleteForward>, SimError> {
        let effective = max_depth - phase;
        let my_depth = BinaryTree::depth(self.id);

        if my_depth != effective {
            if let Some((from, event)) = incoming.first() {
                return Err(SimError::CollectiveProtocolViolation(format!(
                    "LP {} at depth {} received {} from LP {} outside its reduce phase",
                    self.id,
                    my_depth,
                    event.kind(),
                    from
                )));
            }
            return Ok(None);
        }

        let (left, right) = BinaryTree::children(self.id);
        let expected: Vec<u64> = [left, right]
            .into_iter()
            .filter(|&child| child < self.number)
            .collect();

        let mut send_total = self.stats.send_count;
        let mut recv_total = self.stats.recv_count;
        let mut seen: Vec<u64> = Vec::with_capacity(expected.len());

        for (from, event) in incoming {
            if !expected.contains(from) || seen.contains(from) {
                return Err(SimError::CollectiveProtocolViolation(format!(
                    "LP {} received a reduce message from unexpected LP {}",
                    self.id, from
                )));
            }
            match event {
                SimEvent::Complete {
                    send_total: child_send,
                    recv_total: child_recv,
                } => {
                    send_total += child_send;
                    recv_total += child_recv;
                    seen.push(*from);
                }
                other => {
                    return Err(SimError::CollectiveProtocolViolation(format!(
                        "LP {} expected a complete message from LP {}, got {}",
                        self.id,
                        from,
                        other.kind()
                    )));
                }
            }
        }

        if seen.len() != expected.len() {
            return Err(SimError::CollectiveProtocolViolation(format!(
                "LP {} got {} of {} expected child totals",
                self.id,
                seen.len(),
                expected.len()
            )));
        }

        let to = if self.id == 0 {
            None
        } else {
            Some(BinaryTree::parent(self.id))
        };
        Ok(Some(CompleteForward {
            to,
            send_total,
            recv_total,
        }))
    }
}
