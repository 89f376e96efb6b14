//! Partition workers: the conservative dispatch loop.
//!
//! LPs are split into contiguous blocks by id, one block per worker.
//! Each worker owns its block's pending queue and drains an inbox of
//! events sent by peer partitions. The loop is the heart of the
//! scheduler:
//!
//! 1. Snapshot the LBTS, then drain the inbox (causality-checked).
//! 2. If the head is safe against the snapshot, dispatch it.
//! 3. Otherwise publish the local clock and sleep until a peer moves.
//!
//! A worker publishes, as its clock, a lower bound on the arrival time
//! of anything it may still send: `min(head, LBTS) + minimum` while it
//! has or can receive work, and `SimTime::MAX` once nothing can reach
//! it before the stop time. Clocks only ever move forward.

use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

use crate::core::time::SimTime;
use crate::error::SimError;
use crate::events::wire;
use crate::models::link::EventEmitter;
use crate::models::lp::LogicalProcess;
use crate::scheduler::board::SyncBoard;
use crate::scheduler::queue::PendingQueue;

/// A routed event crossing partitions: header fields in the clear, the
/// event itself as a wire frame.
#[derive(Debug)]
pub struct Envelope {
    pub src: u64,
    pub dst: u64,
    pub arrival: SimTime,
    pub frame: Vec<u8>,
}

/// Lifecycle of a partition worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionState {
    Init,
    Running,
    Blocked,
    Draining,
    Terminated,
}

/// Block assignment of LP ids to partitions.
///
/// The first `number % partitions` blocks hold one extra LP, so block
/// sizes differ by at most one and every id maps to exactly one block.
#[derive(Debug, Clone, Copy)]
pub struct PartitionMap {
    number: u64,
    partitions: u64,
}

impl PartitionMap {
    pub fn new(number: u64, partitions: usize) -> Self {
        let partitions = partitions as u64;
        assert!(partitions >= 1 && partitions <= number, "need 1..=number partitions");
        Self { number, partitions }
    }

    /// Partition owning the given LP id.
    pub fn part_of(&self, id: u64) -> usize {
        let small = self.number / self.partitions;
        let extra = self.number % self.partitions;
        let boundary = extra * (small + 1);
        if id < boundary {
            (id / (small + 1)) as usize
        } else {
            (extra + (id - boundary) / small) as usize
        }
    }

    /// The id range owned by a partition.
    pub fn range_of(&self, partition: usize) -> std::ops::Range<u64> {
        let partition = partition as u64;
        let small = self.number / self.partitions;
        let extra = self.number % self.partitions;
        let start = if partition <= extra {
            partition * (small + 1)
        } else {
            extra * (small + 1) + (partition - extra) * small
        };
        let size = if partition < extra { small + 1 } else { small };
        start..start + size
    }
}

/// Routes events emitted by a dispatching LP: destinations inside the
/// block are enqueued locally, everything else is encoded and sent over
/// the owning peer's channel.
struct OutboundRouter<'a> {
    src: u64,
    own: std::ops::Range<u64>,
    queue: &'a mut PendingQueue,
    peers: &'a [Option<Sender<Envelope>>],
    assign: &'a PartitionMap,
}

impl EventEmitter for OutboundRouter<'_> {
    fn emit(&mut self, dst: u64, arrival: SimTime, event: crate::events::SimEvent) {
        if self.own.contains(&dst) {
            self.queue.push(self.src, dst, arrival, event);
        } else {
            let envelope = Envelope {
                src: self.src,
                dst,
                arrival,
                frame: wire::encode(&event),
            };
            if let Some(tx) = &self.peers[self.assign.part_of(dst)] {
                // A closed channel means the peer terminated; anything
                // still in flight to it is past the stop time.
                let _ = tx.send(envelope);
            }
        }
    }
}

/// One partition worker: a block of LPs, their pending queue, and the
/// channel plumbing to the rest of the run.
pub struct Partition<'a> {
    index: usize,
    own: std::ops::Range<u64>,
    lps: Vec<LogicalProcess>,
    queue: PendingQueue,
    inbox: Receiver<Envelope>,
    peers: Vec<Option<Sender<Envelope>>>,
    assign: PartitionMap,
    minimum: SimTime,
    stop: SimTime,
    lvt: SimTime,
    state: PartitionState,
    last_published: SimTime,
    verbosity: u32,
    board: &'a SyncBoard,
}

impl<'a> Partition<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: usize,
        lps: Vec<LogicalProcess>,
        inbox: Receiver<Envelope>,
        peers: Vec<Option<Sender<Envelope>>>,
        assign: PartitionMap,
        minimum: SimTime,
        stop: SimTime,
        verbosity: u32,
        board: &'a SyncBoard,
    ) -> Self {
        let own = assign.range_of(index);
        assert_eq!(own.clone().count(), lps.len(), "block size mismatch");
        Self {
            index,
            own,
            lps,
            queue: PendingQueue::new(),
            inbox,
            peers,
            assign,
            minimum,
            stop,
            lvt: SimTime::ZERO,
            state: PartitionState::Init,
            last_published: SimTime::ZERO,
            verbosity,
            board,
        }
    }

    pub fn state(&self) -> PartitionState {
        self.state
    }

    /// Run this partition to termination, returning its LPs for the
    /// statistics flush. A fatal error is published to the board before
    /// it is returned, so peers shut down too.
    pub fn run(mut self) -> Result<Vec<LogicalProcess>, SimError> {
        match self.run_inner() {
            Ok(()) => {
                self.state = PartitionState::Terminated;
                self.board.publish(self.index, SimTime::MAX);
                if self.verbosity >= 2 {
                    debug!(partition = self.index, lvt = %self.lvt, "partition terminated");
                }
                Ok(self.lps)
            }
            Err(error) => {
                self.state = PartitionState::Terminated;
                self.board.fault(error.clone());
                self.board.publish(self.index, SimTime::MAX);
                Err(error)
            }
        }
    }

    fn run_inner(&mut self) -> Result<(), SimError> {
        self.setup()?;
        self.state = PartitionState::Running;

        loop {
            if self.board.is_cancelled() || self.board.is_faulted() {
                return Ok(());
            }

            // Snapshot order matters: the LBTS must be read BEFORE the
            // inbox drain. A peer always sends before it republishes,
            // so every in-flight event below this snapshot is already
            // in the channel when the snapshot is taken, and the drain
            // picks it up; anything that arrives later is at or above
            // the snapshot. Dispatching against a fresher LBTS read
            // could overtake an event still sitting in the inbox.
            let lbts = self.board.lbts(self.index);
            self.drain_inbox()?;

            let authorized = self.board.all_released();
            if authorized && self.state == PartitionState::Running {
                self.state = PartitionState::Draining;
            }

            match self.queue.peek_arrival() {
                Some(head) => {
                    if authorized && head >= self.stop {
                        // Residual events past the stop time; nothing
                        // left that could affect the counters.
                        return Ok(());
                    }
                    if head <= lbts {
                        self.dispatch_head()?;
                        self.publish_clock(lbts);
                    } else {
                        self.block(lbts)?;
                    }
                }
                None => {
                    if authorized {
                        return Ok(());
                    }
                    self.publish_clock(lbts);
                    if self.board.peers_drained(self.index) {
                        // Peers promised never to send again; whatever
                        // the final drain finds is all there will be.
                        if self.drain_inbox()? == 0 {
                            return Ok(());
                        }
                    } else {
                        self.block(lbts)?;
                    }
                }
            }
        }
    }

    /// Seed the queue with every LP's initial event population.
    fn setup(&mut self) -> Result<(), SimError> {
        for local in 0..self.lps.len() {
            let Self {
                ref mut lps,
                ref mut queue,
                ref peers,
                ref assign,
                ref own,
                ..
            } = *self;
            let lp = &mut lps[local];
            let mut router = OutboundRouter {
                src: lp.id(),
                own: own.clone(),
                queue,
                peers,
                assign,
            };
            lp.setup(&mut router)?;
        }
        Ok(())
    }

    /// Pop and dispatch the queue head.
    fn dispatch_head(&mut self) -> Result<(), SimError> {
        let Some(pending) = self.queue.pop() else {
            return Ok(());
        };
        if pending.arrival < self.lvt {
            return Err(SimError::CausalityViolation {
                partition: self.index,
                src: pending.src,
                arrival: pending.arrival,
                lvt: self.lvt,
            });
        }
        self.lvt = pending.arrival;

        let Self {
            ref mut lps,
            ref mut queue,
            ref peers,
            ref assign,
            ref own,
            ..
        } = *self;
        let local = (pending.dst - own.start) as usize;
        let mut router = OutboundRouter {
            src: pending.dst,
            own: own.clone(),
            queue,
            peers,
            assign,
        };
        let released =
            lps[local].handle_event(pending.event, pending.src, pending.arrival, &mut router)?;
        if released {
            self.board.release_token();
        }
        Ok(())
    }

    /// Move inbound events into the pending queue. Returns how many
    /// arrived.
    fn drain_inbox(&mut self) -> Result<usize, SimError> {
        let mut count = 0;
        while let Ok(envelope) = self.inbox.try_recv() {
            if envelope.arrival < self.lvt {
                return Err(SimError::CausalityViolation {
                    partition: self.index,
                    src: envelope.src,
                    arrival: envelope.arrival,
                    lvt: self.lvt,
                });
            }
            let event = wire::decode(&envelope.frame)?;
            self.queue
                .push(envelope.src, envelope.dst, envelope.arrival, event);
            count += 1;
        }
        Ok(count)
    }

    /// Suspend until a peer publication or an inbound event can change
    /// the picture.
    fn block(&mut self, lbts: SimTime) -> Result<(), SimError> {
        let resume_state = self.state;
        self.state = PartitionState::Blocked;
        self.publish_clock(lbts);
        let epoch = self.board.epoch();
        if self.drain_inbox()? == 0 {
            self.board.wait_for_change(epoch);
        }
        self.state = resume_state;
        Ok(())
    }

    /// Publish the lower bound on the arrival time of this partition's
    /// future sends.
    ///
    /// `lbts` is the snapshot taken before the last inbox drain. The
    /// next dispatch here cannot happen before `min(head, lbts)`: the
    /// head is the earliest known work, and no undrained or future
    /// inbound event arrives below the snapshot. Every send adds at
    /// least the lookahead on top of its dispatch time.
    fn publish_clock(&mut self, lbts: SimTime) {
        let bound = match self.queue.peek_arrival() {
            Some(head) => head.min(lbts).saturating_add(self.minimum),
            None => {
                if lbts >= self.stop {
                    // Nothing can reach this partition before stop, so
                    // it will never generate another event.
                    SimTime::MAX
                } else {
                    lbts.saturating_add(self.minimum)
                }
            }
        };
        // Clocks are monotonic; the clamp keeps that a hard guarantee
        // even when a snapshot is stale.
        let bound = bound.max(self.last_published);
        if bound != self.last_published {
            self.last_published = bound;
            self.board.publish(self.index, bound);
        }
    }
}
