//! The per-partition pending-event queue.
//!
//! Ordered by `(arrival, sequence)` where the sequence number is
//! assigned at enqueue and monotonic within the partition. The secondary
//! key is what makes the schedule deterministic when distinct events
//! share an arrival time.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::time::SimTime;
use crate::events::SimEvent;

/// An event waiting for dispatch.
#[derive(Debug, Clone)]
pub struct PendingEvent {
    pub arrival: SimTime,
    pub seq: u64,
    pub src: u64,
    pub dst: u64,
    pub event: SimEvent,
}

// Ordering considers only (arrival, seq); the cargo is irrelevant and
// seq is unique within a partition, so the order is total.
impl PartialEq for PendingEvent {
    fn eq(&self, other: &Self) -> bool {
        self.arrival == other.arrival && self.seq == other.seq
    }
}

impl Eq for PendingEvent {}

impl PartialOrd for PendingEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap and we want the earliest
        // (arrival, seq) on top.
        other
            .arrival
            .cmp(&self.arrival)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-queue of pending events with monotonic enqueue sequencing.
#[derive(Debug, Default)]
pub struct PendingQueue {
    heap: BinaryHeap<PendingEvent>,
    next_seq: u64,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Enqueue an event, assigning it the next sequence number.
    pub fn push(&mut self, src: u64, dst: u64, arrival: SimTime, event: SimEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(PendingEvent {
            arrival,
            seq,
            src,
            dst,
            event,
        });
    }

    /// Arrival time of the earliest pending event.
    pub fn peek_arrival(&self) -> Option<SimTime> {
        self.heap.peek().map(|e| e.arrival)
    }

    /// Remove and return the earliest pending event.
    pub fn pop(&mut self) -> Option<PendingEvent> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
