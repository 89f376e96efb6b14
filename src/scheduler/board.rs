//! The shared coordination surface between partition workers.
//!
//! Each partition publishes a clock: a lower bound on the arrival time
//! of any event it will send in the future. A partition may dispatch its
//! queue head whenever the head does not exceed the minimum of its
//! peers' published clocks (its LBTS). Published clocks are monotonic,
//! which is what makes the bound safe to read without any further
//! coordination.
//!
//! The board also carries the run-global oddments that every worker
//! consults between dispatches: the released-token count for the
//! termination handshake, the first fatal error, and the cancel flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::core::time::SimTime;
use crate::error::SimError;

/// Upper bound on a blocked worker's sleep; a safety net under the
/// epoch-based wakeup, not the primary mechanism.
const WAIT_SLICE: Duration = Duration::from_millis(10);

/// Shared state for one run, borrowed by every partition worker.
pub struct SyncBoard {
    /// Published clocks, one per partition.
    clocks: Vec<AtomicU64>,

    /// Bumped on every publication; sleepers re-check when it moves.
    epoch: AtomicU64,

    /// Count of LPs that have released their do-not-end token.
    released: AtomicU64,

    /// Total LP population; the handshake completes when `released`
    /// reaches this.
    total_lps: u64,

    faulted: AtomicBool,
    fault: Mutex<Option<SimError>>,

    /// Shared with the run's cancel token, so cancellation works from
    /// outside the worker set.
    cancelled: Arc<AtomicBool>,

    sleep_lock: Mutex<()>,
    wake: Condvar,
}

impl SyncBoard {
    pub fn new(partitions: usize, total_lps: u64, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            clocks: (0..partitions).map(|_| AtomicU64::new(0)).collect(),
            epoch: AtomicU64::new(0),
            released: AtomicU64::new(0),
            total_lps,
            faulted: AtomicBool::new(false),
            fault: Mutex::new(None),
            cancelled,
            sleep_lock: Mutex::new(()),
            wake: Condvar::new(),
        }
    }

    pub fn partitions(&self) -> usize {
        self.clocks.len()
    }

    /// Publish a partition's clock and wake any sleeping peers.
    pub fn publish(&self, partition: usize, clock: SimTime) {
        self.clocks[partition].store(clock.as_nanos(), Ordering::Release);
        self.bump();
    }

    /// A partition's published clock.
    pub fn clock_of(&self, partition: usize) -> SimTime {
        SimTime::from_nanos(self.clocks[partition].load(Ordering::Acquire))
    }

    /// Lower bound on the arrival time of any future inbound event at
    /// `partition`: the minimum of its peers' published clocks.
    /// [`SimTime::MAX`] when there are no peers.
    pub fn lbts(&self, partition: usize) -> SimTime {
        let mut bound = SimTime::MAX;
        for (index, clock) in self.clocks.iter().enumerate() {
            if index != partition {
                bound = bound.min(SimTime::from_nanos(clock.load(Ordering::Acquire)));
            }
        }
        bound
    }

    /// Whether every peer has published [`SimTime::MAX`], i.e. promised
    /// never to send again.
    pub fn peers_drained(&self, partition: usize) -> bool {
        self.clocks
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != partition)
            .all(|(_, clock)| clock.load(Ordering::Acquire) == u64::MAX)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Sleep until the epoch moves past `seen` (or the wait slice
    /// elapses). Callers re-check their whole condition on return.
    pub fn wait_for_change(&self, seen: u64) {
        let mut guard = self.sleep_lock.lock();
        if self.epoch() != seen {
            return;
        }
        self.wake.wait_for(&mut guard, WAIT_SLICE);
    }

    /// Record one LP's token release.
    pub fn release_token(&self) {
        self.released.fetch_add(1, Ordering::AcqRel);
        self.bump();
    }

    /// Whether every LP has released its token.
    pub fn all_released(&self) -> bool {
        self.released.load(Ordering::Acquire) >= self.total_lps
    }

    pub fn released_count(&self) -> u64 {
        self.released.load(Ordering::Acquire)
    }

    /// Publish a fatal error. The first one wins; peers observe the
    /// flag and terminate.
    pub fn fault(&self, error: SimError) {
        {
            let mut slot = self.fault.lock();
            if slot.is_none() {
                *slot = Some(error);
            }
        }
        self.faulted.store(true, Ordering::Release);
        self.bump();
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }

    /// The first published fault, if any.
    pub fn take_fault(&self) -> Option<SimError> {
        self.fault.lock().clone()
    }

    /// Request cooperative cancellation: workers finish their current
    /// handler and terminate.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.bump();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        // Taking the lock orders the notification after any in-progress
        // sleeper registration, so a wakeup cannot be lost.
        let _guard = self.sleep_lock.lock();
        self.wake.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(partitions: usize, total_lps: u64) -> SyncBoard {
        SyncBoard::new(partitions, total_lps, Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn test_lbts_is_minimum_of_peers() {
        let board = board(3, 4);
        board.publish(0, SimTime::from_nanos(100));
        board.publish(1, SimTime::from_nanos(50));
        board.publish(2, SimTime::from_nanos(70));
        assert_eq!(board.lbts(0), SimTime::from_nanos(50));
        assert_eq!(board.lbts(1), SimTime::from_nanos(70));
    }

    #[test]
    fn test_lbts_without_peers_is_max() {
        let board = board(1, 4);
        assert_eq!(board.lbts(0), SimTime::MAX);
        assert!(board.peers_drained(0));
    }

    #[test]
    fn test_peers_drained_requires_all_max() {
        let board = board(2, 4);
        assert!(!board.peers_drained(0));
        board.publish(1, SimTime::MAX);
        assert!(board.peers_drained(0));
        assert!(!board.peers_drained(1));
    }

    #[test]
    fn test_token_handshake_completes_at_population() {
        let board = board(2, 3);
        board.release_token();
        board.release_token();
        assert!(!board.all_released());
        board.release_token();
        assert!(board.all_released());
    }

    #[test]
    fn test_first_fault_wins() {
        let board = board(2, 2);
        board.fault(SimError::ConfigInvalid("first".to_string()));
        board.fault(SimError::ConfigInvalid("second".to_string()));
        assert!(board.is_faulted());
        assert_eq!(
            board.take_fault(),
            Some(SimError::ConfigInvalid("first".to_string()))
        );
    }

    #[test]
    fn test_publish_moves_epoch() {
        let board = board(2, 2);
        let before = board.epoch();
        board.publish(0, SimTime::from_nanos(1));
        assert_ne!(board.epoch(), before);
    }

    #[test]
    fn test_wait_returns_immediately_on_stale_epoch() {
        let board = board(2, 2);
        let seen = board.epoch();
        board.publish(0, SimTime::from_nanos(1));
        // Must not hang: epoch already moved past `seen`.
        board.wait_for_change(seen);
    }
}
