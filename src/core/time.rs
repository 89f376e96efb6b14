//! Virtual time for the simulation.
//!
//! The simulation clock advances in whole nanoseconds. Configuration
//! parameters are given in seconds and converted once, on validation;
//! all scheduling arithmetic is integer-only after that.

use serde::{Deserialize, Serialize};

/// A point in (or span of) virtual time, in nanoseconds.
///
/// `SimTime` is totally ordered and supports addition, which is all the
/// scheduler needs: arrival times are compared against local clocks and
/// built up from `now + latency + delay`.
///
/// # Example
/// ```
/// use phold_sim_core::SimTime;
///
/// let now = SimTime::from_nanos(1_000);
/// let delay = SimTime::from_secs_f64(1e-6);
/// assert_eq!(now + delay, SimTime::from_nanos(2_000));
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SimTime(u64);

impl SimTime {
    /// The start of virtual time.
    pub const ZERO: SimTime = SimTime(0);

    /// The far end of virtual time. Used as the published clock of a
    /// partition that can never send again.
    pub const MAX: SimTime = SimTime(u64::MAX);

    /// Construct from a raw nanosecond count.
    pub const fn from_nanos(ns: u64) -> Self {
        SimTime(ns)
    }

    /// Construct from seconds, rounding to the nearest nanosecond.
    ///
    /// # Panics
    /// Panics if `secs` is negative or not finite.
    pub fn from_secs_f64(secs: f64) -> Self {
        assert!(secs.is_finite() && secs >= 0.0, "time must be finite and non-negative");
        SimTime((secs * 1e9).round() as u64)
    }

    /// Raw nanosecond count.
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Value in seconds, for reporting.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 * 1e-9
    }

    /// Addition that pins at [`SimTime::MAX`] instead of wrapping.
    pub const fn saturating_add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for SimTime {
    fn add_assign(&mut self, rhs: SimTime) {
        self.0 += rhs.0;
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ns", self.0)
    }
}
