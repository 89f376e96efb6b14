//! xorshift64* random number generator.
//!
//! Fast, high-quality, and deterministic: the same seed always produces
//! the same sequence, which is what makes per-LP replay possible. The
//! variant used here passes TestU01's BigCrush statistical tests.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*.
///
/// # Example
/// ```
/// use phold_sim_core::rng::XorShift64Star;
///
/// let mut rng = XorShift64Star::new(12345);
/// let a = rng.next_u64();
/// let u = rng.next_f64();
/// assert!(u >= 0.0 && u < 1.0);
/// # let _ = a;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XorShift64Star {
    /// Internal state (64-bit). Never zero.
    state: u64,
}

impl XorShift64Star {
    /// Create a new generator from a seed.
    ///
    /// A zero seed is replaced with 1: xorshift state must be nonzero or
    /// the generator gets stuck emitting zeros forever.
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Advance the state and return the next 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Next value in `[0.0, 1.0)` with 53 bits of resolution.
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next_u64();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Current state, for checkpointing or replay.
    pub fn state(&self) -> u64 {
        self.state
    }
}
