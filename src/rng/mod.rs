//! Per-LP random draws.
//!
//! Each logical process owns one [`LpRng`], seeded deterministically from
//! its id, so the sequence of draws an LP makes is a function of the
//! configuration alone, independent of how LPs are assigned to
//! partitions.
//!
//! The draw order per generated event is fixed and part of the replay
//! contract: remote-or-not coin first, then (only if remote) the
//! destination, then the delay.

pub mod xorshift;

pub use xorshift::XorShift64Star;

use serde::{Deserialize, Serialize};

/// The random stream of a single logical process.
///
/// All derived draws share one base stream, so consuming them in a
/// different order would change every subsequent value. Callers go
/// through the methods below in the documented order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LpRng {
    base: XorShift64Star,
}

impl LpRng {
    /// Stream for the LP with the given id, seeded with `1 + id`.
    ///
    /// The offset keeps LP 0 away from the disallowed zero seed.
    pub fn for_lp(id: u64) -> Self {
        Self {
            base: XorShift64Star::new(1 + id),
        }
    }

    /// First draw: the remote-or-not coin, uniform in `[0, 1)`.
    pub fn remote_coin(&mut self) -> f64 {
        self.base.next_f64()
    }

    /// Second draw (remote path only): a destination uniform over
    /// `[0, n)` excluding `own`. A draw that lands on `own` is rejected
    /// and redrawn.
    ///
    /// # Panics
    /// Panics if the rejection loop exceeds its bound, which requires
    /// `n < 2` (a configuration the validator rejects) or a broken
    /// generator.
    pub fn destination(&mut self, n: u64, own: u64) -> u64 {
        const MAX_REDRAWS: u32 = 1024;
        for _ in 0..MAX_REDRAWS {
            let candidate = self.base.next_u64() % n;
            if candidate != own {
                return candidate;
            }
        }
        panic!("destination draw rejected {} times; n = {}", MAX_REDRAWS, n);
    }

    /// Third draw: an exponential delay in seconds with the given mean,
    /// via inversion of the CDF.
    pub fn delay_secs(&mut self, mean_secs: f64) -> f64 {
        let u = self.base.next_f64();
        -(1.0 - u).ln() * mean_secs
    }

    /// Base stream state, for checkpointing.
    pub fn state(&self) -> u64 {
        self.base.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_lp_streams_are_deterministic() {
        let mut a = LpRng::for_lp(7);
        let mut b = LpRng::for_lp(7);
        for _ in 0..100 {
            assert_eq!(a.remote_coin().to_bits(), b.remote_coin().to_bits());
        }
    }

    #[test]
    fn test_lp_zero_has_nonzero_seed() {
        let rng = LpRng::for_lp(0);
        assert_ne!(rng.state(), 0);
    }

    #[test]
    fn test_destination_never_returns_self() {
        let mut rng = LpRng::for_lp(3);
        for _ in 0..10_000 {
            assert_ne!(rng.destination(4, 2), 2);
        }
    }

    #[test]
    fn test_destination_covers_all_peers() {
        let mut rng = LpRng::for_lp(1);
        let mut seen = [false; 8];
        for _ in 0..1000 {
            seen[rng.destination(8, 5) as usize] = true;
        }
        for (id, hit) in seen.iter().enumerate() {
            if id == 5 {
                assert!(!hit);
            } else {
                assert!(hit, "destination {} never drawn", id);
            }
        }
    }

    #[test]
    fn test_delay_is_positive_with_sane_mean() {
        let mut rng = LpRng::for_lp(9);
        let mut sum = 0.0;
        const DRAWS: usize = 10_000;
        for _ in 0..DRAWS {
            let d = rng.delay_secs(9e-6);
            assert!(d >= 0.0);
            sum += d;
        }
        let mean = sum / DRAWS as f64;
        assert!(
            (mean - 9e-6).abs() < 1e-6,
            "sample mean {} too far from 9e-6",
            mean
        );
    }
}
