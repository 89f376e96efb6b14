//! Per-LP statistics: send/receive counters and the delay histogram.
//!
//! Gating is the caller's responsibility (sends count only when the
//! scheduled arrival is before the stop time; receives only when the
//! delivery time is). The accumulators themselves are dumb on purpose,
//! so the gating policy lives in exactly one place, the LP.

use serde::{Deserialize, Serialize};

use crate::core::time::SimTime;

/// Statistics accumulated by one logical process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LpStats {
    /// Events sent with arrival before the stop time.
    pub send_count: u64,

    /// Events received before the stop time.
    pub recv_count: u64,

    /// Total-delay histogram, when enabled.
    pub delays: Option<DelayHistogram>,
}

impl LpStats {
    /// Create accumulators, with the histogram allocated only when
    /// delay recording is enabled.
    pub fn new(record_delays: bool) -> Self {
        Self {
            send_count: 0,
            recv_count: 0,
            delays: record_delays.then(DelayHistogram::new),
        }
    }

    pub fn add_send(&mut self) {
        self.send_count += 1;
    }

    pub fn add_recv(&mut self) {
        self.recv_count += 1;
    }

    /// Record a total delay (lookahead plus exponential component).
    pub fn add_delay(&mut self, delay_total: SimTime) {
        if let Some(hist) = self.delays.as_mut() {
            hist.record(delay_total);
        }
    }
}

/// Histogram over total delays with power-of-two nanosecond bins.
///
/// Bin `k` counts samples whose delay `d` satisfies
/// `2^k <= d.as_nanos() < 2^(k+1)`; zero-delay samples land in bin 0.
/// Bin boundaries are reported in seconds for interpretability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayHistogram {
    counts: Vec<u64>,
    samples: u64,
    min_sample: Option<SimTime>,
    max_sample: Option<SimTime>,
}

impl DelayHistogram {
    const BINS: usize = 64;

    pub fn new() -> Self {
        Self {
            counts: vec![0; Self::BINS],
            samples: 0,
            min_sample: None,
            max_sample: None,
        }
    }

    fn bin_of(delay: SimTime) -> usize {
        let ns = delay.as_nanos();
        if ns == 0 {
            0
        } else {
            ns.ilog2() as usize
        }
    }

    /// Record one sample.
    pub fn record(&mut self, delay: SimTime) {
        self.counts[Self::bin_of(delay)] += 1;
        self.samples += 1;
        self.min_sample = Some(match self.min_sample {
            Some(current) => current.min(delay),
            None => delay,
        });
        self.max_sample = Some(match self.max_sample {
            Some(current) => current.max(delay),
            None => delay,
        });
    }

    /// Total number of recorded samples.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Smallest recorded sample, if any.
    pub fn min_sample(&self) -> Option<SimTime> {
        self.min_sample
    }

    /// Largest recorded sample, if any.
    pub fn max_sample(&self) -> Option<SimTime> {
        self.max_sample
    }

    /// Non-empty bins as `(lower bound in seconds, count)`, in order.
    pub fn bins(&self) -> Vec<(f64, u64)> {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(k, &count)| (SimTime::from_nanos(1u64 << k).as_secs_f64(), count))
            .collect()
    }
}

impl Default for DelayHistogram {
    fn default() -> Self {
        Self::new()
    }
}
