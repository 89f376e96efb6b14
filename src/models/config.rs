//! Run configuration: validation, derived quantities, and the echo.
//!
//! The core consumes a fully populated record; parsing a command line or
//! a configuration file is the enclosing shell's job. The record is
//! immutable for the duration of a run and is passed by reference into
//! each LP on construction.

use serde::{Deserialize, Serialize};

use crate::core::time::SimTime;
use crate::error::SimError;

/// Minimum expected events per synchronization window before the
/// configuration echo recommends raising `events`.
const MIN_EVENTS_PER_WINDOW: f64 = 10.0;

/// Complete configuration for one simulation run.
///
/// Times are in seconds. Use [`SimConfig::builder`] to assemble a record
/// and validate it in one step.
///
/// # Example
/// ```
/// use phold_sim_core::SimConfig;
///
/// let config = SimConfig::builder()
///     .remote(0.9)
///     .minimum(1e-6)
///     .average(9e-6)
///     .stop(1e-3)
///     .number(4)
///     .events(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.number, 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Probability that a generated event targets an LP other than its
    /// sender. Must be in `[0, 1]`.
    pub remote: f64,

    /// Lookahead: the minimum delay added to every event, in seconds.
    /// Must be positive; it is the conservative protocol's safety margin.
    pub minimum: f64,

    /// Mean of the exponential component of the delay, in seconds.
    pub average: f64,

    /// Virtual time at which the simulation ends, in seconds.
    pub stop: f64,

    /// Number of logical processes. Must be at least 2.
    pub number: u64,

    /// Initial events per LP. Must be at least 1.
    pub events: u64,

    /// Size of the opaque payload carried by each workload event.
    pub buffer_bytes: usize,

    /// Whether to record the delay histogram.
    pub delays_out: bool,

    /// Verbosity level for run tracing. 0 is quiet.
    pub verbosity: u32,

    /// Debug aid: replace the exponential delay component with this
    /// fixed value (in seconds), skipping the delay draw entirely.
    /// `None` runs the normal workload.
    pub fixed_delay: Option<f64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            remote: 0.9,
            minimum: 1.0,
            average: 9.0,
            stop: 10.0,
            number: 2,
            events: 1,
            buffer_bytes: 0,
            delays_out: false,
            verbosity: 0,
            fixed_delay: None,
        }
    }
}

impl SimConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> SimConfigBuilder {
        SimConfigBuilder::default()
    }

    /// Validate every parameter range.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.number < 2 {
            return Err(SimError::ConfigInvalid(format!(
                "number = {}, need at least 2 LPs",
                self.number
            )));
        }
        if !(self.minimum > 0.0) {
            return Err(SimError::ConfigInvalid(format!(
                "minimum = {}, must be > 0",
                self.minimum
            )));
        }
        if !(self.average > 0.0) {
            return Err(SimError::ConfigInvalid(format!(
                "average = {}, must be > 0",
                self.average
            )));
        }
        if !(self.stop > 0.0) {
            return Err(SimError::ConfigInvalid(format!(
                "stop = {}, must be > 0",
                self.stop
            )));
        }
        if self.events < 1 {
            return Err(SimError::ConfigInvalid(
                "events must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.remote) {
            return Err(SimError::ConfigInvalid(format!(
                "remote = {}, must be in [0, 1]",
                self.remote
            )));
        }
        if let Some(fixed) = self.fixed_delay {
            if !(fixed >= 0.0) {
                return Err(SimError::ConfigInvalid(format!(
                    "fixed_delay = {}, must be >= 0",
                    fixed
                )));
            }
        }
        Ok(())
    }

    /// Fraction of the total expected inter-event delay contributed by
    /// the exponential component: `average / (minimum + average)`.
    pub fn duty_factor(&self) -> f64 {
        self.average / (self.minimum + self.average)
    }

    /// Expected total events over the run:
    /// `number * events * stop / (minimum + average)`.
    pub fn expected_events(&self) -> f64 {
        self.number as f64 * self.events as f64 * self.stop / (self.minimum + self.average)
    }

    /// Smallest `events` value that keeps the per-window event count at
    /// a healthy level.
    pub fn min_events_recommended(&self) -> u64 {
        (MIN_EVENTS_PER_WINDOW / self.duty_factor()).ceil() as u64
    }

    /// Derived quantities, echoed alongside the run outputs.
    ///
    /// Emits a warning when the configuration is starved of events per
    /// synchronization window.
    pub fn echo(&self) -> ConfigEcho {
        let duty_factor = self.duty_factor();
        let events_per_window = self.events as f64 * duty_factor;
        let starved = events_per_window < MIN_EVENTS_PER_WINDOW;
        if starved {
            tracing::warn!(
                events = self.events,
                events_per_window,
                suggested = self.min_events_recommended(),
                "too few events per window; consider raising the initial event count"
            );
        }
        ConfigEcho {
            config: self.clone(),
            duty_factor,
            expected_events: self.expected_events(),
            min_events_recommended: if starved {
                Some(self.min_events_recommended())
            } else {
                None
            },
        }
    }

    /// Lookahead as virtual time.
    pub(crate) fn minimum_time(&self) -> SimTime {
        SimTime::from_secs_f64(self.minimum)
    }

    /// Stop time as virtual time.
    pub(crate) fn stop_time(&self) -> SimTime {
        SimTime::from_secs_f64(self.stop)
    }
}

/// Builder for [`SimConfig`]. `build()` validates.
#[derive(Debug, Clone, Default)]
pub struct SimConfigBuilder {
    config: SimConfig,
}

impl SimConfigBuilder {
    pub fn remote(mut self, remote: f64) -> Self {
        self.config.remote = remote;
        self
    }

    pub fn minimum(mut self, seconds: f64) -> Self {
        self.config.minimum = seconds;
        self
    }

    pub fn average(mut self, seconds: f64) -> Self {
        self.config.average = seconds;
        self
    }

    pub fn stop(mut self, seconds: f64) -> Self {
        self.config.stop = seconds;
        self
    }

    pub fn number(mut self, n: u64) -> Self {
        self.config.number = n;
        self
    }

    pub fn events(mut self, events: u64) -> Self {
        self.config.events = events;
        self
    }

    pub fn buffer_bytes(mut self, bytes: usize) -> Self {
        self.config.buffer_bytes = bytes;
        self
    }

    pub fn delays_out(mut self, enabled: bool) -> Self {
        self.config.delays_out = enabled;
        self
    }

    pub fn verbosity(mut self, level: u32) -> Self {
        self.config.verbosity = level;
        self
    }

    pub fn fixed_delay(mut self, seconds: f64) -> Self {
        self.config.fixed_delay = Some(seconds);
        self
    }

    /// Validate and return the finished configuration.
    pub fn build(self) -> Result<SimConfig, SimError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration echo: the record plus its derived quantities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEcho {
    pub config: SimConfig,
    pub duty_factor: f64,
    pub expected_events: f64,
    /// Present only when the configuration is starved of events per
    /// window.
    pub min_events_recommended: Option<u64>,
}
