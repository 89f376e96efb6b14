//! The run controller.
//!
//! Ties the pieces together in the order the protocol requires:
//!
//! ```text
//! validate config -> construct LPs and links -> init broadcast
//!   -> partitioned conservative scheduling -> complete reduction
//!   -> statistics flush (RunReport)
//! ```
//!
//! The collectives run outside virtual time, before and after the
//! scheduler. One worker thread is spawned per partition; a single
//! partition runs inline on the caller's thread, which is the pure
//! sequential mode.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collective;
use crate::core::time::SimTime;
use crate::error::SimError;
use crate::models::config::{ConfigEcho, SimConfig};
use crate::models::link::Link;
use crate::models::lp::LogicalProcess;
use crate::models::stats::DelayHistogram;
use crate::scheduler::board::SyncBoard;
use crate::scheduler::partition::{Envelope, Partition, PartitionMap};

/// End-of-run outputs for one LP, keyed by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LpReport {
    pub id: u64,
    pub send_count: u64,
    pub recv_count: u64,
    pub delays: Option<DelayHistogram>,
}

/// Aggregate outputs of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Per-LP counters and optional histograms, in id order.
    pub per_lp: Vec<LpReport>,

    /// Grand send total from the complete reduction.
    pub send_total: u64,

    /// Grand receive total from the complete reduction.
    pub recv_total: u64,

    /// `send_total - recv_total`. Non-zero is reported, not fatal:
    /// events scheduled before stop but delivered after it are possible
    /// under lookahead.
    pub error: i64,

    /// Whether the grand totals disagree.
    pub mismatch: bool,

    /// How many LPs released their do-not-end token before the
    /// scheduler exited.
    pub released: u64,

    /// The configuration echo computed before the run.
    pub echo: ConfigEcho,
}

impl RunReport {
    /// Render the report as JSON for the enclosing shell.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Handle for cancelling a run in progress from another thread.
///
/// Workers drain their current handler and terminate; the partial
/// statistics still flow into the report.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// Orchestrates one simulation run.
pub struct Orchestrator {
    config: SimConfig,
    partitions: usize,
    cancel: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Validate the configuration and partition count.
    ///
    /// # Example
    /// ```
    /// use phold_sim_core::{Orchestrator, SimConfig};
    ///
    /// let config = SimConfig::builder()
    ///     .number(4)
    ///     .minimum(1e-6)
    ///     .average(9e-6)
    ///     .stop(1e-4)
    ///     .build()
    ///     .unwrap();
    /// let orchestrator = Orchestrator::new(config, 2).unwrap();
    /// # let _ = orchestrator;
    /// ```
    pub fn new(config: SimConfig, partitions: usize) -> Result<Self, SimError> {
        config.validate()?;
        if partitions == 0 || partitions as u64 > config.number {
            return Err(SimError::ConfigInvalid(format!(
                "partitions = {}, must be between 1 and the LP count {}",
                partitions, config.number
            )));
        }
        Ok(Self {
            config,
            partitions,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Token for cancelling this run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken {
            flag: Arc::clone(&self.cancel),
        }
    }

    /// Execute the run to completion and flush statistics.
    pub fn run(&self) -> Result<RunReport, SimError> {
        let echo = self.config.echo();
        if self.config.verbosity > 0 {
            info!(
                number = self.config.number,
                events = self.config.events,
                remote = self.config.remote,
                duty_factor = echo.duty_factor,
                expected_events = echo.expected_events,
                partitions = self.partitions,
                "starting run"
            );
        }

        let mut lps = self.build_lps();
        collective::broadcast_init(&mut lps)?;

        let lps = self.schedule(lps)?;

        let (send_total, recv_total) = collective::reduce_complete(&lps)?;
        let error = send_total as i64 - recv_total as i64;
        let mismatch = error != 0;
        if mismatch {
            warn!(send_total, recv_total, error, "grand totals disagree");
        }

        let per_lp = lps
            .iter()
            .map(|lp| LpReport {
                id: lp.id(),
                send_count: lp.send_count(),
                recv_count: lp.recv_count(),
                delays: lp.stats().delays.clone(),
            })
            .collect();

        let released = lps.iter().filter(|lp| lp.released()).count() as u64;
        if self.config.verbosity >= 2 {
            debug!(send_total, recv_total, released, "run complete");
        }

        Ok(RunReport {
            per_lp,
            send_total,
            recv_total,
            error,
            mismatch,
            released,
            echo,
        })
    }

    /// One LP per id, each with a full outgoing link set: latency
    /// `minimum` to every peer, none on the self link.
    fn build_lps(&self) -> Vec<LogicalProcess> {
        let minimum = self.config.minimum_time();
        (0..self.config.number)
            .map(|id| {
                let links = (0..self.config.number)
                    .map(|peer| {
                        let latency = if peer == id { SimTime::ZERO } else { minimum };
                        Link::new(id, peer, latency)
                    })
                    .collect();
                LogicalProcess::new(&self.config, id, links)
            })
            .collect()
    }

    /// Run the conservative scheduler over the LP population and hand
    /// the LPs back for the statistics flush.
    fn schedule(&self, mut lps: Vec<LogicalProcess>) -> Result<Vec<LogicalProcess>, SimError> {
        let assign = PartitionMap::new(self.config.number, self.partitions);
        let board = SyncBoard::new(self.partitions, self.config.number, Arc::clone(&self.cancel));
        let minimum = self.config.minimum_time();
        let stop = self.config.stop_time();

        let (senders, receivers): (Vec<_>, Vec<_>) = (0..self.partitions)
            .map(|_| crossbeam_channel::unbounded::<Envelope>())
            .unzip();

        let mut workers = Vec::with_capacity(self.partitions);
        for (index, inbox) in receivers.into_iter().enumerate() {
            let block_len = assign.range_of(index).count();
            let block: Vec<LogicalProcess> = lps.drain(..block_len).collect();
            let peers = senders
                .iter()
                .enumerate()
                .map(|(peer, tx)| (peer != index).then(|| tx.clone()))
                .collect();
            workers.push(Partition::new(
                index,
                block,
                inbox,
                peers,
                assign,
                minimum,
                stop,
                self.config.verbosity,
                &board,
            ));
        }
        drop(senders);

        let results: Vec<Result<Vec<LogicalProcess>, SimError>> = if self.partitions == 1 {
            workers.into_iter().map(Partition::run).collect()
        } else {
            std::thread::scope(|scope| {
                let handles: Vec<_> = workers
                    .into_iter()
                    .enumerate()
                    .map(|(index, worker)| {
                        std::thread::Builder::new()
                            .name(format!("partition-{}", index))
                            .spawn_scoped(scope, move || worker.run())
                            .expect("failed to spawn partition worker")
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| handle.join().expect("partition worker panicked"))
                    .collect()
            })
        };

        if let Some(fault) = board.take_fault() {
            return Err(fault);
        }

        let blocks: Vec<Vec<LogicalProcess>> = results.into_iter().collect::<Result<_, _>>()?;
        // Blocks are contiguous ascending id ranges, so concatenation
        // restores id order.
        Ok(blocks.into_iter().flatten().collect())
    }
}
