//! Collective correctness on an unbalanced tree (N = 7).

use phold_sim_core::collective::{broadcast_init, max_depth, reduce_complete};
use phold_sim_core::{Link, LogicalProcess, Orchestrator, SimConfig, SimTime};

fn config(number: u64) -> SimConfig {
    SimConfig::builder()
        .remote(0.9)
        .minimum(1e-6)
        .average(9e-6)
        .stop(1e-4)
        .number(number)
        .events(1)
        .build()
        .unwrap()
}

fn population(config: &SimConfig) -> Vec<LogicalProcess> {
    (0..config.number)
        .map(|id| {
            let links = (0..config.number)
                .map(|peer| {
                    let latency = if peer == id {
                        SimTime::ZERO
                    } else {
                        SimTime::from_secs_f64(config.minimum)
                    };
                    Link::new(id, peer, latency)
                })
                .collect();
            LogicalProcess::new(config, id, links)
        })
        .collect()
}

#[test]
fn test_phase_count_for_seven_lps() {
    // An unbalanced tree of 7 LPs has depth 2; both collectives finish
    // in exactly 3 phases.
    assert_eq!(max_depth(7), 2);
}

#[test]
fn test_broadcast_reaches_all_seven() {
    let config = config(7);
    let mut lps = population(&config);
    broadcast_init(&mut lps).unwrap();
    assert!(lps.iter().all(LogicalProcess::init_seen));
}

#[test]
fn test_reduce_sums_without_loss() {
    let config = config(7);
    let orchestrator = Orchestrator::new(config, 1).unwrap();
    let report = orchestrator.run().unwrap();

    let send_sum: u64 = report.per_lp.iter().map(|lp| lp.send_count).sum();
    let recv_sum: u64 = report.per_lp.iter().map(|lp| lp.recv_count).sum();
    assert_eq!(report.send_total, send_sum, "reduce lost send counts");
    assert_eq!(report.recv_total, recv_sum, "reduce lost recv counts");
    assert!(report.send_total > 0);
}

#[test]
fn test_reduce_on_idle_population_is_zero() {
    let config = config(7);
    let mut lps = population(&config);
    broadcast_init(&mut lps).unwrap();
    assert_eq!(reduce_complete(&lps).unwrap(), (0, 0));
}

#[test]
fn test_collectives_work_across_partition_counts() {
    for partitions in [1usize, 2, 3, 7] {
        let orchestrator = Orchestrator::new(config(7), partitions).unwrap();
        let report = orchestrator.run().unwrap();
        assert_eq!(report.per_lp.len(), 7, "partitions = {}", partitions);
    }
}
