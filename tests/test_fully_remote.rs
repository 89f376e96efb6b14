//! Fully remote run: every event crosses LPs, exercising the
//! inter-partition channels and the delay histogram.

use phold_sim_core::{Orchestrator, SimConfig, SimTime};

fn config() -> SimConfig {
    SimConfig::builder()
        .remote(1.0)
        .minimum(1e-6)
        .average(9e-6)
        .stop(1e-4)
        .number(4)
        .events(2)
        .delays_out(true)
        .build()
        .unwrap()
}

#[test]
fn test_every_lp_receives_remote_traffic() {
    let orchestrator = Orchestrator::new(config(), 2).unwrap();
    let report = orchestrator.run().unwrap();

    assert_eq!(report.per_lp.len(), 4);
    for lp in &report.per_lp {
        assert!(lp.recv_count > 0, "LP {} received nothing", lp.id);
    }
    assert!(
        report.error.unsigned_abs() <= 2,
        "residue {} exceeds the partition count",
        report.error
    );
}

#[test]
fn test_histogram_respects_the_lookahead_floor() {
    let orchestrator = Orchestrator::new(config(), 2).unwrap();
    let report = orchestrator.run().unwrap();

    let minimum = SimTime::from_secs_f64(1e-6);
    for lp in &report.per_lp {
        let hist = lp
            .delays
            .as_ref()
            .expect("histogram was requested in the configuration");
        if let Some(min_sample) = hist.min_sample() {
            assert!(
                min_sample >= minimum,
                "LP {}: delay sample {} below the lookahead",
                lp.id,
                min_sample
            );
        }
        assert_eq!(
            hist.samples(),
            lp.send_count,
            "LP {}: one histogram sample per counted send",
            lp.id
        );
    }
}

#[test]
fn test_histogram_absent_when_disabled() {
    let config = SimConfig::builder()
        .remote(1.0)
        .minimum(1e-6)
        .average(9e-6)
        .stop(1e-4)
        .number(4)
        .events(2)
        .delays_out(false)
        .build()
        .unwrap();
    let orchestrator = Orchestrator::new(config, 1).unwrap();
    let report = orchestrator.run().unwrap();
    assert!(report.per_lp.iter().all(|lp| lp.delays.is_none()));
}
