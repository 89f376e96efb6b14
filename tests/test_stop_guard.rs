//! The setup live-event guard: a run whose stop time precedes every
//! possible arrival must fail loudly, not spin or exit silently.

use phold_sim_core::{Orchestrator, SimConfig, SimError};

#[test]
fn test_unreachable_stop_raises_dedicated_error() {
    // stop = minimum / 2: every arrival is at least `minimum`, so no
    // draw can ever land before stop.
    let config = SimConfig::builder()
        .remote(0.0)
        .minimum(1e-6)
        .average(9e-6)
        .stop(0.5e-6)
        .number(2)
        .events(1)
        .build()
        .unwrap();
    let orchestrator = Orchestrator::new(config, 1).unwrap();

    let err = orchestrator.run().unwrap_err();
    match &err {
        SimError::StopReachedWithoutLiveEvent { attempts, .. } => {
            assert!(*attempts >= 1000, "retry budget was not exhausted");
        }
        other => panic!("expected StopReachedWithoutLiveEvent, got {:?}", other),
    }
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_barely_reachable_stop_retries_to_a_live_event() {
    // stop = 1.5 * minimum: only exponential draws below half the
    // lookahead are live, so setup usually has to retry; it must keep
    // drawing rather than give up.
    let config = SimConfig::builder()
        .remote(0.0)
        .minimum(1e-6)
        .average(9e-6)
        .stop(1.5e-6)
        .number(2)
        .events(1)
        .build()
        .unwrap();
    let orchestrator = Orchestrator::new(config, 1).unwrap();

    let report = orchestrator.run().unwrap();
    // Each LP ends up with at least its one live event counted.
    assert!(report.send_total >= 2, "live events went missing");
    for lp in &report.per_lp {
        assert!(lp.send_count >= 1, "LP {} has no live event", lp.id);
    }
}

#[test]
fn test_unreachable_stop_aborts_parallel_runs_too() {
    let config = SimConfig::builder()
        .remote(0.0)
        .minimum(1e-6)
        .average(9e-6)
        .stop(0.5e-6)
        .number(4)
        .events(1)
        .build()
        .unwrap();
    let orchestrator = Orchestrator::new(config, 2).unwrap();
    assert!(matches!(
        orchestrator.run(),
        Err(SimError::StopReachedWithoutLiveEvent { .. })
    ));
}
