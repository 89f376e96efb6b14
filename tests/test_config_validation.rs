//! Configuration validation and derived quantities.

use phold_sim_core::{SimConfig, SimError};

#[test]
fn test_valid_configuration_builds() {
    let config = SimConfig::builder()
        .remote(0.5)
        .minimum(1e-6)
        .average(9e-6)
        .stop(1e-3)
        .number(8)
        .events(3)
        .buffer_bytes(16)
        .delays_out(true)
        .build()
        .unwrap();
    assert_eq!(config.number, 8);
    assert!(config.delays_out);
}

#[test]
fn test_each_rejection_rule() {
    let cases: Vec<(&str, Result<SimConfig, SimError>)> = vec![
        ("number", SimConfig::builder().number(1).build()),
        ("minimum", SimConfig::builder().minimum(0.0).build()),
        ("minimum", SimConfig::builder().minimum(-2.0).build()),
        ("average", SimConfig::builder().average(0.0).build()),
        ("stop", SimConfig::builder().stop(-1.0).build()),
        ("events", SimConfig::builder().events(0).build()),
        ("remote", SimConfig::builder().remote(1.01).build()),
        ("remote", SimConfig::builder().remote(-0.01).build()),
    ];
    for (field, result) in cases {
        match result {
            Err(SimError::ConfigInvalid(msg)) => {
                assert!(msg.contains(field), "message {:?} names wrong field", msg)
            }
            other => panic!("expected ConfigInvalid for {}, got {:?}", field, other),
        }
    }
}

#[test]
fn test_config_errors_carry_exit_code_one() {
    let err = SimConfig::builder().number(0).build().unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_derived_quantities() {
    let config = SimConfig::builder()
        .minimum(1e-6)
        .average(9e-6)
        .stop(1e-3)
        .number(2)
        .events(1)
        .build()
        .unwrap();
    assert!((config.duty_factor() - 0.9).abs() < 1e-12);
    // 2 * 1 * 1e-3 / 1e-5 = 200
    assert!((config.expected_events() - 200.0).abs() < 1e-6);
    // ceil(10 / 0.9) = 12
    assert_eq!(config.min_events_recommended(), 12);
}

#[test]
fn test_echo_recommendation_appears_only_when_starved() {
    let starved = SimConfig::builder().events(1).build().unwrap();
    assert!(starved.echo().min_events_recommended.is_some());

    let healthy = SimConfig::builder().events(64).build().unwrap();
    assert!(healthy.echo().min_events_recommended.is_none());
}

#[test]
fn test_default_configuration_mirrors_benchmark_defaults() {
    let config = SimConfig::default();
    assert_eq!(config.remote, 0.9);
    assert_eq!(config.number, 2);
    assert_eq!(config.events, 1);
    assert!(config.validate().is_ok());
}
