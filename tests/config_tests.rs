//! Engine configuration tests

use std::collections::HashMap;

use partix::prelude::*;
use partix_core::config::DEFAULT_CANCEL_CHECK_INTERVAL;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

#[test]
fn test_env_overrides() {
    let cfg = EngineConfig::from_lookup(lookup(&[
        ("PARTIX_PARTITIONS", "6"),
        ("PARTIX_STRIPED", "true"),
        ("PARTIX_CANCEL_CHECK_INTERVAL", "16"),
        ("PARTIX_HASH_SEED", "42"),
        ("PARTIX_ORDERED", "true"),
    ]));
    assert_eq!(cfg.partition_count, 6);
    assert!(cfg.striped);
    assert_eq!(cfg.cancel_check_interval, 16);
    assert_eq!(cfg.hash_seed, Some(42));
    assert!(cfg.ordered);
}

#[test]
fn test_unparseable_env_is_ignored() {
    let cfg = EngineConfig::from_lookup(lookup(&[
        ("PARTIX_PARTITIONS", "many"),
        ("PARTIX_STRIPED", "yes"),
    ]));
    assert_eq!(cfg.partition_count, EngineConfig::default().partition_count);
    assert!(!cfg.striped);
    assert_eq!(cfg.cancel_check_interval, DEFAULT_CANCEL_CHECK_INTERVAL);
}

#[test]
fn test_json_defaults_and_validation() {
    let cfg = EngineConfig::from_json_str(r#"{"partition_count": 3}"#).expect("valid json");
    assert_eq!(cfg.partition_count, 3);
    assert_eq!(cfg.cancel_check_interval, 64);
    assert_eq!(cfg.hash_seed, None);

    let err = EngineConfig::from_json_str(r#"{"partition_count": 0}"#).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    let err = EngineConfig::from_json_str("not json").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_config_round_trips_through_serde() {
    let cfg = EngineConfig {
        hash_seed: Some(7),
        ..EngineConfig::with_partitions(2)
    };
    let json = serde_json::to_string(&cfg).expect("serialize");
    assert_eq!(EngineConfig::from_json_str(&json).expect("parse"), cfg);
}

#[test]
fn test_hash_seed_changes_routing_deterministically() {
    let a = RouteHasher::with_seed(Some(1));
    let b = RouteHasher::with_seed(Some(1));
    let routes_a: Vec<usize> = (0..100u64).map(|k| route(&k, 8, &a)).collect();
    let routes_b: Vec<usize> = (0..100u64).map(|k| route(&k, 8, &b)).collect();
    assert_eq!(routes_a, routes_b);
    assert!(routes_a.iter().all(|&p| p < 8));
}
