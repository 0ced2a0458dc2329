//! Engine configuration that downstream crates can serialize/deserialize.
//!
//! The core never decides how many partitions to use or how they run; the
//! caller supplies those choices here and every stage reads them from the
//! same value.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default cadence (in elements) at which per-partition loops poll the
/// cancellation token.
pub const DEFAULT_CANCEL_CHECK_INTERVAL: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of worker partitions every stage of a query is split into.
    pub partition_count: usize,

    /// Source partitioning mode: round-robin stripes instead of contiguous ranges.
    pub striped: bool,

    /// Poll the cancellation token every this many elements.
    pub cancel_check_interval: usize,

    /// Optional key for the routing hash. `None` uses a fixed built-in key,
    /// so routing is identical across runs and platforms either way.
    pub hash_seed: Option<u64>,

    /// Whether the final merge restores order-key order.
    pub ordered: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            partition_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            striped: false,
            cancel_check_interval: DEFAULT_CANCEL_CHECK_INTERVAL,
            hash_seed: None,
            ordered: false,
        }
    }
}

impl EngineConfig {
    /// Convenience constructor for a fixed partition count.
    pub fn with_partitions(partition_count: usize) -> Self {
        Self {
            partition_count,
            ..Self::default()
        }
    }

    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `PARTIX_PARTITIONS`: partition count
    /// - `PARTIX_STRIPED`: `true`/`false`
    /// - `PARTIX_CANCEL_CHECK_INTERVAL`: cancellation polling cadence
    /// - `PARTIX_HASH_SEED`: routing hash seed
    /// - `PARTIX_ORDERED`: `true`/`false`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`EngineConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(s) = lookup("PARTIX_PARTITIONS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.partition_count = v;
            }
        }

        if let Some(s) = lookup("PARTIX_STRIPED") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.striped = v;
            }
        }

        if let Some(s) = lookup("PARTIX_CANCEL_CHECK_INTERVAL") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.cancel_check_interval = v;
            }
        }

        if let Some(s) = lookup("PARTIX_HASH_SEED") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.hash_seed = Some(v);
            }
        }

        if let Some(s) = lookup("PARTIX_ORDERED") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.ordered = v;
            }
        }

        cfg
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.partition_count == 0 {
            return Err(Error::Config("partition_count must be at least 1".into()));
        }
        if self.cancel_check_interval == 0 {
            return Err(Error::Config(
                "cancel_check_interval must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_overrides_defaults_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = [
            ("PARTIX_PARTITIONS", "3"),
            ("PARTIX_STRIPED", "true"),
            ("PARTIX_CANCEL_CHECK_INTERVAL", "not-a-number"),
            ("PARTIX_HASH_SEED", "42"),
        ]
        .into_iter()
        .collect();

        let cfg = EngineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.partition_count, 3);
        assert!(cfg.striped);
        assert_eq!(cfg.cancel_check_interval, DEFAULT_CANCEL_CHECK_INTERVAL);
        assert_eq!(cfg.hash_seed, Some(42));
        assert!(!cfg.ordered);
    }

    #[test]
    fn json_fills_missing_fields_and_validates() {
        let cfg = EngineConfig::from_json_str(r#"{"partition_count": 2, "ordered": true}"#)
            .expect("valid config");
        assert_eq!(cfg.partition_count, 2);
        assert!(cfg.ordered);
        assert_eq!(cfg.cancel_check_interval, 64);

        let err = EngineConfig::from_json_str(r#"{"partition_count": 0}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = EngineConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
