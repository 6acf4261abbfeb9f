//! Engine Configuration
//!
//! Runtime settings derived from [`ShadeConfig`]. The TOML/env layering lives
//! in `shade-config`; this module only maps it onto engine types.

use std::path::PathBuf;

use shade_config::ShadeConfig;

use crate::storage::BatchLimits;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub limits: BatchLimits,
    pub max_broadcast_recipients: usize,
    /// Only escrow parties (or the controlling component) may release
    pub strict_settlement: bool,
    /// Upper bound for discrete-log search when decrypting aggregates
    pub max_decrypt_value: u64,
    /// Fixed seed for action nonces; entropy when unset
    pub rng_seed: Option<u64>,
    pub db_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&ShadeConfig::default())
    }
}

impl From<&ShadeConfig> for EngineConfig {
    fn from(config: &ShadeConfig) -> Self {
        Self {
            limits: BatchLimits {
                max_notes: config.ledger.max_notes_per_batch,
                max_nullifiers: config.ledger.max_nullifiers_per_batch,
                max_public_writes: config.ledger.max_public_writes_per_batch,
            },
            max_broadcast_recipients: config.protocols.max_broadcast_recipients,
            strict_settlement: config.protocols.strict_settlement,
            max_decrypt_value: config.protocols.max_decrypt_value,
            rng_seed: config.engine.rng_seed,
            db_path: config.ledger.db_path.as_ref().map(PathBuf::from),
        }
    }
}

impl EngineConfig {
    /// Deterministic config for tests and demos
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng_seed: Some(seed),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_every_section() {
        let config = ShadeConfig::from_toml(
            r#"
            [ledger]
            max_notes_per_batch = 8
            db_path = "/tmp/shade"

            [protocols]
            strict_settlement = true

            [engine]
            rng_seed = 7
            "#,
        )
        .unwrap();

        let engine = EngineConfig::from(&config);
        assert_eq!(engine.limits.max_notes, 8);
        assert_eq!(engine.limits.max_nullifiers, 64);
        assert!(engine.strict_settlement);
        assert_eq!(engine.rng_seed, Some(7));
        assert_eq!(engine.db_path, Some(PathBuf::from("/tmp/shade")));
    }

    #[test]
    fn test_defaults_match_ledger_defaults() {
        assert_eq!(EngineConfig::default().limits, BatchLimits::default());
    }
}
