//! Shade Configuration
//!
//! Shared configuration crate for the Shade engine and CLI.
//!
//! Handles loading configuration from:
//! 1. SHADE_CONFIG env var (explicit path)
//! 2. ./shade.toml (current directory)
//! 3. ~/.shade/shade.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::{env, fs};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<ShadeConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "shade.toml";
const CONFIG_DIR_NAME: &str = ".shade";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_MAX_NOTES_PER_BATCH: usize = 64;
const DEFAULT_MAX_NULLIFIERS_PER_BATCH: usize = 64;
const DEFAULT_MAX_PUBLIC_WRITES_PER_BATCH: usize = 16;
const DEFAULT_MAX_BROADCAST_RECIPIENTS: usize = 16;
const DEFAULT_MAX_DECRYPT_VALUE: u64 = 1 << 16;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShadeConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub protocols: ProtocolConfig,
    #[serde(default)]
    pub engine: EngineTomlConfig,
}

/// Ledger submission limits and persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_max_notes")]
    pub max_notes_per_batch: usize,
    #[serde(default = "default_max_nullifiers")]
    pub max_nullifiers_per_batch: usize,
    #[serde(default = "default_max_public_writes")]
    pub max_public_writes_per_batch: usize,
    /// RocksDB directory; in-memory ledger when unset
    #[serde(default)]
    pub db_path: Option<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_notes_per_batch: DEFAULT_MAX_NOTES_PER_BATCH,
            max_nullifiers_per_batch: DEFAULT_MAX_NULLIFIERS_PER_BATCH,
            max_public_writes_per_batch: DEFAULT_MAX_PUBLIC_WRITES_PER_BATCH,
            db_path: None,
        }
    }
}

fn default_max_notes() -> usize {
    DEFAULT_MAX_NOTES_PER_BATCH
}
fn default_max_nullifiers() -> usize {
    DEFAULT_MAX_NULLIFIERS_PER_BATCH
}
fn default_max_public_writes() -> usize {
    DEFAULT_MAX_PUBLIC_WRITES_PER_BATCH
}

/// Protocol-level knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default = "default_max_broadcast")]
    pub max_broadcast_recipients: usize,
    /// Require escrow and settlement callers to be one of the parties.
    /// When false, knowing the random id is enough.
    #[serde(default)]
    pub strict_settlement: bool,
    /// Upper bound used when searching aggregate plaintexts
    #[serde(default = "default_max_decrypt")]
    pub max_decrypt_value: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_broadcast_recipients: DEFAULT_MAX_BROADCAST_RECIPIENTS,
            strict_settlement: false,
            max_decrypt_value: DEFAULT_MAX_DECRYPT_VALUE,
        }
    }
}

fn default_max_broadcast() -> usize {
    DEFAULT_MAX_BROADCAST_RECIPIENTS
}
fn default_max_decrypt() -> u64 {
    DEFAULT_MAX_DECRYPT_VALUE
}

/// Engine configuration (TOML format)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineTomlConfig {
    /// Seed for action nonces; OS entropy when unset
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set Option<String> from env var if present
fn env_option_string(key: &str, field: &mut Option<String>) {
    if let Ok(v) = env::var(key) {
        *field = Some(v);
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = parsed;
        } else {
            log::warn!("Ignoring unparseable {}={}", key, v);
        }
    }
}

/// Set Option<T> from env var if present and parseable
fn env_parse_option<T: std::str::FromStr>(key: &str, field: &mut Option<T>) {
    if let Ok(v) = env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = Some(parsed);
        }
    }
}

/// Check if env var is set to a truthy value ("1" or "true")
fn env_bool(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

// ============================================================================
// Implementation
// ============================================================================

impl ShadeConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse TOML text without touching the environment
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config")
    }

    fn parse_file(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check SHADE_CONFIG env var
        if let Ok(path) = env::var("SHADE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ./shade.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.shade/shade.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Ledger
        env_option_string("SHADE_DB_PATH", &mut self.ledger.db_path);
        env_parse("SHADE_MAX_BATCH_NOTES", &mut self.ledger.max_notes_per_batch);
        env_parse(
            "SHADE_MAX_BATCH_NULLIFIERS",
            &mut self.ledger.max_nullifiers_per_batch,
        );
        env_parse(
            "SHADE_MAX_PUBLIC_WRITES",
            &mut self.ledger.max_public_writes_per_batch,
        );

        // Protocols
        env_parse(
            "SHADE_MAX_BROADCAST",
            &mut self.protocols.max_broadcast_recipients,
        );
        if let Some(v) = env_bool("SHADE_STRICT_SETTLEMENT") {
            self.protocols.strict_settlement = v;
        }

        // Engine
        env_parse_option("SHADE_RNG_SEED", &mut self.engine.rng_seed);
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.ledger.db_path = Some("./shade-db".into());
        toml::to_string_pretty(&sample).unwrap_or_default()
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static ShadeConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Try to get the global config instance.
    ///
    /// Returns `None` if config hasn't been initialized yet.
    pub fn try_global() -> Option<&'static ShadeConfig> {
        GLOBAL_CONFIG.get()
    }

    /// Initialize the global config with a specific instance.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: ShadeConfig) -> Result<(), ShadeConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

/// Shorthand for `ShadeConfig::global()`.
#[inline]
pub fn global_config() -> &'static ShadeConfig {
    ShadeConfig::global()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ShadeConfig::from_toml("").unwrap();
        assert_eq!(config, ShadeConfig::default());
        assert_eq!(config.ledger.max_notes_per_batch, DEFAULT_MAX_NOTES_PER_BATCH);
        assert!(!config.protocols.strict_settlement);
    }

    #[test]
    fn test_partial_sections() {
        let config = ShadeConfig::from_toml(
            r#"
            [protocols]
            strict_settlement = true

            [engine]
            rng_seed = 42
            "#,
        )
        .unwrap();

        assert!(config.protocols.strict_settlement);
        assert_eq!(
            config.protocols.max_broadcast_recipients,
            DEFAULT_MAX_BROADCAST_RECIPIENTS
        );
        assert_eq!(config.engine.rng_seed, Some(42));
        assert_eq!(config.ledger, LedgerConfig::default());
    }

    #[test]
    fn test_sample_parses_back() {
        let sample = ShadeConfig::generate_sample();
        let parsed = ShadeConfig::from_toml(&sample).unwrap();
        assert_eq!(parsed.ledger.db_path.as_deref(), Some("./shade-db"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shade.toml");
        fs::write(&path, "[ledger]\nmax_notes_per_batch = 3\n").unwrap();

        let config = ShadeConfig::load_from(&path).unwrap();
        assert!(config.ledger.max_notes_per_batch == 3 || env::var("SHADE_MAX_BATCH_NOTES").is_ok());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ShadeConfig::load_from(&dir.path().join("absent.toml")).is_err());
    }
}
