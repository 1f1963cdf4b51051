//! Configuration for the analytics service.
//!
//! Loaded in layers:
//! 1. Defaults in code
//! 2. Optional file `config/bloomstock.{toml,yaml,json}`
//! 3. Environment overrides with the `BLOOMSTOCK` prefix and `__` as section
//!    separator, e.g. `BLOOMSTOCK_CACHE__TTL_SECS=180`

use std::time::Duration;

use config::{Environment, File};
use serde::Deserialize;
use thiserror::Error;

use bloomstock_analytics::AnalyticsPolicy;

pub const DEFAULT_FILE: &str = "config/bloomstock";
pub const ENV_PREFIX: &str = "BLOOMSTOCK";

/// `BLOOMSTOCK_` then `__` between nested keys.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration `{field}`: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Snapshot time-to-live, 60 to 300 seconds.
    pub ttl_secs: u64,
    pub key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 120,
            key: "inventory_snapshot".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PassConfig {
    /// Concurrent per-item workers; the CPU count when unset.
    pub max_workers: Option<usize>,
    pub item_timeout_ms: u64,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            item_timeout_ms: 5_000,
        }
    }
}

impl PassConfig {
    pub fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_millis(self.item_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/bloomstock".to_string(),
            max_connections: 10,
            acquire_timeout_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub cache: CacheConfig,
    pub pass: PassConfig,
    pub policy: AnalyticsPolicy,
    pub database: DatabaseConfig,
}

impl AnalyticsConfig {
    /// Load from `config/bloomstock.*` and `BLOOMSTOCK_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_FILE)
    }

    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        Self::load_with(file, environment())
    }

    fn load_with(file: &str, env: Environment) -> Result<Self, ConfigError> {
        let loaded: Self = config::Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(60..=300).contains(&self.cache.ttl_secs) {
            return Err(ConfigError::invalid(
                "cache.ttl_secs",
                format!("must be within 60..=300 seconds, got {}", self.cache.ttl_secs),
            ));
        }
        if self.cache.key.trim().is_empty() {
            return Err(ConfigError::invalid("cache.key", "cannot be empty"));
        }
        if self.pass.max_workers == Some(0) {
            return Err(ConfigError::invalid("pass.max_workers", "must be at least 1"));
        }
        if self.pass.item_timeout_ms == 0 {
            return Err(ConfigError::invalid("pass.item_timeout_ms", "must be positive"));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid(
                "database.max_connections",
                "must be at least 1",
            ));
        }
        self.policy
            .validate()
            .map_err(|e| ConfigError::invalid("policy", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(vars: &[(&str, &str)]) -> Environment {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(vars))
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = AnalyticsConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.cache.ttl(), Duration::from_secs(120));
        assert_eq!(cfg.cache.key, "inventory_snapshot");
        assert_eq!(cfg.pass.item_timeout(), Duration::from_secs(5));
        assert!(cfg.pass.worker_count() >= 1);
    }

    #[test]
    fn ttl_outside_bounds_is_rejected() {
        let mut cfg = AnalyticsConfig::default();
        cfg.cache.ttl_secs = 30;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "cache.ttl_secs"
        ));
        cfg.cache.ttl_secs = 301;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let mut cfg = AnalyticsConfig::default();
        cfg.policy.service_level = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "policy"
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = AnalyticsConfig::load_with("config/does-not-exist", env_of(&[])).unwrap();
        assert_eq!(cfg, AnalyticsConfig::default());
    }

    #[test]
    fn prefixed_variables_override_nested_keys() {
        let cfg = AnalyticsConfig::load_with(
            "config/does-not-exist",
            env_of(&[
                ("BLOOMSTOCK_CACHE__TTL_SECS", "180"),
                ("BLOOMSTOCK_POLICY__SERVICE_LEVEL", "0.99"),
                ("BLOOMSTOCK_PASS__MAX_WORKERS", "3"),
                ("UNRELATED_CACHE__TTL_SECS", "90"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.cache.ttl_secs, 180);
        assert_eq!(cfg.policy.service_level, 0.99);
        assert_eq!(cfg.pass.max_workers, Some(3));
        assert_eq!(cfg.cache.key, "inventory_snapshot");
    }

    #[test]
    fn out_of_range_variable_fails_validation() {
        let err = AnalyticsConfig::load_with(
            "config/does-not-exist",
            env_of(&[("BLOOMSTOCK_CACHE__TTL_SECS", "10")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "cache.ttl_secs"));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg: AnalyticsConfig = config::Config::builder()
            .set_override("cache.ttl_secs", 240)
            .unwrap()
            .set_override("policy.service_level", 0.99)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.cache.ttl_secs, 240);
        assert_eq!(cfg.cache.key, "inventory_snapshot");
        assert_eq!(cfg.policy.service_level, 0.99);
        assert_eq!(cfg.policy.lookback_weeks, 12);
    }
}
