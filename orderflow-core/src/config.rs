//! Service configuration shared by the cache, warm start and pipeline.

use crate::{ConfigError, OrderflowResult};
use std::time::Duration;

/// Cache capacity used when none (or a non-positive one) is configured.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;

/// Number of most recent orders loaded into the cache at startup.
pub const DEFAULT_WARMUP_LIMIT: usize = 200;

/// Core service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Maximum number of orders held in memory.
    pub cache_max_entries: usize,
    /// How many recent orders to load into the cache at startup.
    pub warmup_limit: usize,
    /// Seed the demonstration order when the store is empty.
    pub seed_demo_order: bool,
    /// Pause after a failed receive before polling the source again.
    pub source_retry_delay: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            warmup_limit: DEFAULT_WARMUP_LIMIT,
            seed_demo_order: true,
            source_retry_delay: Duration::from_millis(500),
        }
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse an on/off flag, ignoring case.
fn parse_flag(field: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(field, raw, "expected true/false, yes/no, on/off or 1/0")),
    }
}

impl ServiceConfig {
    /// Environment variables:
    /// - `ORDERFLOW_CACHE_MAX_ENTRIES`: cache capacity, non-positive means default (1000)
    /// - `ORDERFLOW_WARMUP_LIMIT`: orders loaded at startup (default: 200)
    /// - `ORDERFLOW_SEED_DEMO`: seed the demo order into an empty store (default: true)
    /// - `ORDERFLOW_SOURCE_RETRY_MS`: pause after a failed receive (default: 500)
    pub fn from_env() -> OrderflowResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values are errors.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> OrderflowResult<Self> {
        let mut config = Self::default();

        if let Some(raw) = get("ORDERFLOW_CACHE_MAX_ENTRIES") {
            let n: i64 = raw
                .trim()
                .parse()
                .map_err(|_| invalid("ORDERFLOW_CACHE_MAX_ENTRIES", &raw, "not an integer"))?;
            config.cache_max_entries = if n <= 0 {
                DEFAULT_CACHE_MAX_ENTRIES
            } else {
                n as usize
            };
        }
        if let Some(raw) = get("ORDERFLOW_WARMUP_LIMIT") {
            config.warmup_limit = raw
                .trim()
                .parse()
                .map_err(|_| {
                    invalid("ORDERFLOW_WARMUP_LIMIT", &raw, "not a non-negative integer")
                })?;
        }
        if let Some(raw) = get("ORDERFLOW_SEED_DEMO") {
            config.seed_demo_order = parse_flag("ORDERFLOW_SEED_DEMO", &raw)?;
        }
        if let Some(raw) = get("ORDERFLOW_SOURCE_RETRY_MS") {
            config.source_retry_delay = raw
                .trim()
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| {
                    invalid("ORDERFLOW_SOURCE_RETRY_MS", &raw, "not a number of milliseconds")
                })?;
        }
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> OrderflowResult<()> {
        if self.cache_max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_max_entries".to_string(),
                value: "0".to_string(),
                reason: "cache must hold at least one entry".to_string(),
            }
            .into());
        }
        if self.warmup_limit == 0 {
            return Err(invalid("warmup_limit", "0", "must load at least one order").into());
        }
        if self.warmup_limit > self.cache_max_entries {
            return Err(ConfigError::InvalidValue {
                field: "warmup_limit".to_string(),
                value: self.warmup_limit.to_string(),
                reason: format!(
                    "must not exceed cache_max_entries ({})",
                    self.cache_max_entries
                ),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrderflowError;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServiceConfig::default();
        assert_eq!(config.cache_max_entries, 1000);
        assert_eq!(config.warmup_limit, 200);
        assert!(config.seed_demo_order);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = ServiceConfig {
            cache_max_entries: 0,
            ..Default::default()
        };
        let err = config.validate();
        assert_eq!(rejected_field(err).as_deref(), Some("cache_max_entries"));
    }

    #[test]
    fn test_warmup_larger_than_cache_rejected() {
        let config = ServiceConfig {
            cache_max_entries: 10,
            warmup_limit: 11,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    fn rejected_field<T>(result: OrderflowResult<T>) -> Option<String> {
        match result {
            Err(OrderflowError::Config(ConfigError::InvalidValue { field, .. })) => Some(field),
            _ => None,
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() -> OrderflowResult<()> {
        assert_eq!(ServiceConfig::from_lookup(vars(&[]))?, ServiceConfig::default());
        Ok(())
    }

    #[test]
    fn test_from_lookup_reads_every_variable() -> OrderflowResult<()> {
        let config = ServiceConfig::from_lookup(vars(&[
            ("ORDERFLOW_CACHE_MAX_ENTRIES", "50"),
            ("ORDERFLOW_WARMUP_LIMIT", "20"),
            ("ORDERFLOW_SEED_DEMO", "false"),
            ("ORDERFLOW_SOURCE_RETRY_MS", "250"),
        ]))?;
        assert_eq!(config.cache_max_entries, 50);
        assert_eq!(config.warmup_limit, 20);
        assert!(!config.seed_demo_order);
        assert_eq!(config.source_retry_delay, Duration::from_millis(250));
        Ok(())
    }

    #[test]
    fn test_non_positive_capacity_falls_back_to_default() -> OrderflowResult<()> {
        for raw in ["0", "-5"] {
            let config =
                ServiceConfig::from_lookup(vars(&[("ORDERFLOW_CACHE_MAX_ENTRIES", raw)]))?;
            assert_eq!(config.cache_max_entries, DEFAULT_CACHE_MAX_ENTRIES);
        }
        Ok(())
    }

    #[test]
    fn test_seed_flag_ignores_case() -> OrderflowResult<()> {
        for raw in ["TRUE", "True", "yes", "ON", "1"] {
            let config = ServiceConfig::from_lookup(vars(&[("ORDERFLOW_SEED_DEMO", raw)]))?;
            assert!(config.seed_demo_order, "{} should enable seeding", raw);
        }
        for raw in ["FALSE", "no", "Off", "0"] {
            let config = ServiceConfig::from_lookup(vars(&[("ORDERFLOW_SEED_DEMO", raw)]))?;
            assert!(!config.seed_demo_order, "{} should disable seeding", raw);
        }
        Ok(())
    }

    #[test]
    fn test_unrecognized_seed_flag_is_reported() {
        let err = ServiceConfig::from_lookup(vars(&[("ORDERFLOW_SEED_DEMO", "maybe")]));
        assert_eq!(rejected_field(err).as_deref(), Some("ORDERFLOW_SEED_DEMO"));
    }

    #[test]
    fn test_unparseable_numbers_are_reported() {
        for key in [
            "ORDERFLOW_CACHE_MAX_ENTRIES",
            "ORDERFLOW_WARMUP_LIMIT",
            "ORDERFLOW_SOURCE_RETRY_MS",
        ] {
            assert!(
                ServiceConfig::from_lookup(vars(&[(key, "lots")])).is_err(),
                "{} accepted garbage",
                key
            );
        }
    }

    #[test]
    fn test_zero_warmup_limit_rejected() {
        let config = ServiceConfig {
            warmup_limit: 0,
            ..Default::default()
        };
        assert_eq!(rejected_field(config.validate()).as_deref(), Some("warmup_limit"));
    }
}
