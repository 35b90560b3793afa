//! HTTP server and message broker configuration.
//!
//! Loaded from environment variables with defaults suitable for local runs.
//! Each `from_env` delegates to a `from_lookup` that takes the variable source
//! as a closure so parsing can be tested without touching the process env.

use orderflow_core::{ConfigError, OrderflowResult};
use std::net::SocketAddr;
use std::time::Duration;

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Split a comma separated list, dropping blank entries.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ============================================================================
// HTTP SERVER
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_host: String,
    pub port: u16,
    /// Per-request timeout applied to every route.
    pub request_timeout: Duration,
    /// How long to wait for the pipeline to stop after the server exits.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8081,
            request_timeout: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Environment variables:
    /// - `ORDERFLOW_HTTP_BIND`: bind host (default: 0.0.0.0)
    /// - `PORT` or `ORDERFLOW_HTTP_PORT`: port (default: 8081)
    /// - `ORDERFLOW_REQUEST_TIMEOUT_SECS`: per-request timeout (default: 5)
    /// - `ORDERFLOW_SHUTDOWN_GRACE_SECS`: pipeline stop budget (default: 5)
    pub fn from_env() -> OrderflowResult<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> OrderflowResult<Self> {
        let defaults = Self::default();
        let port = match get("PORT").or_else(|| get("ORDERFLOW_HTTP_PORT")) {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                field: "http.port".to_string(),
                value: raw.clone(),
                reason: "not a valid port number".to_string(),
            })?,
            None => defaults.port,
        };
        let secs = |key: &str, default: Duration| {
            get(key)
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Ok(Self {
            bind_host: get("ORDERFLOW_HTTP_BIND").unwrap_or(defaults.bind_host),
            port,
            request_timeout: secs("ORDERFLOW_REQUEST_TIMEOUT_SECS", defaults.request_timeout),
            shutdown_grace: secs("ORDERFLOW_SHUTDOWN_GRACE_SECS", defaults.shutdown_grace),
        })
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> OrderflowResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue {
                field: "http.bind".to_string(),
                value: addr.clone(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

// ============================================================================
// MESSAGE BROKER
// ============================================================================

/// Kafka consumer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub group_id: String,
    /// Where a group with no committed offset starts: `earliest` or `latest`.
    pub offset_reset: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            topic: "orders".to_string(),
            group_id: "orderflow".to_string(),
            offset_reset: "latest".to_string(),
        }
    }
}

impl KafkaConfig {
    /// Environment variables:
    /// - `ORDERFLOW_KAFKA_BROKERS`: comma separated `host:port` list
    /// - `ORDERFLOW_KAFKA_TOPIC`: topic to consume (default: orders)
    /// - `ORDERFLOW_KAFKA_GROUP`: consumer group (default: orderflow)
    /// - `ORDERFLOW_KAFKA_OFFSET_RESET`: `earliest` or `latest` (default: latest)
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            brokers: get("ORDERFLOW_KAFKA_BROKERS")
                .map(|raw| split_csv(&raw))
                .unwrap_or(defaults.brokers),
            topic: get("ORDERFLOW_KAFKA_TOPIC").unwrap_or(defaults.topic),
            group_id: get("ORDERFLOW_KAFKA_GROUP").unwrap_or(defaults.group_id),
            offset_reset: get("ORDERFLOW_KAFKA_OFFSET_RESET")
                .map(|s| s.trim().to_lowercase())
                .unwrap_or(defaults.offset_reset),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> OrderflowResult<()> {
        if self.brokers.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "kafka.brokers".to_string(),
            }
            .into());
        }
        if self.topic.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "kafka.topic".to_string(),
            }
            .into());
        }
        if self.group_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "kafka.group_id".to_string(),
            }
            .into());
        }
        if !matches!(self.offset_reset.as_str(), "earliest" | "latest") {
            return Err(ConfigError::InvalidValue {
                field: "kafka.offset_reset".to_string(),
                value: self.offset_reset.clone(),
                reason: "expected 'earliest' or 'latest'".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Brokers joined the way client libraries expect them.
    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_core::OrderflowError;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_split_csv_drops_blanks() {
        assert_eq!(
            split_csv(" kafka-1:9092, ,kafka-2:9092,"),
            vec!["kafka-1:9092".to_string(), "kafka-2:9092".to_string()]
        );
        assert!(split_csv(" , ").is_empty());
    }

    #[test]
    fn test_server_defaults() -> OrderflowResult<()> {
        let config = ServerConfig::from_lookup(vars(&[]))?;
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr()?.port(), 8081);
        Ok(())
    }

    #[test]
    fn test_port_prefers_platform_variable() -> OrderflowResult<()> {
        let config = ServerConfig::from_lookup(vars(&[
            ("PORT", "9000"),
            ("ORDERFLOW_HTTP_PORT", "9001"),
            ("ORDERFLOW_REQUEST_TIMEOUT_SECS", "2"),
        ]))?;
        assert_eq!(config.port, 9000);
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = ServerConfig::from_lookup(vars(&[("ORDERFLOW_HTTP_PORT", "http")]));
        assert!(matches!(err, Err(OrderflowError::Config(_))));
    }

    #[test]
    fn test_invalid_bind_host_rejected() {
        let config = ServerConfig {
            bind_host: "not a host".to_string(),
            ..Default::default()
        };
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn test_kafka_from_lookup() -> OrderflowResult<()> {
        let config = KafkaConfig::from_lookup(vars(&[
            ("ORDERFLOW_KAFKA_BROKERS", "a:9092,b:9092"),
            ("ORDERFLOW_KAFKA_TOPIC", "orders-v2"),
            ("ORDERFLOW_KAFKA_OFFSET_RESET", " Earliest "),
        ]));
        config.validate()?;
        assert_eq!(config.bootstrap_servers(), "a:9092,b:9092");
        assert_eq!(config.topic, "orders-v2");
        assert_eq!(config.group_id, "orderflow");
        assert_eq!(config.offset_reset, "earliest");
        Ok(())
    }

    #[test]
    fn test_kafka_defaults_start_at_latest() {
        let config = KafkaConfig::default();
        assert_eq!(config.offset_reset, "latest");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_kafka_validation() {
        let blank = KafkaConfig::from_lookup(vars(&[("ORDERFLOW_KAFKA_BROKERS", " , ")]));
        assert!(blank.validate().is_err());

        let bad_reset = KafkaConfig {
            offset_reset: "middle".to_string(),
            ..Default::default()
        };
        assert!(bad_reset.validate().is_err());

        let no_topic = KafkaConfig {
            topic: " ".to_string(),
            ..Default::default()
        };
        assert!(no_topic.validate().is_err());
    }
}
