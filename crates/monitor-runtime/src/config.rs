//! # Runtime Configuration
//!
//! Endpoints and tuning loaded from `CF_*` environment variables.
//!
//! | Variable                | Default                  |
//! |-------------------------|--------------------------|
//! | `CF_NODE_RPC_URL`       | required                 |
//! | `CF_RELAY_URL`          | required                 |
//! | `CF_INDEXER_URL`        | required                 |
//! | `CF_STORE_PATH`         | `./data/pending.json`    |
//! | `CF_POLL_INTERVAL_SECS` | `15`                     |
//! | `CF_RELAY_TIMEOUT_SECS` | `120`                    |
//! | `CF_TX_LOOKUP_ATTEMPTS` | `8`                      |
//! | `CF_LOG_LEVEL`          | `info`                   |
//! | `CF_JSON_LOGS`          | `false`                  |

use cf_02_deployment_monitor::{ConfigError, MonitorConfig, NodeRpcConfig};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeConfigError {
    #[error("{var} must be set")]
    Missing { var: &'static str },

    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error(transparent)]
    Monitor(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub node: NodeRpcConfig,
    pub relay_url: String,
    pub indexer_url: String,
    pub store_path: PathBuf,
    pub monitor: MonitorConfig,
    pub log_level: String,
    pub json_logs: bool,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, RuntimeConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RuntimeConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|value| !value.trim().is_empty())
                .ok_or(RuntimeConfigError::Missing { var })
        };

        let mut monitor = MonitorConfig::default();
        if let Some(secs) = parse_var::<u64, _>(&lookup, "CF_POLL_INTERVAL_SECS")? {
            monitor.relay.poll_interval = Duration::from_secs(secs);
            monitor.indexer.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "CF_RELAY_TIMEOUT_SECS")? {
            monitor.relay.timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_var::<u32, _>(&lookup, "CF_TX_LOOKUP_ATTEMPTS")? {
            monitor.confirmation.max_lookup_attempts = attempts;
        }

        let config = Self {
            node: NodeRpcConfig::new(required("CF_NODE_RPC_URL")?),
            relay_url: required("CF_RELAY_URL")?,
            indexer_url: required("CF_INDEXER_URL")?,
            store_path: lookup("CF_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/pending.json")),
            monitor,
            log_level: lookup("CF_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            json_logs: parse_bool(&lookup, "CF_JSON_LOGS")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RuntimeConfigError> {
        Ok(self.monitor.validate()?)
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, RuntimeConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| RuntimeConfigError::Invalid { var, value })
        })
        .transpose()
}

fn parse_bool<F>(lookup: &F, var: &'static str) -> Result<bool, RuntimeConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some("1") | Some("true") | Some("TRUE") => Ok(true),
        Some("0") | Some("false") | Some("FALSE") => Ok(false),
        Some(other) => Err(RuntimeConfigError::Invalid {
            var,
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| vars.get(var).cloned()
    }

    const ENDPOINTS: [(&str, &str); 3] = [
        ("CF_NODE_RPC_URL", "http://node:8545"),
        ("CF_RELAY_URL", "http://relay"),
        ("CF_INDEXER_URL", "http://indexer"),
    ];

    #[test]
    fn test_defaults_with_endpoints() {
        let config = RuntimeConfig::from_lookup(lookup(&ENDPOINTS)).unwrap();
        assert_eq!(config.node.url, "http://node:8545");
        assert_eq!(config.store_path, PathBuf::from("./data/pending.json"));
        assert_eq!(config.monitor, MonitorConfig::default());
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_missing_endpoint() {
        let result = RuntimeConfig::from_lookup(lookup(&ENDPOINTS[..2]));
        assert_eq!(
            result,
            Err(RuntimeConfigError::Missing {
                var: "CF_INDEXER_URL"
            })
        );
    }

    #[test]
    fn test_overrides() {
        let mut pairs = ENDPOINTS.to_vec();
        pairs.extend([
            ("CF_POLL_INTERVAL_SECS", "5"),
            ("CF_RELAY_TIMEOUT_SECS", "60"),
            ("CF_TX_LOOKUP_ATTEMPTS", "4"),
            ("CF_JSON_LOGS", "true"),
            ("CF_STORE_PATH", "/tmp/pending.json"),
        ]);
        let config = RuntimeConfig::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.monitor.relay.poll_interval, Duration::from_secs(5));
        assert_eq!(config.monitor.indexer.poll_interval, Duration::from_secs(5));
        assert_eq!(config.monitor.relay.timeout, Duration::from_secs(60));
        assert_eq!(config.monitor.confirmation.max_lookup_attempts, 4);
        assert!(config.json_logs);
        assert_eq!(config.store_path, PathBuf::from("/tmp/pending.json"));
    }

    #[test]
    fn test_invalid_number() {
        let mut pairs = ENDPOINTS.to_vec();
        pairs.push(("CF_TX_LOOKUP_ATTEMPTS", "many"));
        assert!(matches!(
            RuntimeConfig::from_lookup(lookup(&pairs)),
            Err(RuntimeConfigError::Invalid {
                var: "CF_TX_LOOKUP_ATTEMPTS",
                ..
            })
        ));
    }

    #[test]
    fn test_timeout_must_exceed_interval() {
        let mut pairs = ENDPOINTS.to_vec();
        pairs.push(("CF_RELAY_TIMEOUT_SECS", "10"));
        assert!(matches!(
            RuntimeConfig::from_lookup(lookup(&pairs)),
            Err(RuntimeConfigError::Monitor(
                ConfigError::TimeoutBelowInterval { .. }
            ))
        ));
    }
}
