//! Monitor tuning knobs.

use crate::domain::BackoffSchedule;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cadence shared by relay and indexer polling.
pub const POLLING_INTERVAL: Duration = Duration::from_secs(15);

/// Self-paid confirmation checker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    /// Transaction lookups before giving up.
    pub max_lookup_attempts: u32,
    /// Wait after the first failed lookup; doubles each time.
    pub initial_backoff: Duration,
    /// Confirmations to wait for once the transaction is found.
    pub confirmations: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            max_lookup_attempts: 8,
            initial_backoff: Duration::from_secs(1),
            confirmations: 1,
        }
    }
}

impl ConfirmationConfig {
    pub fn backoff(&self) -> BackoffSchedule {
        BackoffSchedule::new(self.initial_backoff, self.max_lookup_attempts)
    }
}

/// Sponsored relay checker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub poll_interval: Duration,
    /// Hard budget for the whole polling loop.
    pub timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: POLLING_INTERVAL,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Indexer poller settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            poll_interval: POLLING_INTERVAL,
            max_attempts: 20,
        }
    }
}

/// JSON-RPC node adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRpcConfig {
    pub url: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Wait between receipt polls while awaiting confirmations.
    pub receipt_poll_interval: Duration,
    /// Give up waiting for confirmations after this long.
    pub confirmation_timeout: Duration,
}

impl NodeRpcConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_timeout: Duration::from_secs(10),
            receipt_poll_interval: Duration::from_secs(4),
            confirmation_timeout: Duration::from_secs(600),
        }
    }
}

/// Full monitor configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub confirmation: ConfirmationConfig,
    pub relay: RelayConfig,
    pub indexer: IndexerConfig,
}

impl MonitorConfig {
    /// Tight timings for tests.
    pub fn for_testing() -> Self {
        Self {
            confirmation: ConfirmationConfig {
                max_lookup_attempts: 3,
                initial_backoff: Duration::from_millis(10),
                confirmations: 1,
            },
            relay: RelayConfig {
                poll_interval: Duration::from_millis(10),
                timeout: Duration::from_millis(200),
            },
            indexer: IndexerConfig {
                poll_interval: Duration::from_millis(10),
                max_attempts: 3,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confirmation.max_lookup_attempts == 0 {
            return Err(ConfigError::Zero {
                field: "confirmation.max_lookup_attempts",
            });
        }
        if self.confirmation.confirmations == 0 {
            return Err(ConfigError::Zero {
                field: "confirmation.confirmations",
            });
        }
        if self.relay.poll_interval.is_zero() {
            return Err(ConfigError::Zero {
                field: "relay.poll_interval",
            });
        }
        if self.relay.timeout <= self.relay.poll_interval {
            return Err(ConfigError::TimeoutBelowInterval {
                timeout_secs: self.relay.timeout.as_secs(),
                interval_secs: self.relay.poll_interval.as_secs(),
            });
        }
        if self.indexer.max_attempts == 0 {
            return Err(ConfigError::Zero {
                field: "indexer.max_attempts",
            });
        }
        Ok(())
    }
}
