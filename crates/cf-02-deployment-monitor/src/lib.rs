//! # cf-02-deployment-monitor
//!
//! Drives every pending deployment to a terminal outcome and reconciles the
//! pending store with what the node, the relay and the indexer report.
//!
//! ## Flow
//!
//! ```text
//!  Submitter ──upsert──→ Pending Store ──on_change──→ Supervisor
//!      │                      ↑                          │ spawn (one per key)
//!      │ Processing/          │ upsert/remove            ▼
//!      │ Relaying             │                 ┌──────────────────┐
//!      ▼                      │                 │ConfirmationChecker│ (self-paid)
//!  ┌────────┐  subscribe  ┌───┴──────┐          │ RelayTaskChecker │ (sponsored)
//!  │  Bus   │ ──────────→ │Reconciler│          └────────┬─────────┘
//!  └────────┘             └──────────┘                   │
//!      ↑   Success/Reverted/Failed                       │
//!      └─────────────────────────────────────────────────┘
//!      ↑   Indexed (after indexer poll)
//!      └── Reconciler
//! ```
//!
//! ## Guarantees
//!
//! - At most one checker per `(network, address)` at a time.
//! - Each checker publishes exactly one terminal event.
//! - Store status never moves backwards; `Indexed` entries are removed.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod checkers;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod reconciler;
pub mod service;
pub mod submitter;
pub mod supervisor;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::{HttpIndexerPoller, HttpRelayClient, JsonRpcNodeClient};
pub use checkers::{ConfirmationChecker, RelayTaskChecker};
pub use config::{
    ConfirmationConfig, IndexerConfig, MonitorConfig, NodeRpcConfig, RelayConfig,
    POLLING_INTERVAL,
};
pub use domain::{
    BackoffSchedule, CheckOutcome, NodeTransaction, RelayTaskStatus, ReplacementReason,
    TransactionReceipt, WatchTarget,
};
pub use error::{
    ConfigError, IndexerError, IndexerResult, MonitorError, MonitorResult, NodeError, NodeResult,
    RelayError, RelayResult,
};
pub use ports::{IndexerPoller, NodeClient, RelayClient};
pub use reconciler::{Reconciler, StalledCheckers};
pub use service::DeploymentMonitor;
pub use submitter::Submitter;
pub use supervisor::Supervisor;
