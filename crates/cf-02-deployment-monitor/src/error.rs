//! # Error Types
//!
//! Collaborator errors never escape a checker: every failure path is folded
//! into a terminal `DeploymentFailure`. These types describe what the
//! collaborators reported before that folding.

use crate::domain::{ReplacementReason, TransactionReceipt};
use cf_01_pending_store::StoreError;
use shared_types::TxHash;
use thiserror::Error;

/// Errors reported by the node client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// Another transaction with the same sender nonce was mined instead.
    #[error("Transaction {reason}")]
    Replaced {
        reason: ReplacementReason,
        replacement: Option<TxHash>,
        receipt: Option<TransactionReceipt>,
    },

    #[error("Node transport error: {0}")]
    Transport(String),

    #[error("Node RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed node response: {0}")]
    Decode(String),

    #[error("Confirmation wait timed out after {after_secs}s")]
    Timeout { after_secs: u64 },
}

impl NodeError {
    /// Receipt attached to the error, if the node produced one.
    pub fn receipt(&self) -> Option<&TransactionReceipt> {
        match self {
            Self::Replaced { receipt, .. } => receipt.as_ref(),
            _ => None,
        }
    }
}

pub type NodeResult<T> = Result<T, NodeError>;

/// Errors reported by the relay client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("Relay transport error: {0}")]
    Transport(String),

    #[error("Relay returned HTTP {status}")]
    Http { status: u16 },

    #[error("Malformed relay response: {0}")]
    Decode(String),

    #[error("Invalid relay URL: {0}")]
    InvalidUrl(String),
}

pub type RelayResult<T> = Result<T, RelayError>;

/// Errors reported by the indexer poller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexerError {
    #[error("Indexer transport error: {0}")]
    Transport(String),

    #[error("Deployment not indexed after {attempts} attempts")]
    NotIndexed { attempts: u32 },
}

pub type IndexerResult<T> = Result<T, IndexerError>;

/// Errors from wiring or driving the monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Monitor already started")]
    AlreadyStarted,

    #[error("Not supported for payment method {0:?}")]
    WrongPaymentMethod(shared_types::PaymentMethod),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

pub type MonitorResult<T> = Result<T, MonitorError>;

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("relay timeout ({timeout_secs}s) must exceed poll interval ({interval_secs}s)")]
    TimeoutBelowInterval {
        timeout_secs: u64,
        interval_secs: u64,
    },
}
