//! # Error Types
//!
//! Parse errors for identifiers and the terminal failure taxonomy carried by
//! `Reverted` / `Failed` events.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::RelayTaskState;

/// Errors raised while parsing hex identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input is not valid hex.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded value has the wrong width.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Why a pending deployment ended in `Reverted` or `Failed`.
///
/// Every checker failure path terminates in one of these, so consumers never
/// have to inspect transport-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DeploymentFailure {
    /// Lookup retries exhausted without the node ever returning the transaction.
    #[error("Transaction not found after {attempts} lookup attempts")]
    TransactionNotFound { attempts: u32 },

    /// Mined, but execution reverted.
    #[error("Transaction reverted")]
    TransactionReverted,

    /// Confirmation resolved without a receipt (node/client bug).
    #[error("Transaction receipt missing after confirmation")]
    MissingReceipt,

    /// Any other node-side failure while awaiting the transaction.
    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    /// The relay reported a terminal failure state for the task.
    #[error("Relay task failed with state {state}")]
    RelayTaskFailed { state: RelayTaskState },

    /// The relay never reported a terminal state within the polling budget.
    #[error("Relay task timed out after {after_secs}s")]
    RelayTimeout { after_secs: u64 },
}

impl DeploymentFailure {
    /// Failures that indicate a broken node or client rather than a user-facing outcome.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::MissingReceipt)
    }
}
