//! Chain-side views the checkers work with.

use serde::{Deserialize, Serialize};
use shared_types::{
    Address, DeploymentStatus, PendingDeployment, RelayTaskId, RelayTaskState, TxHash,
};
use std::fmt;

/// A transaction as returned by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTransaction {
    pub hash: TxHash,
    pub from: Address,
    pub nonce: u64,
    pub to: Option<Address>,
    pub value: u128,
    pub input: Vec<u8>,
    /// Set once the transaction is mined.
    pub block_number: Option<u64>,
}

impl NodeTransaction {
    /// Bare transaction known only by hash (sender and payload unknown).
    pub fn with_hash(hash: TxHash) -> Self {
        Self {
            hash,
            from: Address([0; 20]),
            nonce: 0,
            to: None,
            value: 0,
            input: Vec::new(),
            block_number: None,
        }
    }
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    /// Execution status flag (`0x1` on the wire).
    pub success: bool,
}

impl TransactionReceipt {
    pub fn reverted(&self) -> bool {
        !self.success
    }
}

/// How a transaction was superseded by another with the same sender nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplacementReason {
    /// Different payload.
    Replaced,
    /// Same payload, different fee.
    Repriced,
    /// Zero-value self-transfer that voids the original.
    Cancelled,
}

impl ReplacementReason {
    /// Classify `replacement` against the `original` it superseded.
    pub fn classify(original: &NodeTransaction, replacement: &NodeTransaction) -> Self {
        if replacement.to == original.to
            && replacement.input == original.input
            && replacement.value == original.value
        {
            Self::Repriced
        } else if replacement.to == Some(replacement.from)
            && replacement.value == 0
            && replacement.input.is_empty()
        {
            Self::Cancelled
        } else {
            Self::Replaced
        }
    }

    /// Whether the superseding transaction still carries the deployment.
    pub fn keeps_deployment(self) -> bool {
        matches!(self, Self::Replaced | Self::Repriced)
    }
}

impl fmt::Display for ReplacementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replaced => write!(f, "replaced"),
            Self::Repriced => write!(f, "repriced"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Relay status endpoint response for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayTaskStatus {
    pub task_id: RelayTaskId,
    pub state: RelayTaskState,
    pub transaction_hash: Option<TxHash>,
}

/// What a checker should watch for an in-flight entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTarget {
    Transaction {
        tx_hash: TxHash,
        start_block: Option<u64>,
    },
    RelayTask(RelayTaskId),
}

impl WatchTarget {
    /// `None` for entries that are not in flight or lack their reference.
    pub fn for_deployment(deployment: &PendingDeployment) -> Option<Self> {
        match (deployment.status, &deployment.tx_hash, &deployment.relay_task_id) {
            (DeploymentStatus::Processing, Some(tx_hash), _) => Some(Self::Transaction {
                tx_hash: *tx_hash,
                start_block: deployment.start_block,
            }),
            (DeploymentStatus::Relaying, _, Some(task_id)) => {
                Some(Self::RelayTask(task_id.clone()))
            }
            _ => None,
        }
    }
}
