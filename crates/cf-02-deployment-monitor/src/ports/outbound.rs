//! Outbound ports - collaborators the monitor depends on.

use crate::domain::{NodeTransaction, RelayTaskStatus, TransactionReceipt};
use crate::error::{IndexerResult, NodeResult, RelayResult};
use async_trait::async_trait;
use shared_types::{Address, NetworkId, RelayTaskId, TxHash};

/// Chain node access for self-paid deployments.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Look a transaction up by hash; `Ok(None)` while the node has not seen it.
    async fn get_transaction(&self, hash: TxHash) -> NodeResult<Option<NodeTransaction>>;

    /// Follow `tx` to whatever transaction superseded it since `start_block`.
    ///
    /// Returns `tx` unchanged when nothing replaced it, and
    /// `NodeError::Replaced` once a same-nonce replacement has been mined.
    async fn detect_replacement(
        &self,
        tx: &NodeTransaction,
        start_block: u64,
    ) -> NodeResult<NodeTransaction>;

    /// Wait until `tx` has `confirmations` confirmations.
    async fn await_confirmations(
        &self,
        tx: &NodeTransaction,
        confirmations: u64,
    ) -> NodeResult<Option<TransactionReceipt>>;
}

/// Relay service access for sponsored deployments.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// `Ok(None)` while the relay does not yet know the task.
    async fn get_task_status(&self, task_id: &RelayTaskId) -> RelayResult<Option<RelayTaskStatus>>;
}

/// Indexer access used after an on-chain success.
#[async_trait]
pub trait IndexerPoller: Send + Sync {
    /// Resolves once the indexer reports the account, or errors after its own retry budget.
    async fn poll_until_indexed(&self, network_id: &NetworkId, address: &Address)
        -> IndexerResult<()>;
}
