//! Self-paid confirmation checker.
//!
//! 1. Look the transaction up with doubling backoff until the node knows it.
//! 2. Follow replacements from the submission block, if one was recorded.
//! 3. Wait for confirmations and classify the receipt.

use crate::config::ConfirmationConfig;
use crate::domain::{CheckOutcome, NodeTransaction, TransactionReceipt};
use crate::error::NodeResult;
use crate::ports::NodeClient;
use shared_bus::{DeploymentContext, EventPublisher};
use shared_types::{DeploymentFailure, PaymentMethod, TxHash};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Watches one self-paid creation transaction to a terminal outcome.
pub struct ConfirmationChecker<N: NodeClient> {
    node: Arc<N>,
    publisher: Arc<dyn EventPublisher>,
    config: ConfirmationConfig,
}

impl<N: NodeClient> ConfirmationChecker<N> {
    pub fn new(node: Arc<N>, publisher: Arc<dyn EventPublisher>, config: ConfirmationConfig) -> Self {
        Self {
            node,
            publisher,
            config,
        }
    }

    /// Run to completion and publish the single terminal event.
    pub async fn check(
        &self,
        context: DeploymentContext,
        tx_hash: TxHash,
        start_block: Option<u64>,
    ) -> CheckOutcome {
        let key = context.key();
        info!(key = %key, tx = %tx_hash, "[cf-02] 🔍 Confirmation check started");

        let outcome = self.resolve(tx_hash, start_block).await;
        match outcome.failure() {
            None => info!(key = %key, "[cf-02] ✅ Creation transaction confirmed"),
            Some(failure) => warn!(key = %key, %failure, "[cf-02] ❌ Creation transaction did not succeed"),
        }

        self.publisher
            .publish(outcome.clone().into_event(context, PaymentMethod::SelfPaid))
            .await;
        outcome
    }

    async fn resolve(&self, tx_hash: TxHash, start_block: Option<u64>) -> CheckOutcome {
        let Some(tx) = self.find_transaction(tx_hash).await else {
            return CheckOutcome::Failed(DeploymentFailure::TransactionNotFound {
                attempts: self.config.max_lookup_attempts,
            });
        };

        match self.confirm(tx, start_block).await {
            Ok(receipt) => CheckOutcome::from_receipt(receipt.as_ref()),
            Err(err) => {
                debug!(tx = %tx_hash, error = %err, "[cf-02] Confirmation wait failed");
                CheckOutcome::from_node_error(&err)
            }
        }
    }

    /// Polls with backoff; transport errors count as failed attempts.
    async fn find_transaction(&self, tx_hash: TxHash) -> Option<NodeTransaction> {
        let schedule = self.config.backoff();

        for attempt in 1..=schedule.max_attempts() {
            match self.node.get_transaction(tx_hash).await {
                Ok(Some(tx)) => {
                    debug!(tx = %tx_hash, attempt, "[cf-02] Transaction found");
                    return Some(tx);
                }
                Ok(None) => debug!(tx = %tx_hash, attempt, "[cf-02] Transaction not yet known"),
                Err(err) => warn!(tx = %tx_hash, attempt, error = %err, "[cf-02] Transaction lookup failed"),
            }

            if let Some(delay) = schedule.delay_after(attempt) {
                tokio::time::sleep(delay).await;
            }
        }

        warn!(
            tx = %tx_hash,
            attempts = schedule.max_attempts(),
            "[cf-02] Transaction never appeared"
        );
        None
    }

    async fn confirm(
        &self,
        tx: NodeTransaction,
        start_block: Option<u64>,
    ) -> NodeResult<Option<TransactionReceipt>> {
        let tx = match start_block {
            Some(block) => self.node.detect_replacement(&tx, block).await?,
            None => tx,
        };
        self.node
            .await_confirmations(&tx, self.config.confirmations)
            .await
    }
}
