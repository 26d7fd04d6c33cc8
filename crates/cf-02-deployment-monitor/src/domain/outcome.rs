use crate::domain::entities::TransactionReceipt;
use crate::error::NodeError;
use shared_bus::{DeploymentContext, DeploymentEvent};
use shared_types::{DeploymentFailure, PaymentMethod};
use tracing::error;

/// Terminal result of one checker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Success,
    Reverted(DeploymentFailure),
    Failed(DeploymentFailure),
}

impl CheckOutcome {
    /// Outcome of a confirmation wait that resolved with (or without) a receipt.
    pub fn from_receipt(receipt: Option<&TransactionReceipt>) -> Self {
        match receipt {
            Some(receipt) if receipt.reverted() => {
                Self::Reverted(DeploymentFailure::TransactionReverted)
            }
            Some(_) => Self::Success,
            None => Self::Failed(DeploymentFailure::MissingReceipt),
        }
    }

    /// Outcome of a confirmation wait that failed.
    ///
    /// A replacement that still carries the deployment counts as success;
    /// an error carrying a reverted receipt is a revert.
    pub fn from_node_error(err: &NodeError) -> Self {
        if let NodeError::Replaced { reason, .. } = err {
            if reason.keeps_deployment() {
                return Self::Success;
            }
        }
        if err.receipt().is_some_and(TransactionReceipt::reverted) {
            return Self::Reverted(DeploymentFailure::TransactionReverted);
        }
        Self::Failed(DeploymentFailure::TransactionFailed {
            reason: err.to_string(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn failure(&self) -> Option<&DeploymentFailure> {
        match self {
            Self::Success => None,
            Self::Reverted(failure) | Self::Failed(failure) => Some(failure),
        }
    }

    /// The terminal event announcing this outcome.
    pub fn into_event(
        self,
        context: DeploymentContext,
        payment_method: PaymentMethod,
    ) -> DeploymentEvent {
        match self {
            Self::Success => DeploymentEvent::Success {
                context,
                payment_method,
            },
            Self::Reverted(error) => DeploymentEvent::Reverted { context, error },
            Self::Failed(error) => {
                if error.is_invariant_violation() {
                    error!(key = %context.key(), %error, "[cf-02] Invariant violation");
                }
                DeploymentEvent::Failed { context, error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ReplacementReason;
    use shared_types::{Address, GroupKey, NetworkId, TxHash};

    fn receipt(success: bool) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: TxHash([1; 32]),
            block_number: 10,
            success,
        }
    }

    fn replaced(reason: ReplacementReason, receipt: Option<TransactionReceipt>) -> NodeError {
        NodeError::Replaced {
            reason,
            replacement: Some(TxHash([2; 32])),
            receipt,
        }
    }

    #[test]
    fn test_receipt_outcomes() {
        assert_eq!(
            CheckOutcome::from_receipt(Some(&receipt(true))),
            CheckOutcome::Success
        );
        assert_eq!(
            CheckOutcome::from_receipt(Some(&receipt(false))),
            CheckOutcome::Reverted(DeploymentFailure::TransactionReverted)
        );
        assert_eq!(
            CheckOutcome::from_receipt(None),
            CheckOutcome::Failed(DeploymentFailure::MissingReceipt)
        );
    }

    #[test]
    fn test_replacements_that_keep_the_deployment_succeed() {
        for reason in [ReplacementReason::Replaced, ReplacementReason::Repriced] {
            assert!(CheckOutcome::from_node_error(&replaced(reason, None)).is_success());
        }
    }

    #[test]
    fn test_cancellation_fails() {
        let outcome = CheckOutcome::from_node_error(&replaced(ReplacementReason::Cancelled, None));
        assert!(matches!(
            outcome,
            CheckOutcome::Failed(DeploymentFailure::TransactionFailed { .. })
        ));
    }

    #[test]
    fn test_cancellation_with_reverted_receipt_reverts() {
        let err = replaced(ReplacementReason::Cancelled, Some(receipt(false)));
        assert_eq!(
            CheckOutcome::from_node_error(&err),
            CheckOutcome::Reverted(DeploymentFailure::TransactionReverted)
        );
    }

    #[test]
    fn test_transport_error_message_is_kept() {
        let outcome = CheckOutcome::from_node_error(&NodeError::Transport("reset".into()));
        assert_eq!(
            outcome.failure().map(ToString::to_string),
            Some("Transaction failed: Node transport error: reset".to_string())
        );
    }

    #[test]
    fn test_into_event_carries_context() {
        let context = DeploymentContext::new(
            GroupKey::from("g"),
            NetworkId::from("1"),
            Address([0xAA; 20]),
        );
        let event = CheckOutcome::Success.into_event(context.clone(), PaymentMethod::Sponsored);
        assert_eq!(
            event,
            DeploymentEvent::Success {
                context,
                payment_method: PaymentMethod::Sponsored,
            }
        );
    }
}
