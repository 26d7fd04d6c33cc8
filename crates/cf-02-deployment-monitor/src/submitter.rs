//! Entry points for the component that actually broadcasts creations.
//!
//! Each call writes the store first and then announces the change on the
//! bus, so the supervisor and the reconciler see the same state.

use crate::error::{MonitorError, MonitorResult};
use cf_01_pending_store::PendingStoreApi;
use chrono::Utc;
use shared_bus::{DeploymentContext, DeploymentEvent, EventPublisher};
use shared_types::{
    DeploymentKey, DeploymentStatus, GroupKey, PaymentMethod, PendingDeployment, RelayTaskId,
    TxHash,
};
use std::sync::Arc;
use tracing::info;

pub struct Submitter {
    store: Arc<dyn PendingStoreApi>,
    publisher: Arc<dyn EventPublisher>,
}

impl Submitter {
    pub fn new(store: Arc<dyn PendingStoreApi>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Record a deployment nothing has been broadcast for yet.
    pub async fn register(&self, mut deployment: PendingDeployment) -> MonitorResult<DeploymentContext> {
        deployment.status = DeploymentStatus::AwaitingExecution;
        deployment.tx_hash = None;
        deployment.relay_task_id = None;
        deployment.error = None;
        let context = ensure_context(&mut deployment);

        self.store.upsert(deployment)?;
        self.publisher
            .publish(DeploymentEvent::AwaitingExecution {
                context: context.clone(),
            })
            .await;
        Ok(context)
    }

    /// A self-paid creation transaction was broadcast.
    pub async fn submit_transaction(
        &self,
        mut deployment: PendingDeployment,
        tx_hash: TxHash,
        start_block: Option<u64>,
    ) -> MonitorResult<DeploymentContext> {
        if deployment.payment_method != PaymentMethod::SelfPaid {
            return Err(MonitorError::WrongPaymentMethod(deployment.payment_method));
        }
        deployment.status = DeploymentStatus::Processing;
        deployment.tx_hash = Some(tx_hash);
        deployment.relay_task_id = None;
        deployment.start_block = start_block;
        deployment.submitted_at = Some(Utc::now());
        deployment.error = None;
        let context = ensure_context(&mut deployment);

        self.store.upsert(deployment)?;
        info!(key = %context.key(), tx = %tx_hash, "[cf-02] 📤 Creation transaction submitted");
        self.publisher
            .publish(DeploymentEvent::Processing {
                context: context.clone(),
                tx_hash,
                start_block,
            })
            .await;
        Ok(context)
    }

    /// A sponsored creation was accepted by the relay.
    pub async fn submit_relay_task(
        &self,
        mut deployment: PendingDeployment,
        task_id: RelayTaskId,
    ) -> MonitorResult<DeploymentContext> {
        if deployment.payment_method != PaymentMethod::Sponsored {
            return Err(MonitorError::WrongPaymentMethod(deployment.payment_method));
        }
        deployment.status = DeploymentStatus::Relaying;
        deployment.relay_task_id = Some(task_id.clone());
        deployment.tx_hash = None;
        deployment.submitted_at = Some(Utc::now());
        deployment.error = None;
        let context = ensure_context(&mut deployment);

        self.store.upsert(deployment)?;
        info!(key = %context.key(), task = %task_id, "[cf-02] 📤 Relay task submitted");
        self.publisher
            .publish(DeploymentEvent::Relaying {
                context: context.clone(),
                task_id,
            })
            .await;
        Ok(context)
    }

    /// Put a `Reverted` / `Failed` entry back to `AwaitingExecution`.
    ///
    /// Returns `false` if there is no such entry or it is not in a failed state.
    pub async fn reset_for_retry(&self, key: &DeploymentKey) -> MonitorResult<bool> {
        let Some(deployment) = self.store.get(key)? else {
            return Ok(false);
        };
        if !matches!(
            deployment.status,
            DeploymentStatus::Reverted | DeploymentStatus::Failed
        ) {
            return Ok(false);
        }
        self.register(deployment).await?;
        Ok(true)
    }

    /// Drop an entry the user abandoned.
    pub fn dismiss(&self, key: &DeploymentKey) -> MonitorResult<bool> {
        Ok(self.store.remove(key)?)
    }
}

fn ensure_context(deployment: &mut PendingDeployment) -> DeploymentContext {
    let group_key = deployment
        .group_key
        .get_or_insert_with(GroupKey::generate)
        .clone();
    DeploymentContext::new(group_key, deployment.network_id.clone(), deployment.address)
}
