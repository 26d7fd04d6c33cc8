//! # Reconciler
//!
//! Applies bus events to the pending store:
//!
//! | Event        | Store effect                                              |
//! |--------------|-----------------------------------------------------------|
//! | `Processing` | create/update entry with tx hash, keep first `submitted_at` |
//! | `Relaying`   | create/update entry with task id                          |
//! | `Success`    | status `Success`, then poll the indexer and raise `Indexed` |
//! | `Reverted`   | status `Reverted`, error recorded                         |
//! | `Failed`     | status `Failed`, error recorded                           |
//! | `Indexed`    | entry removed                                             |
//!
//! Transitions that would move an entry backwards are logged and ignored.
//!
//! When the bus reports that events were lost, the reconciler drains what is
//! still buffered and then resyncs from the store: `Success` entries get a
//! fresh indexer poll, and in-flight entries whose checker already finished
//! are handed back to the supervisor.

use crate::ports::IndexerPoller;
use cf_01_pending_store::{PendingStoreApi, StoreResult};
use chrono::Utc;
use shared_bus::{
    DeploymentContext, DeploymentEvent, EventPublisher, Subscription, SubscriptionError,
};
use shared_types::{
    DeploymentFailure, DeploymentStatus, PaymentMethod, PendingDeployment, RelayTaskId, TxHash,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of applying a status change to a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// No stored entry for the key.
    Missing,
    /// The change would have moved the entry backwards.
    Rejected,
}

enum Submission {
    Transaction {
        tx_hash: TxHash,
        start_block: Option<u64>,
    },
    RelayTask(RelayTaskId),
}

impl Submission {
    fn status(&self) -> DeploymentStatus {
        match self {
            Self::Transaction { .. } => DeploymentStatus::Processing,
            Self::RelayTask(_) => DeploymentStatus::Relaying,
        }
    }

    fn payment_method(&self) -> PaymentMethod {
        match self {
            Self::Transaction { .. } => PaymentMethod::SelfPaid,
            Self::RelayTask(_) => PaymentMethod::Sponsored,
        }
    }

    fn apply_to(self, deployment: &mut PendingDeployment) {
        deployment.status = self.status();
        deployment.payment_method = self.payment_method();
        match self {
            Self::Transaction {
                tx_hash,
                start_block,
            } => {
                deployment.tx_hash = Some(tx_hash);
                deployment.relay_task_id = None;
                if start_block.is_some() {
                    deployment.start_block = start_block;
                }
            }
            Self::RelayTask(task_id) => {
                deployment.relay_task_id = Some(task_id);
                deployment.tx_hash = None;
            }
        }
    }
}

/// Restarts checkers whose outcome never reached the store.
pub trait StalledCheckers: Send + Sync {
    /// Returns how many checkers were restarted.
    fn rearm_stalled(&self) -> StoreResult<usize>;
}

pub struct Reconciler<I: IndexerPoller + 'static> {
    store: Arc<dyn PendingStoreApi>,
    publisher: Arc<dyn EventPublisher>,
    indexer: Arc<I>,
    stalled: Option<Arc<dyn StalledCheckers>>,
}

impl<I: IndexerPoller + 'static> Reconciler<I> {
    pub fn new(
        store: Arc<dyn PendingStoreApi>,
        publisher: Arc<dyn EventPublisher>,
        indexer: Arc<I>,
    ) -> Self {
        Self {
            store,
            publisher,
            indexer,
            stalled: None,
        }
    }

    /// Hand in-flight entries back to `checkers` when events were lost.
    pub fn with_stalled_checkers(mut self, checkers: Arc<dyn StalledCheckers>) -> Self {
        self.stalled = Some(checkers);
        self
    }

    /// Consume `subscription` until the bus closes.
    pub async fn run(self: Arc<Self>, mut subscription: Subscription) {
        info!("[cf-02] 🔄 Reconciler started");
        loop {
            match subscription.recv_reliable().await {
                Ok(event) => self.handle(event),
                Err(SubscriptionError::Lagged { missed }) => {
                    warn!(missed, "[cf-02] Reconciler fell behind the bus, resyncing from store");
                    for event in subscription.drain() {
                        self.handle(event);
                    }
                    self.resync();
                }
                Err(SubscriptionError::Closed) => break,
            }
        }
        info!("[cf-02] Reconciler stopped (bus closed)");
    }

    /// Recover outcomes whose events were dropped by the bus.
    pub fn resync(self: &Arc<Self>) {
        let deployments = match self.store.list_all() {
            Ok(deployments) => deployments,
            Err(err) => {
                error!(error = %err, "[cf-02] Resync could not list the store");
                return;
            }
        };

        for deployment in deployments {
            if deployment.status == DeploymentStatus::Success {
                debug!(key = %deployment.key(), "[cf-02] Resync re-polls the indexer");
                self.spawn_indexing(DeploymentContext::for_deployment(&deployment));
            }
        }

        if let Some(stalled) = &self.stalled {
            match stalled.rearm_stalled() {
                Ok(rearmed) => info!(rearmed, "[cf-02] Resync finished"),
                Err(err) => error!(error = %err, "[cf-02] Resync could not re-arm checkers"),
            }
        }
    }

    /// Apply one event; store errors are logged and the event dropped.
    pub fn handle(self: &Arc<Self>, event: DeploymentEvent) {
        let key = event.key();
        let kind = event.kind();
        if let Err(err) = self.apply(event) {
            error!(key = %key, kind = ?kind, error = %err, "[cf-02] Failed to reconcile event");
        }
    }

    fn apply(self: &Arc<Self>, event: DeploymentEvent) -> StoreResult<()> {
        match event {
            DeploymentEvent::AwaitingExecution { context } => {
                debug!(key = %context.key(), "[cf-02] Awaiting execution, nothing to reconcile");
            }
            DeploymentEvent::Processing {
                context,
                tx_hash,
                start_block,
            } => self.record_submission(
                &context,
                Submission::Transaction {
                    tx_hash,
                    start_block,
                },
            )?,
            DeploymentEvent::Relaying { context, task_id } => {
                self.record_submission(&context, Submission::RelayTask(task_id))?
            }
            DeploymentEvent::Success { context, .. } => {
                match self.advance(&context, DeploymentStatus::Success, None)? {
                    Applied::Rejected => {}
                    Applied::Updated | Applied::Missing => self.spawn_indexing(context),
                }
            }
            DeploymentEvent::Reverted { context, error } => {
                self.advance(&context, DeploymentStatus::Reverted, Some(error))?;
            }
            DeploymentEvent::Failed { context, error } => {
                self.advance(&context, DeploymentStatus::Failed, Some(error))?;
            }
            DeploymentEvent::Indexed { context } => {
                if self.store.remove(&context.key())? {
                    info!(key = %context.key(), "[cf-02] 📇 Indexed, pending entry pruned");
                }
            }
        }
        Ok(())
    }

    fn record_submission(
        &self,
        context: &DeploymentContext,
        submission: Submission,
    ) -> StoreResult<()> {
        let key = context.key();
        let status = submission.status();

        let mut deployment = match self.store.get(&key)? {
            Some(existing) => {
                if !existing.status.can_advance_to(status) {
                    warn!(key = %key, from = %existing.status, to = %status, "[cf-02] Ignoring backward transition");
                    return Ok(());
                }
                existing
            }
            None => {
                debug!(key = %key, "[cf-02] Creating entry from submission event");
                PendingDeployment::awaiting_execution(
                    context.network_id.clone(),
                    context.address,
                    serde_json::Value::Null,
                    submission.payment_method(),
                )
            }
        };

        submission.apply_to(&mut deployment);
        deployment.submitted_at.get_or_insert_with(Utc::now);
        deployment
            .group_key
            .get_or_insert_with(|| context.group_key.clone());
        deployment.error = None;

        self.store.upsert(deployment)?;
        Ok(())
    }

    fn advance(
        &self,
        context: &DeploymentContext,
        status: DeploymentStatus,
        error: Option<DeploymentFailure>,
    ) -> StoreResult<Applied> {
        let key = context.key();
        let Some(mut deployment) = self.store.get(&key)? else {
            debug!(key = %key, status = %status, "[cf-02] No stored entry to update");
            return Ok(Applied::Missing);
        };

        if !deployment.status.can_advance_to(status) {
            warn!(key = %key, from = %deployment.status, to = %status, "[cf-02] Ignoring backward transition");
            return Ok(Applied::Rejected);
        }

        deployment.status = status;
        if error.is_some() {
            deployment.error = error;
        }
        self.store.upsert(deployment)?;
        Ok(Applied::Updated)
    }

    fn spawn_indexing(self: &Arc<Self>, context: DeploymentContext) {
        let reconciler = Arc::clone(self);
        tokio::spawn(async move {
            let key = context.key();
            if let Err(err) = reconciler
                .indexer
                .poll_until_indexed(&context.network_id, &context.address)
                .await
            {
                warn!(key = %key, error = %err, "[cf-02] Indexer never reported the account, pruning anyway");
            }
            reconciler
                .publisher
                .publish(DeploymentEvent::Indexed { context })
                .await;
        });
    }
}
