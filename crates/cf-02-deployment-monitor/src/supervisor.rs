//! # Checker Supervisor
//!
//! Starts at most one checker per pending entry.
//!
//! ## Triggers
//!
//! - Startup: every in-flight entry already in the store.
//! - Store changes: every upsert into `Processing` / `Relaying`.
//! - Resync: in-flight entries whose checker already finished, after the
//!   reconciler lost events.
//!
//! ## De-duplication
//!
//! A key is marked by storing its checker's handle in the monitored map.
//! The mark, the spawn and the insert happen under one lock, so concurrent
//! notifications for the same key start one checker and a concurrent
//! release either sees the handle or runs before the mark exists.
//! The mark is cleared when the entry returns to `AwaitingExecution`, ends
//! `Reverted` / `Failed`, or is removed, which lets a retried submission be
//! watched again.

use crate::checkers::{ConfirmationChecker, RelayTaskChecker};
use crate::domain::WatchTarget;
use crate::ports::{NodeClient, RelayClient};
use crate::reconciler::StalledCheckers;
use cf_01_pending_store::{ChangeListenerHandle, PendingStoreApi, StoreChange, StoreResult};
use parking_lot::Mutex;
use shared_bus::DeploymentContext;
use shared_types::{DeploymentKey, DeploymentStatus, PendingDeployment};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct Supervisor<N: NodeClient + 'static, R: RelayClient + 'static> {
    store: Arc<dyn PendingStoreApi>,
    confirmation: Arc<ConfirmationChecker<N>>,
    relay: Arc<RelayTaskChecker<R>>,
    /// Store listeners run synchronously on the writer's thread, so checkers
    /// are spawned onto the runtime captured at construction.
    runtime: Handle,
    monitored: Mutex<HashMap<DeploymentKey, JoinHandle<()>>>,
    checkers_started: AtomicU64,
}

impl<N: NodeClient + 'static, R: RelayClient + 'static> Supervisor<N, R> {
    /// Must be called from within a tokio runtime.
    pub fn new(
        store: Arc<dyn PendingStoreApi>,
        confirmation: Arc<ConfirmationChecker<N>>,
        relay: Arc<RelayTaskChecker<R>>,
    ) -> Self {
        Self::with_runtime(store, confirmation, relay, Handle::current())
    }

    pub fn with_runtime(
        store: Arc<dyn PendingStoreApi>,
        confirmation: Arc<ConfirmationChecker<N>>,
        relay: Arc<RelayTaskChecker<R>>,
        runtime: Handle,
    ) -> Self {
        Self {
            store,
            confirmation,
            relay,
            runtime,
            monitored: Mutex::new(HashMap::new()),
            checkers_started: AtomicU64::new(0),
        }
    }

    /// Subscribe to store changes, then scan existing entries.
    ///
    /// Registering first means no change between the scan and the
    /// subscription is missed; an entry seen by both is de-duplicated.
    pub fn start(self: &Arc<Self>) -> StoreResult<ChangeListenerHandle> {
        let supervisor = Arc::downgrade(self);
        let handle = self.store.on_change(Arc::new(move |change: &StoreChange| {
            if let Some(supervisor) = supervisor.upgrade() {
                supervisor.handle_change(change);
            }
        }));

        let existing = self.store.list_all()?;
        info!(
            "[cf-02] 🚀 Supervisor started with {} stored entries",
            existing.len()
        );
        for deployment in &existing {
            self.evaluate(deployment);
        }
        Ok(handle)
    }

    /// React to one store change.
    pub fn handle_change(&self, change: &StoreChange) {
        match change {
            StoreChange::Upserted(deployment) => self.evaluate(deployment),
            StoreChange::Removed(key) => self.release(key),
        }
    }

    fn evaluate(&self, deployment: &PendingDeployment) {
        let key = deployment.key();
        let status = deployment.status;
        if status.is_in_flight() {
            let Some(target) = WatchTarget::for_deployment(deployment) else {
                warn!(key = %key, %status, "[cf-02] In-flight entry has no tracking reference");
                return;
            };
            match self.monitored.lock().entry(key) {
                Entry::Occupied(slot) => debug!(key = %slot.key(), "[cf-02] Already monitored"),
                Entry::Vacant(slot) => {
                    let context = DeploymentContext::for_deployment(deployment);
                    slot.insert(self.launch(context, target));
                }
            }
        } else if status == DeploymentStatus::AwaitingExecution || status.is_terminal() {
            self.release(&key);
        }
    }

    /// Forget `key`, aborting a checker that is still watching it.
    fn release(&self, key: &DeploymentKey) {
        let task = self.monitored.lock().remove(key);
        if let Some(task) = task {
            task.abort();
            debug!(key = %key, "[cf-02] Monitoring released");
        }
    }

    /// Spawn the checker for `target`. Callers hold the monitored lock.
    fn launch(&self, context: DeploymentContext, target: WatchTarget) -> JoinHandle<()> {
        let key = context.key();
        self.checkers_started.fetch_add(1, Ordering::SeqCst);

        match target {
            WatchTarget::Transaction {
                tx_hash,
                start_block,
            } => {
                info!(key = %key, tx = %tx_hash, "[cf-02] Starting confirmation checker");
                let checker = Arc::clone(&self.confirmation);
                self.runtime.spawn(async move {
                    checker.check(context, tx_hash, start_block).await;
                })
            }
            WatchTarget::RelayTask(task_id) => {
                info!(key = %key, task = %task_id, "[cf-02] Starting relay checker");
                let checker = Arc::clone(&self.relay);
                self.runtime.spawn(async move {
                    checker.check(context, task_id).await;
                })
            }
        }
    }

    /// Restart checkers for in-flight entries whose checker already finished
    /// (or never ran) without the entry leaving `Processing` / `Relaying`.
    pub fn rearm_stalled(&self) -> StoreResult<usize> {
        let mut rearmed = 0;
        for deployment in self.store.list_all()? {
            if !deployment.status.is_in_flight() {
                continue;
            }
            let Some(target) = WatchTarget::for_deployment(&deployment) else {
                continue;
            };

            let key = deployment.key();
            let mut monitored = self.monitored.lock();
            if monitored.get(&key).is_some_and(|task| !task.is_finished()) {
                continue;
            }
            warn!(key = %key, status = %deployment.status, "[cf-02] Re-arming stalled checker");
            let task = self.launch(DeploymentContext::for_deployment(&deployment), target);
            monitored.insert(key, task);
            rearmed += 1;
        }
        Ok(rearmed)
    }

    pub fn is_monitored(&self, key: &DeploymentKey) -> bool {
        self.monitored.lock().contains_key(key)
    }

    pub fn monitored_count(&self) -> usize {
        self.monitored.lock().len()
    }

    /// Checkers launched since construction.
    pub fn checkers_started(&self) -> u64 {
        self.checkers_started.load(Ordering::SeqCst)
    }

    /// Abort every running checker and forget all marks.
    pub fn shutdown(&self) {
        let tasks: Vec<_> = self.monitored.lock().drain().map(|(_, task)| task).collect();
        for task in &tasks {
            task.abort();
        }
        info!("[cf-02] 🛑 Supervisor stopped ({} checkers aborted)", tasks.len());
    }
}

impl<N: NodeClient + 'static, R: RelayClient + 'static> StalledCheckers for Supervisor<N, R> {
    fn rearm_stalled(&self) -> StoreResult<usize> {
        Supervisor::rearm_stalled(self)
    }
}
