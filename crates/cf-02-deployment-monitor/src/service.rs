//! Deployment Monitor - wires checkers, supervisor and reconciler together.

use crate::checkers::{ConfirmationChecker, RelayTaskChecker};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, MonitorResult};
use crate::ports::{IndexerPoller, NodeClient, RelayClient};
use crate::reconciler::Reconciler;
use crate::submitter::Submitter;
use crate::supervisor::Supervisor;
use cf_01_pending_store::{ChangeListenerHandle, PendingStoreApi};
use shared_bus::{EventFilter, EventPublisher, InMemoryEventBus};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Running monitor instance.
///
/// The reconciler subscribes before the supervisor scans the store, so the
/// first terminal event of a resumed checker is never missed.
pub struct DeploymentMonitor<N, R, I>
where
    N: NodeClient + 'static,
    R: RelayClient + 'static,
    I: IndexerPoller + 'static,
{
    store: Arc<dyn PendingStoreApi>,
    bus: Arc<InMemoryEventBus>,
    supervisor: Arc<Supervisor<N, R>>,
    reconciler: Arc<Reconciler<I>>,
    reconciler_task: Option<JoinHandle<()>>,
    listener: Option<ChangeListenerHandle>,
}

impl<N, R, I> DeploymentMonitor<N, R, I>
where
    N: NodeClient + 'static,
    R: RelayClient + 'static,
    I: IndexerPoller + 'static,
{
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: MonitorConfig,
        store: Arc<dyn PendingStoreApi>,
        bus: Arc<InMemoryEventBus>,
        node: Arc<N>,
        relay: Arc<R>,
        indexer: Arc<I>,
    ) -> MonitorResult<Self> {
        config.validate()?;
        let publisher: Arc<dyn EventPublisher> = bus.clone();

        let confirmation = Arc::new(ConfirmationChecker::new(
            node,
            Arc::clone(&publisher),
            config.confirmation,
        ));
        let relay = Arc::new(RelayTaskChecker::new(
            relay,
            Arc::clone(&publisher),
            config.relay,
        ));
        let supervisor = Arc::new(Supervisor::new(Arc::clone(&store), confirmation, relay));
        let reconciler = Arc::new(
            Reconciler::new(Arc::clone(&store), publisher, indexer)
                .with_stalled_checkers(supervisor.clone()),
        );

        Ok(Self {
            store,
            bus,
            supervisor,
            reconciler,
            reconciler_task: None,
            listener: None,
        })
    }

    pub fn start(&mut self) -> MonitorResult<()> {
        if self.reconciler_task.is_some() {
            return Err(MonitorError::AlreadyStarted);
        }

        let subscription = self.bus.subscribe(EventFilter::all());
        self.reconciler_task = Some(tokio::spawn(Arc::clone(&self.reconciler).run(subscription)));
        self.listener = Some(self.supervisor.start()?);

        info!("[cf-02] 🚀 Deployment monitor started");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.reconciler_task.is_some()
    }

    /// Stop reacting to store changes, abort checkers and the reconciler.
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.unsubscribe();
        }
        self.supervisor.shutdown();
        if let Some(task) = self.reconciler_task.take() {
            task.abort();
        }
        info!("[cf-02] 🛑 Deployment monitor stopped");
    }

    /// Submission entry points sharing this monitor's store and bus.
    pub fn submitter(&self) -> Submitter {
        Submitter::new(Arc::clone(&self.store), self.bus.clone())
    }

    pub fn supervisor(&self) -> &Arc<Supervisor<N, R>> {
        &self.supervisor
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    pub fn store(&self) -> &Arc<dyn PendingStoreApi> {
        &self.store
    }
}

impl<N, R, I> Drop for DeploymentMonitor<N, R, I>
where
    N: NodeClient + 'static,
    R: RelayClient + 'static,
    I: IndexerPoller + 'static,
{
    fn drop(&mut self) {
        if self.is_running() {
            self.shutdown();
        }
    }
}
