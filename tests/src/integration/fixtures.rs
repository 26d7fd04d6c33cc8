//! Shared wiring for the integration flows.

use cf_01_pending_store::{InMemoryKVStore, KeyValueStore, PendingDeploymentStore};
use cf_02_deployment_monitor::test_utils::{
    MockIndexerPoller, ScriptedNodeClient, ScriptedRelayClient,
};
use cf_02_deployment_monitor::{DeploymentMonitor, MonitorConfig};
use shared_bus::{DeploymentEvent, EventFilter, EventKind, InMemoryEventBus, Subscription};
use std::sync::Arc;
use std::time::Duration;

pub type TestMonitor =
    DeploymentMonitor<ScriptedNodeClient, ScriptedRelayClient, MockIndexerPoller>;

pub struct System<K: KeyValueStore + 'static = InMemoryKVStore> {
    pub store: Arc<PendingDeploymentStore<K>>,
    pub node: Arc<ScriptedNodeClient>,
    pub relay: Arc<ScriptedRelayClient>,
    pub indexer: Arc<MockIndexerPoller>,
    pub monitor: TestMonitor,
    /// Every event published after construction.
    pub events: Subscription,
}

impl System<InMemoryKVStore> {
    pub fn in_memory(node: ScriptedNodeClient, relay: ScriptedRelayClient) -> Self {
        Self::with_backend(InMemoryKVStore::new(), node, relay)
    }
}

impl<K: KeyValueStore + 'static> System<K> {
    /// Wire a stopped monitor; call `monitor.start()` to run it.
    pub fn with_backend(backend: K, node: ScriptedNodeClient, relay: ScriptedRelayClient) -> Self {
        let store = Arc::new(PendingDeploymentStore::new(backend));
        let bus = Arc::new(InMemoryEventBus::new());
        let node = Arc::new(node);
        let relay = Arc::new(relay);
        let indexer = Arc::new(MockIndexerPoller::with_delay(Duration::from_secs(30)));
        let events = bus.subscribe(EventFilter::all());

        let monitor = DeploymentMonitor::new(
            MonitorConfig::default(),
            store.clone(),
            bus,
            node.clone(),
            relay.clone(),
            indexer.clone(),
        )
        .unwrap();

        Self {
            store,
            node,
            relay,
            indexer,
            monitor,
            events,
        }
    }

    /// Receive events until one of `kind` arrives; returns every kind seen.
    pub async fn events_until(&mut self, kind: EventKind) -> Vec<DeploymentEvent> {
        let mut seen = Vec::new();
        while let Some(event) = self.events.recv().await {
            let done = event.kind() == kind;
            seen.push(event);
            if done {
                break;
            }
        }
        seen
    }
}

pub fn kinds(events: &[DeploymentEvent]) -> Vec<EventKind> {
    events.iter().map(DeploymentEvent::kind).collect()
}

/// Poll `condition` on the (paused) clock until it holds or a minute passes.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..600 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    condition()
}
