//! # Monitor Runtime
//!
//! Wires the file-backed pending store, the event bus and the deployment
//! monitor to HTTP node, relay and indexer endpoints.

pub mod config;
pub mod logging;

pub use config::{RuntimeConfig, RuntimeConfigError};
pub use logging::init_logging;

use anyhow::{Context, Result};
use cf_01_pending_store::{FileBackedKVStore, PendingDeploymentStore, PendingStoreApi};
use cf_02_deployment_monitor::{
    DeploymentMonitor, HttpIndexerPoller, HttpRelayClient, JsonRpcNodeClient, Submitter,
};
use shared_bus::InMemoryEventBus;
use std::sync::Arc;
use tracing::info;

type HttpMonitor = DeploymentMonitor<JsonRpcNodeClient, HttpRelayClient, HttpIndexerPoller>;

/// The assembled monitor process.
pub struct MonitorRuntime {
    config: RuntimeConfig,
    monitor: HttpMonitor,
}

impl MonitorRuntime {
    /// Must be called from within a tokio runtime.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let backend = FileBackedKVStore::open(&config.store_path)
            .with_context(|| format!("Failed to open store at {}", config.store_path.display()))?;
        let store: Arc<dyn PendingStoreApi> = Arc::new(PendingDeploymentStore::new(backend));
        let bus = Arc::new(InMemoryEventBus::new());

        let node = JsonRpcNodeClient::new(config.node.clone()).context("Failed to build node client")?;
        let relay = HttpRelayClient::new(&config.relay_url).context("Failed to build relay client")?;
        let indexer = HttpIndexerPoller::new(&config.indexer_url, config.monitor.indexer.clone())
            .context("Failed to build indexer client")?;

        let monitor = DeploymentMonitor::new(
            config.monitor.clone(),
            store,
            bus,
            Arc::new(node),
            Arc::new(relay),
            Arc::new(indexer),
        )?;

        Ok(Self { config, monitor })
    }

    pub fn start(&mut self) -> Result<()> {
        info!("===========================================");
        info!("  Counterfactual Deployment Monitor v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");
        info!("Node RPC: {}", self.config.node.url);
        info!("Relay:    {}", self.config.relay_url);
        info!("Indexer:  {}", self.config.indexer_url);
        info!("Store:    {}", self.config.store_path.display());

        self.monitor.start()?;
        Ok(())
    }

    /// Entry points for recording new submissions.
    pub fn submitter(&self) -> Submitter {
        self.monitor.submitter()
    }

    pub fn monitor(&self) -> &HttpMonitor {
        &self.monitor
    }

    pub fn shutdown(&mut self) {
        info!("Initiating shutdown...");
        self.monitor.shutdown();
        info!("Shutdown complete");
    }
}
