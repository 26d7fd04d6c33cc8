//! # Counterfactual Deployment Monitor
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialise logging
//! 3. Open the file-backed pending store
//! 4. Start the reconciler, then the supervisor
//! 5. Run until Ctrl+C, then abort checkers and stop the reconciler

use anyhow::{Context, Result};
use monitor_runtime::{init_logging, MonitorRuntime, RuntimeConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("Invalid configuration")?;
    init_logging(&config.log_level, config.json_logs)?;

    let mut runtime = MonitorRuntime::new(config)?;
    runtime.start()?;

    info!("Monitor is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown();
    Ok(())
}
