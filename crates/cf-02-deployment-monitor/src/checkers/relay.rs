//! Sponsored relay checker.
//!
//! Polls the relay task status on a fixed interval under a hard time
//! budget. The first poll happens one interval after start.

use crate::config::RelayConfig;
use crate::domain::CheckOutcome;
use crate::ports::RelayClient;
use shared_bus::{DeploymentContext, EventPublisher};
use shared_types::{DeploymentFailure, PaymentMethod, RelayTaskId, RelayTaskState};
use std::sync::Arc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Watches one relay task to a terminal outcome.
pub struct RelayTaskChecker<R: RelayClient> {
    relay: Arc<R>,
    publisher: Arc<dyn EventPublisher>,
    config: RelayConfig,
}

impl<R: RelayClient> RelayTaskChecker<R> {
    pub fn new(relay: Arc<R>, publisher: Arc<dyn EventPublisher>, config: RelayConfig) -> Self {
        Self {
            relay,
            publisher,
            config,
        }
    }

    /// Run to completion and publish the single terminal event.
    ///
    /// Dropping the polling future on timeout stops any further polls.
    pub async fn check(&self, context: DeploymentContext, task_id: RelayTaskId) -> CheckOutcome {
        let key = context.key();
        info!(key = %key, task = %task_id, "[cf-02] 🔍 Relay check started");

        let outcome =
            match tokio::time::timeout(self.config.timeout, self.poll_until_terminal(&task_id))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        key = %key,
                        task = %task_id,
                        timeout_secs = self.config.timeout.as_secs(),
                        "[cf-02] ⏱️ Relay task timed out"
                    );
                    CheckOutcome::Failed(DeploymentFailure::RelayTimeout {
                        after_secs: self.config.timeout.as_secs(),
                    })
                }
            };

        if outcome.is_success() {
            info!(key = %key, task = %task_id, "[cf-02] ✅ Relay task executed");
        }

        self.publisher
            .publish(outcome.clone().into_event(context, PaymentMethod::Sponsored))
            .await;
        outcome
    }

    async fn poll_until_terminal(&self, task_id: &RelayTaskId) -> CheckOutcome {
        let period = self.config.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let status = match self.relay.get_task_status(task_id).await {
                Ok(Some(status)) => status,
                Ok(None) => {
                    debug!(task = %task_id, "[cf-02] Relay does not know task yet");
                    continue;
                }
                Err(err) => {
                    warn!(task = %task_id, error = %err, "[cf-02] Relay status poll failed");
                    continue;
                }
            };

            match status.state {
                RelayTaskState::ExecSuccess => return CheckOutcome::Success,
                state if state.is_failure() => {
                    warn!(task = %task_id, %state, "[cf-02] ❌ Relay task failed");
                    return CheckOutcome::Failed(DeploymentFailure::RelayTaskFailed { state });
                }
                state => debug!(task = %task_id, %state, "[cf-02] Relay task pending"),
            }
        }
    }
}
