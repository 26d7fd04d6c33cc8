//! # End-to-End Lifecycle Flows
//!
//! ## Self-paid
//!
//! ```text
//! submit_transaction → Processing → ConfirmationChecker → Success
//!                                  → indexer poll → Indexed → entry pruned
//! ```
//!
//! ## Sponsored
//!
//! ```text
//! submit_relay_task → Relaying → RelayTaskChecker → Failed (Blacklisted)
//!                                 → entry kept as Failed, never indexed
//! ```

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{eventually, kinds, System};
    use cf_01_pending_store::PendingStoreApi;
    use cf_02_deployment_monitor::test_utils::{
        awaiting_deployment, ScriptedNodeClient, ScriptedRelayClient,
    };
    use shared_bus::{DeploymentEvent, EventKind};
    use shared_types::{
        DeploymentFailure, DeploymentStatus, PaymentMethod, RelayTaskId, RelayTaskState, TxHash,
    };
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_self_paid_deployment_is_confirmed_indexed_and_pruned() {
        let mut system = System::in_memory(
            ScriptedNodeClient::found_on_attempt(3),
            ScriptedRelayClient::new(),
        );
        system.monitor.start().unwrap();
        let deployment = awaiting_deployment(0xAA, PaymentMethod::SelfPaid);

        system
            .monitor
            .submitter()
            .submit_transaction(deployment.clone(), TxHash([0xAA; 32]), None)
            .await
            .unwrap();

        let events = system.events_until(EventKind::Indexed).await;
        assert_eq!(
            kinds(&events),
            vec![EventKind::Processing, EventKind::Success, EventKind::Indexed]
        );
        assert_eq!(system.node.lookup_calls(), 3);
        assert_eq!(system.indexer.calls(), 1);

        let store = system.store.clone();
        let key = deployment.key();
        assert!(eventually(|| store.get(&key).unwrap().is_none()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_visible_before_indexing_completes() {
        let mut system = System::in_memory(
            ScriptedNodeClient::found_on_attempt(1),
            ScriptedRelayClient::new(),
        );
        system.monitor.start().unwrap();
        let deployment = awaiting_deployment(0xAA, PaymentMethod::SelfPaid);

        system
            .monitor
            .submitter()
            .submit_transaction(deployment.clone(), TxHash([0xAA; 32]), Some(10))
            .await
            .unwrap();
        system.events_until(EventKind::Success).await;

        let store = system.store.clone();
        let key = deployment.key();
        assert!(
            eventually(|| {
                store
                    .get(&key)
                    .unwrap()
                    .is_some_and(|entry| entry.status == DeploymentStatus::Success)
            })
            .await
        );
        // The indexer double takes 30s; the entry is still present meanwhile.
        let stored = system.store.get(&key).unwrap().unwrap();
        assert_eq!(stored.creation_props, deployment.creation_props);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blacklisted_relay_task_fails_and_is_kept() {
        let mut system = System::in_memory(
            ScriptedNodeClient::never_found(),
            ScriptedRelayClient::with_states([
                RelayTaskState::CheckPending,
                RelayTaskState::Blacklisted,
            ]),
        );
        system.monitor.start().unwrap();
        let deployment = awaiting_deployment(0xBB, PaymentMethod::Sponsored);

        system
            .monitor
            .submitter()
            .submit_relay_task(deployment.clone(), RelayTaskId::from("task-1"))
            .await
            .unwrap();

        let events = system.events_until(EventKind::Failed).await;
        assert_eq!(kinds(&events), vec![EventKind::Relaying, EventKind::Failed]);
        assert!(matches!(
            &events[1],
            DeploymentEvent::Failed {
                error: DeploymentFailure::RelayTaskFailed {
                    state: RelayTaskState::Blacklisted
                },
                ..
            }
        ));

        let store = system.store.clone();
        let key = deployment.key();
        assert!(
            eventually(|| {
                store
                    .get(&key)
                    .unwrap()
                    .is_some_and(|entry| entry.status == DeploymentStatus::Failed)
            })
            .await
        );

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert!(system.events.drain().is_empty());
        assert_eq!(system.indexer.calls(), 0);
        assert_eq!(system.relay.calls(), 2);
        let stored = system.store.get(&key).unwrap().unwrap();
        assert_eq!(
            stored.error,
            Some(DeploymentFailure::RelayTaskFailed {
                state: RelayTaskState::Blacklisted
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_relay_timeout_fails_once() {
        let mut system = System::in_memory(
            ScriptedNodeClient::never_found(),
            ScriptedRelayClient::pending_forever(),
        );
        system.monitor.start().unwrap();
        let deployment = awaiting_deployment(0xBB, PaymentMethod::Sponsored);

        system
            .monitor
            .submitter()
            .submit_relay_task(deployment, RelayTaskId::from("task-9"))
            .await
            .unwrap();

        let events = system.events_until(EventKind::Failed).await;
        assert!(matches!(
            events.last(),
            Some(DeploymentEvent::Failed {
                error: DeploymentFailure::RelayTimeout { after_secs: 120 },
                ..
            })
        ));

        let polls = system.relay.calls();
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(system.relay.calls(), polls);
        assert!(system.events.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transaction_never_found_fails() {
        let mut system = System::in_memory(
            ScriptedNodeClient::never_found(),
            ScriptedRelayClient::new(),
        );
        system.monitor.start().unwrap();
        let deployment = awaiting_deployment(0xCC, PaymentMethod::SelfPaid);

        system
            .monitor
            .submitter()
            .submit_transaction(deployment.clone(), TxHash([0xCC; 32]), None)
            .await
            .unwrap();

        let events = system.events_until(EventKind::Failed).await;
        match events.last() {
            Some(DeploymentEvent::Failed { error, .. }) => {
                assert!(error.to_string().starts_with("Transaction not found"));
            }
            other => panic!("unexpected terminal event {other:?}"),
        }
        assert_eq!(system.node.lookup_calls(), 8);
    }
}
