//! # Status Lifecycle Rules
//!
//! - Status never moves backwards once terminal.
//! - A failed entry can be retried after it is reset.
//! - Concurrent notifications for one key start one checker.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{eventually, kinds, System};
    use cf_01_pending_store::PendingStoreApi;
    use cf_02_deployment_monitor::test_utils::{
        awaiting_deployment, context, processing_deployment, Confirmation, ScriptedNodeClient,
        ScriptedRelayClient,
    };
    use shared_bus::{DeploymentEvent, EventKind, EventPublisher};
    use shared_types::{DeploymentFailure, DeploymentStatus, PaymentMethod, TxHash};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_late_success_does_not_resurrect_failed_entry() {
        let mut system = System::in_memory(
            ScriptedNodeClient::never_found(),
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
        system.events_until(EventKind::Failed).await;

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

        system
            .monitor
            .bus()
            .publish(DeploymentEvent::Success {
                context: context(0xAA),
                payment_method: PaymentMethod::SelfPaid,
            })
            .await;
        tokio::time::sleep(Duration::from_secs(120)).await;

        let stored = system.store.get(&key).unwrap().unwrap();
        assert_eq!(stored.status, DeploymentStatus::Failed);
        assert_eq!(
            stored.error,
            Some(DeploymentFailure::TransactionNotFound { attempts: 8 })
        );
        assert_eq!(system.indexer.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_entry_is_monitored_again_after_reset() {
        let mut system = System::in_memory(
            ScriptedNodeClient::never_found(),
            ScriptedRelayClient::new(),
        );
        system.monitor.start().unwrap();
        let submitter = system.monitor.submitter();
        let deployment = awaiting_deployment(0xAA, PaymentMethod::SelfPaid);
        submitter
            .submit_transaction(deployment.clone(), TxHash([1; 32]), None)
            .await
            .unwrap();
        system.events_until(EventKind::Failed).await;

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
        assert!(!system.monitor.supervisor().is_monitored(&key));

        assert!(submitter.reset_for_retry(&key).await.unwrap());
        let retried = system.store.get(&key).unwrap().unwrap();
        submitter
            .submit_transaction(retried, TxHash([2; 32]), None)
            .await
            .unwrap();

        let events = system.events_until(EventKind::Failed).await;
        assert_eq!(
            kinds(&events),
            vec![
                EventKind::AwaitingExecution,
                EventKind::Processing,
                EventKind::Failed
            ]
        );
        assert_eq!(system.monitor.supervisor().checkers_started(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_start_one_checker() {
        let node = ScriptedNodeClient::found_on_attempt(1);
        node.set_confirmation(Confirmation::Pending);
        let mut system = System::in_memory(node, ScriptedRelayClient::new());
        system.monitor.start().unwrap();

        // Distinct start blocks make each write a real change with its own notification.
        let writers: Vec<_> = (0..3u64)
            .map(|block| {
                let store = Arc::clone(&system.store);
                tokio::spawn(async move {
                    let mut deployment = processing_deployment(0xAA, TxHash([0xAA; 32]));
                    deployment.start_block = Some(block);
                    store.upsert(deployment).unwrap();
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        assert_eq!(system.monitor.supervisor().checkers_started(), 1);
        assert_eq!(system.monitor.supervisor().monitored_count(), 1);
        system.monitor.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_networks_are_tracked_separately() {
        let node = ScriptedNodeClient::found_on_attempt(1);
        node.set_confirmation(Confirmation::Pending);
        let mut system = System::in_memory(node, ScriptedRelayClient::new());
        system.monitor.start().unwrap();

        let mainnet = processing_deployment(0xAA, TxHash([1; 32]));
        let mut polygon = mainnet.clone();
        polygon.network_id = "137".into();
        system.store.upsert(mainnet).unwrap();
        system.store.upsert(polygon).unwrap();

        assert_eq!(system.monitor.supervisor().checkers_started(), 2);
    }
}
