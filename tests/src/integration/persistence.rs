//! # Restart Recovery
//!
//! In-flight entries written to the file-backed store before a restart are
//! picked up by the supervisor's startup scan and driven to completion.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{eventually, kinds, System};
    use cf_01_pending_store::{FileBackedKVStore, PendingDeploymentStore, PendingStoreApi};
    use cf_02_deployment_monitor::test_utils::{
        processing_deployment, relaying_deployment, ScriptedNodeClient, ScriptedRelayClient,
    };
    use shared_bus::EventKind;
    use shared_types::{DeploymentStatus, RelayTaskState, TxHash};

    #[tokio::test(start_paused = true)]
    async fn test_resumes_in_flight_entry_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending.json");
        let deployment = processing_deployment(0xAA, TxHash([0xAA; 32]));

        {
            let store = PendingDeploymentStore::new(FileBackedKVStore::open(&path).unwrap());
            store.upsert(deployment.clone()).unwrap();
        }

        let mut system = System::with_backend(
            FileBackedKVStore::open(&path).unwrap(),
            ScriptedNodeClient::found_on_attempt(2),
            ScriptedRelayClient::new(),
        );
        system.monitor.start().unwrap();

        let events = system.events_until(EventKind::Indexed).await;
        assert_eq!(
            kinds(&events),
            vec![EventKind::Success, EventKind::Indexed]
        );
        assert_eq!(system.monitor.supervisor().checkers_started(), 1);

        let store = system.store.clone();
        let key = deployment.key();
        assert!(eventually(|| store.get(&key).unwrap().is_none()).await);

        let reopened = PendingDeploymentStore::new(FileBackedKVStore::open(&path).unwrap());
        assert!(reopened.is_empty().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_failure_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending.json");
        let deployment = relaying_deployment(0xBB, "task-1");

        {
            let mut system = System::with_backend(
                FileBackedKVStore::open(&path).unwrap(),
                ScriptedNodeClient::never_found(),
                ScriptedRelayClient::with_states([RelayTaskState::ExecReverted]),
            );
            system.store.upsert(deployment.clone()).unwrap();
            system.monitor.start().unwrap();
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
            system.monitor.shutdown();
        }

        let mut system = System::with_backend(
            FileBackedKVStore::open(&path).unwrap(),
            ScriptedNodeClient::never_found(),
            ScriptedRelayClient::new(),
        );
        system.monitor.start().unwrap();

        let stored = system.store.get(&deployment.key()).unwrap().unwrap();
        assert_eq!(stored.status, DeploymentStatus::Failed);
        assert!(stored.error.is_some());
        assert_eq!(system.monitor.supervisor().checkers_started(), 0);
    }
}
