//! Pending Deployment Store - keyed records with change notifications
//!
//! Entries are serialised with serde_json into the injected key-value
//! backend. Writers are serialised by a mutex around the backend, giving
//! last-writer-wins per key; change listeners run after the mutex is
//! released.

use crate::domain::{
    storage_key, ChangeListener, ChangeListenerHandle, ListenerRegistry, StoreChange,
    PENDING_PREFIX,
};
use crate::error::StoreResult;
use crate::ports::inbound::PendingStoreApi;
use crate::ports::outbound::KeyValueStore;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use shared_types::{DeploymentKey, NetworkId, PendingDeployment};
use std::sync::Arc;
use tracing::{debug, info};

/// Pending store backed by a `KeyValueStore`
pub struct PendingDeploymentStore<K: KeyValueStore> {
    backend: Mutex<K>,
    listeners: Arc<RwLock<ListenerRegistry>>,
}

impl<K: KeyValueStore> PendingDeploymentStore<K> {
    pub fn new(backend: K) -> Self {
        Self {
            backend: Mutex::new(backend),
            listeners: Arc::new(RwLock::new(ListenerRegistry::new())),
        }
    }

    /// Entries for one network (the per-chain view a client renders).
    pub fn list_for_network(&self, network_id: &NetworkId) -> StoreResult<Vec<PendingDeployment>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|deployment| &deployment.network_id == network_id)
            .collect())
    }

    /// Entries submitted more than `older_than` before `now`.
    ///
    /// Entries without a submission timestamp are never stale.
    pub fn list_stale(
        &self,
        older_than: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<PendingDeployment>> {
        let cutoff = now - older_than;
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|deployment| deployment.submitted_at.is_some_and(|at| at < cutoff))
            .collect())
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.backend.lock().prefix_scan(PENDING_PREFIX.as_bytes())?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn notify(&self, change: &StoreChange) {
        let listeners = self.listeners.read().snapshot();
        for listener in listeners {
            listener(change);
        }
    }
}

impl<K: KeyValueStore> PendingStoreApi for PendingDeploymentStore<K> {
    fn upsert(&self, deployment: PendingDeployment) -> StoreResult<bool> {
        let key = deployment.key();
        let storage_key = storage_key(&key);
        let encoded = serde_json::to_vec(&deployment)?;

        {
            let mut backend = self.backend.lock();
            if backend.get(&storage_key)?.as_deref() == Some(encoded.as_slice()) {
                debug!(key = %key, "[cf-01] Upsert unchanged, skipping notification");
                return Ok(false);
            }
            backend.put(&storage_key, &encoded)?;
        }

        debug!(key = %key, status = %deployment.status, "[cf-01] Entry upserted");
        self.notify(&StoreChange::Upserted(deployment));
        Ok(true)
    }

    fn get(&self, key: &DeploymentKey) -> StoreResult<Option<PendingDeployment>> {
        let raw = self.backend.lock().get(&storage_key(key))?;
        raw.map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(Into::into)
    }

    fn remove(&self, key: &DeploymentKey) -> StoreResult<bool> {
        let storage_key = storage_key(key);
        {
            let mut backend = self.backend.lock();
            if backend.get(&storage_key)?.is_none() {
                return Ok(false);
            }
            backend.delete(&storage_key)?;
        }

        info!(key = %key, "[cf-01] 🗑️ Entry removed");
        self.notify(&StoreChange::Removed(key.clone()));
        Ok(true)
    }

    fn list_all(&self) -> StoreResult<Vec<PendingDeployment>> {
        let entries = self.backend.lock().prefix_scan(PENDING_PREFIX.as_bytes())?;
        let mut deployments = entries
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice::<PendingDeployment>(&bytes))
            .collect::<Result<Vec<_>, _>>()?;
        deployments.sort_by_key(PendingDeployment::key);
        Ok(deployments)
    }

    fn on_change(&self, listener: ChangeListener) -> ChangeListenerHandle {
        ListenerRegistry::register(&self.listeners, listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryKVStore;
    use shared_types::{Address, DeploymentStatus, PaymentMethod, TxHash};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn deployment(network: &str, byte: u8) -> PendingDeployment {
        PendingDeployment::awaiting_execution(
            NetworkId::from(network),
            Address([byte; 20]),
            serde_json::json!({ "owners": ["0x01"], "threshold": 1 }),
            PaymentMethod::SelfPaid,
        )
    }

    fn store() -> PendingDeploymentStore<InMemoryKVStore> {
        PendingDeploymentStore::new(InMemoryKVStore::new())
    }

    fn counting_listener(
        store: &PendingDeploymentStore<InMemoryKVStore>,
    ) -> (Arc<AtomicUsize>, ChangeListenerHandle) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle = store.on_change(Arc::new(move |_: &StoreChange| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (calls, handle)
    }

    #[test]
    fn test_upsert_and_get() {
        let store = store();
        let entry = deployment("1", 0xAA);

        assert!(store.upsert(entry.clone()).unwrap());
        assert_eq!(store.get(&entry.key()).unwrap(), Some(entry));
    }

    #[test]
    fn test_identical_upsert_fires_once() {
        let store = store();
        let (calls, _handle) = counting_listener(&store);
        let entry = deployment("1", 0xAA);

        assert!(store.upsert(entry.clone()).unwrap());
        assert!(!store.upsert(entry).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_changed_upsert_fires_again() {
        let store = store();
        let (calls, _handle) = counting_listener(&store);
        let mut entry = deployment("1", 0xAA);
        store.upsert(entry.clone()).unwrap();

        entry.status = DeploymentStatus::Processing;
        entry.tx_hash = Some(TxHash([1; 32]));
        store.upsert(entry).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let store = store();
        let entry = deployment("1", 0xAB);
        store.upsert(entry.clone()).unwrap();

        let upper: Address = "0xABABABABABABABABABABABABABABABABABABABAB".parse().unwrap();
        let key = DeploymentKey::new(NetworkId::new(" 1"), upper);
        assert_eq!(store.get(&key).unwrap(), Some(entry));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = store();
        let (calls, _handle) = counting_listener(&store);
        let entry = deployment("1", 0xAA);
        store.upsert(entry.clone()).unwrap();

        assert!(store.remove(&entry.key()).unwrap());
        assert!(!store.remove(&entry.key()).unwrap());
        assert_eq!(store.get(&entry.key()).unwrap(), None);
        // One upsert + one effective removal
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listener_receives_change() {
        let store = store();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _handle = store.on_change(Arc::new(move |change: &StoreChange| {
            sink.lock().push(change.clone())
        }));

        let entry = deployment("1", 0xAA);
        store.upsert(entry.clone()).unwrap();
        store.remove(&entry.key()).unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                StoreChange::Upserted(entry.clone()),
                StoreChange::Removed(entry.key())
            ]
        );
    }

    #[test]
    fn test_listener_may_read_store() {
        let store = Arc::new(store());
        let reader = Arc::clone(&store);
        let observed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&observed);
        let _handle = store.on_change(Arc::new(move |change: &StoreChange| {
            if reader.get(&change.key()).unwrap().is_some() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        store.upsert(deployment("1", 1)).unwrap();
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribed_listener_is_silent() {
        let store = store();
        let (calls, handle) = counting_listener(&store);
        handle.unsubscribe();

        store.upsert(deployment("1", 1)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_list_all_and_by_network() {
        let store = store();
        store.upsert(deployment("137", 2)).unwrap();
        store.upsert(deployment("1", 1)).unwrap();
        store.upsert(deployment("1", 3)).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(store.len().unwrap(), 3);

        let mainnet = store.list_for_network(&NetworkId::from("1")).unwrap();
        assert_eq!(mainnet.len(), 2);
        assert!(mainnet.iter().all(|d| d.network_id.as_str() == "1"));
    }

    #[test]
    fn test_list_stale() {
        let store = store();
        let now = Utc::now();

        let mut old = deployment("1", 1);
        old.submitted_at = Some(now - Duration::minutes(30));
        let mut fresh = deployment("1", 2);
        fresh.submitted_at = Some(now - Duration::seconds(10));
        let unsubmitted = deployment("1", 3);

        store.upsert(old.clone()).unwrap();
        store.upsert(fresh).unwrap();
        store.upsert(unsubmitted).unwrap();

        let stale = store.list_stale(Duration::minutes(5), now).unwrap();
        assert_eq!(stale, vec![old]);
    }

    #[test]
    fn test_empty_store() {
        let store = store();
        assert!(store.is_empty().unwrap());
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_retried_after_failed_write_is_persisted() {
        use crate::adapters::FileBackedKVStore;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending.json");
        let store = PendingDeploymentStore::new(FileBackedKVStore::open(&path).unwrap());
        let entry = deployment("1", 0xAA);

        let tmp = path.with_extension("tmp");
        std::fs::create_dir(&tmp).unwrap();
        assert!(store.upsert(entry.clone()).is_err());
        assert_eq!(store.get(&entry.key()).unwrap(), None);

        std::fs::remove_dir(&tmp).unwrap();
        assert!(store.upsert(entry.clone()).unwrap());
        drop(store);

        let reopened = PendingDeploymentStore::new(FileBackedKVStore::open(&path).unwrap());
        assert_eq!(reopened.get(&entry.key()).unwrap(), Some(entry));
    }
}
