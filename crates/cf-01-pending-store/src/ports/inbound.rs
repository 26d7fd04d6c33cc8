//! Driving Ports (API - Inbound)
//!
//! The only surface the monitor, submitters, and display layers use to read
//! or mutate pending deployments.

use crate::domain::{ChangeListener, ChangeListenerHandle};
use crate::error::StoreResult;
use shared_types::{DeploymentKey, PendingDeployment};

/// Primary pending store API
pub trait PendingStoreApi: Send + Sync {
    /// Insert or replace the entry keyed by `(network_id, address)`.
    ///
    /// # Returns
    /// * `true` if the stored value changed, `false` if it was already identical
    ///   (no change notification is fired in that case)
    fn upsert(&self, deployment: PendingDeployment) -> StoreResult<bool>;

    /// Look up an entry.
    fn get(&self, key: &DeploymentKey) -> StoreResult<Option<PendingDeployment>>;

    /// Delete an entry. Idempotent.
    ///
    /// # Returns
    /// * `true` if an entry was removed
    fn remove(&self, key: &DeploymentKey) -> StoreResult<bool>;

    /// Every entry, ordered by key.
    fn list_all(&self) -> StoreResult<Vec<PendingDeployment>>;

    /// Register a change listener; dropping the handle unregisters it.
    fn on_change(&self, listener: ChangeListener) -> ChangeListenerHandle;
}
