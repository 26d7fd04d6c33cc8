//! Change notification registry
//!
//! Listeners are invoked synchronously by the writer, after the backend lock
//! has been released, so a listener may read the store without deadlocking.

use parking_lot::RwLock;
use shared_types::{DeploymentKey, PendingDeployment};
use std::sync::{Arc, Weak};
use tracing::debug;

/// A committed mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    /// Entry created or changed; carries the new value.
    Upserted(PendingDeployment),
    /// Entry deleted.
    Removed(DeploymentKey),
}

impl StoreChange {
    #[must_use]
    pub fn key(&self) -> DeploymentKey {
        match self {
            Self::Upserted(deployment) => deployment.key(),
            Self::Removed(key) => key.clone(),
        }
    }
}

/// Callback invoked for every committed mutation.
pub type ChangeListener = Arc<dyn Fn(&StoreChange) + Send + Sync>;

/// Registered listeners, keyed by registration id.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(u64, ChangeListener)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; dropping the returned handle unregisters it.
    pub fn register(
        registry: &Arc<RwLock<ListenerRegistry>>,
        listener: ChangeListener,
    ) -> ChangeListenerHandle {
        let mut guard = registry.write();
        let id = guard.next_id;
        guard.next_id += 1;
        guard.listeners.push((id, listener));
        debug!(listener_id = id, "[cf-01] Change listener registered");

        ChangeListenerHandle {
            id,
            registry: Arc::downgrade(registry),
        }
    }

    /// Listeners to notify, cloned so callers can release the lock first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChangeListener> {
        self.listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn remove(&mut self, id: u64) {
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
    }
}

/// Disposer returned by `on_change`.
pub struct ChangeListenerHandle {
    id: u64,
    registry: Weak<RwLock<ListenerRegistry>>,
}

impl ChangeListenerHandle {
    /// Stop receiving change notifications.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for ChangeListenerHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.write().remove(self.id);
            debug!(listener_id = self.id, "[cf-01] Change listener removed");
        }
    }
}
