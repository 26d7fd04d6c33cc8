//! Domain layer for the pending store
//!
//! - `keys`: normalised storage keys
//! - `listeners`: change notification registry

pub mod keys;
pub mod listeners;

pub use keys::{storage_key, PENDING_PREFIX};
pub use listeners::{ChangeListener, ChangeListenerHandle, ListenerRegistry, StoreChange};
