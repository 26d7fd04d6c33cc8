//! # cf-01-pending-store
//!
//! Durable store of optimistically-created deployments that have not yet
//! been confirmed and indexed.
//!
//! ## Overview
//!
//! - **Keyed by `(network_id, address)`**: addresses are normalised on parse,
//!   so caller casing never produces duplicate entries.
//! - **Idempotent writes**: re-upserting an identical entry is a no-op and
//!   fires no change notification.
//! - **Change notifications**: the supervisor reacts to `on_change` instead
//!   of polling.
//!
//! ## Architecture
//!
//! ```text
//! Submitter ──upsert──→ ┌──────────────────────┐ ──on_change──→ Supervisor
//!                       │ PendingDeploymentStore│
//! Reconciler ─upsert/──→│   (serde_json)        │
//!             remove    └──────────┬───────────┘
//!                                  │ KeyValueStore port
//!                      ┌───────────┴───────────┐
//!                 InMemoryKVStore       FileBackedKVStore
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use cf_01_pending_store::{InMemoryKVStore, PendingDeploymentStore, PendingStoreApi};
//!
//! let store = PendingDeploymentStore::new(InMemoryKVStore::new());
//! let _handle = store.on_change(Arc::new(|change| println!("{change:?}")));
//! store.upsert(deployment)?;
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{FileBackedKVStore, InMemoryKVStore};
pub use domain::{ChangeListener, ChangeListenerHandle, StoreChange};
pub use error::{KVStoreError, StoreError, StoreResult};
pub use ports::{KeyValueStore, PendingStoreApi};
pub use service::PendingDeploymentStore;
