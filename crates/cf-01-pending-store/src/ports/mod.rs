//! Ports layer (Hexagonal Architecture)
//!
//! - `inbound`: the store API other components call
//! - `outbound`: the key-value backend the store requires

pub mod inbound;
pub mod outbound;

pub use inbound::PendingStoreApi;
pub use outbound::{KeyValueStore, ScanResult};
