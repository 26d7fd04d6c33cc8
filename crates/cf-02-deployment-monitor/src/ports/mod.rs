//! # Ports Layer (Hexagonal Architecture)
//!
//! - **Outbound**: node, relay and indexer collaborators the checkers call

pub mod outbound;

pub use outbound::{IndexerPoller, NodeClient, RelayClient};
