//! # Adapters Layer (Hexagonal Architecture)
//!
//! Key-value backends implementing the outbound `KeyValueStore` port.

mod file;
mod memory;

pub use file::FileBackedKVStore;
pub use memory::InMemoryKVStore;
